//! Size measurement for a checked-out repository.
//!
//! The size of a tree is the number of newline bytes across every text file
//! in it. Version-control metadata directories are pruned from the walk and
//! files are classified as binary when a NUL byte shows up in their first
//! [`BINARY_PROBE_BYTES`] bytes. Binary files contribute nothing.
//!
//! Counting never fails: a file that cannot be read counts as zero and the
//! walk moves on.

use std::fs::File;
use std::io;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;

use tracing::debug;
use tracing::trace;
use walkdir::DirEntry;
use walkdir::WalkDir;

/// Number of leading bytes inspected when deciding whether a file is binary.
pub const BINARY_PROBE_BYTES: usize = 1024;

/// Directory names that are never descended into.
pub const VCS_METADATA_DIRS: &[&str] = &[".git", ".hg", ".svn"];

const READ_CHUNK_BYTES: usize = 8_192;

/// Totals gathered while walking a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub lines: u64,
    pub text_files: u64,
    pub binary_files: u64,
    pub unreadable_files: u64,
}

/// Sum of newline bytes across all text files under `root`.
pub fn count_lines(root: &Path) -> u64 {
    tree_stats(root).lines
}

/// Walk `root` and collect per-category file counts alongside the line total.
pub fn tree_stats(root: &Path) -> TreeStats {
    tree_stats_with(root, |path: &Path| File::open(path))
}

/// [`tree_stats`] with the way each regular file is opened supplied by the caller.
fn tree_stats_with<R, F>(root: &Path, open: F) -> TreeStats
where
    R: Read,
    F: Fn(&Path) -> io::Result<R>,
{
    let mut stats = TreeStats::default();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !is_vcs_metadata_dir(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match open(entry.path()).and_then(count_reader_lines) {
            Ok(Some(lines)) => {
                stats.text_files += 1;
                stats.lines += lines;
            }
            Ok(None) => {
                trace!(path = %entry.path().display(), "skipping binary file");
                stats.binary_files += 1;
            }
            Err(err) => {
                debug!(path = %entry.path().display(), error = %err, "failed to read file");
                stats.unreadable_files += 1;
            }
        }
    }

    debug!(root = %root.display(), ?stats, "tree walk complete");
    stats
}

fn is_vcs_metadata_dir(entry: &DirEntry) -> bool {
    // The root itself is always walked, whatever it is called.
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| VCS_METADATA_DIRS.contains(&name))
}

#[cfg(test)]
fn count_file_lines(path: &Path) -> io::Result<Option<u64>> {
    count_reader_lines(File::open(path)?)
}

/// Count newlines in a single file's contents.
///
/// Returns `Ok(None)` for binary files. The probe bytes are reused for the
/// count so each file is read once.
fn count_reader_lines<R: Read>(mut file: R) -> io::Result<Option<u64>> {
    let mut head = Vec::with_capacity(BINARY_PROBE_BYTES);
    (&mut file)
        .take(BINARY_PROBE_BYTES as u64)
        .read_to_end(&mut head)?;
    if head.contains(&0) {
        return Ok(None);
    }

    let mut lines = count_newlines(&head);
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => lines += count_newlines(&buf[..n]),
            Err(ref err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(Some(lines))
}

fn count_newlines(bytes: &[u8]) -> u64 {
    bytes.iter().filter(|&&b| b == b'\n').count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn sums_newlines_across_nested_text_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.md", b"one\ntwo\n");
        write(dir.path(), "src/main.js", b"a\nb\nc\n");
        write(dir.path(), "src/deep/er/util.js", b"x\ny");

        assert_eq!(count_lines(dir.path()), 6);
    }

    #[test]
    fn prunes_vcs_metadata_at_any_depth() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "file.txt", b"1\n");
        write(dir.path(), ".git/HEAD", b"ref: refs/heads/main\n");
        write(dir.path(), ".git/objects/pack/info", b"a\nb\nc\n");
        write(dir.path(), "vendor/lib/.git/config", b"[core]\n");
        write(dir.path(), "vendor/lib/.hg/store", b"x\n");

        assert_eq!(count_lines(dir.path()), 1);
    }

    #[test]
    fn file_named_like_vcs_dir_is_still_counted() {
        let dir = TempDir::new().unwrap();
        // Submodule checkouts use a `.git` *file*, which is ordinary text.
        write(dir.path(), "sub/.git", b"gitdir: ../.git/modules/sub\n");

        assert_eq!(count_lines(dir.path()), 1);
    }

    #[test]
    fn binary_files_contribute_nothing() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "text.txt", b"a\nb\n");
        write(dir.path(), "image.png", b"\x89PNG\n\x00\n\n\n");

        let stats = tree_stats(dir.path());
        assert_eq!(
            stats,
            TreeStats {
                lines: 2,
                text_files: 1,
                binary_files: 1,
                unreadable_files: 0,
            }
        );
    }

    #[test]
    fn nul_after_probe_window_is_counted_as_text() {
        let dir = TempDir::new().unwrap();
        let mut contents = vec![b'\n'; BINARY_PROBE_BYTES];
        contents.push(0);
        contents.extend_from_slice(b"\n\n");
        write(dir.path(), "late_nul.txt", &contents);

        assert_eq!(count_lines(dir.path()), BINARY_PROBE_BYTES as u64 + 2);
    }

    #[test]
    fn large_file_is_counted_in_chunks() {
        let dir = TempDir::new().unwrap();
        let line = b"0123456789abcdef\n";
        let contents: Vec<u8> = line.repeat(10_000);
        write(dir.path(), "big.txt", &contents);

        assert_eq!(count_lines(dir.path()), 10_000);
    }

    #[test]
    fn reading_a_directory_as_file_is_an_error_not_a_panic() {
        let dir = TempDir::new().unwrap();
        assert!(count_file_lines(dir.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_counts_as_zero() {
        use std::os::unix::fs::PermissionsExt;

        // Permission bits do not stop root from reading.
        if unsafe { libc::geteuid() } == 0 {
            return;
        }

        let dir = TempDir::new().unwrap();
        write(dir.path(), "ok.txt", b"a\nb\nc\n");
        write(dir.path(), "locked.txt", b"x\ny\n");
        let locked = dir.path().join("locked.txt");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let stats = tree_stats(dir.path());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.unreadable_files, 1);
    }

    #[test]
    fn open_failure_is_tallied_and_the_walk_continues() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ok.txt", b"a\nb\nc\n");
        write(dir.path(), "nested/also_ok.txt", b"d\n");
        write(dir.path(), "nested/locked.txt", b"x\ny\n");

        let stats = tree_stats_with(dir.path(), |path| {
            if path.ends_with("nested/locked.txt") {
                Err(io::Error::from(ErrorKind::PermissionDenied))
            } else {
                File::open(path)
            }
        });

        assert_eq!(
            stats,
            TreeStats {
                lines: 4,
                text_files: 2,
                binary_files: 0,
                unreadable_files: 1,
            }
        );
    }

    #[test]
    fn read_failure_mid_file_is_tallied() {
        struct FailsAfterHead(usize);

        impl Read for FailsAfterHead {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0 == 0 {
                    return Err(io::Error::other("device went away"));
                }
                let n = self.0.min(buf.len());
                buf[..n].fill(b'\n');
                self.0 -= n;
                Ok(n)
            }
        }

        let dir = TempDir::new().unwrap();
        write(dir.path(), "flaky.txt", b"irrelevant");

        let stats = tree_stats_with(dir.path(), |_| Ok(FailsAfterHead(BINARY_PROBE_BYTES * 2)));

        assert_eq!(stats.unreadable_files, 1);
        assert_eq!(stats.lines, 0);
    }

    #[test]
    fn empty_tree_counts_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(count_lines(dir.path()), 0);
    }
}
