//! Per-repository log files written by the sampling pipeline.

use std::path::Path;
use std::path::PathBuf;

use census_utils_string::log_file_stem;
use tokio::io::AsyncWriteExt;

use crate::repository::RepositoryId;
use crate::spawn::CapturedOutput;

pub const TIMEOUT_SENTINEL: &str = "TIMEOUT";
pub const EXCEPTION_SENTINEL: &str = "EXCEPTION";

pub fn log_path_for(log_dir: &Path, identifier: &RepositoryId) -> PathBuf {
    log_dir.join(format!("{}.log", log_file_stem(&identifier.to_string())))
}

/// Write captured output, replacing any previous log for the repository.
pub(crate) async fn write_output(path: &Path, output: &CapturedOutput) -> std::io::Result<()> {
    let mut contents = Vec::with_capacity(output.stdout.len() + output.stderr.len() + 32);
    contents.extend_from_slice(b"=== STDOUT ===\n");
    contents.extend_from_slice(&output.stdout);
    contents.extend_from_slice(b"\n=== STDERR ===\n");
    contents.extend_from_slice(&output.stderr);
    tokio::fs::write(path, contents).await
}

/// Append a marker line such as `TIMEOUT` or `EXCEPTION: <message>`.
pub(crate) async fn append_marker(path: &Path, marker: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("\n{marker}\n").as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn log_name_encodes_identifier() {
        let id = RepositoryId::parse("grafana/k6").unwrap();
        assert_eq!(
            log_path_for(Path::new("clone_logs"), &id),
            PathBuf::from("clone_logs/grafana__k6.log")
        );
    }

    #[tokio::test]
    async fn output_then_marker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a__b.log");
        let output = CapturedOutput {
            stdout: b"out".to_vec(),
            stderr: b"Cloning into '/tmp/x'...".to_vec(),
        };

        write_output(&path, &output).await.unwrap();
        append_marker(&path, TIMEOUT_SENTINEL).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "=== STDOUT ===\nout\n=== STDERR ===\nCloning into '/tmp/x'...\nTIMEOUT\n"
        );
    }

    #[tokio::test]
    async fn marker_creates_missing_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a__b.log");

        append_marker(&path, "EXCEPTION: boom").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\nEXCEPTION: boom\n");
    }
}
