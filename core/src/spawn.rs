use std::ffi::OsStr;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::trace;
use tracing::warn;

use crate::process_group;

/// How long to keep draining pipes after the child is gone. A descendant that
/// escaped the process group could otherwise hold them open forever.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CommandResult {
    /// `code` is `None` when the child was terminated by a signal.
    Exited {
        code: Option<i32>,
        output: CapturedOutput,
    },
    /// The child and its process group were killed once `timeout` elapsed.
    TimedOut { output: CapturedOutput },
}

/// Run `command` followed by `extra_args`, capturing both output streams and
/// killing the whole process group if it outlives `timeout`.
///
/// The child gets a null stdin so prompts (host-key confirmation, password)
/// fail instead of hanging.
pub(crate) async fn run_with_timeout(
    command: &[String],
    extra_args: &[&OsStr],
    timeout: Duration,
) -> io::Result<CommandResult> {
    let Some((program, args)) = command.split_first() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "missing program for clone command",
        ));
    };

    trace!("run_with_timeout: {program:?} {args:?} {extra_args:?} {timeout:?}");

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.args(extra_args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    #[cfg(unix)]
    unsafe {
        let parent_pid = libc::getpid();
        cmd.pre_exec(move || process_group::detach_into_own_group(parent_pid));
    }

    let mut child = cmd.kill_on_drop(true).spawn()?;
    let stdout_handle = child.stdout.take().map(spawn_reader);
    let stderr_handle = child.stderr.take().map(spawn_reader);

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => {
            let status = status?;
            let output = collect_output(stdout_handle, stderr_handle).await;
            Ok(CommandResult::Exited {
                code: status.code(),
                output,
            })
        }
        Err(_) => {
            if let Err(err) = process_group::kill_clone_group(&child) {
                warn!(error = %err, "failed to kill clone process group");
            }
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to kill clone process");
            }
            let output = collect_output(stdout_handle, stderr_handle).await;
            Ok(CommandResult::TimedOut { output })
        }
    }
}

fn spawn_reader<R>(mut reader: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        // A read error leaves whatever was captured so far.
        let _ = reader.read_to_end(&mut buf).await;
        buf
    })
}

async fn collect_output(
    stdout: Option<JoinHandle<Vec<u8>>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
) -> CapturedOutput {
    CapturedOutput {
        stdout: drain(stdout).await,
        stderr: drain(stderr).await,
    }
}

async fn drain(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    let Some(mut handle) = handle else {
        return Vec::new();
    };
    match tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut handle).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(err)) => {
            warn!(error = %err, "output reader task failed");
            Vec::new()
        }
        Err(_) => {
            handle.abort();
            warn!("output pipe still open after child exit; dropping it");
            Vec::new()
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string(), "sh".to_string()]
    }

    #[tokio::test]
    async fn captures_both_streams_and_exit_code() {
        let result = run_with_timeout(
            &sh("printf out; printf err >&2; exit 3"),
            &[],
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(
            result,
            CommandResult::Exited {
                code: Some(3),
                output: CapturedOutput {
                    stdout: b"out".to_vec(),
                    stderr: b"err".to_vec(),
                },
            }
        );
    }

    #[tokio::test]
    async fn extra_args_become_positional_parameters() {
        let result = run_with_timeout(
            &sh("printf '%s|%s' \"$1\" \"$2\""),
            &[OsStr::new("first"), OsStr::new("second")],
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        let CommandResult::Exited { code, output } = result else {
            panic!("expected exit, got {result:?}");
        };
        assert_eq!(code, Some(0));
        assert_eq!(output.stdout, b"first|second".to_vec());
    }

    #[tokio::test]
    async fn timeout_kills_the_whole_group() {
        let started = Instant::now();
        // The background sleep inherits the pipes; only a group kill closes them.
        let result = run_with_timeout(
            &sh("printf started; sleep 30 & sleep 30; wait"),
            &[],
            Duration::from_millis(300),
        )
        .await
        .unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        let CommandResult::TimedOut { output } = result else {
            panic!("expected timeout, got {result:?}");
        };
        assert_eq!(output.stdout, b"started".to_vec());
    }

    #[tokio::test]
    async fn missing_program_is_an_io_error() {
        let err = run_with_timeout(
            &["/definitely/not/a/real/git".to_string()],
            &[],
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let err = run_with_timeout(&[], &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
