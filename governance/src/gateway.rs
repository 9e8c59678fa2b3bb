//! Command gateway to the node CLI
//!
//! Runs `<cli> <args...>` synchronously and normalizes the outcome: trimmed
//! stdout on exit status zero, a [`CommandError`] otherwise. Both pipes are
//! drained on their own threads so a chatty child cannot block on a full
//! pipe while we wait on it.

use log::debug;
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

use crate::config::NodeSettings;
use crate::error::CommandError;

/// Arguments for one CLI invocation, without the binary itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCommand {
    args: Vec<String>,
}

impl NodeCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for NodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

pub trait CommandExecutor {
    fn execute(&self, command: &NodeCommand) -> Result<String, CommandError>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn execute(&self, command: &NodeCommand) -> Result<String, CommandError> {
        (**self).execute(command)
    }
}

/// Executes commands against a real CLI binary
#[derive(Debug, Clone)]
pub struct CliGateway {
    cli: PathBuf,
    timeout: Option<Duration>,
}

impl CliGateway {
    pub fn new(cli: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            cli: cli.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &NodeSettings) -> Self {
        Self::new(settings.cli.clone(), settings.command_timeout())
    }
}

impl CommandExecutor for CliGateway {
    fn execute(&self, command: &NodeCommand) -> Result<String, CommandError> {
        debug!("Executing: {} {}", self.cli.display(), command);

        let mut child = Command::new(&self.cli)
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(CommandError::Spawn)?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            Some(limit) => match child.wait_timeout(limit).map_err(CommandError::Output)? {
                Some(status) => status,
                None => {
                    // Readers are left to finish once the pipes close.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CommandError::TimedOut { after: limit });
                }
            },
            None => child.wait().map_err(CommandError::Output)?,
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        if status.success() {
            Ok(stdout.trim().to_string())
        } else {
            Err(CommandError::Failed {
                status: status.code(),
                stderr: stderr.trim().to_string(),
            })
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(reader: JoinHandle<io::Result<Vec<u8>>>) -> Result<String, CommandError> {
    let bytes = reader
        .join()
        .map_err(|_| {
            CommandError::Output(io::Error::new(io::ErrorKind::Other, "output reader panicked"))
        })?
        .map_err(CommandError::Output)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(timeout: Option<Duration>) -> CliGateway {
        CliGateway::new("/bin/sh", timeout)
    }

    fn script(body: &str) -> NodeCommand {
        NodeCommand::new(["-c", body])
    }

    #[test]
    fn test_success_returns_trimmed_stdout() {
        let out = shell(Some(Duration::from_secs(10)))
            .execute(&script("echo '  Tx id: abc123  '"))
            .unwrap();
        assert_eq!(out, "Tx id: abc123");
    }

    #[test]
    fn test_nonzero_exit_carries_stderr() {
        let err = shell(None)
            .execute(&script("echo 'account not found' >&2; exit 3"))
            .unwrap_err();
        match err {
            CommandError::Failed { status, stderr } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "account not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_kills_hung_command() {
        let err = shell(Some(Duration::from_millis(200)))
            .execute(&script("exec sleep 5"))
            .unwrap_err();
        assert!(matches!(err, CommandError::TimedOut { .. }));
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let gateway = CliGateway::new("/nonexistent/xchain-cli", None);
        let err = gateway.execute(&NodeCommand::new(["--version"])).unwrap_err();
        assert!(matches!(err, CommandError::Spawn(_)));
    }

    #[test]
    fn test_large_output_does_not_block() {
        let out = shell(Some(Duration::from_secs(10)))
            .execute(&script("head -c 200000 /dev/zero | tr '\\0' a"))
            .unwrap();
        assert_eq!(out.len(), 200_000);
    }

    #[test]
    fn test_command_display() {
        let cmd = NodeCommand::new(["proposal", "query"]).arg("-p").arg("7");
        assert_eq!(cmd.to_string(), "proposal query -p 7");
        assert_eq!(cmd.args().len(), 4);
    }
}
