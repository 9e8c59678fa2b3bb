//! Governance error types

use std::time::Duration;
use thiserror::Error;

/// Failure of a single invocation of the node CLI.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command exited with status {}: {stderr}", exit_label(status))]
    Failed { status: Option<i32>, stderr: String },

    #[error("Command timed out after {}s", after.as_secs())]
    TimedOut { after: Duration },

    #[error("Failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to collect command output: {0}")]
    Output(#[source] std::io::Error),
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Command failed: {command}: {source}")]
    Command {
        command: String,
        #[source]
        source: CommandError,
    },

    #[error("Could not parse {0}")]
    ParseFailure(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailure(String),

    #[error("Neither a proposal id nor a transaction id was returned by the node")]
    MissingIdentifier,

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GovernanceError {
    pub fn command(command: impl ToString, source: CommandError) -> Self {
        Self::Command {
            command: command.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
