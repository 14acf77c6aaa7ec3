//! Error types for process execution

use std::io;
use thiserror::Error;

/// Result type for process operations
pub type Result<T> = std::result::Result<T, ProcError>;

/// Errors that can occur while configuring, spawning or disposing of a process
#[derive(Error, Debug)]
pub enum ProcError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Syscall error: {0}")]
    Syscall(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "The spawned command '{}' exited unsuccessfully (exit code: {exit_code}, signal: {})",
        .command.join(" "),
        .signal.unwrap_or(0)
    )]
    UnsuccessfulExit {
        exit_code: i32,
        signal: Option<i32>,
        command: Vec<String>,
    },

    #[error("Usage error: {0}")]
    Usage(String),
}

impl ProcError {
    /// Build a spawn error for the given argv
    pub fn spawn(command: &[String], source: io::Error) -> Self {
        ProcError::Spawn {
            command: command.join(" "),
            source,
        }
    }

    /// Exit code carried by an `UnsuccessfulExit`
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcError::UnsuccessfulExit { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    pub fn is_unsuccessful_exit(&self) -> bool {
        matches!(self, ProcError::UnsuccessfulExit { .. })
    }
}
