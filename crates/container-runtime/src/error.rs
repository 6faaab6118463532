//! Error types for container orchestration

use thiserror::Error;

/// Unified error type for container operations
#[derive(Error, Debug)]
pub enum Error {
    /// The container runtime binary could not be started
    #[error("failed to spawn `{program}`: {source}")]
    SpawnFailed {
        /// The program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A runtime command ran but exited unsuccessfully
    #[error("`{command}` failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        /// The command line that failed
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The requested image does not exist locally and could not be pulled
    #[error("image not found: {image}")]
    ImageNotFound {
        /// Fully qualified image reference
        image: String,
    },

    /// The requested internal port has no published host binding
    #[error("port {port}/tcp is not published by container {id}")]
    PortNotPublished {
        /// Container identifier
        id: String,
        /// Internal container port
        port: u16,
    },

    /// Output from the runtime could not be understood
    #[error("unexpected runtime output: {0}")]
    UnexpectedOutput(String),
}

impl Error {
    pub(crate) fn command_failed(
        command: impl Into<String>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
