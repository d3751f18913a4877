//! Error type for command decoding.

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors that can occur while decoding a replicated command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The argument list does not fit the command's shape.
    ///
    /// This never tears a replication session down; the stream position is
    /// already past the framed command when parsing starts.
    #[error("malformed {command} command: {message}")]
    Malformed {
        /// Lowercase command name.
        command: String,
        /// Description of the problem.
        message: String,
    },
}

impl CommandError {
    /// Creates a [`CommandError::Malformed`] from anything string-like.
    pub fn malformed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            command: command.into(),
            message: message.into(),
        }
    }
}
