//! Error types for replication sessions.

use redtap_rdb::RdbError;
use redtap_source::SourceError;
use thiserror::Error;

/// Result type for replication operations.
pub type ReplicaResult<T> = Result<T, ReplicaError>;

/// Errors raised while talking to a replication source.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// The source answered with something the protocol does not allow.
    #[error("protocol error: {message}")]
    Protocol {
        /// What was received and why it was rejected.
        message: String,
    },

    /// Transport-level failure while reading or writing the link.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// The snapshot transferred during full resync failed to decode.
    #[error("snapshot error: {0}")]
    Rdb(#[from] RdbError),

    /// The session was cancelled via its token.
    #[error("replication cancelled")]
    Cancelled,

    /// Every configured connection attempt failed.
    #[error("replication gave up after {attempts} attempts")]
    RetriesExhausted {
        /// Attempts made, including the first connection.
        attempts: u32,
    },

    /// The event listener refused an event and aborted the session.
    #[error("event listener failed: {message}")]
    Listener {
        /// Description supplied by the listener.
        message: String,
    },
}

impl ReplicaError {
    /// Builds a [`ReplicaError::Protocol`] from a message.
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Builds a [`ReplicaError::Listener`] from a message.
    ///
    /// Listener implementations return this to abort the session from
    /// inside an event callback.
    pub fn listener(message: impl Into<String>) -> Self {
        Self::Listener {
            message: message.into(),
        }
    }

    /// Whether a fresh connection attempt can follow this error.
    ///
    /// Transport failures, dropped links, protocol confusion and snapshot
    /// corruption all qualify; the next attempt renegotiates from scratch.
    /// Cancellation, exhausted retries and listener refusals are terminal.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ReplicaError::Protocol { .. } => true,
            ReplicaError::Source(err) => !matches!(err, SourceError::Cancelled),
            ReplicaError::Rdb(err) => !matches!(err, RdbError::Source(SourceError::Cancelled)),
            ReplicaError::Cancelled
            | ReplicaError::RetriesExhausted { .. }
            | ReplicaError::Listener { .. } => false,
        }
    }
}
