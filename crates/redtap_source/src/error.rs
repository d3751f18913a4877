//! Error types for byte-source operations.

use std::io;
use thiserror::Error;

/// Result type for byte-source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that can occur while reading from a byte source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// An I/O error occurred on the underlying reader.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No bytes arrived within the reader's configured timeout.
    #[error("read timed out")]
    Timeout,

    /// The read was cancelled via its [`CancelToken`](crate::CancelToken).
    #[error("read cancelled")]
    Cancelled,

    /// The stream ended before the requested bytes were available.
    #[error("unexpected end of stream: needed {wanted} more bytes, {available} buffered")]
    UnexpectedEof {
        /// Bytes the caller asked for.
        wanted: usize,
        /// Bytes still buffered when the stream ended.
        available: usize,
    },
}

impl SourceError {
    /// Whether a fresh connection could plausibly get past this error.
    ///
    /// Transport failures and timeouts are retryable; cancellation and a
    /// cleanly ended stream are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_timeout_are_retryable() {
        let io_err = SourceError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(io_err.is_retryable());
        assert!(SourceError::Timeout.is_retryable());
    }

    #[test]
    fn cancelled_and_eof_are_not_retryable() {
        assert!(!SourceError::Cancelled.is_retryable());
        let eof = SourceError::UnexpectedEof {
            wanted: 4,
            available: 1,
        };
        assert!(!eof.is_retryable());
    }
}
