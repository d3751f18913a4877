//! Error types for snapshot decoding.

use redtap_source::SourceError;
use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type RdbResult<T> = Result<T, RdbError>;

/// Errors that can occur while decoding a snapshot.
#[derive(Debug, Error)]
pub enum RdbError {
    /// The byte stream underneath the decoder failed.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// The payload violates the snapshot format.
    #[error("malformed snapshot: {message}")]
    Format {
        /// Description of the violation.
        message: String,
    },

    /// The CRC-64 trailer does not match the bytes that were read.
    #[error("snapshot checksum mismatch: stored {expected:#018x}, computed {actual:#018x}")]
    Checksum {
        /// Checksum stored in the trailer.
        expected: u64,
        /// Checksum computed over the decoded bytes.
        actual: u64,
    },

    /// A checksum was demanded but the snapshot does not carry one.
    #[error("snapshot carries no checksum but one was required")]
    ChecksumMissing,

    /// The payload uses a feature this decoder does not handle.
    #[error("unsupported snapshot feature: {what}")]
    Unsupported {
        /// The feature in question.
        what: String,
    },
}

impl RdbError {
    /// Creates a [`RdbError::Format`] from anything string-like.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Creates an [`RdbError::Unsupported`] from anything string-like.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported {
            what: what.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_displays_message() {
        let err = RdbError::format("bad length prefix");
        assert_eq!(err.to_string(), "malformed snapshot: bad length prefix");
    }

    #[test]
    fn checksum_error_displays_both_values() {
        let err = RdbError::Checksum {
            expected: 0x1122_3344_5566_7788,
            actual: 0,
        };
        let text = err.to_string();
        assert!(text.contains("0x1122334455667788"));
        assert!(text.contains("0x0000000000000000"));
    }

    #[test]
    fn source_error_converts() {
        let err = RdbError::from(SourceError::Timeout);
        assert!(matches!(err, RdbError::Source(SourceError::Timeout)));
    }
}
