//! Replication session phases and counters.

/// The phase a replication session is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaState {
    /// No connection to the source.
    Disconnected,
    /// Connected, exchanging the handshake commands.
    Handshaking,
    /// Sync requested, waiting for the source to answer full or partial.
    AwaitingSyncDecision,
    /// Receiving and decoding a snapshot.
    FullSync,
    /// Applying the live request stream.
    Streaming,
    /// Waiting out the backoff delay before reconnecting.
    RetryWait,
}

impl ReplicaState {
    /// Whether the session currently holds a connection to the source.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Handshaking | Self::AwaitingSyncDecision | Self::FullSync | Self::Streaming
        )
    }
}

/// Counters accumulated across connection attempts.
#[derive(Debug, Clone, Default)]
pub struct ReplicaStats {
    /// Connection attempts made, including the first.
    pub attempts: u32,
    /// Reconnections after a failed attempt.
    pub retries: u32,
    /// Full resynchronizations performed.
    pub full_syncs: u32,
    /// Partial resynchronizations granted by the source.
    pub partial_syncs: u32,
    /// Requests surfaced from the live stream, summed over attempts.
    pub requests_streamed: u64,
    /// Message of the most recent failure, if any.
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_phases() {
        assert!(!ReplicaState::Disconnected.is_active());
        assert!(!ReplicaState::RetryWait.is_active());
        assert!(ReplicaState::Handshaking.is_active());
        assert!(ReplicaState::AwaitingSyncDecision.is_active());
        assert!(ReplicaState::FullSync.is_active());
        assert!(ReplicaState::Streaming.is_active());
    }

    #[test]
    fn stats_start_at_zero() {
        let stats = ReplicaStats::default();
        assert_eq!(stats.attempts, 0);
        assert_eq!(stats.requests_streamed, 0);
        assert!(stats.last_error.is_none());
    }
}
