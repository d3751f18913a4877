//! Configuration for replication sessions.

use std::fmt;
use std::time::Duration;

use redtap_rdb::SnapshotOptions;

/// Credentials sent during the handshake.
#[derive(Clone)]
pub struct Auth {
    /// Username for ACL-style authentication; `None` sends the legacy
    /// single-argument form.
    pub username: Option<String>,
    /// Password.
    pub password: String,
}

impl Auth {
    /// Legacy password-only credentials.
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            username: None,
            password: password.into(),
        }
    }

    /// Username and password credentials.
    #[must_use]
    pub fn user(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: password.into(),
        }
    }
}

// Keeps the password out of logs and error chains.
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The cached replication position used to request partial resync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    /// Replication id of the history the offset belongs to.
    pub replication_id: String,
    /// Last applied offset within that history.
    pub offset: u64,
}

impl ResumePoint {
    /// Creates a resume point from an id and offset.
    #[must_use]
    pub fn new(replication_id: impl Into<String>, offset: u64) -> Self {
        Self {
            replication_id: replication_id.into(),
            offset,
        }
    }
}

/// Configuration for a replication session.
#[derive(Debug, Clone)]
pub struct ReplicaConfig {
    /// Source address, `host:port`.
    pub address: String,
    /// Credentials, when the source requires authentication.
    pub auth: Option<Auth>,
    /// Port announced via `REPLCONF listening-port` during the handshake.
    pub listening_port: Option<u16>,
    /// TCP connect timeout per address attempt.
    pub connect_timeout: Duration,
    /// Socket read timeout. Handshake and snapshot phases treat an expiry
    /// as a retryable stall; the streaming phase treats an expiry on an
    /// idle link as a wakeup to check cancellation and the ack deadline.
    pub read_timeout: Duration,
    /// How often the session acknowledges its offset to the source.
    pub ack_interval: Duration,
    /// Whether reconnects request partial resync from the cached resume
    /// point before falling back to full.
    pub partial_resync: bool,
    /// Resume point seeding the first connection attempt, if the caller
    /// persisted one from an earlier session.
    pub resume_point: Option<ResumePoint>,
    /// Checksum policy applied to snapshots received during full resync.
    pub snapshot: SnapshotOptions,
    /// Reconnection policy.
    pub retry: RetryConfig,
}

impl ReplicaConfig {
    /// Creates a configuration for the given source address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            auth: None,
            listening_port: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            ack_interval: Duration::from_secs(1),
            partial_resync: true,
            resume_point: None,
            snapshot: SnapshotOptions::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the credentials sent during the handshake.
    #[must_use]
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets the port announced to the source.
    #[must_use]
    pub fn with_listening_port(mut self, port: u16) -> Self {
        self.listening_port = Some(port);
        self
    }

    /// Sets the TCP connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the socket read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the acknowledgement interval.
    #[must_use]
    pub fn with_ack_interval(mut self, interval: Duration) -> Self {
        self.ack_interval = interval;
        self
    }

    /// Enables or disables partial resynchronization.
    #[must_use]
    pub fn with_partial_resync(mut self, enabled: bool) -> Self {
        self.partial_resync = enabled;
        self
    }

    /// Seeds the resume point for the first connection attempt.
    #[must_use]
    pub fn with_resume_point(mut self, point: ResumePoint) -> Self {
        self.resume_point = Some(point);
        self
    }

    /// Sets the snapshot checksum policy.
    #[must_use]
    pub fn with_snapshot_options(mut self, options: SnapshotOptions) -> Self {
        self.snapshot = options;
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self::new("127.0.0.1:6379")
    }
}

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum connection attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Cap on the delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a reconnection policy with the given attempt budget.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// A policy with a single attempt and no reconnection.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the delay before the second attempt.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the cap on inter-attempt delays.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter, making delays exact.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Calculates the delay preceding a given attempt (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% extra, so reconnecting replicas spread out.
            let jitter = delay_secs * 0.25 * jitter_fraction();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Cheap time-derived jitter fraction in `[0, 1)`.
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}
