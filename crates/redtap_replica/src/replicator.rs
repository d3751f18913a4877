//! Reconnecting replication driver.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{error, info, warn};

use redtap_source::{CancelToken, SourceError};

use crate::config::{ReplicaConfig, ResumePoint};
use crate::error::{ReplicaError, ReplicaResult};
use crate::event::EventListener;
use crate::session::Session;
use crate::state::{ReplicaState, ReplicaStats};

/// Runs replication sessions against a source, reconnecting on failure.
///
/// Each connection attempt is a [`Session`]. Between attempts the
/// replicator waits out the configured backoff, and it carries the resume
/// point forward so a reconnect first asks for a partial resync. A broken
/// dialogue discards the resume point, so the following attempt requests a
/// full resync instead of resuming into an inconsistent stream.
pub struct Replicator {
    config: ReplicaConfig,
    resume: Option<ResumePoint>,
    cancel: CancelToken,
    state: Arc<RwLock<ReplicaState>>,
    stats: Arc<RwLock<ReplicaStats>>,
    live: Arc<Mutex<Option<TcpStream>>>,
}

impl Replicator {
    /// Creates a replicator for the given configuration.
    #[must_use]
    pub fn new(config: ReplicaConfig) -> Self {
        let resume = config.resume_point.clone();
        Self {
            config,
            resume,
            cancel: CancelToken::new(),
            state: Arc::new(RwLock::new(ReplicaState::Disconnected)),
            stats: Arc::new(RwLock::new(ReplicaStats::default())),
            live: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns a handle for observing and stopping the replicator from
    /// another thread.
    #[must_use]
    pub fn handle(&self) -> ReplicaHandle {
        ReplicaHandle {
            cancel: self.cancel.clone(),
            state: Arc::clone(&self.state),
            stats: Arc::clone(&self.stats),
            live: Arc::clone(&self.live),
        }
    }

    /// Position the next connection attempt would try to resume from.
    #[must_use]
    pub fn resume_point(&self) -> Option<&ResumePoint> {
        self.resume.as_ref()
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> ReplicaStats {
        self.stats.read().clone()
    }

    /// Runs replication until cancelled or the retry budget is spent.
    ///
    /// Cancellation through a [`ReplicaHandle`] is an orderly shutdown and
    /// returns `Ok(())`. Anything else that ends the final attempt is
    /// returned as the terminal error.
    pub fn run(&mut self, listener: &mut dyn EventListener) -> ReplicaResult<()> {
        let max_attempts = self.config.retry.max_attempts;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                *self.state.write() = ReplicaState::RetryWait;
                let delay = self.config.retry.delay_for_attempt(attempt);
                info!(attempt, ?delay, "waiting before reconnecting");
                self.sleep_with_cancel(delay);
                self.stats.write().retries += 1;
            }

            if self.cancel.is_cancelled() {
                *self.state.write() = ReplicaState::Disconnected;
                return Ok(());
            }
            self.stats.write().attempts += 1;

            match self.attempt(listener) {
                Ok(()) => return Ok(()),
                Err(ReplicaError::Cancelled) => {
                    info!("replication cancelled");
                    return Ok(());
                }
                Err(err) => {
                    self.stats.write().last_error = Some(err.to_string());
                    if matches!(err, ReplicaError::Protocol { .. }) {
                        // The cached position is not trustworthy once the
                        // dialogue breaks.
                        self.resume = None;
                    }
                    if err.is_retryable() && attempt + 1 < max_attempts {
                        warn!(error = %err, attempt, "replication attempt failed");
                        continue;
                    }
                    error!(error = %err, "replication failed");
                    return Err(err);
                }
            }
        }

        Err(ReplicaError::RetriesExhausted {
            attempts: max_attempts,
        })
    }

    /// Makes one connection attempt and drives a session over it.
    fn attempt(&mut self, listener: &mut dyn EventListener) -> ReplicaResult<()> {
        let stream = self.connect()?;
        let reader = stream.try_clone().map_err(SourceError::from)?;
        *self.live.lock() = Some(stream.try_clone().map_err(SourceError::from)?);

        let mut config = self.config.clone();
        config.resume_point = self.resume.clone();
        let mut session = Session::new(reader, stream, config)
            .with_cancel_token(self.cancel.clone())
            .with_shared_phase(Arc::clone(&self.state));

        let result = session.run(listener);

        *self.live.lock() = None;
        {
            let mut stats = self.stats.write();
            stats.requests_streamed += session.requests_streamed();
            if session.performed_full_sync() {
                stats.full_syncs += 1;
            }
            if session.performed_partial_sync() {
                stats.partial_syncs += 1;
            }
        }
        self.resume = session.resume_point();
        result
    }

    fn connect(&self) -> ReplicaResult<TcpStream> {
        let addrs: Vec<SocketAddr> = self
            .config
            .address
            .to_socket_addrs()
            .map_err(SourceError::from)?
            .collect();

        let mut last_error: Option<io::Error> = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, self.config.connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.config.read_timeout))
                        .map_err(SourceError::from)?;
                    stream.set_nodelay(true).map_err(SourceError::from)?;
                    info!(address = %addr, "connected to the source");
                    return Ok(stream);
                }
                Err(err) => last_error = Some(err),
            }
        }

        let err = last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} did not resolve to any address", self.config.address),
            )
        });
        Err(SourceError::from(err).into())
    }

    fn sleep_with_cancel(&self, total: Duration) {
        let step = Duration::from_millis(50);
        let deadline = Instant::now() + total;
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            thread::sleep(step.min(remaining));
        }
    }
}

/// Cloneable observer and stop switch for a running [`Replicator`].
#[derive(Clone)]
pub struct ReplicaHandle {
    cancel: CancelToken,
    state: Arc<RwLock<ReplicaState>>,
    stats: Arc<RwLock<ReplicaStats>>,
    live: Arc<Mutex<Option<TcpStream>>>,
}

impl ReplicaHandle {
    /// Stops the replicator.
    ///
    /// Cancels the token and shuts down the live connection so a session
    /// blocked in a read returns promptly.
    pub fn stop(&self) {
        self.cancel.cancel();
        if let Some(stream) = self.live.lock().as_ref() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// Whether `stop` has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Phase the replicator is currently in.
    #[must_use]
    pub fn state(&self) -> ReplicaState {
        *self.state.read()
    }

    /// Snapshot of the accumulated counters.
    #[must_use]
    pub fn stats(&self) -> ReplicaStats {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use crate::event::VecListener;

    use super::*;

    fn refused_address() -> String {
        // Bind to grab a free port, then drop the listener so connects
        // to it are refused.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }

    #[test]
    fn stop_before_run_is_an_orderly_exit() {
        let config = ReplicaConfig::new(refused_address());
        let mut replicator = Replicator::new(config);
        let handle = replicator.handle();
        handle.stop();

        let mut listener = VecListener::new();
        replicator.run(&mut listener).unwrap();
        assert!(handle.is_stopped());
        assert_eq!(handle.stats().attempts, 0);
        assert_eq!(handle.state(), ReplicaState::Disconnected);
    }

    #[test]
    fn refused_connection_surfaces_after_the_budget() {
        let config = ReplicaConfig::new(refused_address()).with_retry(
            crate::config::RetryConfig::new(2)
                .with_initial_delay(Duration::from_millis(1))
                .without_jitter(),
        );
        let mut replicator = Replicator::new(config);
        let mut listener = VecListener::new();

        let err = replicator.run(&mut listener).unwrap_err();
        assert!(matches!(err, ReplicaError::Source(_)));
        assert_eq!(replicator.stats().attempts, 2);
        assert_eq!(replicator.stats().retries, 1);
        assert!(replicator.stats().last_error.is_some());
    }

    #[test]
    fn zero_attempt_budget_gives_up_immediately() {
        let mut config = ReplicaConfig::new(refused_address());
        config.retry.max_attempts = 0;
        let mut replicator = Replicator::new(config);
        let mut listener = VecListener::new();

        let err = replicator.run(&mut listener).unwrap_err();
        assert!(matches!(
            err,
            ReplicaError::RetriesExhausted { attempts: 0 }
        ));
    }

    #[test]
    fn handle_reports_the_initial_state() {
        let replicator = Replicator::new(ReplicaConfig::default());
        let handle = replicator.handle();
        assert_eq!(handle.state(), ReplicaState::Disconnected);
        assert_eq!(handle.stats().full_syncs, 0);
        assert!(replicator.resume_point().is_none());
    }
}
