//! Client-side replication against a Redis-compatible source.
//!
//! A [`Session`] drives one connection: it runs the handshake, asks the
//! source to synchronize, decodes the snapshot a full resync ships, and
//! then applies the live request stream, acknowledging its offset as it
//! goes. Everything the session observes is pushed to an [`EventListener`]
//! in arrival order, so a caller sees one ordered feed regardless of
//! whether a record came from the snapshot or the stream.
//!
//! [`Replicator`] wraps sessions with reconnection: exponential backoff
//! between attempts, a cached resume point so reconnects try a partial
//! resync first, and a [`ReplicaHandle`] for stopping and observing the
//! whole thing from another thread.
//!
//! ```no_run
//! use redtap_replica::{Event, EventListener, ReplicaConfig, ReplicaResult, Replicator};
//!
//! struct Print;
//!
//! impl EventListener for Print {
//!     fn on_event(&mut self, event: Event) -> ReplicaResult<()> {
//!         println!("{event:?}");
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> ReplicaResult<()> {
//!     let mut replicator = Replicator::new(ReplicaConfig::new("127.0.0.1:6379"));
//!     replicator.run(&mut Print)
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod event;
mod handshake;
mod replicator;
mod resp;
mod session;
mod state;

pub use config::{Auth, ReplicaConfig, ResumePoint, RetryConfig};
pub use error::{ReplicaError, ReplicaResult};
pub use event::{Event, EventListener, VecListener};
pub use replicator::{ReplicaHandle, Replicator};
pub use session::Session;
pub use state::{ReplicaState, ReplicaStats};
