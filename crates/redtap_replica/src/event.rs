//! Session-level events and the listener boundary.

use redtap_command::Command;
use redtap_rdb::SnapshotEvent;

use crate::error::ReplicaResult;

/// One observation from a replication session.
///
/// Events are delivered in exactly the order the wire produced them,
/// including the [`Event::FullSyncStart`] / [`Event::FullSyncEnd`] markers
/// around snapshot transfer. Consumers must not assume random access.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A full resynchronization began; a snapshot transfer follows.
    FullSyncStart {
        /// Replication id announced by the source.
        replication_id: String,
        /// Offset the continuation stream starts from.
        offset: u64,
    },
    /// The snapshot transfer completed and streaming begins.
    FullSyncEnd {
        /// Snapshot checksum when the dump carried one and it was verified.
        checksum: Option<u64>,
    },
    /// One record from the snapshot transferred during full resync.
    Snapshot(SnapshotEvent),
    /// A streamed mutation decoded into a typed command.
    Command(Command),
    /// A streamed request whose name has no registered parser.
    UnknownCommand {
        /// Raw argument vector, name first.
        args: Vec<Vec<u8>>,
    },
    /// A streamed request whose arguments a registered parser rejected.
    ///
    /// Recoverable at single-request granularity; the session keeps
    /// streaming after emitting this.
    CommandError {
        /// Raw argument vector, name first.
        args: Vec<Vec<u8>>,
        /// Why the parser rejected it.
        message: String,
    },
    /// A bare keepalive ping from the source.
    Ping,
}

/// Receiver for session events.
///
/// Called synchronously on the session's reader thread; a slow listener
/// backpressures the socket, which is the intended flow control. Returning
/// an error aborts the session; [`ReplicaError::listener`] builds one.
///
/// [`ReplicaError::listener`]: crate::ReplicaError::listener
pub trait EventListener: Send {
    /// Handles the next event in stream order.
    fn on_event(&mut self, event: Event) -> ReplicaResult<()>;
}

/// Listener that collects every event into a vector.
#[derive(Debug, Default)]
pub struct VecListener {
    /// Events in arrival order.
    pub events: Vec<Event>,
}

impl VecListener {
    /// Creates an empty listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventListener for VecListener {
    fn on_event(&mut self, event: Event) -> ReplicaResult<()> {
        self.events.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_listener_preserves_order() {
        let mut listener = VecListener::new();
        listener.on_event(Event::Ping).unwrap();
        listener
            .on_event(Event::FullSyncEnd { checksum: None })
            .unwrap();
        assert_eq!(
            listener.events,
            vec![Event::Ping, Event::FullSyncEnd { checksum: None }]
        );
    }
}
