//! A single replication session over one connection.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use redtap_command::{Command, CommandTable};
use redtap_rdb::{
    ChecksumOutcome, EventSink, RdbError, RdbResult, SnapshotDecoder, SnapshotEvent,
    SnapshotSummary,
};
use redtap_source::{ByteSource, CancelToken, RawByteSink, SourceError};

use crate::config::{ReplicaConfig, ResumePoint};
use crate::error::{ReplicaError, ReplicaResult};
use crate::event::{Event, EventListener};
use crate::handshake::{self, SyncDecision};
use crate::resp;
use crate::state::ReplicaState;

/// Drives one connection through handshake, synchronization, and the live
/// request stream.
///
/// A session is a single attempt: it returns when the connection fails, the
/// dialogue breaks, or the caller cancels it. Reconnection with backoff
/// lives in [`Replicator`](crate::Replicator).
pub struct Session<R: Read, W: Write> {
    source: ByteSource<R>,
    writer: W,
    config: ReplicaConfig,
    table: CommandTable,
    replication_id: Option<String>,
    offset: u64,
    db: u64,
    last_ack: Instant,
    requests_streamed: u64,
    did_full_sync: bool,
    did_partial_sync: bool,
    phase: ReplicaState,
    shared_phase: Option<Arc<RwLock<ReplicaState>>>,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Creates a session over a connected reader and writer pair.
    ///
    /// The position in `config.resume_point`, if any, seeds the offset this
    /// session will resume from and acknowledge.
    pub fn new(reader: R, writer: W, config: ReplicaConfig) -> Self {
        let (replication_id, offset) = match &config.resume_point {
            Some(point) => (Some(point.replication_id.clone()), point.offset),
            None => (None, 0),
        };
        Self {
            source: ByteSource::new(reader),
            writer,
            config,
            table: CommandTable::new(),
            replication_id,
            offset,
            db: 0,
            last_ack: Instant::now(),
            requests_streamed: 0,
            did_full_sync: false,
            did_partial_sync: false,
            phase: ReplicaState::Disconnected,
            shared_phase: None,
        }
    }

    /// Attaches a cancellation token observed during blocking reads.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.source = self.source.with_cancel_token(token);
        self
    }

    pub(crate) fn with_shared_phase(mut self, phase: Arc<RwLock<ReplicaState>>) -> Self {
        self.shared_phase = Some(phase);
        self
    }

    /// Registers a passive observer of raw inbound bytes.
    pub fn set_raw_sink(&mut self, sink: Box<dyn RawByteSink>) {
        self.source.set_raw_sink(sink);
    }

    /// Replication offset of the last fully applied request.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Replication id of the history being followed, once known.
    #[must_use]
    pub fn replication_id(&self) -> Option<&str> {
        self.replication_id.as_deref()
    }

    /// Database index the stream last selected, starting at zero.
    #[must_use]
    pub fn db(&self) -> u64 {
        self.db
    }

    /// Position to request on the next connection, once a history is known.
    #[must_use]
    pub fn resume_point(&self) -> Option<ResumePoint> {
        self.replication_id
            .clone()
            .map(|id| ResumePoint::new(id, self.offset))
    }

    /// Requests surfaced to the listener from the live stream.
    #[must_use]
    pub fn requests_streamed(&self) -> u64 {
        self.requests_streamed
    }

    /// Whether this session performed a full resynchronization.
    #[must_use]
    pub fn performed_full_sync(&self) -> bool {
        self.did_full_sync
    }

    /// Whether the source granted this session a partial resynchronization.
    #[must_use]
    pub fn performed_partial_sync(&self) -> bool {
        self.did_partial_sync
    }

    /// Phase the session is currently in.
    #[must_use]
    pub fn phase(&self) -> ReplicaState {
        self.phase
    }

    /// The writer half of the connection.
    #[must_use]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Drives the session until it fails or is cancelled.
    ///
    /// A healthy session never returns: it streams requests indefinitely.
    /// Cancellation surfaces as [`ReplicaError::Cancelled`] regardless of
    /// which read it interrupted.
    pub fn run(&mut self, listener: &mut dyn EventListener) -> ReplicaResult<()> {
        let result = self.run_inner(listener);
        self.set_phase(ReplicaState::Disconnected);
        if self.source.cancel_token().is_cancelled() {
            return Err(ReplicaError::Cancelled);
        }
        match result {
            Err(ReplicaError::Source(SourceError::Cancelled))
            | Err(ReplicaError::Rdb(RdbError::Source(SourceError::Cancelled))) => {
                Err(ReplicaError::Cancelled)
            }
            other => other,
        }
    }

    fn run_inner(&mut self, listener: &mut dyn EventListener) -> ReplicaResult<()> {
        self.set_phase(ReplicaState::Handshaking);
        handshake::run(&mut self.source, &mut self.writer, &self.config)?;

        self.set_phase(ReplicaState::AwaitingSyncDecision);
        let resume = if self.config.partial_resync {
            self.resume_point()
        } else {
            None
        };
        let decision =
            handshake::request_sync(&mut self.source, &mut self.writer, resume.as_ref())?;

        match decision {
            SyncDecision::Full {
                replication_id,
                offset,
            } => {
                info!(%replication_id, offset, "full resynchronization granted");
                self.replication_id = Some(replication_id.clone());
                self.offset = offset;
                self.db = 0;
                self.did_full_sync = true;
                self.set_phase(ReplicaState::FullSync);
                listener.on_event(Event::FullSyncStart {
                    replication_id,
                    offset,
                })?;
                let checksum = self.receive_snapshot(listener)?;
                listener.on_event(Event::FullSyncEnd { checksum })?;
            }
            SyncDecision::Partial { replication_id } => {
                if let Some(id) = replication_id {
                    self.replication_id = Some(id);
                }
                self.did_partial_sync = true;
                info!(offset = self.offset, "partial resynchronization granted");
            }
        }

        self.set_phase(ReplicaState::Streaming);
        self.last_ack = Instant::now();
        self.stream(listener)
    }

    /// Receives the snapshot transfer that follows a full resync decision.
    ///
    /// Returns the snapshot checksum when the trailer carried one and it
    /// verified.
    fn receive_snapshot(
        &mut self,
        listener: &mut dyn EventListener,
    ) -> ReplicaResult<Option<u64>> {
        // The transfer header may be preceded by newline keepalives while
        // the source prepares the snapshot in the background.
        loop {
            match self.source.read_u8()? {
                b'\n' => continue,
                b'$' => break,
                other => {
                    return Err(ReplicaError::protocol(format!(
                        "expected the snapshot transfer, got type byte 0x{other:02x}"
                    )));
                }
            }
        }

        let header = resp::read_line(&mut self.source)?;
        let summary = if let Some(token) = header.strip_prefix("EOF:") {
            if token.len() != 40 {
                return Err(ReplicaError::protocol(format!(
                    "diskless terminator token must be 40 bytes, got {}",
                    token.len()
                )));
            }
            let summary = self.decode_snapshot(listener)?;
            let trailer = self.source.read_bytes(40)?;
            if trailer != token.as_bytes() {
                return Err(ReplicaError::protocol(
                    "diskless snapshot terminator does not match the announced token",
                ));
            }
            summary
        } else {
            let declared: u64 = header.parse().map_err(|_| {
                ReplicaError::protocol(format!("invalid snapshot length {header:?}"))
            })?;
            let start = self.source.tell();
            let summary = self.decode_snapshot(listener)?;
            let consumed = self.source.tell() - start;
            if consumed != declared {
                return Err(ReplicaError::protocol(format!(
                    "snapshot decode consumed {consumed} bytes of a declared {declared}"
                )));
            }
            summary
        };

        info!(
            version = summary.version,
            keys = summary.keys,
            "snapshot decoded"
        );
        Ok(match summary.checksum {
            ChecksumOutcome::Verified(value) => Some(value),
            _ => None,
        })
    }

    fn decode_snapshot(
        &mut self,
        listener: &mut dyn EventListener,
    ) -> ReplicaResult<SnapshotSummary> {
        let mut sink = ListenerSink {
            listener,
            failure: None,
        };
        let result = SnapshotDecoder::new(&mut self.source, self.config.snapshot).run(&mut sink);
        if let Some(failure) = sink.failure.take() {
            return Err(failure);
        }
        Ok(result?)
    }

    fn stream(&mut self, listener: &mut dyn EventListener) -> ReplicaResult<()> {
        info!(offset = self.offset, "streaming live requests");
        loop {
            if self.source.cancel_token().is_cancelled() {
                return Err(ReplicaError::Cancelled);
            }
            self.maybe_ack()?;

            let start = self.source.tell();
            let args = match resp::read_request(&mut self.source) {
                Ok(args) => args,
                // An expired read timeout between frames is the idle-link
                // wakeup; mid-frame it means the source stalled.
                Err(ReplicaError::Source(SourceError::Timeout))
                    if self.source.tell() == start =>
                {
                    continue;
                }
                Err(err) => return Err(err),
            };
            self.offset += self.source.tell() - start;
            self.dispatch(args, listener)?;
        }
    }

    fn dispatch(
        &mut self,
        args: Vec<Vec<u8>>,
        listener: &mut dyn EventListener,
    ) -> ReplicaResult<()> {
        if args.is_empty() {
            return Err(ReplicaError::protocol("empty request array"));
        }
        // GETACK is answered inline with an offset that already includes
        // its own frame, and is never surfaced to the listener.
        if args.len() >= 2
            && args[0].eq_ignore_ascii_case(b"REPLCONF")
            && args[1].eq_ignore_ascii_case(b"GETACK")
        {
            return self.send_ack();
        }

        self.requests_streamed += 1;
        if args.len() == 1 && args[0].eq_ignore_ascii_case(b"PING") {
            return listener.on_event(Event::Ping);
        }

        match self.table.parse(&args) {
            None => {
                debug!(
                    command = %String::from_utf8_lossy(&args[0]),
                    "passing through an unregistered command"
                );
                listener.on_event(Event::UnknownCommand { args })
            }
            Some(Err(err)) => {
                warn!(
                    command = %String::from_utf8_lossy(&args[0]),
                    error = %err,
                    "malformed replicated command"
                );
                let message = err.to_string();
                listener.on_event(Event::CommandError { args, message })
            }
            Some(Ok(command)) => {
                if let Command::Select { db } = &command {
                    self.db = *db;
                }
                listener.on_event(Event::Command(command))
            }
        }
    }

    fn maybe_ack(&mut self) -> ReplicaResult<()> {
        if self.last_ack.elapsed() >= self.config.ack_interval {
            self.send_ack()?;
        }
        Ok(())
    }

    /// Acknowledges the current offset to the source.
    fn send_ack(&mut self) -> ReplicaResult<()> {
        let offset = self.offset.to_string();
        resp::write_command(&mut self.writer, &[b"REPLCONF", b"ACK", offset.as_bytes()])?;
        self.last_ack = Instant::now();
        Ok(())
    }

    fn set_phase(&mut self, phase: ReplicaState) {
        debug!(?phase, "session phase");
        self.phase = phase;
        if let Some(shared) = &self.shared_phase {
            *shared.write() = phase;
        }
    }
}

/// Adapts the replication listener to the snapshot decoder's sink.
struct ListenerSink<'a> {
    listener: &'a mut dyn EventListener,
    failure: Option<ReplicaError>,
}

impl EventSink for ListenerSink<'_> {
    fn event(&mut self, event: SnapshotEvent) -> RdbResult<()> {
        match self.listener.on_event(Event::Snapshot(event)) {
            Ok(()) => Ok(()),
            Err(failure) => {
                self.failure = Some(failure);
                Err(RdbError::format("event listener aborted the snapshot"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::event::VecListener;

    use super::*;

    fn session_over(bytes: &[u8]) -> Session<Cursor<Vec<u8>>, Vec<u8>> {
        Session::new(
            Cursor::new(bytes.to_vec()),
            Vec::new(),
            ReplicaConfig::default(),
        )
    }

    /// Smallest valid snapshot: header, end opcode, zeroed checksum.
    fn empty_snapshot() -> Vec<u8> {
        let mut dump = b"REDIS0011".to_vec();
        dump.push(0xFF);
        dump.extend_from_slice(&[0u8; 8]);
        dump
    }

    #[test]
    fn resume_point_seeds_the_session_position() {
        let config = ReplicaConfig::default().with_resume_point(ResumePoint::new("abc123", 41));
        let session = Session::new(Cursor::new(Vec::new()), Vec::new(), config);
        assert_eq!(session.offset(), 41);
        assert_eq!(session.replication_id(), Some("abc123"));
        assert_eq!(
            session.resume_point(),
            Some(ResumePoint::new("abc123", 41))
        );
    }

    #[test]
    fn getack_is_answered_inline_and_not_surfaced() {
        let mut session = session_over(b"");
        session.offset = 77;
        let mut listener = VecListener::new();
        session
            .dispatch(
                vec![b"REPLCONF".to_vec(), b"GETACK".to_vec(), b"*".to_vec()],
                &mut listener,
            )
            .unwrap();
        assert!(listener.events.is_empty());
        assert_eq!(session.requests_streamed(), 0);
        assert_eq!(
            session.writer().as_slice(),
            b"*3\r\n$8\r\nREPLCONF\r\n$3\r\nACK\r\n$2\r\n77\r\n"
        );
    }

    #[test]
    fn bare_ping_surfaces_as_an_event() {
        let mut session = session_over(b"");
        let mut listener = VecListener::new();
        session
            .dispatch(vec![b"ping".to_vec()], &mut listener)
            .unwrap();
        assert_eq!(listener.events, vec![Event::Ping]);
        assert_eq!(session.requests_streamed(), 1);
    }

    #[test]
    fn select_updates_the_tracked_db() {
        let mut session = session_over(b"");
        let mut listener = VecListener::new();
        session
            .dispatch(vec![b"SELECT".to_vec(), b"3".to_vec()], &mut listener)
            .unwrap();
        assert_eq!(session.db(), 3);
        assert_eq!(
            listener.events,
            vec![Event::Command(Command::Select { db: 3 })]
        );
    }

    #[test]
    fn unregistered_commands_pass_through() {
        let mut session = session_over(b"");
        let mut listener = VecListener::new();
        let args = vec![b"OBJECT".to_vec(), b"FREQ".to_vec(), b"k".to_vec()];
        session.dispatch(args.clone(), &mut listener).unwrap();
        assert_eq!(listener.events, vec![Event::UnknownCommand { args }]);
    }

    #[test]
    fn malformed_commands_surface_with_a_message() {
        let mut session = session_over(b"");
        let mut listener = VecListener::new();
        let args = vec![b"SET".to_vec(), b"k".to_vec()];
        session.dispatch(args.clone(), &mut listener).unwrap();
        match &listener.events[0] {
            Event::CommandError { args: seen, message } => {
                assert_eq!(seen, &args);
                assert!(!message.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn empty_requests_are_a_protocol_error() {
        let mut session = session_over(b"");
        let mut listener = VecListener::new();
        let err = session.dispatch(Vec::new(), &mut listener).unwrap_err();
        assert!(matches!(err, ReplicaError::Protocol { .. }));
    }

    #[test]
    fn sized_snapshot_skips_keepalives_and_verifies_length() {
        let dump = empty_snapshot();
        let mut script = b"\n\n".to_vec();
        script.extend_from_slice(format!("${}\r\n", dump.len()).as_bytes());
        script.extend_from_slice(&dump);

        let mut session = session_over(&script);
        let mut listener = VecListener::new();
        let checksum = session.receive_snapshot(&mut listener).unwrap();
        // A zeroed trailer means the producer disabled checksums.
        assert_eq!(checksum, None);
    }

    #[test]
    fn sized_snapshot_with_wrong_length_is_rejected() {
        let dump = empty_snapshot();
        let mut script = format!("${}\r\n", dump.len() + 1).into_bytes();
        script.extend_from_slice(&dump);
        script.push(0x00);

        let mut session = session_over(&script);
        let mut listener = VecListener::new();
        let err = session.receive_snapshot(&mut listener).unwrap_err();
        assert!(err.to_string().contains("declared"));
    }

    #[test]
    fn diskless_snapshot_consumes_the_terminator() {
        let token = "a".repeat(40);
        let dump = empty_snapshot();
        let mut script = format!("$EOF:{token}\r\n").into_bytes();
        script.extend_from_slice(&dump);
        script.extend_from_slice(token.as_bytes());

        let mut session = session_over(&script);
        let mut listener = VecListener::new();
        let checksum = session.receive_snapshot(&mut listener).unwrap();
        assert_eq!(checksum, None);
    }

    #[test]
    fn diskless_snapshot_with_short_token_is_rejected() {
        let mut session = session_over(b"$EOF:short\r\n");
        let mut listener = VecListener::new();
        let err = session.receive_snapshot(&mut listener).unwrap_err();
        assert!(err.to_string().contains("40 bytes"));
    }
}
