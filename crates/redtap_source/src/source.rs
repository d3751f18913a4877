//! Buffered blocking reader over a file, socket, or in-memory slice.

use crate::cancel::CancelToken;
use crate::checksum::Crc64;
use crate::error::{SourceError, SourceResult};
use std::fmt;
use std::io::{self, Read};

/// Default capacity of the reusable fill buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Passive observer of raw inbound bytes.
///
/// Registered on a [`ByteSource`], a sink is handed exactly the bytes read
/// from the underlying reader, in arrival order, before any interpretation.
/// It is invoked synchronously on the reader thread and must not block for
/// long; the decode path waits for it.
pub trait RawByteSink: Send {
    /// Observes one chunk of inbound bytes.
    fn raw_bytes(&mut self, bytes: &[u8]);
}

impl<F: FnMut(&[u8]) + Send> RawByteSink for F {
    fn raw_bytes(&mut self, bytes: &[u8]) {
        self(bytes);
    }
}

/// A buffered, blocking byte source.
///
/// All decoding in redtap pulls from one of these. The source owns a single
/// reusable fill buffer (never exposed to callers; decoded values are always
/// copied out), tracks the running count of consumed bytes for replication
/// offset accounting, and can feed an incremental CRC-64 over exactly the
/// bytes consumed while a snapshot is in flight.
///
/// Blocking fills honor the attached [`CancelToken`]: readers configured
/// with a read timeout (sockets) observe cancellation within one timeout
/// even when no data arrives.
pub struct ByteSource<R: Read> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
    consumed: u64,
    checksum: Option<Crc64>,
    raw_sink: Option<Box<dyn RawByteSink>>,
    cancel: CancelToken,
}

impl<R: Read> fmt::Debug for ByteSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource")
            .field("capacity", &self.buf.len())
            .field("buffered", &(self.filled - self.pos))
            .field("consumed", &self.consumed)
            .field("checksum_active", &self.checksum.is_some())
            .field("raw_sink", &self.raw_sink.is_some())
            .finish()
    }
}

impl<R: Read> ByteSource<R> {
    /// Wraps a reader with the default buffer capacity.
    pub fn new(inner: R) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    /// Wraps a reader with an explicit buffer capacity.
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner,
            buf: vec![0u8; capacity.max(1)],
            pos: 0,
            filled: 0,
            consumed: 0,
            checksum: None,
            raw_sink: None,
            cancel: CancelToken::new(),
        }
    }

    /// Attaches a cancellation token checked inside blocking fills.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the cancellation token this source polls.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Registers a passive sink for raw inbound bytes.
    pub fn set_raw_sink(&mut self, sink: Box<dyn RawByteSink>) {
        self.raw_sink = Some(sink);
    }

    /// Removes and returns the raw-byte sink, if any.
    pub fn clear_raw_sink(&mut self) -> Option<Box<dyn RawByteSink>> {
        self.raw_sink.take()
    }

    /// Total bytes consumed by callers since construction.
    ///
    /// Peeked bytes do not count until they are actually read.
    #[must_use]
    pub fn tell(&self) -> u64 {
        self.consumed
    }

    /// Starts a fresh checksum window over subsequently consumed bytes.
    pub fn begin_checksum(&mut self) {
        self.checksum = Some(Crc64::new());
    }

    /// Current checksum of the open window, if one is active.
    #[must_use]
    pub fn checksum(&self) -> Option<u64> {
        self.checksum.map(|crc| crc.value())
    }

    /// Closes the checksum window and returns its final value.
    ///
    /// Bytes consumed after this call (for example a trailing checksum
    /// field itself) are not included.
    pub fn finish_checksum(&mut self) -> Option<u64> {
        self.checksum.take().map(|crc| crc.value())
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> SourceResult<u8> {
        if self.pos == self.filled && self.fill()? == 0 {
            return Err(SourceError::UnexpectedEof {
                wanted: 1,
                available: 0,
            });
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        self.consumed += 1;
        if let Some(crc) = self.checksum.as_mut() {
            crc.update(&[byte]);
        }
        Ok(byte)
    }

    /// Returns the next byte without consuming it.
    pub fn peek_u8(&mut self) -> SourceResult<u8> {
        if self.pos == self.filled && self.fill()? == 0 {
            return Err(SourceError::UnexpectedEof {
                wanted: 1,
                available: 0,
            });
        }
        Ok(self.buf[self.pos])
    }

    /// Reads exactly `len` bytes into an owned buffer.
    pub fn read_bytes(&mut self, len: usize) -> SourceResult<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.read_exact(&mut out)?;
        Ok(out)
    }

    /// Fills `out` completely from the stream.
    pub fn read_exact(&mut self, out: &mut [u8]) -> SourceResult<()> {
        let mut copied = 0;
        while copied < out.len() {
            if self.pos == self.filled && self.fill()? == 0 {
                return Err(SourceError::UnexpectedEof {
                    wanted: out.len() - copied,
                    available: 0,
                });
            }
            let take = (out.len() - copied).min(self.filled - self.pos);
            out[copied..copied + take].copy_from_slice(&self.buf[self.pos..self.pos + take]);
            self.pos += take;
            copied += take;
        }
        self.consumed += out.len() as u64;
        if let Some(crc) = self.checksum.as_mut() {
            crc.update(out);
        }
        Ok(())
    }

    /// Consumes and discards exactly `len` bytes.
    pub fn skip(&mut self, len: usize) -> SourceResult<()> {
        let mut remaining = len;
        while remaining > 0 {
            if self.pos == self.filled && self.fill()? == 0 {
                return Err(SourceError::UnexpectedEof {
                    wanted: remaining,
                    available: 0,
                });
            }
            let take = remaining.min(self.filled - self.pos);
            if let Some(crc) = self.checksum.as_mut() {
                crc.update(&self.buf[self.pos..self.pos + take]);
            }
            self.pos += take;
            self.consumed += take as u64;
            remaining -= take;
        }
        Ok(())
    }

    /// Reads once from the inner reader into the (empty) buffer.
    ///
    /// Returns the number of bytes added; zero means end of stream.
    fn fill(&mut self) -> SourceResult<usize> {
        debug_assert_eq!(self.pos, self.filled);
        self.pos = 0;
        self.filled = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(SourceError::Cancelled);
            }
            match self.inner.read(&mut self.buf) {
                Ok(0) => return Ok(0),
                Ok(n) => {
                    if let Some(sink) = self.raw_sink.as_mut() {
                        sink.raw_bytes(&self.buf[..n]);
                    }
                    self.filled = n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    // Read timeouts surface here on sockets; cancellation
                    // takes priority so shutdown reads as Cancelled.
                    if self.cancel.is_cancelled() {
                        return Err(SourceError::Cancelled);
                    }
                    return Err(SourceError::Timeout);
                }
                Err(e) => {
                    if self.cancel.is_cancelled() {
                        return Err(SourceError::Cancelled);
                    }
                    return Err(SourceError::Io(e));
                }
            }
        }
    }
}
