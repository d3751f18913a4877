//! The snapshot opcode loop.
//!
//! A dump is `REDIS` + four version digits, then records until the `0xff`
//! end marker: metadata opcodes in the `0xf4..=0xfe` range, anything below
//! that a value type tag announcing a key/value record. Expiry, idle and
//! frequency opcodes accumulate onto the next key. From format version 5 a
//! CRC-64 trailer closes the file; an all-zero trailer means the producer
//! had checksumming disabled and is honored by skipping validation.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use redtap_source::{ByteSource, SourceError};
use tracing::{debug, warn};

use crate::error::{RdbError, RdbResult};
use crate::primitive;
use crate::types::{KeyValuePair, SnapshotEvent};
use crate::value::{self, RdbType};

/// Magic bytes every snapshot opens with.
pub const SNAPSHOT_MAGIC: &[u8; 5] = b"REDIS";
/// Oldest format version this decoder accepts.
pub const MIN_SNAPSHOT_VERSION: u32 = 1;
/// Newest format version this decoder accepts.
pub const MAX_SNAPSHOT_VERSION: u32 = 11;
/// First version that carries a checksum trailer.
const MIN_CHECKSUM_VERSION: u32 = 5;

const OP_SLOT_INFO: u8 = 0xf4;
const OP_FUNCTION: u8 = 0xf5;
const OP_FUNCTION_PRE_RELEASE: u8 = 0xf6;
const OP_MODULE_AUX: u8 = 0xf7;
const OP_IDLE: u8 = 0xf8;
const OP_FREQ: u8 = 0xf9;
const OP_AUX: u8 = 0xfa;
const OP_RESIZE_DB: u8 = 0xfb;
const OP_EXPIRE_TIME_MS: u8 = 0xfc;
const OP_EXPIRE_TIME: u8 = 0xfd;
const OP_SELECT_DB: u8 = 0xfe;
const OP_EOF: u8 = 0xff;

/// Opcodes inside a module payload stream.
const MODULE_OP_EOF: u64 = 0;
const MODULE_OP_SINT: u64 = 1;
const MODULE_OP_UINT: u64 = 2;
const MODULE_OP_FLOAT: u64 = 3;
const MODULE_OP_DOUBLE: u64 = 4;
const MODULE_OP_STRING: u64 = 5;

/// Receives decoded records in stream order.
///
/// Emission is synchronous: a slow sink slows the decode down, and an error
/// aborts it.
pub trait EventSink: Send {
    /// Handles the next record.
    ///
    /// # Errors
    ///
    /// Any error returned here propagates out of [`SnapshotDecoder::run`]
    /// unchanged.
    fn event(&mut self, event: SnapshotEvent) -> RdbResult<()>;
}

/// Sink that collects every event into a vector.
#[derive(Debug, Default)]
pub struct VecSink {
    /// Events in arrival order.
    pub events: Vec<SnapshotEvent>,
}

impl VecSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for VecSink {
    fn event(&mut self, event: SnapshotEvent) -> RdbResult<()> {
        self.events.push(event);
        Ok(())
    }
}

/// Decode-time policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotOptions {
    /// Compare the trailer against the computed checksum. On by default.
    pub validate_checksum: bool,
    /// Treat a missing or all-zero trailer as an error. Off by default,
    /// honoring producers that write dumps with checksumming disabled.
    pub require_checksum: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            validate_checksum: true,
            require_checksum: false,
        }
    }
}

impl SnapshotOptions {
    /// Toggles trailer validation.
    #[must_use]
    pub fn with_checksum_validation(mut self, validate: bool) -> Self {
        self.validate_checksum = validate;
        self
    }

    /// Toggles rejection of snapshots without a usable checksum.
    #[must_use]
    pub fn with_checksum_required(mut self, require: bool) -> Self {
        self.require_checksum = require;
        self
    }
}

/// What happened to the checksum trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumOutcome {
    /// Trailer present and it matched.
    Verified(u64),
    /// Trailer was all zeroes, meaning the producer disabled checksumming.
    SkippedZero,
    /// Validation was turned off in [`SnapshotOptions`].
    SkippedDisabled,
    /// The format version predates checksum trailers.
    NotPresent,
}

/// Totals reported after a successful decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSummary {
    /// Format version from the header.
    pub version: u32,
    /// Number of key/value records emitted.
    pub keys: u64,
    /// Checksum trailer outcome.
    pub checksum: ChecksumOutcome,
}

/// Streaming decoder for one snapshot.
///
/// Borrows the source so replication sessions can keep using it for the
/// command stream that follows the snapshot on the same connection.
#[derive(Debug)]
pub struct SnapshotDecoder<'a, R: Read> {
    src: &'a mut ByteSource<R>,
    options: SnapshotOptions,
    version: u32,
    db: u64,
    expire_at_ms: Option<u64>,
    idle: Option<u64>,
    freq: Option<u8>,
    keys: u64,
}

impl<'a, R: Read> SnapshotDecoder<'a, R> {
    /// Creates a decoder reading from `src`.
    pub fn new(src: &'a mut ByteSource<R>, options: SnapshotOptions) -> Self {
        Self {
            src,
            options,
            version: 0,
            db: 0,
            expire_at_ms: None,
            idle: None,
            freq: None,
            keys: 0,
        }
    }

    /// Decodes the whole snapshot, pushing records to `sink`.
    ///
    /// # Errors
    ///
    /// Fails on malformed or unsupported payloads, checksum mismatches,
    /// source failures (including cancellation) and sink errors. Any error
    /// invalidates the snapshot as a whole.
    pub fn run(&mut self, sink: &mut dyn EventSink) -> RdbResult<SnapshotSummary> {
        self.src.begin_checksum();
        self.read_header()?;

        loop {
            if self.src.cancel_token().is_cancelled() {
                return Err(SourceError::Cancelled.into());
            }
            let opcode = self.src.read_u8()?;
            match opcode {
                OP_EOF => break,
                OP_SELECT_DB => {
                    self.db = primitive::read_length(self.src)?;
                    sink.event(SnapshotEvent::SelectDb(self.db))?;
                }
                OP_RESIZE_DB => {
                    let db_size = primitive::read_length(self.src)?;
                    let expires_size = primitive::read_length(self.src)?;
                    sink.event(SnapshotEvent::ResizeHint {
                        db_size,
                        expires_size,
                    })?;
                }
                OP_AUX => {
                    let key = primitive::read_string(self.src)?;
                    let value = primitive::read_string(self.src)?;
                    sink.event(SnapshotEvent::Aux { key, value })?;
                }
                OP_EXPIRE_TIME_MS => {
                    self.expire_at_ms = Some(primitive::read_u64_le(self.src)?);
                }
                OP_EXPIRE_TIME => {
                    let seconds = primitive::read_u32_le(self.src)?;
                    self.expire_at_ms = Some(u64::from(seconds) * 1000);
                }
                OP_IDLE => {
                    self.require_version(9, "the idle opcode")?;
                    self.idle = Some(primitive::read_length(self.src)?);
                }
                OP_FREQ => {
                    self.require_version(9, "the freq opcode")?;
                    self.freq = Some(self.src.read_u8()?);
                }
                OP_FUNCTION => {
                    self.require_version(10, "the function opcode")?;
                    let payload = primitive::read_string(self.src)?;
                    sink.event(SnapshotEvent::Function(payload))?;
                }
                OP_FUNCTION_PRE_RELEASE => {
                    return Err(RdbError::unsupported(
                        "pre-release function serialization",
                    ));
                }
                OP_MODULE_AUX => {
                    self.skip_module_aux()?;
                }
                OP_SLOT_INFO => {
                    self.require_version(11, "the slot-info opcode")?;
                    let slot_id = primitive::read_length(self.src)?;
                    let slot_size = primitive::read_length(self.src)?;
                    let expires_slot_size = primitive::read_length(self.src)?;
                    debug!(slot_id, slot_size, expires_slot_size, "dropping slot info");
                }
                tag => self.key_value(tag, sink)?,
            }
        }

        let checksum = self.read_trailer()?;
        Ok(SnapshotSummary {
            version: self.version,
            keys: self.keys,
            checksum,
        })
    }

    fn read_header(&mut self) -> RdbResult<()> {
        let mut magic = [0u8; 5];
        self.src.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(RdbError::format("missing REDIS magic"));
        }
        let mut digits = [0u8; 4];
        self.src.read_exact(&mut digits)?;
        let version: u32 = std::str::from_utf8(&digits)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| {
                RdbError::format(format!(
                    "version field {:?} is not four digits",
                    String::from_utf8_lossy(&digits)
                ))
            })?;
        if !(MIN_SNAPSHOT_VERSION..=MAX_SNAPSHOT_VERSION).contains(&version) {
            return Err(RdbError::unsupported(format!("snapshot version {version}")));
        }
        self.version = version;
        Ok(())
    }

    fn require_version(&self, needed: u32, what: &str) -> RdbResult<()> {
        if self.version < needed {
            return Err(RdbError::format(format!(
                "{what} requires snapshot version {needed}, this file is version {}",
                self.version
            )));
        }
        Ok(())
    }

    fn key_value(&mut self, tag: u8, sink: &mut dyn EventSink) -> RdbResult<()> {
        let ty = RdbType::from_byte(tag)
            .ok_or_else(|| RdbError::format(format!("unknown value type tag {tag}")))?;
        if let Some(needed) = ty.min_version() {
            self.require_version(needed, "this stream encoding")?;
        }

        let key = primitive::read_string(self.src)?;
        match ty {
            RdbType::ModulePreGa => Err(RdbError::unsupported(
                "pre-GA module value, which carries no length and cannot be skipped",
            )),
            RdbType::Module2 => {
                let module_id = primitive::read_length(self.src)?;
                skip_module_payload(self.src)?;
                warn!(
                    module_id,
                    key = %String::from_utf8_lossy(&key),
                    "skipped undecodable module value"
                );
                self.take_metadata();
                Ok(())
            }
            _ => {
                let value = value::decode_value(self.src, ty)?;
                let (expire_at_ms, idle, freq) = self.take_metadata();
                self.keys += 1;
                sink.event(SnapshotEvent::KeyValue(KeyValuePair {
                    db: self.db,
                    key,
                    value,
                    expire_at_ms,
                    idle,
                    freq,
                }))
            }
        }
    }

    fn take_metadata(&mut self) -> (Option<u64>, Option<u64>, Option<u8>) {
        (
            self.expire_at_ms.take(),
            self.idle.take(),
            self.freq.take(),
        )
    }

    fn skip_module_aux(&mut self) -> RdbResult<()> {
        let module_id = primitive::read_length(self.src)?;
        let when_opcode = primitive::read_length(self.src)?;
        if when_opcode != MODULE_OP_UINT {
            return Err(RdbError::format(format!(
                "module aux when-opcode is {when_opcode}, expected {MODULE_OP_UINT}"
            )));
        }
        let _when = primitive::read_length(self.src)?;
        skip_module_payload(self.src)?;
        warn!(module_id, "skipped module auxiliary record");
        Ok(())
    }

    fn read_trailer(&mut self) -> RdbResult<ChecksumOutcome> {
        let actual = self.src.finish_checksum().unwrap_or_default();
        if self.version < MIN_CHECKSUM_VERSION {
            if self.options.require_checksum {
                return Err(RdbError::ChecksumMissing);
            }
            return Ok(ChecksumOutcome::NotPresent);
        }

        let expected = primitive::read_u64_le(self.src)?;
        if expected == 0 {
            if self.options.require_checksum {
                return Err(RdbError::ChecksumMissing);
            }
            return Ok(ChecksumOutcome::SkippedZero);
        }
        if !self.options.validate_checksum {
            return Ok(ChecksumOutcome::SkippedDisabled);
        }
        if expected != actual {
            return Err(RdbError::Checksum { expected, actual });
        }
        Ok(ChecksumOutcome::Verified(actual))
    }
}

/// Walks a module opcode stream without interpreting it.
fn skip_module_payload<R: Read>(src: &mut ByteSource<R>) -> RdbResult<()> {
    loop {
        match primitive::read_length(src)? {
            MODULE_OP_EOF => return Ok(()),
            MODULE_OP_SINT | MODULE_OP_UINT => {
                primitive::read_length(src)?;
            }
            MODULE_OP_FLOAT => {
                primitive::read_float(src)?;
            }
            MODULE_OP_DOUBLE => {
                primitive::read_binary_double(src)?;
            }
            MODULE_OP_STRING => {
                primitive::read_string(src)?;
            }
            other => {
                return Err(RdbError::format(format!("unknown module opcode {other}")));
            }
        }
    }
}

/// Decodes a snapshot file from disk.
///
/// # Errors
///
/// Fails if the file cannot be opened or on any decode error.
pub fn decode_file(
    path: &Path,
    options: SnapshotOptions,
    sink: &mut dyn EventSink,
) -> RdbResult<SnapshotSummary> {
    let file = File::open(path).map_err(SourceError::from)?;
    let mut src = ByteSource::new(file);
    SnapshotDecoder::new(&mut src, options).run(sink)
}
