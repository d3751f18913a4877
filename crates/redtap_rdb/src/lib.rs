//! Streaming decoder for Redis snapshot (RDB) payloads.
//!
//! The snapshot format is a sequence of opcode-tagged records: auxiliary
//! metadata, database selectors, expiry stamps and key/value pairs, closed by
//! an end-of-file marker and (from format version 5 on) a CRC-64 trailer.
//! [`SnapshotDecoder`] walks that sequence over a [`redtap_source::ByteSource`]
//! and pushes one [`SnapshotEvent`] per record to an [`EventSink`], so a dump
//! is decoded in one pass without buffering it whole.
//!
//! Compact container encodings (ziplist, listpack, zipmap, intset, quicklist
//! and the stream listpack family) are unpacked into plain [`Value`]s; LZF
//! compressed strings are inflated transparently.
//!
//! ```
//! use redtap_rdb::{SnapshotDecoder, SnapshotOptions, VecSink};
//! use redtap_source::ByteSource;
//!
//! // An empty format-version-3 dump: magic, version, end marker.
//! let dump = b"REDIS0003\xff";
//! let mut source = ByteSource::new(&dump[..]);
//! let mut sink = VecSink::new();
//! let summary = SnapshotDecoder::new(&mut source, SnapshotOptions::default())
//!     .run(&mut sink)
//!     .unwrap();
//! assert_eq!(summary.version, 3);
//! assert!(sink.events.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod convert;

mod cursor;
mod error;
mod intset;
mod listpack;
mod lzf;
mod primitive;
mod snapshot;
mod stream;
mod types;
mod value;
mod zipmap;
mod ziplist;

pub use error::{RdbError, RdbResult};
pub use primitive::{Length, MAX_BYTES_LENGTH, MAX_CONTAINER_ELEMENTS};
pub use snapshot::{
    decode_file, ChecksumOutcome, EventSink, SnapshotDecoder, SnapshotOptions, SnapshotSummary,
    VecSink, MAX_SNAPSHOT_VERSION, MIN_SNAPSHOT_VERSION, SNAPSHOT_MAGIC,
};
pub use types::{
    KeyValuePair, PendingEntry, ScoredMember, SnapshotEvent, Stream, StreamConsumer, StreamEntry,
    StreamGroup, StreamId, Value,
};
pub use value::RdbType;
