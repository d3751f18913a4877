//! Decoded snapshot data model.
//!
//! Everything here is owned: decoding never hands out borrows into the read
//! buffer, so events can outlive the source they came from. Keys, members
//! and field names stay `Vec<u8>` because the wire makes no UTF-8 promise.

use std::fmt;

/// One record decoded from a snapshot, in stream order.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    /// Auxiliary metadata field from the snapshot preamble, such as
    /// `redis-ver` or `repl-id`.
    Aux {
        /// Metadata field name.
        key: Vec<u8>,
        /// Metadata field value.
        value: Vec<u8>,
    },
    /// The records that follow belong to this database index.
    SelectDb(u64),
    /// Capacity hint for the current database.
    ResizeHint {
        /// Declared number of keys.
        db_size: u64,
        /// Declared number of keys carrying an expiry.
        expires_size: u64,
    },
    /// A function library payload, passed through undecoded.
    Function(Vec<u8>),
    /// A key together with its decoded value and metadata.
    KeyValue(KeyValuePair),
}

/// A decoded key/value record and the metadata attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValuePair {
    /// Database index the key lives in.
    pub db: u64,
    /// Raw key bytes.
    pub key: Vec<u8>,
    /// Decoded value.
    pub value: Value,
    /// Absolute expiry in milliseconds since the epoch, when set.
    pub expire_at_ms: Option<u64>,
    /// LRU idle time carried by the snapshot, when present.
    pub idle: Option<u64>,
    /// LFU access frequency carried by the snapshot, when present.
    pub freq: Option<u8>,
}

/// A decoded value, normalised across all storage encodings.
///
/// The compact encodings collapse into the same variants as their plain
/// counterparts: a ziplist list and a quicklist both come out as
/// [`Value::List`]. Integer-packed elements are rendered as decimal ASCII.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A byte string.
    String(Vec<u8>),
    /// A list, in list order.
    List(Vec<Vec<u8>>),
    /// A set, in storage order.
    Set(Vec<Vec<u8>>),
    /// A hash as field/value pairs, in storage order.
    Hash(Vec<(Vec<u8>, Vec<u8>)>),
    /// A sorted set as member/score pairs, in storage order.
    SortedSet(Vec<ScoredMember>),
    /// A stream with its entries and consumer groups.
    Stream(Stream),
}

impl Value {
    /// Short name of the variant, e.g. for log lines.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Hash(_) => "hash",
            Value::SortedSet(_) => "zset",
            Value::Stream(_) => "stream",
        }
    }
}

/// A sorted set member and its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    /// Raw member bytes.
    pub member: Vec<u8>,
    /// Score; may be infinite, and NaN never occurs in well-formed data.
    pub score: f64,
}

/// A stream entry identifier: milliseconds and a sequence number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    /// Millisecond component.
    pub ms: u64,
    /// Sequence component, disambiguating entries within one millisecond.
    pub seq: u64,
}

impl StreamId {
    /// Creates an id from its two components.
    #[must_use]
    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// A single stream entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    /// Entry id.
    pub id: StreamId,
    /// Field/value pairs in insertion order. Tombstones keep the fields
    /// they were stored with.
    pub fields: Vec<(Vec<u8>, Vec<u8>)>,
    /// True when the entry is a tombstone still occupying its node.
    pub deleted: bool,
}

/// A decoded stream value.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Entries across all nodes, including tombstones, in id order.
    pub entries: Vec<StreamEntry>,
    /// Number of live entries the snapshot declares.
    pub length: u64,
    /// Highest id ever assigned.
    pub last_id: StreamId,
    /// Lowest id still present.
    pub first_id: StreamId,
    /// Highest id among deleted entries.
    pub max_deleted_id: StreamId,
    /// Total entries added over the stream's lifetime.
    pub entries_added: u64,
    /// Consumer groups registered on the stream.
    pub groups: Vec<StreamGroup>,
}

/// A consumer group and its delivery state.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamGroup {
    /// Group name.
    pub name: Vec<u8>,
    /// Last id delivered to any consumer of the group.
    pub last_delivered: StreamId,
    /// Entries read counter; absent in snapshots older than stream v2.
    pub entries_read: Option<u64>,
    /// Group-level pending entries list.
    pub pending: Vec<PendingEntry>,
    /// Consumers known to the group.
    pub consumers: Vec<StreamConsumer>,
}

/// One consumer inside a group.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConsumer {
    /// Consumer name.
    pub name: Vec<u8>,
    /// Last time the consumer was seen, in milliseconds since the epoch.
    pub seen_time_ms: u64,
    /// Last time the consumer attempted an action; equals `seen_time_ms`
    /// in snapshots older than stream v3.
    pub active_time_ms: u64,
    /// Ids of entries pending for this consumer. Delivery metadata lives
    /// in the group-level [`PendingEntry`] with the same id.
    pub pending: Vec<StreamId>,
}

/// One entry in a group's pending entries list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    /// Entry id.
    pub id: StreamId,
    /// Last delivery time, in milliseconds since the epoch.
    pub delivery_time_ms: u64,
    /// Number of times the entry was delivered.
    pub delivery_count: u64,
}
