//! Typed representation of replicated commands.

use redtap_rdb::ScoredMember;

/// Condition restricting when a write may take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// Only if the target does not exist (`NX`).
    IfAbsent,
    /// Only if the target already exists (`XX`).
    IfPresent,
}

/// Expiry clause of a `SET` command, as given on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetExpiry {
    /// `EX`: relative seconds.
    Seconds(u64),
    /// `PX`: relative milliseconds.
    Millis(u64),
    /// `EXAT`: absolute unix seconds.
    AtSeconds(u64),
    /// `PXAT`: absolute unix milliseconds.
    AtMillis(u64),
}

/// Condition restricting when an expiry update may take effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireCondition {
    /// Only when no expiry is set (`NX`).
    IfNone,
    /// Only when an expiry is already set (`XX`).
    IfSet,
    /// Only when the new expiry is later (`GT`).
    IfGreater,
    /// Only when the new expiry is earlier (`LT`).
    IfLess,
}

/// Which side of a list an operation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEnd {
    /// Head of the list.
    Left,
    /// Tail of the list.
    Right,
}

/// Placement selector for `LINSERT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Insert before the pivot element.
    Before,
    /// Insert after the pivot element.
    After,
}

/// Score comparison gate for `ZADD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreComparison {
    /// Only update when the new score is greater (`GT`).
    Greater,
    /// Only update when the new score is less (`LT`).
    Less,
}

/// One statement of a `BITFIELD` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitFieldOp {
    /// Read a field.
    Get {
        /// Field type token, e.g. `u8` or `i16`.
        ty: Vec<u8>,
        /// Offset token, a bit offset or `#`-prefixed slot index.
        offset: Vec<u8>,
    },
    /// Write a field.
    Set {
        /// Field type token.
        ty: Vec<u8>,
        /// Offset token.
        offset: Vec<u8>,
        /// Value to store.
        value: i64,
    },
    /// Increment a field.
    IncrBy {
        /// Field type token.
        ty: Vec<u8>,
        /// Offset token.
        offset: Vec<u8>,
        /// Signed increment.
        delta: i64,
    },
    /// Set the overflow behavior for subsequent statements.
    Overflow(Overflow),
}

/// Overflow policy of `BITFIELD` arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Wrap around on overflow.
    Wrap,
    /// Saturate at the type bounds.
    Saturate,
    /// Fail the statement on overflow.
    Fail,
}

/// Stream trimming strategy attached to `XADD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTrim {
    /// What the threshold applies to.
    pub strategy: TrimStrategy,
    /// Exact (`=`) or approximate (`~`) trimming, when spelled out.
    pub exactness: Option<TrimExactness>,
    /// Threshold token: a length for `MAXLEN`, an id for `MINID`.
    pub threshold: Vec<u8>,
    /// `LIMIT` clause bounding the work done per trim.
    pub limit: Option<u64>,
}

/// What an `XADD` trim threshold measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimStrategy {
    /// Trim down to a maximum entry count (`MAXLEN`).
    MaxLen,
    /// Trim entries with ids below a minimum (`MINID`).
    MinId,
}

/// Exactness marker of a trim threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimExactness {
    /// `=`: trim exactly.
    Exact,
    /// `~`: trim opportunistically.
    Approximate,
}

/// Flush mode for `FLUSHDB`/`FLUSHALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Flush asynchronously (`ASYNC`).
    Async,
    /// Flush synchronously (`SYNC`).
    Sync,
}

/// A replicated write command with typed arguments.
///
/// Deprecated spellings that replicate identical semantics parse into the
/// same variant: `HMSET` decodes as [`Command::HSet`].
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)] // Field meanings follow the command's documentation.
pub enum Command {
    // Strings.
    Set {
        key: Vec<u8>,
        value: Vec<u8>,
        condition: Option<SetCondition>,
        expiry: Option<SetExpiry>,
        keep_ttl: bool,
        get: bool,
    },
    SetNx {
        key: Vec<u8>,
        value: Vec<u8>,
    },
    SetEx {
        key: Vec<u8>,
        seconds: u64,
        value: Vec<u8>,
    },
    PSetEx {
        key: Vec<u8>,
        millis: u64,
        value: Vec<u8>,
    },
    GetSet {
        key: Vec<u8>,
        value: Vec<u8>,
    },
    GetDel {
        key: Vec<u8>,
    },
    Append {
        key: Vec<u8>,
        value: Vec<u8>,
    },
    SetRange {
        key: Vec<u8>,
        offset: u64,
        value: Vec<u8>,
    },
    Incr {
        key: Vec<u8>,
    },
    Decr {
        key: Vec<u8>,
    },
    IncrBy {
        key: Vec<u8>,
        delta: i64,
    },
    DecrBy {
        key: Vec<u8>,
        delta: i64,
    },
    IncrByFloat {
        key: Vec<u8>,
        delta: f64,
    },
    MSet {
        pairs: Vec<(Vec<u8>, Vec<u8>)>,
    },
    MSetNx {
        pairs: Vec<(Vec<u8>, Vec<u8>)>,
    },
    SetBit {
        key: Vec<u8>,
        offset: u64,
        bit: bool,
    },
    BitField {
        key: Vec<u8>,
        ops: Vec<BitFieldOp>,
    },

    // Keys.
    Del {
        keys: Vec<Vec<u8>>,
    },
    Unlink {
        keys: Vec<Vec<u8>>,
    },
    Expire {
        key: Vec<u8>,
        seconds: i64,
        condition: Option<ExpireCondition>,
    },
    PExpire {
        key: Vec<u8>,
        millis: i64,
        condition: Option<ExpireCondition>,
    },
    ExpireAt {
        key: Vec<u8>,
        at_seconds: i64,
        condition: Option<ExpireCondition>,
    },
    PExpireAt {
        key: Vec<u8>,
        at_millis: i64,
        condition: Option<ExpireCondition>,
    },
    Persist {
        key: Vec<u8>,
    },
    Rename {
        source: Vec<u8>,
        destination: Vec<u8>,
    },
    RenameNx {
        source: Vec<u8>,
        destination: Vec<u8>,
    },
    Move {
        key: Vec<u8>,
        db: u64,
    },
    Copy {
        source: Vec<u8>,
        destination: Vec<u8>,
        destination_db: Option<u64>,
        replace: bool,
    },
    Restore {
        key: Vec<u8>,
        ttl_ms: u64,
        payload: Vec<u8>,
        replace: bool,
        absolute_ttl: bool,
        idle_time: Option<u64>,
        freq: Option<u8>,
    },

    // Lists.
    LPush {
        key: Vec<u8>,
        elements: Vec<Vec<u8>>,
    },
    RPush {
        key: Vec<u8>,
        elements: Vec<Vec<u8>>,
    },
    LPushX {
        key: Vec<u8>,
        elements: Vec<Vec<u8>>,
    },
    RPushX {
        key: Vec<u8>,
        elements: Vec<Vec<u8>>,
    },
    LPop {
        key: Vec<u8>,
        count: Option<u64>,
    },
    RPop {
        key: Vec<u8>,
        count: Option<u64>,
    },
    LSet {
        key: Vec<u8>,
        index: i64,
        element: Vec<u8>,
    },
    LRem {
        key: Vec<u8>,
        count: i64,
        element: Vec<u8>,
    },
    LTrim {
        key: Vec<u8>,
        start: i64,
        stop: i64,
    },
    LInsert {
        key: Vec<u8>,
        position: InsertPosition,
        pivot: Vec<u8>,
        element: Vec<u8>,
    },
    RPopLPush {
        source: Vec<u8>,
        destination: Vec<u8>,
    },
    BRPopLPush {
        source: Vec<u8>,
        destination: Vec<u8>,
        timeout: f64,
    },
    LMove {
        source: Vec<u8>,
        destination: Vec<u8>,
        from: ListEnd,
        to: ListEnd,
    },

    // Sets.
    SAdd {
        key: Vec<u8>,
        members: Vec<Vec<u8>>,
    },
    SRem {
        key: Vec<u8>,
        members: Vec<Vec<u8>>,
    },
    SMove {
        source: Vec<u8>,
        destination: Vec<u8>,
        member: Vec<u8>,
    },
    SPop {
        key: Vec<u8>,
        count: Option<u64>,
    },
    SDiffStore {
        destination: Vec<u8>,
        keys: Vec<Vec<u8>>,
    },
    SInterStore {
        destination: Vec<u8>,
        keys: Vec<Vec<u8>>,
    },
    SUnionStore {
        destination: Vec<u8>,
        keys: Vec<Vec<u8>>,
    },

    // Hashes.
    HSet {
        key: Vec<u8>,
        fields: Vec<(Vec<u8>, Vec<u8>)>,
    },
    HSetNx {
        key: Vec<u8>,
        field: Vec<u8>,
        value: Vec<u8>,
    },
    HDel {
        key: Vec<u8>,
        fields: Vec<Vec<u8>>,
    },
    HIncrBy {
        key: Vec<u8>,
        field: Vec<u8>,
        delta: i64,
    },
    HIncrByFloat {
        key: Vec<u8>,
        field: Vec<u8>,
        delta: f64,
    },

    // Sorted sets.
    ZAdd {
        key: Vec<u8>,
        condition: Option<SetCondition>,
        comparison: Option<ScoreComparison>,
        changed: bool,
        increment: bool,
        members: Vec<ScoredMember>,
    },
    ZIncrBy {
        key: Vec<u8>,
        delta: f64,
        member: Vec<u8>,
    },
    ZRem {
        key: Vec<u8>,
        members: Vec<Vec<u8>>,
    },
    ZRemRangeByRank {
        key: Vec<u8>,
        start: i64,
        stop: i64,
    },
    ZRemRangeByScore {
        key: Vec<u8>,
        min: Vec<u8>,
        max: Vec<u8>,
    },
    ZRemRangeByLex {
        key: Vec<u8>,
        min: Vec<u8>,
        max: Vec<u8>,
    },

    // Streams.
    XAdd {
        key: Vec<u8>,
        no_mk_stream: bool,
        trim: Option<StreamTrim>,
        id: Vec<u8>,
        fields: Vec<(Vec<u8>, Vec<u8>)>,
    },
    XDel {
        key: Vec<u8>,
        ids: Vec<Vec<u8>>,
    },
    XSetId {
        key: Vec<u8>,
        id: Vec<u8>,
        entries_added: Option<u64>,
        max_deleted_id: Option<Vec<u8>>,
    },

    // Server and connection.
    Select {
        db: u64,
    },
    SwapDb {
        first: u64,
        second: u64,
    },
    FlushDb {
        mode: Option<FlushMode>,
    },
    FlushAll {
        mode: Option<FlushMode>,
    },
    Ping {
        message: Option<Vec<u8>>,
    },
    Publish {
        channel: Vec<u8>,
        message: Vec<u8>,
    },
    Multi,
    Exec,
}

impl Command {
    /// Lowercase wire name of the command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "set",
            Command::SetNx { .. } => "setnx",
            Command::SetEx { .. } => "setex",
            Command::PSetEx { .. } => "psetex",
            Command::GetSet { .. } => "getset",
            Command::GetDel { .. } => "getdel",
            Command::Append { .. } => "append",
            Command::SetRange { .. } => "setrange",
            Command::Incr { .. } => "incr",
            Command::Decr { .. } => "decr",
            Command::IncrBy { .. } => "incrby",
            Command::DecrBy { .. } => "decrby",
            Command::IncrByFloat { .. } => "incrbyfloat",
            Command::MSet { .. } => "mset",
            Command::MSetNx { .. } => "msetnx",
            Command::SetBit { .. } => "setbit",
            Command::BitField { .. } => "bitfield",
            Command::Del { .. } => "del",
            Command::Unlink { .. } => "unlink",
            Command::Expire { .. } => "expire",
            Command::PExpire { .. } => "pexpire",
            Command::ExpireAt { .. } => "expireat",
            Command::PExpireAt { .. } => "pexpireat",
            Command::Persist { .. } => "persist",
            Command::Rename { .. } => "rename",
            Command::RenameNx { .. } => "renamenx",
            Command::Move { .. } => "move",
            Command::Copy { .. } => "copy",
            Command::Restore { .. } => "restore",
            Command::LPush { .. } => "lpush",
            Command::RPush { .. } => "rpush",
            Command::LPushX { .. } => "lpushx",
            Command::RPushX { .. } => "rpushx",
            Command::LPop { .. } => "lpop",
            Command::RPop { .. } => "rpop",
            Command::LSet { .. } => "lset",
            Command::LRem { .. } => "lrem",
            Command::LTrim { .. } => "ltrim",
            Command::LInsert { .. } => "linsert",
            Command::RPopLPush { .. } => "rpoplpush",
            Command::BRPopLPush { .. } => "brpoplpush",
            Command::LMove { .. } => "lmove",
            Command::SAdd { .. } => "sadd",
            Command::SRem { .. } => "srem",
            Command::SMove { .. } => "smove",
            Command::SPop { .. } => "spop",
            Command::SDiffStore { .. } => "sdiffstore",
            Command::SInterStore { .. } => "sinterstore",
            Command::SUnionStore { .. } => "sunionstore",
            Command::HSet { .. } => "hset",
            Command::HSetNx { .. } => "hsetnx",
            Command::HDel { .. } => "hdel",
            Command::HIncrBy { .. } => "hincrby",
            Command::HIncrByFloat { .. } => "hincrbyfloat",
            Command::ZAdd { .. } => "zadd",
            Command::ZIncrBy { .. } => "zincrby",
            Command::ZRem { .. } => "zrem",
            Command::ZRemRangeByRank { .. } => "zremrangebyrank",
            Command::ZRemRangeByScore { .. } => "zremrangebyscore",
            Command::ZRemRangeByLex { .. } => "zremrangebylex",
            Command::XAdd { .. } => "xadd",
            Command::XDel { .. } => "xdel",
            Command::XSetId { .. } => "xsetid",
            Command::Select { .. } => "select",
            Command::SwapDb { .. } => "swapdb",
            Command::FlushDb { .. } => "flushdb",
            Command::FlushAll { .. } => "flushall",
            Command::Ping { .. } => "ping",
            Command::Publish { .. } => "publish",
            Command::Multi => "multi",
            Command::Exec => "exec",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_lowercase_wire_spellings() {
        assert_eq!(Command::Multi.name(), "multi");
        assert_eq!(
            Command::Del {
                keys: vec![b"k".to_vec()]
            }
            .name(),
            "del"
        );
        assert_eq!(
            Command::ZRemRangeByScore {
                key: vec![],
                min: vec![],
                max: vec![],
            }
            .name(),
            "zremrangebyscore"
        );
    }
}
