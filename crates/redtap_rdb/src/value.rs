//! Value type tags and the per-type decode dispatch.

use std::io::Read;

use redtap_source::ByteSource;

use crate::convert;
use crate::error::{RdbError, RdbResult};
use crate::intset;
use crate::listpack;
use crate::primitive;
use crate::stream::{self, StreamVariant};
use crate::types::{ScoredMember, Value};
use crate::zipmap;
use crate::ziplist;

/// Quicklist v2 node holding one oversized element as-is.
const QUICKLIST_NODE_PLAIN: u64 = 1;
/// Quicklist v2 node holding a packed listpack.
const QUICKLIST_NODE_PACKED: u64 = 2;

/// Value type tag, the byte that selects how a key's payload is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdbType {
    /// Plain byte string.
    String,
    /// List of length-prefixed strings.
    List,
    /// Set of length-prefixed strings.
    Set,
    /// Sorted set with ASCII scores.
    SortedSet,
    /// Hash of length-prefixed field/value strings.
    Hash,
    /// Sorted set with binary little-endian scores.
    SortedSet2,
    /// Pre-GA module value; carries no length information and cannot be
    /// decoded or skipped.
    ModulePreGa,
    /// Module value with a self-describing opcode stream.
    Module2,
    /// Hash packed in a zipmap.
    HashZipmap,
    /// List packed in a ziplist.
    ListZiplist,
    /// Set packed in an intset.
    SetIntset,
    /// Sorted set packed in a ziplist.
    SortedSetZiplist,
    /// Hash packed in a ziplist.
    HashZiplist,
    /// List of ziplist nodes.
    ListQuicklist,
    /// Stream, first revision.
    StreamListpacks,
    /// Hash packed in a listpack.
    HashListpack,
    /// Sorted set packed in a listpack.
    SortedSetListpack,
    /// List of listpack nodes with per-node container flags.
    ListQuicklist2,
    /// Stream, second revision.
    StreamListpacks2,
    /// Set packed in a listpack.
    SetListpack,
    /// Stream, third revision.
    StreamListpacks3,
}

impl RdbType {
    /// Maps a wire tag to its type, if the tag is known.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::String),
            1 => Some(Self::List),
            2 => Some(Self::Set),
            3 => Some(Self::SortedSet),
            4 => Some(Self::Hash),
            5 => Some(Self::SortedSet2),
            6 => Some(Self::ModulePreGa),
            7 => Some(Self::Module2),
            9 => Some(Self::HashZipmap),
            10 => Some(Self::ListZiplist),
            11 => Some(Self::SetIntset),
            12 => Some(Self::SortedSetZiplist),
            13 => Some(Self::HashZiplist),
            14 => Some(Self::ListQuicklist),
            15 => Some(Self::StreamListpacks),
            16 => Some(Self::HashListpack),
            17 => Some(Self::SortedSetListpack),
            18 => Some(Self::ListQuicklist2),
            19 => Some(Self::StreamListpacks2),
            20 => Some(Self::SetListpack),
            21 => Some(Self::StreamListpacks3),
            _ => None,
        }
    }

    /// The wire tag for this type.
    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            Self::String => 0,
            Self::List => 1,
            Self::Set => 2,
            Self::SortedSet => 3,
            Self::Hash => 4,
            Self::SortedSet2 => 5,
            Self::ModulePreGa => 6,
            Self::Module2 => 7,
            Self::HashZipmap => 9,
            Self::ListZiplist => 10,
            Self::SetIntset => 11,
            Self::SortedSetZiplist => 12,
            Self::HashZiplist => 13,
            Self::ListQuicklist => 14,
            Self::StreamListpacks => 15,
            Self::HashListpack => 16,
            Self::SortedSetListpack => 17,
            Self::ListQuicklist2 => 18,
            Self::StreamListpacks2 => 19,
            Self::SetListpack => 20,
            Self::StreamListpacks3 => 21,
        }
    }

    /// Lowest snapshot version where this type may appear, where the format
    /// ties the type to a version.
    #[must_use]
    pub fn min_version(self) -> Option<u32> {
        match self {
            Self::StreamListpacks => Some(9),
            Self::StreamListpacks2 => Some(10),
            Self::StreamListpacks3 => Some(11),
            _ => None,
        }
    }
}

/// Decodes the payload for a key of type `ty`.
///
/// Module types are not decodable values: the caller handles them before
/// dispatching here, so both module arms are errors.
pub(crate) fn decode_value<R: Read>(src: &mut ByteSource<R>, ty: RdbType) -> RdbResult<Value> {
    match ty {
        RdbType::String => Ok(Value::String(primitive::read_string(src)?)),
        RdbType::List => Ok(Value::List(read_string_seq(src)?)),
        RdbType::Set => Ok(Value::Set(read_string_seq(src)?)),
        RdbType::Hash => {
            let pairs = primitive::read_count(src)?;
            let mut out = Vec::with_capacity(pairs.min(1024) as usize);
            for _ in 0..pairs {
                let field = primitive::read_string(src)?;
                let value = primitive::read_string(src)?;
                out.push((field, value));
            }
            Ok(Value::Hash(out))
        }
        RdbType::SortedSet | RdbType::SortedSet2 => {
            let members = primitive::read_count(src)?;
            let mut out = Vec::with_capacity(members.min(1024) as usize);
            for _ in 0..members {
                let member = primitive::read_string(src)?;
                let score = if ty == RdbType::SortedSet2 {
                    primitive::read_binary_double(src)?
                } else {
                    primitive::read_text_double(src)?
                };
                out.push(ScoredMember { member, score });
            }
            Ok(Value::SortedSet(out))
        }
        RdbType::HashZipmap => Ok(Value::Hash(zipmap::decode(&primitive::read_string(src)?)?)),
        RdbType::ListZiplist => Ok(Value::List(ziplist::decode(&primitive::read_string(src)?)?)),
        RdbType::SetIntset => Ok(Value::Set(intset::decode(&primitive::read_string(src)?)?)),
        RdbType::SortedSetZiplist => {
            scored_pairs(ziplist::decode(&primitive::read_string(src)?)?)
        }
        RdbType::HashZiplist => hash_pairs(ziplist::decode(&primitive::read_string(src)?)?),
        RdbType::HashListpack => hash_pairs(listpack::decode(&primitive::read_string(src)?)?),
        RdbType::SortedSetListpack => {
            scored_pairs(listpack::decode(&primitive::read_string(src)?)?)
        }
        RdbType::SetListpack => Ok(Value::Set(listpack::decode(&primitive::read_string(src)?)?)),
        RdbType::ListQuicklist => {
            let nodes = primitive::read_count(src)?;
            let mut out = Vec::new();
            for _ in 0..nodes {
                out.extend(ziplist::decode(&primitive::read_string(src)?)?);
            }
            Ok(Value::List(out))
        }
        RdbType::ListQuicklist2 => {
            let nodes = primitive::read_count(src)?;
            let mut out = Vec::new();
            for _ in 0..nodes {
                let container = primitive::read_length(src)?;
                let blob = primitive::read_string(src)?;
                match container {
                    QUICKLIST_NODE_PLAIN => out.push(blob),
                    QUICKLIST_NODE_PACKED => out.extend(listpack::decode(&blob)?),
                    other => {
                        return Err(RdbError::format(format!(
                            "unknown quicklist node container {other}"
                        )))
                    }
                }
            }
            Ok(Value::List(out))
        }
        RdbType::StreamListpacks => Ok(Value::Stream(stream::decode(src, StreamVariant::V1)?)),
        RdbType::StreamListpacks2 => Ok(Value::Stream(stream::decode(src, StreamVariant::V2)?)),
        RdbType::StreamListpacks3 => Ok(Value::Stream(stream::decode(src, StreamVariant::V3)?)),
        RdbType::ModulePreGa | RdbType::Module2 => Err(RdbError::unsupported(format!(
            "module value (type tag {})",
            ty.as_byte()
        ))),
    }
}

fn read_string_seq<R: Read>(src: &mut ByteSource<R>) -> RdbResult<Vec<Vec<u8>>> {
    let count = primitive::read_count(src)?;
    let mut out = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        out.push(primitive::read_string(src)?);
    }
    Ok(out)
}

/// Pairs up alternating member/score elements from a flat container.
fn scored_pairs(items: Vec<Vec<u8>>) -> RdbResult<Value> {
    if items.len() % 2 != 0 {
        return Err(RdbError::format(format!(
            "sorted set container holds {} elements, expected an even count",
            items.len()
        )));
    }
    let mut out = Vec::with_capacity(items.len() / 2);
    let mut items = items.into_iter();
    while let (Some(member), Some(score)) = (items.next(), items.next()) {
        let score = convert::to_f64(&score).ok_or_else(|| {
            RdbError::format(format!(
                "invalid sorted set score {:?}",
                String::from_utf8_lossy(&score)
            ))
        })?;
        out.push(ScoredMember { member, score });
    }
    Ok(Value::SortedSet(out))
}

/// Pairs up alternating field/value elements from a flat container.
fn hash_pairs(items: Vec<Vec<u8>>) -> RdbResult<Value> {
    if items.len() % 2 != 0 {
        return Err(RdbError::format(format!(
            "hash container holds {} elements, expected an even count",
            items.len()
        )));
    }
    let mut out = Vec::with_capacity(items.len() / 2);
    let mut items = items.into_iter();
    while let (Some(field), Some(value)) = (items.next(), items.next()) {
        out.push((field, value));
    }
    Ok(Value::Hash(out))
}
