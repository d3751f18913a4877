//! Stream value decoding.
//!
//! A stream is stored as a run of radix tree nodes, each a 16-byte
//! big-endian master id plus a listpack holding entries as deltas against
//! that id, followed by the stream's own counters and its consumer groups.
//! Three revisions of the encoding exist: v2 added the first-id,
//! max-deleted-id and entries-added counters plus per-group entries-read,
//! v3 added per-consumer active times.

use std::io::Read;

use redtap_source::ByteSource;

use crate::convert;
use crate::cursor::ByteCursor;
use crate::error::{RdbError, RdbResult};
use crate::listpack;
use crate::primitive;
use crate::types::{PendingEntry, Stream, StreamConsumer, StreamEntry, StreamGroup, StreamId};

/// Which revision of the stream encoding a type tag selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum StreamVariant {
    V1,
    V2,
    V3,
}

/// Entry flag: the entry is a tombstone.
const FLAG_DELETED: u64 = 1;
/// Entry flag: the entry reuses the node's master field names.
const FLAG_SAMEFIELDS: u64 = 2;

/// Decodes a full stream value, nodes then counters then groups.
pub(crate) fn decode<R: Read>(
    src: &mut ByteSource<R>,
    variant: StreamVariant,
) -> RdbResult<Stream> {
    let node_count = primitive::read_count(src)?;
    let mut entries = Vec::new();
    for _ in 0..node_count {
        let raw_id = primitive::read_string(src)?;
        let master_id = parse_binary_id(&raw_id)?;
        let blob = primitive::read_string(src)?;
        decode_node(&blob, master_id, &mut entries)?;
    }

    let length = primitive::read_length(src)?;
    let last_id = read_coded_id(src)?;
    let (first_id, max_deleted_id, entries_added) = if variant >= StreamVariant::V2 {
        (
            read_coded_id(src)?,
            read_coded_id(src)?,
            primitive::read_length(src)?,
        )
    } else {
        // v1 snapshots never stored these counters; reconstruct them the
        // way a server does when loading old data.
        let first = entries
            .iter()
            .find(|e| !e.deleted)
            .map(|e| e.id)
            .unwrap_or_default();
        (first, StreamId::default(), length)
    };

    let group_count = primitive::read_count(src)?;
    let mut groups = Vec::with_capacity(group_count.min(64) as usize);
    for _ in 0..group_count {
        groups.push(decode_group(src, variant)?);
    }

    Ok(Stream {
        entries,
        length,
        last_id,
        first_id,
        max_deleted_id,
        entries_added,
        groups,
    })
}

/// Reads an id stored as two length-coded integers.
fn read_coded_id<R: Read>(src: &mut ByteSource<R>) -> RdbResult<StreamId> {
    let ms = primitive::read_length(src)?;
    let seq = primitive::read_length(src)?;
    Ok(StreamId::new(ms, seq))
}

/// Reads an id stored as 16 raw big-endian bytes.
fn read_binary_id<R: Read>(src: &mut ByteSource<R>) -> RdbResult<StreamId> {
    let mut raw = [0u8; 16];
    src.read_exact(&mut raw)?;
    parse_binary_id(&raw)
}

fn parse_binary_id(raw: &[u8]) -> RdbResult<StreamId> {
    if raw.len() != 16 {
        return Err(RdbError::format(format!(
            "stream id is {} bytes, expected 16",
            raw.len()
        )));
    }
    let mut cur = ByteCursor::new(raw);
    let ms = cur.read_u64_be()?;
    let seq = cur.read_u64_be()?;
    Ok(StreamId::new(ms, seq))
}

fn decode_group<R: Read>(
    src: &mut ByteSource<R>,
    variant: StreamVariant,
) -> RdbResult<StreamGroup> {
    let name = primitive::read_string(src)?;
    let last_delivered = read_coded_id(src)?;
    let entries_read = if variant >= StreamVariant::V2 {
        Some(primitive::read_length(src)?)
    } else {
        None
    };

    let pel_count = primitive::read_count(src)?;
    let mut pending = Vec::with_capacity(pel_count.min(1024) as usize);
    for _ in 0..pel_count {
        let id = read_binary_id(src)?;
        let delivery_time_ms = primitive::read_u64_le(src)?;
        let delivery_count = primitive::read_length(src)?;
        pending.push(PendingEntry {
            id,
            delivery_time_ms,
            delivery_count,
        });
    }

    let consumer_count = primitive::read_count(src)?;
    let mut consumers = Vec::with_capacity(consumer_count.min(1024) as usize);
    for _ in 0..consumer_count {
        let consumer_name = primitive::read_string(src)?;
        let seen_time_ms = primitive::read_u64_le(src)?;
        let active_time_ms = if variant >= StreamVariant::V3 {
            primitive::read_u64_le(src)?
        } else {
            seen_time_ms
        };

        let own_count = primitive::read_count(src)?;
        let mut own = Vec::with_capacity(own_count.min(1024) as usize);
        for _ in 0..own_count {
            let id = read_binary_id(src)?;
            if !pending.iter().any(|p| p.id == id) {
                return Err(RdbError::format(format!(
                    "consumer pending id {id} missing from the group pending list"
                )));
            }
            own.push(id);
        }
        consumers.push(StreamConsumer {
            name: consumer_name,
            seen_time_ms,
            active_time_ms,
            pending: own,
        });
    }

    Ok(StreamGroup {
        name,
        last_delivered,
        entries_read,
        pending,
        consumers,
    })
}

/// Unpacks one radix node listpack into entries.
///
/// Node layout, as listpack elements: live count, deleted count, master
/// field names (count then names), a literal `0` closing the master record,
/// then per entry: flags, ms and seq deltas against the master id, fields
/// (inherited values or an explicit count of pairs), and a trailing element
/// count used only for reverse traversal.
fn decode_node(blob: &[u8], master_id: StreamId, out: &mut Vec<StreamEntry>) -> RdbResult<()> {
    let mut elems = Elements::new(listpack::decode(blob)?);

    let live = elems.next_u64("live entry count")?;
    let deleted = elems.next_u64("deleted entry count")?;
    let field_count = elems.next_u64("master field count")?;
    if field_count as usize > elems.remaining() {
        return Err(RdbError::format(
            "stream node declares more master fields than elements",
        ));
    }
    let mut master_fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        master_fields.push(elems.next_bytes("master field name")?);
    }
    if elems.next_u64("master record terminator")? != 0 {
        return Err(RdbError::format(
            "stream node master record not closed by a zero element",
        ));
    }

    let total = live
        .checked_add(deleted)
        .ok_or_else(|| RdbError::format("stream node entry counts overflow"))?;
    for _ in 0..total {
        let flags = elems.next_u64("entry flags")?;
        let ms_diff = elems.next_u64("entry ms delta")?;
        let seq_diff = elems.next_u64("entry seq delta")?;
        let id = StreamId::new(
            master_id.ms.checked_add(ms_diff).ok_or_else(id_overflow)?,
            master_id.seq.checked_add(seq_diff).ok_or_else(id_overflow)?,
        );

        let fields = if flags & FLAG_SAMEFIELDS != 0 {
            let mut fields = Vec::with_capacity(master_fields.len());
            for name in &master_fields {
                fields.push((name.clone(), elems.next_bytes("inherited field value")?));
            }
            fields
        } else {
            let pair_count = elems.next_u64("entry field count")?;
            if (pair_count as usize).saturating_mul(2) > elems.remaining() {
                return Err(RdbError::format(
                    "stream entry declares more fields than elements",
                ));
            }
            let mut fields = Vec::with_capacity(pair_count as usize);
            for _ in 0..pair_count {
                let field = elems.next_bytes("field name")?;
                let value = elems.next_bytes("field value")?;
                fields.push((field, value));
            }
            fields
        };

        // Per-entry element count, only needed for reverse traversal.
        elems.next_u64("entry element count")?;

        out.push(StreamEntry {
            id,
            fields,
            deleted: flags & FLAG_DELETED != 0,
        });
    }

    if !elems.is_empty() {
        return Err(RdbError::format(format!(
            "{} unconsumed elements after the last stream entry",
            elems.remaining()
        )));
    }
    Ok(())
}

fn id_overflow() -> RdbError {
    RdbError::format("stream entry id delta overflows the master id")
}

/// Forward cursor over decoded listpack elements.
struct Elements {
    items: Vec<Vec<u8>>,
    pos: usize,
}

impl Elements {
    fn new(items: Vec<Vec<u8>>) -> Self {
        Self { items, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.items.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.pos == self.items.len()
    }

    fn next_bytes(&mut self, what: &str) -> RdbResult<Vec<u8>> {
        if self.is_empty() {
            return Err(RdbError::format(format!(
                "stream node listpack ended before {what}"
            )));
        }
        let item = std::mem::take(&mut self.items[self.pos]);
        self.pos += 1;
        Ok(item)
    }

    fn next_u64(&mut self, what: &str) -> RdbResult<u64> {
        let bytes = self.next_bytes(what)?;
        convert::to_u64(&bytes).ok_or_else(|| {
            RdbError::format(format!(
                "stream node {what} {:?} is not an integer",
                String::from_utf8_lossy(&bytes)
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes a byte-string length prefix the way dumps do.
    fn push_len(out: &mut Vec<u8>, len: u64) {
        if len < 64 {
            out.push(len as u8);
        } else if len < 16384 {
            out.push(0x40 | (len >> 8) as u8);
            out.push((len & 0xff) as u8);
        } else {
            out.push(0x80);
            out.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }

    fn push_str(out: &mut Vec<u8>, bytes: &[u8]) {
        push_len(out, bytes.len() as u64);
        out.extend_from_slice(bytes);
    }

    fn push_binary_id(out: &mut Vec<u8>, id: StreamId) {
        out.extend_from_slice(&id.ms.to_be_bytes());
        out.extend_from_slice(&id.seq.to_be_bytes());
    }

    /// Builds a listpack whose elements are all plain strings.
    fn listpack_of(items: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(items.len() as u16).to_le_bytes());
        for item in items {
            assert!(item.len() < 4096);
            let start = out.len();
            if item.len() < 64 {
                out.push(0x80 | item.len() as u8);
            } else {
                out.push(0xe0 | (item.len() >> 8) as u8);
                out.push((item.len() & 0xff) as u8);
            }
            out.extend_from_slice(item);
            let encoded = out.len() - start;
            assert!(encoded < 128);
            out.push(encoded as u8); // backlen
        }
        out.push(0xff);
        let total = out.len() as u32;
        out[0..4].copy_from_slice(&total.to_le_bytes());
        out
    }

    fn source(bytes: &[u8]) -> ByteSource<&[u8]> {
        ByteSource::new(bytes)
    }

    /// One node, master id 5-0, two live entries: the first inherits the
    /// master fields, the second carries its own.
    fn two_entry_node() -> Vec<u8> {
        listpack_of(&[
            b"2",    // live
            b"0",    // deleted
            b"2",    // master field count
            b"temp", b"hum", b"0", // master fields, terminator
            b"2", b"0", b"1", // entry 1: SAMEFIELDS, id 5-1
            b"20", b"60", // inherited values
            b"6",    // lp count
            b"0", b"1", b"0", // entry 2: explicit, id 6-0
            b"1", b"press", b"1013", // one pair
            b"7",    // lp count
        ])
    }

    #[test]
    fn v1_stream_with_entries() {
        let mut wire = Vec::new();
        push_len(&mut wire, 1); // node count
        let mut id = Vec::new();
        push_binary_id(&mut id, StreamId::new(5, 0));
        push_str(&mut wire, &id);
        push_str(&mut wire, &two_entry_node());
        push_len(&mut wire, 2); // length
        push_len(&mut wire, 6); // last id ms
        push_len(&mut wire, 0); // last id seq
        push_len(&mut wire, 0); // group count

        let stream = decode(&mut source(&wire), StreamVariant::V1).unwrap();
        assert_eq!(stream.length, 2);
        assert_eq!(stream.last_id, StreamId::new(6, 0));
        assert_eq!(stream.entries.len(), 2);
        assert_eq!(stream.entries[0].id, StreamId::new(5, 1));
        assert_eq!(
            stream.entries[0].fields,
            vec![
                (b"temp".to_vec(), b"20".to_vec()),
                (b"hum".to_vec(), b"60".to_vec()),
            ]
        );
        assert_eq!(stream.entries[1].id, StreamId::new(6, 0));
        assert_eq!(
            stream.entries[1].fields,
            vec![(b"press".to_vec(), b"1013".to_vec())]
        );
        // Counters v1 never stored are reconstructed.
        assert_eq!(stream.first_id, StreamId::new(5, 1));
        assert_eq!(stream.max_deleted_id, StreamId::default());
        assert_eq!(stream.entries_added, 2);
        assert!(stream.groups.is_empty());
    }

    #[test]
    fn tombstones_are_surfaced_with_the_deleted_flag() {
        let node = listpack_of(&[
            b"1", b"1", // one live, one deleted
            b"1", b"f", b"0", // master field "f"
            b"3", b"0", b"0", // entry 1: DELETED | SAMEFIELDS, id 9-0
            b"gone", b"5", // inherited value, lp count
            b"2", b"0", b"1", // entry 2: SAMEFIELDS, id 9-1
            b"live", b"5",
        ]);
        let mut wire = Vec::new();
        push_len(&mut wire, 1);
        let mut id = Vec::new();
        push_binary_id(&mut id, StreamId::new(9, 0));
        push_str(&mut wire, &id);
        push_str(&mut wire, &node);
        push_len(&mut wire, 1); // length counts live entries only
        push_len(&mut wire, 9);
        push_len(&mut wire, 1);
        push_len(&mut wire, 0); // groups

        let stream = decode(&mut source(&wire), StreamVariant::V1).unwrap();
        assert_eq!(stream.entries.len(), 2);
        assert!(stream.entries[0].deleted);
        assert!(!stream.entries[1].deleted);
        // The derived first id skips the tombstone.
        assert_eq!(stream.first_id, StreamId::new(9, 1));
    }

    #[test]
    fn v3_stream_with_groups_and_pending_entries() {
        let node = listpack_of(&[
            b"1", b"0", b"1", b"f", b"0", // one entry, master field "f"
            b"2", b"0", b"0", b"v", b"5",
        ]);
        let entry_id = StreamId::new(100, 0);

        let mut wire = Vec::new();
        push_len(&mut wire, 1);
        let mut id = Vec::new();
        push_binary_id(&mut id, entry_id);
        push_str(&mut wire, &id);
        push_str(&mut wire, &node);
        push_len(&mut wire, 1); // length
        push_len(&mut wire, 100); // last id
        push_len(&mut wire, 0);
        push_len(&mut wire, 100); // first id
        push_len(&mut wire, 0);
        push_len(&mut wire, 0); // max deleted id
        push_len(&mut wire, 0);
        push_len(&mut wire, 1); // entries added
        push_len(&mut wire, 1); // group count
        push_str(&mut wire, b"workers"); // group name
        push_len(&mut wire, 100); // last delivered
        push_len(&mut wire, 0);
        push_len(&mut wire, 1); // entries read
        push_len(&mut wire, 1); // global PEL count
        push_binary_id(&mut wire, entry_id);
        wire.extend_from_slice(&7777u64.to_le_bytes()); // delivery time
        push_len(&mut wire, 3); // delivery count
        push_len(&mut wire, 1); // consumer count
        push_str(&mut wire, b"alice");
        wire.extend_from_slice(&8888u64.to_le_bytes()); // seen time
        wire.extend_from_slice(&8890u64.to_le_bytes()); // active time
        push_len(&mut wire, 1); // consumer PEL count
        push_binary_id(&mut wire, entry_id);

        let stream = decode(&mut source(&wire), StreamVariant::V3).unwrap();
        assert_eq!(stream.first_id, StreamId::new(100, 0));
        assert_eq!(stream.entries_added, 1);
        assert_eq!(stream.groups.len(), 1);

        let group = &stream.groups[0];
        assert_eq!(group.name, b"workers");
        assert_eq!(group.last_delivered, StreamId::new(100, 0));
        assert_eq!(group.entries_read, Some(1));
        assert_eq!(
            group.pending,
            vec![PendingEntry {
                id: entry_id,
                delivery_time_ms: 7777,
                delivery_count: 3,
            }]
        );

        let consumer = &group.consumers[0];
        assert_eq!(consumer.name, b"alice");
        assert_eq!(consumer.seen_time_ms, 8888);
        assert_eq!(consumer.active_time_ms, 8890);
        assert_eq!(consumer.pending, vec![entry_id]);
    }

    #[test]
    fn v2_consumer_active_time_defaults_to_seen_time() {
        let mut wire = Vec::new();
        push_len(&mut wire, 0); // no nodes
        push_len(&mut wire, 0); // length
        push_len(&mut wire, 0); // last id
        push_len(&mut wire, 0);
        push_len(&mut wire, 0); // first id
        push_len(&mut wire, 0);
        push_len(&mut wire, 0); // max deleted id
        push_len(&mut wire, 0);
        push_len(&mut wire, 0); // entries added
        push_len(&mut wire, 1); // group count
        push_str(&mut wire, b"g");
        push_len(&mut wire, 0); // last delivered
        push_len(&mut wire, 0);
        push_len(&mut wire, 0); // entries read
        push_len(&mut wire, 0); // global PEL
        push_len(&mut wire, 1); // consumers
        push_str(&mut wire, b"c");
        wire.extend_from_slice(&4242u64.to_le_bytes()); // seen time only
        push_len(&mut wire, 0); // consumer PEL

        let stream = decode(&mut source(&wire), StreamVariant::V2).unwrap();
        let consumer = &stream.groups[0].consumers[0];
        assert_eq!(consumer.seen_time_ms, 4242);
        assert_eq!(consumer.active_time_ms, 4242);
    }

    #[test]
    fn consumer_pending_id_missing_from_group_is_rejected() {
        let mut wire = Vec::new();
        push_len(&mut wire, 0);
        push_len(&mut wire, 0);
        push_len(&mut wire, 0);
        push_len(&mut wire, 0);
        push_len(&mut wire, 0);
        push_len(&mut wire, 0);
        push_len(&mut wire, 0);
        push_len(&mut wire, 0);
        push_len(&mut wire, 0);
        push_len(&mut wire, 1); // one group
        push_str(&mut wire, b"g");
        push_len(&mut wire, 0);
        push_len(&mut wire, 0);
        push_len(&mut wire, 0);
        push_len(&mut wire, 0); // empty global PEL
        push_len(&mut wire, 1);
        push_str(&mut wire, b"c");
        wire.extend_from_slice(&1u64.to_le_bytes());
        wire.extend_from_slice(&1u64.to_le_bytes());
        push_len(&mut wire, 1); // consumer claims one pending id
        push_binary_id(&mut wire, StreamId::new(1, 1));

        let err = decode(&mut source(&wire), StreamVariant::V3).unwrap_err();
        assert!(matches!(err, RdbError::Format { .. }));
    }

    #[test]
    fn node_listpack_ending_early_is_rejected() {
        // Declares two live entries but carries only one.
        let node = listpack_of(&[
            b"2", b"0", b"1", b"f", b"0",
            b"2", b"0", b"0", b"v", b"5",
        ]);
        let mut wire = Vec::new();
        push_len(&mut wire, 1);
        let mut id = Vec::new();
        push_binary_id(&mut id, StreamId::new(1, 0));
        push_str(&mut wire, &id);
        push_str(&mut wire, &node);

        let err = decode(&mut source(&wire), StreamVariant::V1).unwrap_err();
        assert!(matches!(err, RdbError::Format { .. }));
    }

    #[test]
    fn short_master_id_is_rejected() {
        let mut wire = Vec::new();
        push_len(&mut wire, 1);
        push_str(&mut wire, b"short"); // not 16 bytes
        let err = decode(&mut source(&wire), StreamVariant::V1).unwrap_err();
        assert!(matches!(err, RdbError::Format { .. }));
    }
}
