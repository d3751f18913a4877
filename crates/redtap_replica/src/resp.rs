//! Minimal reader and writer for the source's wire dialogue.
//!
//! Only the shapes the replication dialogue uses are supported: simple
//! strings, errors, integers, bulk strings, and arrays. Replicated
//! requests are always arrays of non-null bulk strings; replies to the
//! handshake commands may take any shape.

use std::io::{Read, Write};

use redtap_source::{ByteSource, SourceError};

use crate::error::{ReplicaError, ReplicaResult};

/// Longest accepted line, terminator excluded.
const MAX_LINE: usize = 4096;
/// Largest accepted bulk payload, 512 MiB.
const MAX_BULK: i64 = 512 * 1024 * 1024;
/// Most elements accepted in one array.
const MAX_ARRAY: i64 = 1024 * 1024;
/// Deepest accepted array nesting.
const MAX_DEPTH: u32 = 32;

/// One reply from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `+` line.
    Simple(String),
    /// `-` line.
    Error(String),
    /// `:` line.
    Integer(i64),
    /// `$` payload, `None` for the null bulk.
    Bulk(Option<Vec<u8>>),
    /// `*` sequence, `None` for the null array.
    Array(Option<Vec<Reply>>),
}

/// Reads one reply of any supported shape.
pub fn read_reply<R: Read>(src: &mut ByteSource<R>) -> ReplicaResult<Reply> {
    read_reply_at(src, 0)
}

fn read_reply_at<R: Read>(src: &mut ByteSource<R>, depth: u32) -> ReplicaResult<Reply> {
    if depth > MAX_DEPTH {
        return Err(ReplicaError::protocol("reply nests too deeply"));
    }
    match src.read_u8()? {
        b'+' => Ok(Reply::Simple(read_line(src)?)),
        b'-' => Ok(Reply::Error(read_line(src)?)),
        b':' => Ok(Reply::Integer(read_integer_line(src)?)),
        b'$' => {
            let len = read_integer_line(src)?;
            if len == -1 {
                return Ok(Reply::Bulk(None));
            }
            Ok(Reply::Bulk(Some(read_bulk_payload(src, len)?)))
        }
        b'*' => {
            let count = read_integer_line(src)?;
            if count == -1 {
                return Ok(Reply::Array(None));
            }
            if !(0..=MAX_ARRAY).contains(&count) {
                return Err(ReplicaError::protocol(format!(
                    "array length {count} is out of range"
                )));
            }
            let mut items = Vec::with_capacity(count.min(64) as usize);
            for _ in 0..count {
                items.push(read_reply_at(src, depth + 1)?);
            }
            Ok(Reply::Array(Some(items)))
        }
        other => Err(ReplicaError::protocol(format!(
            "unexpected reply type byte 0x{other:02x}"
        ))),
    }
}

/// Reads one replicated request, an array of non-null bulk strings.
pub fn read_request<R: Read>(src: &mut ByteSource<R>) -> ReplicaResult<Vec<Vec<u8>>> {
    let kind = src.read_u8()?;
    if kind != b'*' {
        return Err(ReplicaError::protocol(format!(
            "expected a request array, got type byte 0x{kind:02x}"
        )));
    }
    let count = read_integer_line(src)?;
    if !(0..=MAX_ARRAY).contains(&count) {
        return Err(ReplicaError::protocol(format!(
            "request length {count} is out of range"
        )));
    }
    let mut args = Vec::with_capacity(count.min(64) as usize);
    for _ in 0..count {
        let kind = src.read_u8()?;
        if kind != b'$' {
            return Err(ReplicaError::protocol(format!(
                "expected a bulk argument, got type byte 0x{kind:02x}"
            )));
        }
        let len = read_integer_line(src)?;
        if len < 0 {
            return Err(ReplicaError::protocol("request argument is a null bulk"));
        }
        args.push(read_bulk_payload(src, len)?);
    }
    Ok(args)
}

/// Reads a CRLF-terminated line, returning it without the terminator.
///
/// A bare LF also terminates, matching sources that thin their keepalive
/// traffic down to single newlines.
pub fn read_line<R: Read>(src: &mut ByteSource<R>) -> ReplicaResult<String> {
    let mut line = Vec::new();
    loop {
        let byte = src.read_u8()?;
        if byte == b'\n' {
            break;
        }
        if line.len() >= MAX_LINE {
            return Err(ReplicaError::protocol("line exceeds the length limit"));
        }
        line.push(byte);
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line).map_err(|_| ReplicaError::protocol("line is not valid UTF-8"))
}

fn read_integer_line<R: Read>(src: &mut ByteSource<R>) -> ReplicaResult<i64> {
    let line = read_line(src)?;
    line.parse()
        .map_err(|_| ReplicaError::protocol(format!("expected an integer, got {line:?}")))
}

fn read_bulk_payload<R: Read>(src: &mut ByteSource<R>, len: i64) -> ReplicaResult<Vec<u8>> {
    if !(0..=MAX_BULK).contains(&len) {
        return Err(ReplicaError::protocol(format!(
            "bulk length {len} is out of range"
        )));
    }
    let payload = src.read_bytes(len as usize)?;
    expect_crlf(src)?;
    Ok(payload)
}

fn expect_crlf<R: Read>(src: &mut ByteSource<R>) -> ReplicaResult<()> {
    let mut terminator = [0u8; 2];
    src.read_exact(&mut terminator)?;
    if terminator != *b"\r\n" {
        return Err(ReplicaError::protocol("missing CRLF terminator"));
    }
    Ok(())
}

/// Writes one command as an array of bulk strings and flushes.
pub fn write_command<W: Write>(out: &mut W, args: &[&[u8]]) -> ReplicaResult<()> {
    let mut frame = Vec::new();
    frame.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        frame.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        frame.extend_from_slice(arg);
        frame.extend_from_slice(b"\r\n");
    }
    out.write_all(&frame).map_err(SourceError::from)?;
    out.flush().map_err(SourceError::from)?;
    Ok(())
}
