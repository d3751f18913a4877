//! # Redtap Source
//!
//! Buffered byte-source primitives shared by the snapshot decoder and the
//! replication session.
//!
//! This crate provides the lowest-level reading abstraction for redtap.
//! A [`ByteSource`] wraps any blocking [`std::io::Read`] (a file, a socket,
//! an in-memory slice) and layers on top of it:
//!
//! - a reusable fill buffer with peeking and exact-count reads
//! - a running count of bytes consumed ([`ByteSource::tell`])
//! - a transparent incremental CRC-64 over consumed bytes ([`Crc64`])
//! - an optional passive tee of the raw inbound bytes ([`RawByteSink`])
//! - cooperative cancellation inside blocking fills ([`CancelToken`])
//!
//! There is exactly one reader per source; nothing in this crate locks.
//!
//! ## Example
//!
//! ```rust
//! use redtap_source::ByteSource;
//!
//! let mut src = ByteSource::new(&b"hello"[..]);
//! assert_eq!(src.peek_u8().unwrap(), b'h');
//! let bytes = src.read_bytes(5).unwrap();
//! assert_eq!(&bytes, b"hello");
//! assert_eq!(src.tell(), 5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod checksum;
mod error;
mod source;

pub use cancel::CancelToken;
pub use checksum::{crc64, Crc64};
pub use error::{SourceError, SourceResult};
pub use source::{ByteSource, RawByteSink, DEFAULT_BUFFER_SIZE};
