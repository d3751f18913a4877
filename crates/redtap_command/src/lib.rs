//! Typed decoding of replicated write commands.
//!
//! A replication stream carries commands as flat argument vectors: the
//! command name followed by raw byte-string arguments. [`CommandTable`] maps
//! a vector to the parser registered for its name and produces a [`Command`]
//! with every argument coerced to its proper shape, keywords resolved,
//! integers and scores parsed, option flags folded into typed fields.
//!
//! Unregistered names are not an error. [`CommandTable::parse`] returns
//! `None` for them so callers can pass the raw vector through, which keeps
//! the decoder forward compatible with commands it does not model.
//!
//! ```
//! use redtap_command::{Command, CommandTable, SetExpiry};
//!
//! let table = CommandTable::new();
//! let args: Vec<Vec<u8>> = ["SET", "greeting", "hello", "EX", "60"]
//!     .iter()
//!     .map(|part| part.as_bytes().to_vec())
//!     .collect();
//! match table.parse(&args) {
//!     Some(Ok(Command::Set { key, expiry, .. })) => {
//!         assert_eq!(key, b"greeting");
//!         assert_eq!(expiry, Some(SetExpiry::Seconds(60)));
//!     }
//!     other => panic!("unexpected parse result: {other:?}"),
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod args;
mod command;
mod error;
mod parse;
mod table;

pub use command::{
    BitFieldOp, Command, ExpireCondition, FlushMode, InsertPosition, ListEnd, Overflow,
    ScoreComparison, SetCondition, SetExpiry, StreamTrim, TrimExactness, TrimStrategy,
};
pub use error::{CommandError, CommandResult};
pub use table::CommandTable;
