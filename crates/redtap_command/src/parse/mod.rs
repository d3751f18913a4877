//! Family-grouped argument parsers registered in
//! [`CommandTable`](crate::CommandTable).

pub(crate) mod hashes;
pub(crate) mod keys;
pub(crate) mod lists;
pub(crate) mod server;
pub(crate) mod sets;
pub(crate) mod sorted_sets;
pub(crate) mod streams;
pub(crate) mod strings;

use crate::args::Args;
use crate::error::{CommandError, CommandResult};

/// Error for an option token no branch of a parser recognized.
pub(crate) fn unknown_option(args: &Args<'_>) -> CommandError {
    match args.peek() {
        Some(token) => {
            let token = String::from_utf8_lossy(token).into_owned();
            args.malformed(format!("unexpected option {token}"))
        }
        None => args.malformed("truncated options"),
    }
}

/// Stores a flag value in `slot`. Repeating the same flag is harmless,
/// switching to a different value of the same group is a syntax error.
pub(crate) fn set_flag<T: Copy + PartialEq>(
    args: &Args<'_>,
    slot: &mut Option<T>,
    value: T,
    conflict: &str,
) -> CommandResult<()> {
    match *slot {
        Some(existing) if existing != value => Err(args.malformed(conflict)),
        _ => {
            *slot = Some(value);
            Ok(())
        }
    }
}
