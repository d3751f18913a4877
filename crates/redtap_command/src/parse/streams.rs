//! Parsers for the stream command family.

use crate::args::Args;
use crate::command::{Command, StreamTrim, TrimExactness, TrimStrategy};
use crate::error::CommandResult;
use crate::parse::unknown_option;

pub(crate) fn xadd(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let mut no_mk_stream = false;
    let mut trim = None;
    loop {
        if args.take_keyword("nomkstream") {
            no_mk_stream = true;
        } else if args.take_keyword("maxlen") {
            read_trim(args, &mut trim, TrimStrategy::MaxLen)?;
        } else if args.take_keyword("minid") {
            read_trim(args, &mut trim, TrimStrategy::MinId)?;
        } else {
            break;
        }
    }
    let id = args.next_bytes("entry id")?;
    let fields = args.rest_pairs("field/value")?;
    Ok(Command::XAdd {
        key,
        no_mk_stream,
        trim,
        id,
        fields,
    })
}

/// `[=|~] threshold [LIMIT count]` following a trim strategy keyword.
fn read_trim(
    args: &mut Args<'_>,
    slot: &mut Option<StreamTrim>,
    strategy: TrimStrategy,
) -> CommandResult<()> {
    if slot.is_some() {
        return Err(args.malformed("duplicate trim strategy"));
    }
    let exactness = if args.take_keyword("=") {
        Some(TrimExactness::Exact)
    } else if args.take_keyword("~") {
        Some(TrimExactness::Approximate)
    } else {
        None
    };
    let threshold = args.next_bytes("trim threshold")?;
    let limit = if args.take_keyword("limit") {
        Some(args.next_u64("trim limit")?)
    } else {
        None
    };
    if limit.is_some() && exactness != Some(TrimExactness::Approximate) {
        return Err(args.malformed("LIMIT requires approximate trimming (~)"));
    }
    *slot = Some(StreamTrim {
        strategy,
        exactness,
        threshold,
        limit,
    });
    Ok(())
}

pub(crate) fn xdel(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let ids = args.rest_nonempty("entry id")?;
    Ok(Command::XDel { key, ids })
}

pub(crate) fn xsetid(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let id = args.next_bytes("last id")?;
    let mut entries_added = None;
    let mut max_deleted_id = None;
    while args.remaining() > 0 {
        if args.take_keyword("entriesadded") {
            entries_added = Some(args.next_u64("entries added")?);
        } else if args.take_keyword("maxdeletedid") {
            max_deleted_id = Some(args.next_bytes("max deleted id")?);
        } else {
            return Err(unknown_option(args));
        }
    }
    Ok(Command::XSetId {
        key,
        id,
        entries_added,
        max_deleted_id,
    })
}
