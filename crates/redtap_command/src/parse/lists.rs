//! Parsers for the list command family.

use crate::args::Args;
use crate::command::{Command, InsertPosition, ListEnd};
use crate::error::CommandResult;

pub(crate) fn lpush(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let elements = args.rest_nonempty("element")?;
    Ok(Command::LPush { key, elements })
}

pub(crate) fn rpush(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let elements = args.rest_nonempty("element")?;
    Ok(Command::RPush { key, elements })
}

pub(crate) fn lpushx(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let elements = args.rest_nonempty("element")?;
    Ok(Command::LPushX { key, elements })
}

pub(crate) fn rpushx(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let elements = args.rest_nonempty("element")?;
    Ok(Command::RPushX { key, elements })
}

/// `key [count]` tail shared by `LPOP` and `RPOP`.
fn pop(args: &mut Args<'_>) -> CommandResult<(Vec<u8>, Option<u64>)> {
    let key = args.next_bytes("key")?;
    let count = if args.remaining() > 0 {
        Some(args.next_u64("count")?)
    } else {
        None
    };
    args.expect_end()?;
    Ok((key, count))
}

pub(crate) fn lpop(args: &mut Args<'_>) -> CommandResult<Command> {
    let (key, count) = pop(args)?;
    Ok(Command::LPop { key, count })
}

pub(crate) fn rpop(args: &mut Args<'_>) -> CommandResult<Command> {
    let (key, count) = pop(args)?;
    Ok(Command::RPop { key, count })
}

pub(crate) fn lset(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let index = args.next_i64("index")?;
    let element = args.next_bytes("element")?;
    args.expect_end()?;
    Ok(Command::LSet {
        key,
        index,
        element,
    })
}

pub(crate) fn lrem(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let count = args.next_i64("count")?;
    let element = args.next_bytes("element")?;
    args.expect_end()?;
    Ok(Command::LRem {
        key,
        count,
        element,
    })
}

pub(crate) fn ltrim(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let start = args.next_i64("start")?;
    let stop = args.next_i64("stop")?;
    args.expect_end()?;
    Ok(Command::LTrim { key, start, stop })
}

pub(crate) fn linsert(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let position = if args.take_keyword("before") {
        InsertPosition::Before
    } else if args.take_keyword("after") {
        InsertPosition::After
    } else {
        return Err(args.malformed("expected BEFORE or AFTER"));
    };
    let pivot = args.next_bytes("pivot")?;
    let element = args.next_bytes("element")?;
    args.expect_end()?;
    Ok(Command::LInsert {
        key,
        position,
        pivot,
        element,
    })
}

pub(crate) fn rpoplpush(args: &mut Args<'_>) -> CommandResult<Command> {
    let source = args.next_bytes("source")?;
    let destination = args.next_bytes("destination")?;
    args.expect_end()?;
    Ok(Command::RPopLPush {
        source,
        destination,
    })
}

pub(crate) fn brpoplpush(args: &mut Args<'_>) -> CommandResult<Command> {
    let source = args.next_bytes("source")?;
    let destination = args.next_bytes("destination")?;
    let timeout = args.next_f64("timeout")?;
    args.expect_end()?;
    Ok(Command::BRPopLPush {
        source,
        destination,
        timeout,
    })
}

fn list_end(args: &mut Args<'_>, what: &str) -> CommandResult<ListEnd> {
    if args.take_keyword("left") {
        Ok(ListEnd::Left)
    } else if args.take_keyword("right") {
        Ok(ListEnd::Right)
    } else {
        Err(args.malformed(format!("{what} must be LEFT or RIGHT")))
    }
}

pub(crate) fn lmove(args: &mut Args<'_>) -> CommandResult<Command> {
    let source = args.next_bytes("source")?;
    let destination = args.next_bytes("destination")?;
    let from = list_end(args, "source end")?;
    let to = list_end(args, "destination end")?;
    args.expect_end()?;
    Ok(Command::LMove {
        source,
        destination,
        from,
        to,
    })
}
