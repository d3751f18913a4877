//! Parsers for generic key management commands.

use crate::args::Args;
use crate::command::{Command, ExpireCondition};
use crate::error::CommandResult;
use crate::parse::unknown_option;

pub(crate) fn del(args: &mut Args<'_>) -> CommandResult<Command> {
    let keys = args.rest_nonempty("key")?;
    Ok(Command::Del { keys })
}

pub(crate) fn unlink(args: &mut Args<'_>) -> CommandResult<Command> {
    let keys = args.rest_nonempty("key")?;
    Ok(Command::Unlink { keys })
}

/// Optional `NX`/`XX`/`GT`/`LT` tail shared by the expire commands.
fn expire_condition(args: &mut Args<'_>) -> CommandResult<Option<ExpireCondition>> {
    let condition = if args.take_keyword("nx") {
        Some(ExpireCondition::IfNone)
    } else if args.take_keyword("xx") {
        Some(ExpireCondition::IfSet)
    } else if args.take_keyword("gt") {
        Some(ExpireCondition::IfGreater)
    } else if args.take_keyword("lt") {
        Some(ExpireCondition::IfLess)
    } else {
        None
    };
    args.expect_end()?;
    Ok(condition)
}

pub(crate) fn expire(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let seconds = args.next_i64("seconds")?;
    let condition = expire_condition(args)?;
    Ok(Command::Expire {
        key,
        seconds,
        condition,
    })
}

pub(crate) fn pexpire(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let millis = args.next_i64("milliseconds")?;
    let condition = expire_condition(args)?;
    Ok(Command::PExpire {
        key,
        millis,
        condition,
    })
}

pub(crate) fn expireat(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let at_seconds = args.next_i64("timestamp")?;
    let condition = expire_condition(args)?;
    Ok(Command::ExpireAt {
        key,
        at_seconds,
        condition,
    })
}

pub(crate) fn pexpireat(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let at_millis = args.next_i64("timestamp")?;
    let condition = expire_condition(args)?;
    Ok(Command::PExpireAt {
        key,
        at_millis,
        condition,
    })
}

pub(crate) fn persist(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    args.expect_end()?;
    Ok(Command::Persist { key })
}

pub(crate) fn rename(args: &mut Args<'_>) -> CommandResult<Command> {
    let source = args.next_bytes("source")?;
    let destination = args.next_bytes("destination")?;
    args.expect_end()?;
    Ok(Command::Rename {
        source,
        destination,
    })
}

pub(crate) fn renamenx(args: &mut Args<'_>) -> CommandResult<Command> {
    let source = args.next_bytes("source")?;
    let destination = args.next_bytes("destination")?;
    args.expect_end()?;
    Ok(Command::RenameNx {
        source,
        destination,
    })
}

pub(crate) fn move_key(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let db = args.next_u64("db index")?;
    args.expect_end()?;
    Ok(Command::Move { key, db })
}

pub(crate) fn copy(args: &mut Args<'_>) -> CommandResult<Command> {
    let source = args.next_bytes("source")?;
    let destination = args.next_bytes("destination")?;
    let mut destination_db = None;
    let mut replace = false;
    while args.remaining() > 0 {
        if args.take_keyword("db") {
            let db = args.next_u64("destination db")?;
            if destination_db.replace(db).is_some() {
                return Err(args.malformed("duplicate DB option"));
            }
        } else if args.take_keyword("replace") {
            replace = true;
        } else {
            return Err(unknown_option(args));
        }
    }
    Ok(Command::Copy {
        source,
        destination,
        destination_db,
        replace,
    })
}

pub(crate) fn restore(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let ttl_ms = args.next_u64("ttl")?;
    let payload = args.next_bytes("serialized value")?;
    let mut replace = false;
    let mut absolute_ttl = false;
    let mut idle_time = None;
    let mut freq = None;
    while args.remaining() > 0 {
        if args.take_keyword("replace") {
            replace = true;
        } else if args.take_keyword("absttl") {
            absolute_ttl = true;
        } else if args.take_keyword("idletime") {
            idle_time = Some(args.next_u64("idle time")?);
        } else if args.take_keyword("freq") {
            let value = args.next_u64("frequency")?;
            let value = u8::try_from(value)
                .map_err(|_| args.malformed("frequency must be between 0 and 255"))?;
            freq = Some(value);
        } else {
            return Err(unknown_option(args));
        }
    }
    Ok(Command::Restore {
        key,
        ttl_ms,
        payload,
        replace,
        absolute_ttl,
        idle_time,
        freq,
    })
}
