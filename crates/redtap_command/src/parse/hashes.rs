//! Parsers for the hash command family.

use crate::args::Args;
use crate::command::Command;
use crate::error::CommandResult;

/// Shared by `HSET` and its deprecated `HMSET` spelling.
pub(crate) fn hset(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let fields = args.rest_pairs("field/value")?;
    Ok(Command::HSet { key, fields })
}

pub(crate) fn hsetnx(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let field = args.next_bytes("field")?;
    let value = args.next_bytes("value")?;
    args.expect_end()?;
    Ok(Command::HSetNx { key, field, value })
}

pub(crate) fn hdel(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let fields = args.rest_nonempty("field")?;
    Ok(Command::HDel { key, fields })
}

pub(crate) fn hincrby(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let field = args.next_bytes("field")?;
    let delta = args.next_i64("increment")?;
    args.expect_end()?;
    Ok(Command::HIncrBy { key, field, delta })
}

pub(crate) fn hincrbyfloat(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let field = args.next_bytes("field")?;
    let delta = args.next_f64("increment")?;
    args.expect_end()?;
    Ok(Command::HIncrByFloat { key, field, delta })
}
