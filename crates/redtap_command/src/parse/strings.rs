//! Parsers for the string command family.

use crate::args::Args;
use crate::command::{BitFieldOp, Command, Overflow, SetCondition, SetExpiry};
use crate::error::CommandResult;
use crate::parse::{set_flag, unknown_option};

pub(crate) fn set(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let value = args.next_bytes("value")?;
    let mut condition = None;
    let mut expiry = None;
    let mut keep_ttl = false;
    let mut get = false;
    while args.remaining() > 0 {
        if args.take_keyword("nx") {
            set_flag(
                args,
                &mut condition,
                SetCondition::IfAbsent,
                "NX and XX are mutually exclusive",
            )?;
        } else if args.take_keyword("xx") {
            set_flag(
                args,
                &mut condition,
                SetCondition::IfPresent,
                "NX and XX are mutually exclusive",
            )?;
        } else if args.take_keyword("get") {
            get = true;
        } else if args.take_keyword("keepttl") {
            if expiry.is_some() {
                return Err(args.malformed("KEEPTTL conflicts with an expiry option"));
            }
            keep_ttl = true;
        } else if args.take_keyword("ex") {
            let seconds = args.next_u64("EX seconds")?;
            apply_expiry(args, &mut expiry, keep_ttl, SetExpiry::Seconds(seconds))?;
        } else if args.take_keyword("px") {
            let millis = args.next_u64("PX milliseconds")?;
            apply_expiry(args, &mut expiry, keep_ttl, SetExpiry::Millis(millis))?;
        } else if args.take_keyword("exat") {
            let at = args.next_u64("EXAT timestamp")?;
            apply_expiry(args, &mut expiry, keep_ttl, SetExpiry::AtSeconds(at))?;
        } else if args.take_keyword("pxat") {
            let at = args.next_u64("PXAT timestamp")?;
            apply_expiry(args, &mut expiry, keep_ttl, SetExpiry::AtMillis(at))?;
        } else {
            return Err(unknown_option(args));
        }
    }
    Ok(Command::Set {
        key,
        value,
        condition,
        expiry,
        keep_ttl,
        get,
    })
}

/// Expiry clauses are strictly single-use, even when repeated verbatim.
fn apply_expiry(
    args: &Args<'_>,
    slot: &mut Option<SetExpiry>,
    keep_ttl: bool,
    value: SetExpiry,
) -> CommandResult<()> {
    if slot.is_some() || keep_ttl {
        return Err(args.malformed("conflicting expiry options"));
    }
    *slot = Some(value);
    Ok(())
}

pub(crate) fn setnx(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let value = args.next_bytes("value")?;
    args.expect_end()?;
    Ok(Command::SetNx { key, value })
}

pub(crate) fn setex(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let seconds = args.next_u64("seconds")?;
    let value = args.next_bytes("value")?;
    args.expect_end()?;
    Ok(Command::SetEx {
        key,
        seconds,
        value,
    })
}

pub(crate) fn psetex(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let millis = args.next_u64("milliseconds")?;
    let value = args.next_bytes("value")?;
    args.expect_end()?;
    Ok(Command::PSetEx { key, millis, value })
}

pub(crate) fn getset(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let value = args.next_bytes("value")?;
    args.expect_end()?;
    Ok(Command::GetSet { key, value })
}

pub(crate) fn getdel(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    args.expect_end()?;
    Ok(Command::GetDel { key })
}

pub(crate) fn append(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let value = args.next_bytes("value")?;
    args.expect_end()?;
    Ok(Command::Append { key, value })
}

pub(crate) fn setrange(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let offset = args.next_u64("offset")?;
    let value = args.next_bytes("value")?;
    args.expect_end()?;
    Ok(Command::SetRange { key, offset, value })
}

pub(crate) fn incr(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    args.expect_end()?;
    Ok(Command::Incr { key })
}

pub(crate) fn decr(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    args.expect_end()?;
    Ok(Command::Decr { key })
}

pub(crate) fn incrby(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let delta = args.next_i64("increment")?;
    args.expect_end()?;
    Ok(Command::IncrBy { key, delta })
}

pub(crate) fn decrby(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let delta = args.next_i64("decrement")?;
    args.expect_end()?;
    Ok(Command::DecrBy { key, delta })
}

pub(crate) fn incrbyfloat(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let delta = args.next_f64("increment")?;
    args.expect_end()?;
    Ok(Command::IncrByFloat { key, delta })
}

pub(crate) fn mset(args: &mut Args<'_>) -> CommandResult<Command> {
    let pairs = args.rest_pairs("key/value")?;
    Ok(Command::MSet { pairs })
}

pub(crate) fn msetnx(args: &mut Args<'_>) -> CommandResult<Command> {
    let pairs = args.rest_pairs("key/value")?;
    Ok(Command::MSetNx { pairs })
}

pub(crate) fn setbit(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let offset = args.next_u64("offset")?;
    let bit = match args.next_u64("bit")? {
        0 => false,
        1 => true,
        other => return Err(args.malformed(format!("bit must be 0 or 1, got {other}"))),
    };
    args.expect_end()?;
    Ok(Command::SetBit { key, offset, bit })
}

pub(crate) fn bitfield(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let mut ops = Vec::new();
    while args.remaining() > 0 {
        if args.take_keyword("get") {
            let ty = args.next_bytes("field type")?;
            let offset = args.next_bytes("field offset")?;
            ops.push(BitFieldOp::Get { ty, offset });
        } else if args.take_keyword("set") {
            let ty = args.next_bytes("field type")?;
            let offset = args.next_bytes("field offset")?;
            let value = args.next_i64("field value")?;
            ops.push(BitFieldOp::Set { ty, offset, value });
        } else if args.take_keyword("incrby") {
            let ty = args.next_bytes("field type")?;
            let offset = args.next_bytes("field offset")?;
            let delta = args.next_i64("field increment")?;
            ops.push(BitFieldOp::IncrBy { ty, offset, delta });
        } else if args.take_keyword("overflow") {
            ops.push(BitFieldOp::Overflow(overflow(args)?));
        } else {
            return Err(unknown_option(args));
        }
    }
    Ok(Command::BitField { key, ops })
}

fn overflow(args: &mut Args<'_>) -> CommandResult<Overflow> {
    if args.take_keyword("wrap") {
        Ok(Overflow::Wrap)
    } else if args.take_keyword("sat") {
        Ok(Overflow::Saturate)
    } else if args.take_keyword("fail") {
        Ok(Overflow::Fail)
    } else {
        Err(args.malformed("OVERFLOW expects WRAP, SAT, or FAIL"))
    }
}
