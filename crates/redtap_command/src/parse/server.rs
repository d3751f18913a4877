//! Parsers for server, connection, and transaction commands.

use crate::args::Args;
use crate::command::{Command, FlushMode};
use crate::error::CommandResult;

pub(crate) fn select(args: &mut Args<'_>) -> CommandResult<Command> {
    let db = args.next_u64("db index")?;
    args.expect_end()?;
    Ok(Command::Select { db })
}

pub(crate) fn swapdb(args: &mut Args<'_>) -> CommandResult<Command> {
    let first = args.next_u64("first db index")?;
    let second = args.next_u64("second db index")?;
    args.expect_end()?;
    Ok(Command::SwapDb { first, second })
}

fn flush_mode(args: &mut Args<'_>) -> CommandResult<Option<FlushMode>> {
    let mode = if args.take_keyword("async") {
        Some(FlushMode::Async)
    } else if args.take_keyword("sync") {
        Some(FlushMode::Sync)
    } else {
        None
    };
    args.expect_end()?;
    Ok(mode)
}

pub(crate) fn flushdb(args: &mut Args<'_>) -> CommandResult<Command> {
    let mode = flush_mode(args)?;
    Ok(Command::FlushDb { mode })
}

pub(crate) fn flushall(args: &mut Args<'_>) -> CommandResult<Command> {
    let mode = flush_mode(args)?;
    Ok(Command::FlushAll { mode })
}

pub(crate) fn ping(args: &mut Args<'_>) -> CommandResult<Command> {
    let message = if args.remaining() > 0 {
        Some(args.next_bytes("message")?)
    } else {
        None
    };
    args.expect_end()?;
    Ok(Command::Ping { message })
}

pub(crate) fn publish(args: &mut Args<'_>) -> CommandResult<Command> {
    let channel = args.next_bytes("channel")?;
    let message = args.next_bytes("message")?;
    args.expect_end()?;
    Ok(Command::Publish { channel, message })
}

pub(crate) fn multi(args: &mut Args<'_>) -> CommandResult<Command> {
    args.expect_end()?;
    Ok(Command::Multi)
}

pub(crate) fn exec(args: &mut Args<'_>) -> CommandResult<Command> {
    args.expect_end()?;
    Ok(Command::Exec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommandTable;

    fn parse(parts: &[&str]) -> CommandResult<Command> {
        let argv: Vec<Vec<u8>> = parts.iter().map(|p| p.as_bytes().to_vec()).collect();
        CommandTable::new()
            .parse(&argv)
            .expect("command is registered")
    }

    #[test]
    fn select_and_swapdb_take_indexes() {
        assert_eq!(parse(&["SELECT", "2"]).unwrap(), Command::Select { db: 2 });
        assert!(parse(&["SELECT", "two"]).is_err());
        assert_eq!(
            parse(&["SWAPDB", "0", "1"]).unwrap(),
            Command::SwapDb {
                first: 0,
                second: 1,
            }
        );
    }

    #[test]
    fn flush_modes() {
        assert_eq!(parse(&["FLUSHDB"]).unwrap(), Command::FlushDb { mode: None });
        assert_eq!(
            parse(&["FLUSHDB", "ASYNC"]).unwrap(),
            Command::FlushDb {
                mode: Some(FlushMode::Async),
            }
        );
        assert_eq!(
            parse(&["FLUSHALL", "sync"]).unwrap(),
            Command::FlushAll {
                mode: Some(FlushMode::Sync),
            }
        );
        assert!(parse(&["FLUSHALL", "LATER"]).is_err());
    }

    #[test]
    fn ping_message_is_optional() {
        assert_eq!(parse(&["PING"]).unwrap(), Command::Ping { message: None });
        assert_eq!(
            parse(&["PING", "hello"]).unwrap(),
            Command::Ping {
                message: Some(b"hello".to_vec()),
            }
        );
        assert!(parse(&["PING", "a", "b"]).is_err());
    }

    #[test]
    fn publish_names_a_channel() {
        assert_eq!(
            parse(&["PUBLISH", "news", "hi"]).unwrap(),
            Command::Publish {
                channel: b"news".to_vec(),
                message: b"hi".to_vec(),
            }
        );
        assert!(parse(&["PUBLISH", "news"]).is_err());
    }

    #[test]
    fn transaction_markers_take_no_arguments() {
        assert_eq!(parse(&["MULTI"]).unwrap(), Command::Multi);
        assert_eq!(parse(&["EXEC"]).unwrap(), Command::Exec);
        assert!(parse(&["MULTI", "now"]).is_err());
    }
}
