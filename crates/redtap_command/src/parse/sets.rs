//! Parsers for the set command family.

use crate::args::Args;
use crate::command::Command;
use crate::error::CommandResult;

pub(crate) fn sadd(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let members = args.rest_nonempty("member")?;
    Ok(Command::SAdd { key, members })
}

pub(crate) fn srem(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let members = args.rest_nonempty("member")?;
    Ok(Command::SRem { key, members })
}

pub(crate) fn smove(args: &mut Args<'_>) -> CommandResult<Command> {
    let source = args.next_bytes("source")?;
    let destination = args.next_bytes("destination")?;
    let member = args.next_bytes("member")?;
    args.expect_end()?;
    Ok(Command::SMove {
        source,
        destination,
        member,
    })
}

pub(crate) fn spop(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let count = if args.remaining() > 0 {
        Some(args.next_u64("count")?)
    } else {
        None
    };
    args.expect_end()?;
    Ok(Command::SPop { key, count })
}

pub(crate) fn sdiffstore(args: &mut Args<'_>) -> CommandResult<Command> {
    let destination = args.next_bytes("destination")?;
    let keys = args.rest_nonempty("key")?;
    Ok(Command::SDiffStore { destination, keys })
}

pub(crate) fn sinterstore(args: &mut Args<'_>) -> CommandResult<Command> {
    let destination = args.next_bytes("destination")?;
    let keys = args.rest_nonempty("key")?;
    Ok(Command::SInterStore { destination, keys })
}

pub(crate) fn sunionstore(args: &mut Args<'_>) -> CommandResult<Command> {
    let destination = args.next_bytes("destination")?;
    let keys = args.rest_nonempty("key")?;
    Ok(Command::SUnionStore { destination, keys })
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
    fn membership_updates_require_members() {
        assert_eq!(
            parse(&["SADD", "s", "a", "b"]).unwrap(),
            Command::SAdd {
                key: b"s".to_vec(),
                members: vec![b"a".to_vec(), b"b".to_vec()],
            }
        );
        assert!(parse(&["SREM", "s"]).is_err());
    }

    #[test]
    fn smove_names_both_sets() {
        assert_eq!(
            parse(&["SMOVE", "src", "dst", "m"]).unwrap(),
            Command::SMove {
                source: b"src".to_vec(),
                destination: b"dst".to_vec(),
                member: b"m".to_vec(),
            }
        );
        assert!(parse(&["SMOVE", "src", "dst"]).is_err());
    }

    #[test]
    fn spop_count_is_optional() {
        assert_eq!(
            parse(&["SPOP", "s"]).unwrap(),
            Command::SPop {
                key: b"s".to_vec(),
                count: None,
            }
        );
        assert_eq!(
            parse(&["SPOP", "s", "2"]).unwrap(),
            Command::SPop {
                key: b"s".to_vec(),
                count: Some(2),
            }
        );
        assert!(parse(&["SPOP", "s", "-1"]).is_err());
    }

    #[test]
    fn store_variants_take_a_destination_then_keys() {
        assert_eq!(
            parse(&["SINTERSTORE", "out", "a", "b"]).unwrap(),
            Command::SInterStore {
                destination: b"out".to_vec(),
                keys: vec![b"a".to_vec(), b"b".to_vec()],
            }
        );
        assert_eq!(
            parse(&["SUNIONSTORE", "out", "a"]).unwrap(),
            Command::SUnionStore {
                destination: b"out".to_vec(),
                keys: vec![b"a".to_vec()],
            }
        );
        assert!(parse(&["SDIFFSTORE", "out"]).is_err());
    }
}
