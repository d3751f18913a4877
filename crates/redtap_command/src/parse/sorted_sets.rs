//! Parsers for the sorted set command family.

use redtap_rdb::{convert, ScoredMember};

use crate::args::Args;
use crate::command::{Command, ScoreComparison, SetCondition};
use crate::error::CommandResult;
use crate::parse::set_flag;

pub(crate) fn zadd(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let mut condition = None;
    let mut comparison = None;
    let mut changed = false;
    let mut increment = false;
    loop {
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
        } else if args.take_keyword("gt") {
            set_flag(
                args,
                &mut comparison,
                ScoreComparison::Greater,
                "GT and LT are mutually exclusive",
            )?;
        } else if args.take_keyword("lt") {
            set_flag(
                args,
                &mut comparison,
                ScoreComparison::Less,
                "GT and LT are mutually exclusive",
            )?;
        } else if args.take_keyword("ch") {
            changed = true;
        } else if args.take_keyword("incr") {
            increment = true;
        } else {
            break;
        }
    }
    if condition == Some(SetCondition::IfAbsent) && comparison.is_some() {
        return Err(args.malformed("GT and LT are not compatible with NX"));
    }
    let pairs = args.rest_pairs("score/member")?;
    if increment && pairs.len() != 1 {
        return Err(args.malformed("INCR takes a single score/member pair"));
    }
    let mut members = Vec::with_capacity(pairs.len());
    for (score, member) in pairs {
        let score =
            convert::to_f64(&score).ok_or_else(|| args.malformed("score is not a number"))?;
        members.push(ScoredMember { member, score });
    }
    Ok(Command::ZAdd {
        key,
        condition,
        comparison,
        changed,
        increment,
        members,
    })
}

pub(crate) fn zincrby(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let delta = args.next_f64("increment")?;
    let member = args.next_bytes("member")?;
    args.expect_end()?;
    Ok(Command::ZIncrBy { key, delta, member })
}

pub(crate) fn zrem(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let members = args.rest_nonempty("member")?;
    Ok(Command::ZRem { key, members })
}

pub(crate) fn zremrangebyrank(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let start = args.next_i64("start")?;
    let stop = args.next_i64("stop")?;
    args.expect_end()?;
    Ok(Command::ZRemRangeByRank { key, start, stop })
}

/// Score ranges keep their wire spelling, `(` exclusivity and infinities
/// included, so consumers can apply their own range semantics.
pub(crate) fn zremrangebyscore(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let min = args.next_bytes("min")?;
    let max = args.next_bytes("max")?;
    args.expect_end()?;
    Ok(Command::ZRemRangeByScore { key, min, max })
}

pub(crate) fn zremrangebylex(args: &mut Args<'_>) -> CommandResult<Command> {
    let key = args.next_bytes("key")?;
    let min = args.next_bytes("min")?;
    let max = args.next_bytes("max")?;
    args.expect_end()?;
    Ok(Command::ZRemRangeByLex { key, min, max })
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
    fn zadd_collects_scored_members() {
        let cmd = parse(&["ZADD", "z", "1.5", "a", "-2", "b"]).unwrap();
        assert_eq!(
            cmd,
            Command::ZAdd {
                key: b"z".to_vec(),
                condition: None,
                comparison: None,
                changed: false,
                increment: false,
                members: vec![
                    ScoredMember {
                        member: b"a".to_vec(),
                        score: 1.5,
                    },
                    ScoredMember {
                        member: b"b".to_vec(),
                        score: -2.0,
                    },
                ],
            }
        );
    }

    #[test]
    fn zadd_flags() {
        let cmd = parse(&["ZADD", "z", "XX", "GT", "CH", "5", "m"]).unwrap();
        let Command::ZAdd {
            condition,
            comparison,
            changed,
            increment,
            ..
        } = cmd
        else {
            panic!("expected ZADD");
        };
        assert_eq!(condition, Some(SetCondition::IfPresent));
        assert_eq!(comparison, Some(ScoreComparison::Greater));
        assert!(changed);
        assert!(!increment);
    }

    #[test]
    fn zadd_rejects_conflicting_flags() {
        assert!(parse(&["ZADD", "z", "NX", "XX", "1", "m"]).is_err());
        assert!(parse(&["ZADD", "z", "GT", "LT", "1", "m"]).is_err());
        assert!(parse(&["ZADD", "z", "NX", "GT", "1", "m"]).is_err());
        // GT combines with XX.
        parse(&["ZADD", "z", "XX", "GT", "1", "m"]).unwrap();
    }

    #[test]
    fn zadd_incr_takes_one_pair() {
        parse(&["ZADD", "z", "INCR", "1", "m"]).unwrap();
        assert!(parse(&["ZADD", "z", "INCR", "1", "a", "2", "b"]).is_err());
    }

    #[test]
    fn zadd_rejects_bad_scores_and_odd_tails() {
        assert!(parse(&["ZADD", "z", "high", "m"]).is_err());
        assert!(parse(&["ZADD", "z", "1", "a", "2"]).is_err());
        assert!(parse(&["ZADD", "z"]).is_err());
    }

    #[test]
    fn zadd_member_that_looks_like_a_flag() {
        // Flags are only taken before the first score token.
        let cmd = parse(&["ZADD", "z", "5", "nx"]).unwrap();
        let Command::ZAdd {
            condition, members, ..
        } = cmd
        else {
            panic!("expected ZADD");
        };
        assert_eq!(condition, None);
        assert_eq!(members[0].member, b"nx".to_vec());
    }

    #[test]
    fn zincrby_parses_the_delta() {
        assert_eq!(
            parse(&["ZINCRBY", "z", "-1.5", "m"]).unwrap(),
            Command::ZIncrBy {
                key: b"z".to_vec(),
                delta: -1.5,
                member: b"m".to_vec(),
            }
        );
    }

    #[test]
    fn range_removals() {
        assert_eq!(
            parse(&["ZREMRANGEBYRANK", "z", "0", "-1"]).unwrap(),
            Command::ZRemRangeByRank {
                key: b"z".to_vec(),
                start: 0,
                stop: -1,
            }
        );
        assert_eq!(
            parse(&["ZREMRANGEBYSCORE", "z", "(1.5", "+inf"]).unwrap(),
            Command::ZRemRangeByScore {
                key: b"z".to_vec(),
                min: b"(1.5".to_vec(),
                max: b"+inf".to_vec(),
            }
        );
        assert_eq!(
            parse(&["ZREMRANGEBYLEX", "z", "[a", "(c"]).unwrap(),
            Command::ZRemRangeByLex {
                key: b"z".to_vec(),
                min: b"[a".to_vec(),
                max: b"(c".to_vec(),
            }
        );
        assert!(parse(&["ZREM", "z"]).is_err());
    }
}
