//! Name-driven dispatch from raw argument vectors to typed commands.

use std::collections::HashMap;

use crate::args::Args;
use crate::error::CommandResult;
use crate::parse;
use crate::Command;

type ParseFn = fn(&mut Args<'_>) -> CommandResult<Command>;

/// Registry of command parsers keyed by lowercase wire name.
///
/// The table owns the mapping from a command's name to the function that
/// decodes its argument vector. Lookups are case-insensitive; names arriving
/// in any mix of cases resolve to the same parser.
pub struct CommandTable {
    entries: HashMap<&'static str, ParseFn>,
}

impl CommandTable {
    /// Builds the table with every supported command registered.
    #[must_use]
    pub fn new() -> Self {
        let mut entries: HashMap<&'static str, ParseFn> = HashMap::new();

        // Strings.
        entries.insert("set", parse::strings::set);
        entries.insert("setnx", parse::strings::setnx);
        entries.insert("setex", parse::strings::setex);
        entries.insert("psetex", parse::strings::psetex);
        entries.insert("getset", parse::strings::getset);
        entries.insert("getdel", parse::strings::getdel);
        entries.insert("append", parse::strings::append);
        entries.insert("setrange", parse::strings::setrange);
        entries.insert("incr", parse::strings::incr);
        entries.insert("decr", parse::strings::decr);
        entries.insert("incrby", parse::strings::incrby);
        entries.insert("decrby", parse::strings::decrby);
        entries.insert("incrbyfloat", parse::strings::incrbyfloat);
        entries.insert("mset", parse::strings::mset);
        entries.insert("msetnx", parse::strings::msetnx);
        entries.insert("setbit", parse::strings::setbit);
        entries.insert("bitfield", parse::strings::bitfield);

        // Keys.
        entries.insert("del", parse::keys::del);
        entries.insert("unlink", parse::keys::unlink);
        entries.insert("expire", parse::keys::expire);
        entries.insert("pexpire", parse::keys::pexpire);
        entries.insert("expireat", parse::keys::expireat);
        entries.insert("pexpireat", parse::keys::pexpireat);
        entries.insert("persist", parse::keys::persist);
        entries.insert("rename", parse::keys::rename);
        entries.insert("renamenx", parse::keys::renamenx);
        entries.insert("move", parse::keys::move_key);
        entries.insert("copy", parse::keys::copy);
        entries.insert("restore", parse::keys::restore);

        // Lists.
        entries.insert("lpush", parse::lists::lpush);
        entries.insert("rpush", parse::lists::rpush);
        entries.insert("lpushx", parse::lists::lpushx);
        entries.insert("rpushx", parse::lists::rpushx);
        entries.insert("lpop", parse::lists::lpop);
        entries.insert("rpop", parse::lists::rpop);
        entries.insert("lset", parse::lists::lset);
        entries.insert("lrem", parse::lists::lrem);
        entries.insert("ltrim", parse::lists::ltrim);
        entries.insert("linsert", parse::lists::linsert);
        entries.insert("rpoplpush", parse::lists::rpoplpush);
        entries.insert("brpoplpush", parse::lists::brpoplpush);
        entries.insert("lmove", parse::lists::lmove);

        // Sets.
        entries.insert("sadd", parse::sets::sadd);
        entries.insert("srem", parse::sets::srem);
        entries.insert("smove", parse::sets::smove);
        entries.insert("spop", parse::sets::spop);
        entries.insert("sdiffstore", parse::sets::sdiffstore);
        entries.insert("sinterstore", parse::sets::sinterstore);
        entries.insert("sunionstore", parse::sets::sunionstore);

        // Hashes. HMSET is a deprecated spelling of HSET with the same
        // replication semantics, so both names share one parser.
        entries.insert("hset", parse::hashes::hset);
        entries.insert("hmset", parse::hashes::hset);
        entries.insert("hsetnx", parse::hashes::hsetnx);
        entries.insert("hdel", parse::hashes::hdel);
        entries.insert("hincrby", parse::hashes::hincrby);
        entries.insert("hincrbyfloat", parse::hashes::hincrbyfloat);

        // Sorted sets.
        entries.insert("zadd", parse::sorted_sets::zadd);
        entries.insert("zincrby", parse::sorted_sets::zincrby);
        entries.insert("zrem", parse::sorted_sets::zrem);
        entries.insert("zremrangebyrank", parse::sorted_sets::zremrangebyrank);
        entries.insert("zremrangebyscore", parse::sorted_sets::zremrangebyscore);
        entries.insert("zremrangebylex", parse::sorted_sets::zremrangebylex);

        // Streams.
        entries.insert("xadd", parse::streams::xadd);
        entries.insert("xdel", parse::streams::xdel);
        entries.insert("xsetid", parse::streams::xsetid);

        // Server and connection.
        entries.insert("select", parse::server::select);
        entries.insert("swapdb", parse::server::swapdb);
        entries.insert("flushdb", parse::server::flushdb);
        entries.insert("flushall", parse::server::flushall);
        entries.insert("ping", parse::server::ping);
        entries.insert("publish", parse::server::publish);
        entries.insert("multi", parse::server::multi);
        entries.insert("exec", parse::server::exec);

        Self { entries }
    }

    /// Number of registered command names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty. Always false for a built table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` resolves to a registered parser.
    #[must_use]
    pub fn contains(&self, name: &[u8]) -> bool {
        lowercase_name(name)
            .map(|name| self.entries.contains_key(name.as_str()))
            .unwrap_or(false)
    }

    /// Decodes a raw argument vector into a typed [`Command`].
    ///
    /// `args[0]` is the command name, the rest are its arguments. Returns
    /// `None` when the name is not registered, so callers can surface the
    /// raw vector instead of failing. Registered names yield `Some`: either
    /// the decoded command or the [`CommandError`](crate::CommandError)
    /// describing why its arguments were rejected.
    pub fn parse(&self, args: &[Vec<u8>]) -> Option<CommandResult<Command>> {
        let name = args.first()?;
        let lowered = lowercase_name(name)?;
        let (canonical, parser) = self.entries.get_key_value(lowered.as_str())?;
        let mut cursor = Args::new(canonical, &args[1..]);
        Some(parser(&mut cursor))
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercases an ASCII command name, rejecting non-UTF-8 input outright.
/// Command names are ASCII on the wire, so anything else cannot match.
fn lowercase_name(name: &[u8]) -> Option<String> {
    let name = std::str::from_utf8(name).ok()?;
    Some(name.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<Vec<u8>> {
        parts.iter().map(|p| p.as_bytes().to_vec()).collect()
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let table = CommandTable::new();
        let upper = table.parse(&argv(&["SET", "k", "v"])).unwrap().unwrap();
        let lower = table.parse(&argv(&["set", "k", "v"])).unwrap().unwrap();
        let mixed = table.parse(&argv(&["SeT", "k", "v"])).unwrap().unwrap();
        assert_eq!(upper, lower);
        assert_eq!(lower, mixed);
    }

    #[test]
    fn unknown_command_returns_none() {
        let table = CommandTable::new();
        assert!(table.parse(&argv(&["object", "encoding", "k"])).is_none());
        assert!(table.parse(&argv(&["get", "k"])).is_none());
        assert!(table.parse(&[]).is_none());
    }

    #[test]
    fn non_utf8_name_returns_none() {
        let table = CommandTable::new();
        let args = vec![vec![0xff, 0xfe], b"k".to_vec()];
        assert!(table.parse(&args).is_none());
    }

    #[test]
    fn registered_name_with_bad_args_is_some_err() {
        let table = CommandTable::new();
        let result = table.parse(&argv(&["set", "k"])).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn contains_matches_registration() {
        let table = CommandTable::new();
        assert!(table.contains(b"SET"));
        assert!(table.contains(b"hmset"));
        assert!(!table.contains(b"get"));
        assert!(!table.contains(&[0xff][..]));
    }

    #[test]
    fn deprecated_spelling_shares_parser() {
        let table = CommandTable::new();
        let hset = table
            .parse(&argv(&["hset", "h", "f", "v"]))
            .unwrap()
            .unwrap();
        let hmset = table
            .parse(&argv(&["HMSET", "h", "f", "v"]))
            .unwrap()
            .unwrap();
        assert_eq!(hset, hmset);
    }

    #[test]
    fn table_registers_every_family() {
        let table = CommandTable::new();
        assert!(!table.is_empty());
        // One spot check per family.
        for name in [
            "set", "del", "lpush", "sadd", "hset", "zadd", "xadd", "select",
        ] {
            assert!(table.contains(name.as_bytes()), "missing {name}");
        }
        assert_eq!(table.len(), 72);
    }
}
