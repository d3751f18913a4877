//! Cursor over a command's argument list.
//!
//! Parsers consume arguments front to back; every accessor produces a
//! [`CommandError::Malformed`] naming the command when the list is too short
//! or an argument fails to coerce, so parsing never panics on hostile input.

use redtap_rdb::convert;

use crate::error::{CommandError, CommandResult};

/// Forward cursor over the arguments following a command name.
#[derive(Debug)]
pub(crate) struct Args<'a> {
    command: &'a str,
    items: &'a [Vec<u8>],
    pos: usize,
}

impl<'a> Args<'a> {
    pub(crate) fn new(command: &'a str, items: &'a [Vec<u8>]) -> Self {
        Self {
            command,
            items,
            pos: 0,
        }
    }

    /// Builds a malformed-command error carrying this command's name.
    pub(crate) fn malformed(&self, message: impl Into<String>) -> CommandError {
        CommandError::malformed(self.command, message)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.items.len() - self.pos
    }

    /// The next argument without consuming it.
    pub(crate) fn peek(&self) -> Option<&'a [u8]> {
        self.items.get(self.pos).map(Vec::as_slice)
    }

    /// Consumes the next argument.
    pub(crate) fn next_bytes(&mut self, what: &str) -> CommandResult<Vec<u8>> {
        let item = self
            .items
            .get(self.pos)
            .ok_or_else(|| self.malformed(format!("missing {what}")))?;
        self.pos += 1;
        Ok(item.clone())
    }

    pub(crate) fn next_i64(&mut self, what: &str) -> CommandResult<i64> {
        let bytes = self.next_bytes(what)?;
        convert::to_i64(&bytes)
            .ok_or_else(|| self.malformed(format!("{what} is not an integer")))
    }

    pub(crate) fn next_u64(&mut self, what: &str) -> CommandResult<u64> {
        let bytes = self.next_bytes(what)?;
        convert::to_u64(&bytes)
            .ok_or_else(|| self.malformed(format!("{what} is not a non-negative integer")))
    }

    pub(crate) fn next_f64(&mut self, what: &str) -> CommandResult<f64> {
        let bytes = self.next_bytes(what)?;
        convert::to_f64(&bytes)
            .ok_or_else(|| self.malformed(format!("{what} is not a number")))
    }

    /// Consumes the next argument if it equals `keyword` ASCII
    /// case-insensitively.
    pub(crate) fn take_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(arg) if arg.eq_ignore_ascii_case(keyword.as_bytes()) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Drains all remaining arguments.
    pub(crate) fn rest(&mut self) -> Vec<Vec<u8>> {
        let rest = self.items[self.pos..].to_vec();
        self.pos = self.items.len();
        rest
    }

    /// Drains all remaining arguments, requiring at least one.
    pub(crate) fn rest_nonempty(&mut self, what: &str) -> CommandResult<Vec<Vec<u8>>> {
        if self.remaining() == 0 {
            return Err(self.malformed(format!("missing {what}")));
        }
        Ok(self.rest())
    }

    /// Drains the remaining arguments as pairs, requiring at least one pair
    /// and an even count.
    pub(crate) fn rest_pairs(&mut self, what: &str) -> CommandResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let rest = self.rest_nonempty(what)?;
        if rest.len() % 2 != 0 {
            return Err(self.malformed(format!("unpaired {what}")));
        }
        let mut out = Vec::with_capacity(rest.len() / 2);
        let mut rest = rest.into_iter();
        while let (Some(a), Some(b)) = (rest.next(), rest.next()) {
            out.push((a, b));
        }
        Ok(out)
    }

    /// Rejects any unconsumed arguments.
    pub(crate) fn expect_end(&self) -> CommandResult<()> {
        if self.remaining() != 0 {
            return Err(self.malformed(format!(
                "{} unexpected trailing arguments",
                self.remaining()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(words: &[&str]) -> Vec<Vec<u8>> {
        words.iter().map(|w| w.as_bytes().to_vec()).collect()
    }

    #[test]
    fn consumes_in_order() {
        let list = items(&["key", "10", "-3", "2.5"]);
        let mut args = Args::new("test", &list);
        assert_eq!(args.next_bytes("key").unwrap(), b"key");
        assert_eq!(args.next_u64("count").unwrap(), 10);
        assert_eq!(args.next_i64("delta").unwrap(), -3);
        assert_eq!(args.next_f64("score").unwrap(), 2.5);
        args.expect_end().unwrap();
    }

    #[test]
    fn missing_argument_names_the_command() {
        let list = items(&[]);
        let mut args = Args::new("expire", &list);
        let err = args.next_bytes("key").unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed expire command: missing key"
        );
    }

    #[test]
    fn bad_integer_is_malformed() {
        let list = items(&["abc"]);
        let mut args = Args::new("incrby", &list);
        assert!(args.next_i64("delta").is_err());
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let list = items(&["Px", "100"]);
        let mut args = Args::new("set", &list);
        assert!(!args.take_keyword("ex"));
        assert!(args.take_keyword("px"));
        assert_eq!(args.next_u64("ttl").unwrap(), 100);
    }

    #[test]
    fn rest_pairs_requires_even_count() {
        let list = items(&["f1", "v1", "f2"]);
        let mut args = Args::new("hset", &list);
        assert!(args.rest_pairs("field/value").is_err());
    }

    #[test]
    fn trailing_arguments_are_rejected() {
        let list = items(&["key", "extra"]);
        let mut args = Args::new("persist", &list);
        args.next_bytes("key").unwrap();
        assert!(args.expect_end().is_err());
    }
}
