//! Byte scripts for the source side of a replication session.
//!
//! A [`SourceScript`] concatenates, in order, everything a source would
//! send over one connection: handshake replies, the sync decision line,
//! the snapshot transfer, and replicated requests. Feeding the finished
//! script to a session through an in-memory reader exercises the whole
//! dialogue without a socket.

/// Builds the inbound byte stream for a scripted session.
#[derive(Debug, Clone, Default)]
pub struct SourceScript {
    bytes: Vec<u8>,
}

impl SourceScript {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies that satisfy the default handshake: `PONG` for the ping
    /// and one acknowledgement for the capability announcement.
    pub fn handshake() -> Self {
        Self::new().simple("PONG").simple("OK")
    }

    /// Appends a simple-string reply line.
    #[must_use]
    pub fn simple(mut self, line: &str) -> Self {
        self.bytes.extend_from_slice(format!("+{line}\r\n").as_bytes());
        self
    }

    /// Appends an error reply line.
    #[must_use]
    pub fn error(mut self, line: &str) -> Self {
        self.bytes.extend_from_slice(format!("-{line}\r\n").as_bytes());
        self
    }

    /// Appends an integer reply.
    #[must_use]
    pub fn integer(mut self, value: i64) -> Self {
        self.bytes.extend_from_slice(format!(":{value}\r\n").as_bytes());
        self
    }

    /// Appends a bulk-string reply.
    #[must_use]
    pub fn bulk(mut self, payload: &[u8]) -> Self {
        self.bytes
            .extend_from_slice(format!("${}\r\n", payload.len()).as_bytes());
        self.bytes.extend_from_slice(payload);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    /// Appends a replicated request as an array of bulk strings.
    #[must_use]
    pub fn request(mut self, args: &[&[u8]]) -> Self {
        self.bytes
            .extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
        for arg in args {
            self.bytes
                .extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
            self.bytes.extend_from_slice(arg);
            self.bytes.extend_from_slice(b"\r\n");
        }
        self
    }

    /// Appends a bare newline keepalive.
    #[must_use]
    pub fn keepalive(mut self) -> Self {
        self.bytes.push(b'\n');
        self
    }

    /// Appends a disk-backed snapshot transfer: length header, then the
    /// dump with no trailing terminator.
    #[must_use]
    pub fn snapshot_sized(mut self, dump: &[u8]) -> Self {
        self.bytes
            .extend_from_slice(format!("${}\r\n", dump.len()).as_bytes());
        self.bytes.extend_from_slice(dump);
        self
    }

    /// Appends a diskless snapshot transfer: `EOF:` header, the dump, and
    /// the token repeated as the terminator.
    #[must_use]
    pub fn snapshot_diskless(mut self, token: &str, dump: &[u8]) -> Self {
        self.bytes
            .extend_from_slice(format!("$EOF:{token}\r\n").as_bytes());
        self.bytes.extend_from_slice(dump);
        self.bytes.extend_from_slice(token.as_bytes());
        self
    }

    /// Appends raw bytes verbatim.
    #[must_use]
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Returns the assembled byte stream.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_encode_with_their_type_bytes() {
        let script = SourceScript::new()
            .simple("OK")
            .error("ERR nope")
            .integer(-3)
            .bulk(b"hi")
            .finish();
        assert_eq!(script, b"+OK\r\n-ERR nope\r\n:-3\r\n$2\r\nhi\r\n");
    }

    #[test]
    fn requests_encode_as_bulk_arrays() {
        let script = SourceScript::new()
            .request(&[b"SET", b"k", b"v"])
            .finish();
        assert_eq!(script, b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n");
    }

    #[test]
    fn sized_snapshots_have_no_trailing_terminator() {
        let script = SourceScript::new().snapshot_sized(b"DUMP").finish();
        assert_eq!(script, b"$4\r\nDUMP");
    }

    #[test]
    fn diskless_snapshots_repeat_the_token() {
        let token = "t".repeat(40);
        let script = SourceScript::new()
            .snapshot_diskless(&token, b"DUMP")
            .finish();
        let mut expected = format!("$EOF:{token}\r\n").into_bytes();
        expected.extend_from_slice(b"DUMP");
        expected.extend_from_slice(token.as_bytes());
        assert_eq!(script, expected);
    }

    #[test]
    fn handshake_replies_cover_ping_and_capa() {
        assert_eq!(SourceScript::handshake().finish(), b"+PONG\r\n+OK\r\n");
    }
}
