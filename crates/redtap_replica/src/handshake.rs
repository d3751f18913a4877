//! The command exchange that precedes synchronization.

use std::io::{Read, Write};

use tracing::{debug, warn};

use redtap_source::ByteSource;

use crate::config::{ReplicaConfig, ResumePoint};
use crate::error::{ReplicaError, ReplicaResult};
use crate::resp::{self, Reply};

/// The source's answer to a sync request.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncDecision {
    /// A snapshot follows, opening the given history.
    Full {
        /// Replication id of the new history.
        replication_id: String,
        /// Offset at which the history starts.
        offset: u64,
    },
    /// The live stream resumes at the requested position. The source may
    /// announce a renamed history for the same data.
    Partial {
        /// Replacement replication id, when the source announces one.
        replication_id: Option<String>,
    },
}

/// Runs the handshake commands, up to but not including the sync request.
pub fn run<R: Read, W: Write>(
    src: &mut ByteSource<R>,
    out: &mut W,
    config: &ReplicaConfig,
) -> ReplicaResult<()> {
    if let Some(auth) = &config.auth {
        let reply = match &auth.username {
            Some(user) => exchange(
                src,
                out,
                &[b"AUTH", user.as_bytes(), auth.password.as_bytes()],
            )?,
            None => exchange(src, out, &[b"AUTH", auth.password.as_bytes()])?,
        };
        match reply {
            Reply::Simple(_) => {}
            Reply::Error(message) => {
                return Err(ReplicaError::protocol(format!(
                    "authentication rejected: {message}"
                )));
            }
            other => return Err(unexpected("AUTH", &other)),
        }
    }

    match exchange(src, out, &[b"PING"])? {
        Reply::Simple(answer) if answer.eq_ignore_ascii_case("pong") => {}
        Reply::Error(message) => {
            return Err(ReplicaError::protocol(format!("PING rejected: {message}")));
        }
        other => return Err(unexpected("PING", &other)),
    }

    if let Some(port) = config.listening_port {
        let port = port.to_string();
        replconf(src, out, &[b"REPLCONF", b"listening-port", port.as_bytes()])?;
    }
    replconf(src, out, &[b"REPLCONF", b"capa", b"eof", b"capa", b"psync2"])?;

    debug!("handshake complete");
    Ok(())
}

/// Requests synchronization, resuming from `resume` when one is given.
pub fn request_sync<R: Read, W: Write>(
    src: &mut ByteSource<R>,
    out: &mut W,
    resume: Option<&ResumePoint>,
) -> ReplicaResult<SyncDecision> {
    let requested_partial = resume.is_some();
    match resume {
        Some(point) => {
            // The requested offset is one past the last byte applied.
            let offset = (point.offset + 1).to_string();
            resp::write_command(
                out,
                &[b"PSYNC", point.replication_id.as_bytes(), offset.as_bytes()],
            )?;
        }
        None => resp::write_command(out, &[b"PSYNC", b"?", b"-1"])?,
    }

    let line = match resp::read_reply(src)? {
        Reply::Simple(line) => line,
        Reply::Error(message) => {
            return Err(ReplicaError::protocol(format!(
                "sync request rejected: {message}"
            )));
        }
        other => return Err(unexpected("PSYNC", &other)),
    };
    debug!(%line, "sync decision received");
    parse_decision(&line, requested_partial)
}

fn parse_decision(line: &str, requested_partial: bool) -> ReplicaResult<SyncDecision> {
    let mut words = line.split_ascii_whitespace();
    match words.next() {
        Some(word) if word.eq_ignore_ascii_case("FULLRESYNC") => {
            let id = words
                .next()
                .ok_or_else(|| ReplicaError::protocol("FULLRESYNC is missing the replication id"))?;
            let offset = words
                .next()
                .and_then(|word| word.parse().ok())
                .ok_or_else(|| ReplicaError::protocol("FULLRESYNC is missing the offset"))?;
            Ok(SyncDecision::Full {
                replication_id: id.to_string(),
                offset,
            })
        }
        Some(word) if word.eq_ignore_ascii_case("CONTINUE") => {
            if !requested_partial {
                return Err(ReplicaError::protocol(
                    "source answered CONTINUE to a full resync request",
                ));
            }
            Ok(SyncDecision::Partial {
                replication_id: words.next().map(str::to_string),
            })
        }
        _ => Err(ReplicaError::protocol(format!(
            "unrecognized sync decision: {line:?}"
        ))),
    }
}

fn exchange<R: Read, W: Write>(
    src: &mut ByteSource<R>,
    out: &mut W,
    args: &[&[u8]],
) -> ReplicaResult<Reply> {
    resp::write_command(out, args)?;
    resp::read_reply(src)
}

/// Sends a REPLCONF option, tolerating sources that do not know it.
fn replconf<R: Read, W: Write>(
    src: &mut ByteSource<R>,
    out: &mut W,
    args: &[&[u8]],
) -> ReplicaResult<()> {
    match exchange(src, out, args)? {
        Reply::Simple(_) => Ok(()),
        Reply::Error(message) => {
            warn!(%message, "source rejected a REPLCONF option");
            Ok(())
        }
        other => Err(unexpected("REPLCONF", &other)),
    }
}

fn unexpected(command: &str, reply: &Reply) -> ReplicaError {
    ReplicaError::protocol(format!("unexpected reply to {command}: {reply:?}"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::config::Auth;

    use super::*;

    fn source(bytes: &[u8]) -> ByteSource<Cursor<Vec<u8>>> {
        ByteSource::new(Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn handshake_sends_the_expected_commands() {
        let mut src = source(b"+OK\r\n+PONG\r\n+OK\r\n+OK\r\n");
        let mut out = Vec::new();
        let config = ReplicaConfig::new("src:6379")
            .with_auth(Auth::user("tap", "secret"))
            .with_listening_port(7000);

        run(&mut src, &mut out, &config).unwrap();

        let expected: Vec<u8> = [
            &b"*3\r\n$4\r\nAUTH\r\n$3\r\ntap\r\n$6\r\nsecret\r\n"[..],
            b"*1\r\n$4\r\nPING\r\n",
            b"*3\r\n$8\r\nREPLCONF\r\n$14\r\nlistening-port\r\n$4\r\n7000\r\n",
            b"*5\r\n$8\r\nREPLCONF\r\n$4\r\ncapa\r\n$3\r\neof\r\n$4\r\ncapa\r\n$6\r\npsync2\r\n",
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn handshake_without_auth_or_port_is_two_commands() {
        let mut src = source(b"+PONG\r\n+OK\r\n");
        let mut out = Vec::new();
        run(&mut src, &mut out, &ReplicaConfig::new("src:6379")).unwrap();
        let expected: Vec<u8> = [
            &b"*1\r\n$4\r\nPING\r\n"[..],
            b"*5\r\n$8\r\nREPLCONF\r\n$4\r\ncapa\r\n$3\r\neof\r\n$4\r\ncapa\r\n$6\r\npsync2\r\n",
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn rejected_ping_fails_the_handshake() {
        let mut src = source(b"-NOAUTH Authentication required.\r\n");
        let mut out = Vec::new();
        let err = run(&mut src, &mut out, &ReplicaConfig::new("src:6379")).unwrap_err();
        assert!(err.to_string().contains("PING rejected"));
    }

    #[test]
    fn rejected_replconf_option_is_tolerated() {
        let mut src = source(b"+PONG\r\n-ERR Unrecognized REPLCONF option\r\n");
        let mut out = Vec::new();
        run(&mut src, &mut out, &ReplicaConfig::new("src:6379")).unwrap();
    }

    #[test]
    fn fresh_sync_requests_everything() {
        let mut src = source(b"+FULLRESYNC 8de23c68c0c453954e4f8d05ab9a1e5a3bf0378e 1042\r\n");
        let mut out = Vec::new();
        let decision = request_sync(&mut src, &mut out, None).unwrap();
        assert_eq!(out, b"*3\r\n$5\r\nPSYNC\r\n$1\r\n?\r\n$2\r\n-1\r\n");
        assert_eq!(
            decision,
            SyncDecision::Full {
                replication_id: "8de23c68c0c453954e4f8d05ab9a1e5a3bf0378e".into(),
                offset: 1042,
            }
        );
    }

    #[test]
    fn resumed_sync_requests_the_next_byte() {
        let mut src = source(b"+CONTINUE\r\n");
        let mut out = Vec::new();
        let resume = ResumePoint::new("abc123", 41);
        let decision = request_sync(&mut src, &mut out, Some(&resume)).unwrap();
        assert_eq!(out, b"*3\r\n$5\r\nPSYNC\r\n$6\r\nabc123\r\n$2\r\n42\r\n");
        assert_eq!(
            decision,
            SyncDecision::Partial {
                replication_id: None
            }
        );
    }

    #[test]
    fn continue_may_announce_a_renamed_history() {
        let mut src = source(b"+CONTINUE f00dfeed\r\n");
        let mut out = Vec::new();
        let resume = ResumePoint::new("abc123", 0);
        let decision = request_sync(&mut src, &mut out, Some(&resume)).unwrap();
        assert_eq!(
            decision,
            SyncDecision::Partial {
                replication_id: Some("f00dfeed".into())
            }
        );
    }

    #[test]
    fn continue_without_a_requested_resume_is_rejected() {
        let mut src = source(b"+CONTINUE\r\n");
        let mut out = Vec::new();
        let err = request_sync(&mut src, &mut out, None).unwrap_err();
        assert!(matches!(err, ReplicaError::Protocol { .. }));
    }

    #[test]
    fn unknown_decision_lines_are_rejected() {
        let mut src = source(b"+RESYNCISH maybe\r\n");
        let mut out = Vec::new();
        let err = request_sync(&mut src, &mut out, None).unwrap_err();
        assert!(err.to_string().contains("unrecognized sync decision"));
    }
}
