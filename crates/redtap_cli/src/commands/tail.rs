//! Tail command implementation.

use redtap_command::Command;
use redtap_rdb::SnapshotEvent;
use redtap_replica::{
    Auth, Event, EventListener, ReplicaConfig, ReplicaResult, Replicator, RetryConfig,
};
use serde_json::json;
use tracing::debug;

/// Listener that prints every event to stdout.
struct Printer {
    json: bool,
    skip_snapshot: bool,
}

impl EventListener for Printer {
    fn on_event(&mut self, event: Event) -> ReplicaResult<()> {
        if self.skip_snapshot && matches!(event, Event::Snapshot(_)) {
            return Ok(());
        }
        if self.json {
            println!("{}", render_json(&event));
        } else {
            println!("{}", render_text(&event));
        }
        Ok(())
    }
}

/// Runs the tail command. Blocks until the link is lost for good.
pub fn run(
    address: &str,
    auth: Option<&str>,
    port: Option<u16>,
    retries: Option<u32>,
    skip_snapshot: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ReplicaConfig::new(address);
    if let Some(auth) = auth {
        config = config.with_auth(parse_auth(auth));
    }
    if let Some(port) = port {
        config = config.with_listening_port(port);
    }
    if let Some(retries) = retries {
        config = config.with_retry(RetryConfig::new(retries));
    }
    debug!(%address, "attaching to source");

    let mut printer = Printer {
        json: format == "json",
        skip_snapshot,
    };
    let mut replicator = Replicator::new(config);
    replicator.run(&mut printer)?;
    Ok(())
}

fn parse_auth(auth: &str) -> Auth {
    match auth.split_once(':') {
        Some((username, password)) => Auth::user(username, password),
        None => Auth::password(auth),
    }
}

fn render_text(event: &Event) -> String {
    match event {
        Event::FullSyncStart {
            replication_id,
            offset,
        } => format!("full sync from {replication_id} at offset {offset}"),
        Event::FullSyncEnd {
            checksum: Some(value),
        } => format!("snapshot complete, checksum {value:016x}"),
        Event::FullSyncEnd { checksum: None } => "snapshot complete".to_string(),
        Event::Snapshot(record) => snapshot_text(record),
        Event::Command(command) => format!("command {}", command_text(command)),
        Event::UnknownCommand { args } => {
            format!("unknown command {:?}", name_of(args))
        }
        Event::CommandError { args, message } => {
            format!("rejected {:?}: {message}", name_of(args))
        }
        Event::Ping => "ping".to_string(),
    }
}

fn command_text(command: &Command) -> String {
    match command {
        Command::Set { key, value, .. } => {
            format!("set {:?} ({} bytes)", lossy(key), value.len())
        }
        Command::Del { keys } => format!("del ({} keys)", keys.len()),
        Command::Select { db } => format!("select {db}"),
        Command::Expire { key, seconds, .. } => {
            format!("expire {:?} {seconds}", lossy(key))
        }
        other => other.name().to_string(),
    }
}

fn snapshot_text(record: &SnapshotEvent) -> String {
    match record {
        SnapshotEvent::Aux { key, value } => {
            format!("aux {}={}", lossy(key), lossy(value))
        }
        SnapshotEvent::SelectDb(db) => format!("select db {db}"),
        SnapshotEvent::ResizeHint {
            db_size,
            expires_size,
        } => format!("resize hint, {db_size} keys ({expires_size} expiring)"),
        SnapshotEvent::Function(body) => format!("function library, {} bytes", body.len()),
        SnapshotEvent::KeyValue(pair) => {
            let mut line = format!(
                "db{} {} {:?}",
                pair.db,
                pair.value.type_name(),
                lossy(&pair.key)
            );
            if let Some(expire) = pair.expire_at_ms {
                line.push_str(&format!(" (expires {expire})"));
            }
            line
        }
    }
}

fn render_json(event: &Event) -> serde_json::Value {
    match event {
        Event::FullSyncStart {
            replication_id,
            offset,
        } => json!({
            "type": "full-sync-start",
            "replication_id": replication_id,
            "offset": offset,
        }),
        Event::FullSyncEnd { checksum } => json!({
            "type": "full-sync-end",
            "checksum": checksum,
        }),
        Event::Snapshot(record) => snapshot_json(record),
        Event::Command(command) => json!({
            "type": "command",
            "name": command.name(),
        }),
        Event::UnknownCommand { args } => json!({
            "type": "unknown-command",
            "name": name_of(args),
            "args": args.len().saturating_sub(1),
        }),
        Event::CommandError { args, message } => json!({
            "type": "rejected-command",
            "name": name_of(args),
            "message": message,
        }),
        Event::Ping => json!({ "type": "ping" }),
    }
}

fn snapshot_json(record: &SnapshotEvent) -> serde_json::Value {
    match record {
        SnapshotEvent::Aux { key, value } => json!({
            "type": "snapshot",
            "kind": "aux",
            "key": lossy(key),
            "value": lossy(value),
        }),
        SnapshotEvent::SelectDb(db) => json!({
            "type": "snapshot",
            "kind": "select-db",
            "db": db,
        }),
        SnapshotEvent::ResizeHint {
            db_size,
            expires_size,
        } => json!({
            "type": "snapshot",
            "kind": "resize-hint",
            "keys": db_size,
            "expiring": expires_size,
        }),
        SnapshotEvent::Function(body) => json!({
            "type": "snapshot",
            "kind": "function",
            "bytes": body.len(),
        }),
        SnapshotEvent::KeyValue(pair) => json!({
            "type": "snapshot",
            "kind": "key",
            "db": pair.db,
            "key": lossy(&pair.key),
            "value_type": pair.value.type_name(),
            "expire_at_ms": pair.expire_at_ms,
        }),
    }
}

fn name_of(args: &[Vec<u8>]) -> String {
    args.first().map(|name| lossy(name)).unwrap_or_default()
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
