//! Dump command implementation.

use redtap_rdb::{decode_file, SnapshotEvent, SnapshotOptions, SnapshotSummary, Value, VecSink};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Snapshot record representation for output.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Record kind: aux, select-db, resize-hint, function or key.
    pub kind: String,
    /// Database index (key records only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<u64>,
    /// Key, lossily decoded (key records only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Value type name (key records only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// Element count for container values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<usize>,
    /// Rendered value (key records, unless suppressed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Absolute expiry in milliseconds since the epoch (if set).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at_ms: Option<u64>,
    /// Detail line for non-key records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    keys_only: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sink = VecSink::new();
    let summary = decode_file(path, SnapshotOptions::default(), &mut sink)?;
    debug!(records = sink.events.len(), keys = summary.keys, "snapshot decoded");

    let max_records = limit.unwrap_or(usize::MAX);
    let records: Vec<RecordInfo> = sink
        .events
        .iter()
        .take(max_records)
        .map(|event| describe(event, keys_only))
        .collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records, &summary);
        }
    }

    Ok(())
}

fn describe(event: &SnapshotEvent, keys_only: bool) -> RecordInfo {
    let mut record = RecordInfo {
        kind: String::new(),
        db: None,
        key: None,
        value_type: None,
        elements: None,
        value: None,
        expire_at_ms: None,
        detail: None,
    };

    match event {
        SnapshotEvent::Aux { key, value } => {
            record.kind = "aux".to_string();
            record.detail = Some(format!("{}={}", lossy(key), lossy(value)));
        }
        SnapshotEvent::SelectDb(db) => {
            record.kind = "select-db".to_string();
            record.db = Some(*db);
        }
        SnapshotEvent::ResizeHint {
            db_size,
            expires_size,
        } => {
            record.kind = "resize-hint".to_string();
            record.detail = Some(format!("{db_size} keys, {expires_size} expiring"));
        }
        SnapshotEvent::Function(body) => {
            record.kind = "function".to_string();
            record.detail = Some(format!("{} bytes", body.len()));
        }
        SnapshotEvent::KeyValue(pair) => {
            record.kind = "key".to_string();
            record.db = Some(pair.db);
            record.key = Some(lossy(&pair.key));
            record.value_type = Some(pair.value.type_name().to_string());
            record.elements = element_count(&pair.value);
            if !keys_only {
                record.value = Some(render_value(&pair.value));
            }
            record.expire_at_ms = pair.expire_at_ms;
        }
    }

    record
}

fn element_count(value: &Value) -> Option<usize> {
    match value {
        Value::String(_) => None,
        Value::List(items) | Value::Set(items) => Some(items.len()),
        Value::Hash(fields) => Some(fields.len()),
        Value::SortedSet(members) => Some(members.len()),
        Value::Stream(stream) => Some(stream.entries.len()),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(bytes) => lossy(bytes),
        Value::List(items) => {
            let rendered: Vec<String> = items.iter().map(|item| lossy(item)).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Set(members) => {
            let rendered: Vec<String> = members.iter().map(|member| lossy(member)).collect();
            format!("{{{}}}", rendered.join(", "))
        }
        Value::Hash(fields) => {
            let rendered: Vec<String> = fields
                .iter()
                .map(|(field, value)| format!("{}={}", lossy(field), lossy(value)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        Value::SortedSet(members) => {
            let rendered: Vec<String> = members
                .iter()
                .map(|scored| format!("{}:{}", lossy(&scored.member), scored.score))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        Value::Stream(stream) => format!(
            "{} entries, last id {}, {} groups",
            stream.entries.len(),
            stream.last_id,
            stream.groups.len()
        ),
    }
}

fn print_text_output(records: &[RecordInfo], summary: &SnapshotSummary) {
    println!("Snapshot Records ({} shown)", records.len());
    println!("================");
    println!();

    for record in records {
        print!("{:12}", record.kind);

        if let Some(db) = record.db {
            print!(" db={db}");
        }
        if let Some(ref key) = record.key {
            print!(" {key:?}");
        }
        if let Some(ref value_type) = record.value_type {
            print!(" type={value_type}");
        }
        if let Some(elements) = record.elements {
            print!(" elements={elements}");
        }
        if let Some(ref value) = record.value {
            print!(" = {}", clip(value, 96));
        }
        if let Some(expire) = record.expire_at_ms {
            print!(" expires={expire}");
        }
        if let Some(ref detail) = record.detail {
            print!(" {detail}");
        }

        println!();
    }

    println!();
    println!("Snapshot version: {}", summary.version);
    println!("Keys: {}", summary.keys);
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let clipped: String = text.chars().take(max).collect();
        format!("{clipped}...")
    }
}
