//! Versioned encoding of the session record
//!
//! Stored blobs are wrapped in `{"schemaVersion": N, "record": {...}}`.
//! Blobs without the wrapper are version 0: the bare legacy record, whose
//! readers used to spread stored fields over defaults.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::record::SessionRecord;
use crate::{Error, Result};

/// Schema version written by this build
pub const CURRENT_SCHEMA_VERSION: u64 = 1;

const VERSION_KEY: &str = "schemaVersion";
const RECORD_KEY: &str = "record";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a> {
    schema_version: u64,
    record: &'a SessionRecord,
}

/// Serialize a record at the current schema version
pub fn encode(record: &SessionRecord) -> Result<String> {
    let envelope = EnvelopeRef {
        schema_version: CURRENT_SCHEMA_VERSION,
        record,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parse a stored blob of any known version into the current record shape
pub fn decode(raw: &str) -> Result<SessionRecord> {
    let value: Value = serde_json::from_str(raw)?;
    let (version, record) = split_envelope(value)?;
    let upgraded = migrate(version, record)?;
    Ok(serde_json::from_value(upgraded)?)
}

fn split_envelope(value: Value) -> Result<(u64, Value)> {
    let Value::Object(mut map) = value else {
        return Err(Error::Serialization(
            "session blob is not a JSON object".to_string(),
        ));
    };

    match map.get(VERSION_KEY) {
        None => Ok((0, Value::Object(map))),
        Some(version) => {
            let version = version.as_u64().ok_or_else(|| {
                Error::Serialization(format!("{} must be an unsigned integer", VERSION_KEY))
            })?;
            let record = map
                .remove(RECORD_KEY)
                .ok_or_else(|| Error::Serialization("envelope has no record".to_string()))?;
            Ok((version, record))
        }
    }
}

/// Upgrade `record` from `version` to [`CURRENT_SCHEMA_VERSION`] one step at
/// a time.
pub fn migrate(mut version: u64, mut record: Value) -> Result<Value> {
    loop {
        match version {
            CURRENT_SCHEMA_VERSION => return Ok(record),
            0 => {
                debug!("Migrating session record from v0 to v1");
                record = migrate_v0_to_v1(record)?;
                version = 1;
            }
            other => {
                return Err(Error::Serialization(format!(
                    "unsupported session schema version {} (this build reads up to {})",
                    other, CURRENT_SCHEMA_VERSION
                )))
            }
        }
    }
}

/// v0 stored the record bare, allowed `null` anywhere, and used epoch
/// milliseconds for timestamps. Nested entries (the user, uploads, payments
/// and downloads) may lack the ids and dates added later; those are filled in.
fn migrate_v0_to_v1(legacy: Value) -> Result<Value> {
    let mut legacy = legacy;
    strip_nulls(&mut legacy);

    let mut merged = serde_json::to_value(SessionRecord::default())?;
    spread(&mut merged, legacy);

    let now = Utc::now();
    if let Some(state) = merged.get_mut("userState") {
        if let Some(Value::Object(user)) = state.get_mut("user") {
            fill_id(user);
            fill_stamp(user, "joinedAt", now);
        }
        if let Some(usage) = state.get_mut("questionUsage").and_then(Value::as_array_mut) {
            for stamp in usage.iter_mut() {
                normalize_timestamp(stamp);
            }
        }
        if let Some(history) = state.get_mut("uploadHistory").and_then(Value::as_array_mut) {
            for entry in history.iter_mut() {
                if let Value::Object(upload) = entry {
                    fill_upload(upload, now);
                }
            }
        }
        for list in ["paymentHistory", "downloadHistory"] {
            if let Some(entries) = state.get_mut(list).and_then(Value::as_array_mut) {
                for entry in entries.iter_mut() {
                    if let Value::Object(fields) = entry {
                        fill_id(fields);
                        fill_stamp(fields, "date", now);
                    }
                }
            }
        }
    }

    if let Some(Value::Object(file)) = merged.get_mut("currentFile") {
        fill_upload(file, now);
    }

    Ok(merged)
}

/// Shallow spread of legacy fields over defaults, one level deep for
/// `userState`.
fn spread(base: &mut Value, overlay: Value) {
    let (Value::Object(base_map), Value::Object(overlay_map)) = (base, overlay) else {
        return;
    };
    for (key, value) in overlay_map {
        if let Value::Object(fields) = value {
            if key == "userState" {
                if let Some(Value::Object(existing)) = base_map.get_mut(&key) {
                    existing.extend(fields);
                    continue;
                }
            }
            base_map.insert(key, Value::Object(fields));
        } else {
            base_map.insert(key, value);
        }
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for v in map.values_mut() {
                strip_nulls(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                strip_nulls(v);
            }
        }
        _ => {}
    }
}

fn normalize_timestamp(value: &mut Value) {
    let millis = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    };
    if let Some(stamp) = millis.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
        *value = Value::String(stamp.to_rfc3339());
    }
}

fn fill_id(entry: &mut Map<String, Value>) {
    if !entry.contains_key("id") {
        entry.insert(
            "id".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
    }
}

/// Normalize `key` when present, otherwise stamp it with `now`
fn fill_stamp(entry: &mut Map<String, Value>, key: &str, now: DateTime<Utc>) {
    match entry.get_mut(key) {
        Some(stamp) => normalize_timestamp(stamp),
        None => {
            entry.insert(key.to_string(), Value::String(now.to_rfc3339()));
        }
    }
}

/// Upload entries written before ids and sizes were tracked
fn fill_upload(file: &mut Map<String, Value>, now: DateTime<Utc>) {
    fill_id(file);
    fill_stamp(file, "date", now);
    if !file.contains_key("size") {
        let size = file
            .get("content")
            .and_then(Value::as_str)
            .map(|c| c.len() as u64)
            .unwrap_or(0);
        file.insert("size".to_string(), Value::from(size));
    }
}
