//! record.rs
//! The immutable log record and its two wire serializations.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::level::Level;

const MAX_CATEGORY_LEN: usize = 50;
const MAX_MESSAGE_LEN: usize = 5_000;
const MESSAGE_TRUNCATION_SUFFIX: &str = "… [truncated]";

/// One structured log event. Immutable after construction; `context` has already
/// passed through `context::sanitize` by the time a `Record` holds it.
#[derive(Debug, Clone)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub category: String,
    pub message: String,
    pub context: Option<Map<String, Value>>,
    pub session_id: String,
    pub sequence_number: u64,
}

impl Record {
    pub fn new(
        timestamp: DateTime<Utc>,
        level: Level,
        category: &str,
        message: &str,
        context: Option<Map<String, Value>>,
        session_id: String,
        sequence_number: u64,
    ) -> Self {
        Record {
            timestamp,
            level,
            category: normalize_category(category),
            message: normalize_message(message),
            context,
            session_id,
            sequence_number,
        }
    }

    /// Canonical full wire map: `{timestamp, level, category, message, context?, sessionId?, seq?}`.
    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("timestamp".to_string(), Value::String(iso8601_ms(&self.timestamp)));
        map.insert("level".to_string(), Value::String(self.level.name().to_string()));
        map.insert("category".to_string(), Value::String(self.category.clone()));
        map.insert("message".to_string(), Value::String(self.message.clone()));
        if let Some(ctx) = &self.context {
            if !ctx.is_empty() {
                map.insert("context".to_string(), Value::Object(ctx.clone()));
            }
        }
        map.insert("sessionId".to_string(), Value::String(self.session_id.clone()));
        map.insert("seq".to_string(), Value::Number(self.sequence_number.into()));
        Value::Object(map)
    }

    /// Compact wire map with short keys: `{t, l, c, m, x?, s?, n?}`.
    pub fn to_compact_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("t".to_string(), Value::Number(self.timestamp.timestamp_millis().into()));
        map.insert("l".to_string(), Value::Number(self.level.numeric().into()));
        map.insert("c".to_string(), Value::String(self.category.clone()));
        map.insert("m".to_string(), Value::String(self.message.clone()));
        if let Some(ctx) = &self.context {
            if !ctx.is_empty() {
                map.insert("x".to_string(), Value::Object(ctx.clone()));
            }
        }
        map.insert("s".to_string(), Value::String(self.session_id.clone()));
        map.insert("n".to_string(), Value::Number(self.sequence_number.into()));
        Value::Object(map)
    }

    /// Parses a full wire object. Tolerant to an unknown `level` (defaults to
    /// `Info`) and to missing optional keys.
    pub fn from_wire(value: &Value) -> Option<Record> {
        let obj = value.as_object()?;
        let timestamp = obj.get("timestamp")?.as_str().and_then(parse_iso8601)?;
        let level = obj
            .get("level")
            .and_then(Value::as_str)
            .map(Level::from_name)
            .unwrap_or(Level::Info);
        let category = obj.get("category").and_then(Value::as_str).unwrap_or("UNKNOWN").to_string();
        let message = obj.get("message").and_then(Value::as_str).unwrap_or("").to_string();
        let context = obj.get("context").and_then(Value::as_object).cloned();
        let session_id = obj.get("sessionId").and_then(Value::as_str).unwrap_or("").to_string();
        let sequence_number = obj.get("seq").and_then(Value::as_u64).unwrap_or(0);
        Some(Record {
            timestamp,
            level,
            category,
            message,
            context,
            session_id,
            sequence_number,
        })
    }

    /// Parses a compact wire object.
    pub fn from_compact_wire(value: &Value) -> Option<Record> {
        let obj = value.as_object()?;
        let millis = obj.get("t")?.as_i64()?;
        let timestamp = Utc.timestamp_millis_opt(millis).single()?;
        let level = obj
            .get("l")
            .and_then(Value::as_u64)
            .and_then(|n| Level::from_numeric(n as u8))
            .unwrap_or(Level::Info);
        let category = obj.get("c").and_then(Value::as_str).unwrap_or("UNKNOWN").to_string();
        let message = obj.get("m").and_then(Value::as_str).unwrap_or("").to_string();
        let context = obj.get("x").and_then(Value::as_object).cloned();
        let session_id = obj.get("s").and_then(Value::as_str).unwrap_or("").to_string();
        let sequence_number = obj.get("n").and_then(Value::as_u64).unwrap_or(0);
        Some(Record {
            timestamp,
            level,
            category,
            message,
            context,
            session_id,
            sequence_number,
        })
    }

    /// Structural equality over `(timestamp, level, category, message, sequenceNumber)`.
    /// Context is intentionally excluded, per the data model.
    pub fn structurally_eq(&self, other: &Record) -> bool {
        self.timestamp == other.timestamp
            && self.level == other.level
            && self.category == other.category
            && self.message == other.message
            && self.sequence_number == other.sequence_number
    }
}

fn normalize_category(category: &str) -> String {
    if category.is_empty() {
        return "UNKNOWN".to_string();
    }
    truncate_chars(category, MAX_CATEGORY_LEN, "")
}

fn normalize_message(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_LEN {
        return message.to_string();
    }
    let head: String = message.chars().take(MAX_MESSAGE_LEN).collect();
    format!("{head}{MESSAGE_TRUNCATION_SUFFIX}")
}

fn truncate_chars(s: &str, max: usize, suffix: &str) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    format!("{head}{suffix}")
}

pub fn iso8601_ms(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample() -> Record {
        Record::new(Utc::now(), Level::Info, "net", "hello", None, "sess_1".into(), 7)
    }

    #[test]
    fn wire_round_trip_is_identity_modulo_ms() {
        let r = sample();
        let parsed = Record::from_wire(&r.to_wire()).unwrap();
        assert!(r.structurally_eq(&parsed));
    }

    #[test]
    fn compact_wire_round_trip_is_identity() {
        let r = sample();
        let parsed = Record::from_compact_wire(&r.to_compact_wire()).unwrap();
        assert!(r.structurally_eq(&parsed));
    }

    #[test]
    fn empty_category_becomes_unknown() {
        let r = Record::new(Utc::now(), Level::Debug, "", "m", None, "s".into(), 1);
        assert_eq!(r.category, "UNKNOWN");
    }

    #[test]
    fn overlong_message_is_truncated_with_suffix() {
        let long = "x".repeat(5_001);
        let r = Record::new(Utc::now(), Level::Debug, "c", &long, None, "s".into(), 1);
        assert!(r.message.ends_with(MESSAGE_TRUNCATION_SUFFIX));
    }

    #[test]
    fn empty_context_is_omitted_from_wire() {
        let r = Record::new(Utc::now(), Level::Info, "c", "m", Some(Map::new()), "s".into(), 1);
        let wire = r.to_wire();
        assert!(wire.get("context").is_none());
    }

    #[test]
    fn from_wire_defaults_unknown_level_to_info() {
        let mut obj = Map::new();
        obj.insert("timestamp".into(), Value::String(iso8601_ms(&Utc::now())));
        obj.insert("level".into(), Value::String("nonsense".into()));
        obj.insert("category".into(), Value::String("c".into()));
        obj.insert("message".into(), Value::String("m".into()));
        let parsed = Record::from_wire(&Value::Object(obj)).unwrap();
        assert_eq!(parsed.level, Level::Info);
    }
}
