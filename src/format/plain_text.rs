use super::Formatter;
use crate::record::{iso8601_ms, Record};

pub struct PlainTextFormatter;

impl Formatter for PlainTextFormatter {
    fn format(&self, record: &Record) -> String {
        let level_name = record.level.name().to_uppercase();
        let padded_level = format!("{level_name:<7}");
        let mut line = format!(
            "[{}] [{}] [{}] {}",
            iso8601_ms(&record.timestamp),
            padded_level,
            record.category,
            record.message
        );
        if let Some(ctx) = &record.context {
            if !ctx.is_empty() {
                let compact = serde_json::to_string(ctx).expect("context map is always serializable");
                line.push(' ');
                line.push_str(&compact);
            }
        }
        line
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn mime_type(&self) -> &'static str {
        "text/plain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use chrono::Utc;
    use serde_json::{Map, Value};

    #[test]
    fn level_is_uppercased_and_padded_to_seven() {
        let r = Record::new(Utc::now(), Level::Info, "net", "hello", None, "s".into(), 1);
        let line = PlainTextFormatter.format(&r);
        assert!(line.contains("[INFO   ]"));
    }

    #[test]
    fn warning_fills_the_full_seven_width() {
        let r = Record::new(Utc::now(), Level::Warning, "net", "hello", None, "s".into(), 1);
        let line = PlainTextFormatter.format(&r);
        assert!(line.contains("[WARNING]"));
    }

    #[test]
    fn context_is_appended_as_compact_json_when_present() {
        let mut ctx = Map::new();
        ctx.insert("k".to_string(), Value::String("v".to_string()));
        let mut r = Record::new(Utc::now(), Level::Info, "net", "hello", Some(ctx), "s".into(), 1);
        r.context = r.context;
        let line = PlainTextFormatter.format(&r);
        assert!(line.ends_with("{\"k\":\"v\"}"));
    }

    #[test]
    fn empty_context_adds_nothing() {
        let r = Record::new(Utc::now(), Level::Info, "net", "hello", Some(Map::new()), "s".into(), 1);
        let line = PlainTextFormatter.format(&r);
        assert!(line.ends_with("hello"));
    }
}
