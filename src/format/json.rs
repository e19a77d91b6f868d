use super::Formatter;
use crate::record::Record;

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, record: &Record) -> String {
        serde_json::to_string(&record.to_wire()).expect("record wire value is always serializable")
    }

    fn file_extension(&self) -> &'static str {
        "log"
    }

    fn mime_type(&self) -> &'static str {
        "application/x-ndjson"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use chrono::Utc;

    #[test]
    fn omits_empty_context() {
        let r = Record::new(Utc::now(), Level::Info, "c", "m", None, "s".into(), 1);
        let line = JsonFormatter.format(&r);
        assert!(!line.contains("\"context\""));
    }
}
