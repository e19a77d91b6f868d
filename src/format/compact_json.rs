use super::Formatter;
use crate::record::Record;

pub struct CompactJsonFormatter;

impl Formatter for CompactJsonFormatter {
    fn format(&self, record: &Record) -> String {
        serde_json::to_string(&record.to_compact_wire()).expect("compact wire value is always serializable")
    }

    fn file_extension(&self) -> &'static str {
        "log"
    }

    fn mime_type(&self) -> &'static str {
        "application/x-ndjson"
    }
}
