use csv::WriterBuilder;

use super::Formatter;
use crate::record::{iso8601_ms, Record};

pub const CSV_HEADER: &str = "timestamp,level,category,message,context,sessionId";

pub struct CsvFormatter;

impl CsvFormatter {
    pub fn new() -> Self {
        CsvFormatter
    }

    pub fn header(&self) -> &'static str {
        CSV_HEADER
    }
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for CsvFormatter {
    fn format(&self, record: &Record) -> String {
        let context_json = match &record.context {
            Some(ctx) if !ctx.is_empty() => {
                serde_json::to_string(ctx).expect("context map is always serializable")
            }
            _ => String::new(),
        };

        let mut writer = WriterBuilder::new().terminator(csv::Terminator::Any(b'\n')).from_writer(vec![]);
        writer
            .write_record([
                &iso8601_ms(&record.timestamp),
                record.level.name(),
                &record.category,
                &record.message,
                &context_json,
                &record.session_id,
            ])
            .expect("writing a record to an in-memory buffer cannot fail");
        let bytes = writer.into_inner().expect("writer holds no unflushed state after write_record");
        String::from_utf8(bytes).expect("csv writer output is valid utf-8").trim_end_matches('\n').to_string()
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }
}
