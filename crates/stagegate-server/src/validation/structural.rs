//! Header and row checks for CSV uploads.
//!
//! Rows are scanned first to last and the first violation wins, so the reason
//! always names a single offending value.

use csv::{Reader, ReaderBuilder, StringRecord};
use stagegate_common::{GateError, Result};
use std::{collections::HashMap, path::Path};
use tracing::debug;

use super::{timestamp::is_valid_timestamp, ValidationOutcome};

/// One data row: the `timestamp` column by name, every other column by header.
///
/// A row shorter than the header leaves the trailing columns absent; an absent
/// `timestamp` reads as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRow {
    pub timestamp: String,
    pub extra: HashMap<String, String>,
}

impl CsvRow {
    pub fn from_record(headers: &StringRecord, record: &StringRecord) -> Self {
        let mut row = CsvRow::default();

        for (name, value) in headers.iter().zip(record.iter()) {
            if name == "timestamp" {
                row.timestamp = value.to_string();
            } else {
                row.extra.insert(name.to_string(), value.to_string());
            }
        }

        row
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        if column == "timestamp" {
            return Some(&self.timestamp);
        }
        self.extra.get(column).map(String::as_str)
    }
}

/// Validate raw upload bytes against `required_columns`.
///
/// Bytes that are not UTF-8 are an I/O-class failure and come back as
/// `Err(GateError::Decode)`. Every structural problem is an
/// `Ok(ValidationOutcome::Invalid)`.
///
/// The header is the first physical line: a blank first line means an empty
/// header, even if column names follow. A leading UTF-8 BOM is stripped
/// before the header is read. An unterminated quote is not an error; the
/// quoted field runs to the end of the file.
pub fn validate(bytes: &[u8], required_columns: &[&str]) -> Result<ValidationOutcome> {
    let text = std::str::from_utf8(bytes)?;

    let headers = if starts_with_blank_line(text) {
        StringRecord::new()
    } else {
        read_headers(text)?
    };

    let missing: Vec<&str> = required_columns
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();

    if !missing.is_empty() {
        debug!(?missing, "Header is missing required columns");
        return Ok(ValidationOutcome::Invalid(format!(
            "Missing required columns: {}",
            render_column_list(&missing)
        )));
    }

    let mut reader = csv_reader(text);
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| GateError::Parse(format!("CSV read failed: {}", e)))?;
        let row = CsvRow::from_record(&headers, &record);
        let value = row.timestamp.trim();

        if !value.is_empty() && !is_valid_timestamp(value) {
            debug!(row = index + 1, value, "Rejecting row with invalid timestamp");
            return Ok(ValidationOutcome::Invalid(format!(
                "Invalid timestamp format: '{}'. Expected ISO8601 or Unix epoch.",
                value
            )));
        }
    }

    Ok(ValidationOutcome::Valid)
}

fn csv_reader(text: &str) -> Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn read_headers(text: &str) -> Result<StringRecord> {
    csv_reader(text)
        .headers()
        .cloned()
        .map_err(|e| GateError::Parse(format!("CSV read failed: {}", e)))
}

/// The reader skips blank lines, so a blank first line would otherwise let
/// the next line act as the header.
fn starts_with_blank_line(text: &str) -> bool {
    let first = text.split('\n').next().unwrap_or_default();
    !text.is_empty() && first.trim_end_matches('\r').is_empty()
}

/// [`validate`] over a local file, for checking uploads before staging them.
pub fn validate_file(path: &Path, required_columns: &[&str]) -> Result<ValidationOutcome> {
    let bytes = std::fs::read(path)?;
    validate(&bytes, required_columns)
}

/// `['id', 'value']`
fn render_column_list(columns: &[&str]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| format!("'{}'", c)).collect();
    format!("[{}]", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::REQUIRED_COLUMNS;

    fn check(csv: &str) -> ValidationOutcome {
        validate(csv.as_bytes(), &REQUIRED_COLUMNS).unwrap()
    }

    #[test]
    fn test_valid_file() {
        let outcome = check(
            "id,value,timestamp\n\
             1,10.5,2024-01-15T10:30:00Z\n\
             2,11.0,1700000000\n\
             3,12.25,\n",
        );
        assert_eq!(outcome, ValidationOutcome::Valid);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let outcome = check("region,id,value,timestamp,notes\neu,1,2,2024-01-15 10:30:00,hi\n");
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_header_only_is_valid() {
        assert!(check("id,value,timestamp\n").is_valid());
    }

    #[test]
    fn test_missing_timestamp_column() {
        let outcome = check("id,value\n1,2\n");
        assert_eq!(
            outcome,
            ValidationOutcome::Invalid("Missing required columns: ['timestamp']".to_string())
        );
    }

    #[test]
    fn test_missing_columns_keep_declared_order() {
        let outcome = check("timestamp,other\n2024-01-15T10:30:00Z,x\n");
        assert_eq!(
            outcome.reason(),
            Some("Missing required columns: ['id', 'value']")
        );
    }

    #[test]
    fn test_empty_file_reports_all_columns() {
        let outcome = check("");
        assert_eq!(
            outcome.reason(),
            Some("Missing required columns: ['id', 'value', 'timestamp']")
        );
    }

    #[test]
    fn test_blank_first_line_means_empty_header() {
        for csv in [
            "\nid,value,timestamp\n1,2,1700000000\n",
            "\r\nid,value,timestamp\r\n1,2,1700000000\r\n",
        ] {
            assert_eq!(
                check(csv).reason(),
                Some("Missing required columns: ['id', 'value', 'timestamp']"),
                "{:?}",
                csv
            );
        }
    }

    #[test]
    fn test_leading_bom_is_stripped() {
        assert!(check("\u{feff}id,value,timestamp\n1,2,1700000000\n").is_valid());

        let outcome = check("\u{feff}id,value,timestamp\n1,2,later\n");
        assert_eq!(
            outcome.reason(),
            Some("Invalid timestamp format: 'later'. Expected ISO8601 or Unix epoch.")
        );
    }

    #[test]
    fn test_unterminated_quote_runs_to_end_of_file() {
        // The quoted field swallows the timestamp, leaving that column absent.
        assert!(check("id,value,timestamp\n1,\"2,1700000000\n").is_valid());

        let outcome = check("id,value,timestamp\n1,2,bad\n3,\"4,also-bad\n");
        assert_eq!(
            outcome.reason(),
            Some("Invalid timestamp format: 'bad'. Expected ISO8601 or Unix epoch.")
        );
    }

    #[test]
    fn test_column_names_are_case_sensitive() {
        let outcome = check("ID,Value,Timestamp\n1,2,1700000000\n");
        assert_eq!(
            outcome.reason(),
            Some("Missing required columns: ['id', 'value', 'timestamp']")
        );
    }

    #[test]
    fn test_first_bad_timestamp_wins() {
        let outcome = check(
            "id,value,timestamp\n\
             1,1,2024-01-15T10:30:00Z\n\
             2,2,bad-value\n\
             3,3,also-bad\n",
        );
        let reason = outcome.reason().unwrap();
        assert_eq!(
            reason,
            "Invalid timestamp format: 'bad-value'. Expected ISO8601 or Unix epoch."
        );
        assert!(!reason.contains("also-bad"));
    }

    #[test]
    fn test_timestamp_is_trimmed_in_reason() {
        let outcome = check("id,value,timestamp\n1,1,\"  nope  \"\n");
        assert_eq!(
            outcome.reason(),
            Some("Invalid timestamp format: 'nope'. Expected ISO8601 or Unix epoch.")
        );
    }

    #[test]
    fn test_blank_and_short_rows_pass() {
        let outcome = check("id,value,timestamp\n1,1,   \n2,2\n\n3\n");
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_quoted_fields() {
        let outcome = check("id,value,timestamp\n\"1\",\"a, b\",\"2024-01-15 10:30:00.25+01:00\"\n");
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let bytes = b"id,value,timestamp\n1,\xff,1700000000\n";
        let err = validate(bytes, &REQUIRED_COLUMNS).unwrap_err();
        assert!(matches!(err, GateError::Decode(_)));
    }

    #[test]
    fn test_deterministic() {
        let csv = "id,value,timestamp\n1,1,nope\n";
        assert_eq!(check(csv), check(csv));
    }

    #[test]
    fn test_csv_row_accessors() {
        let headers = StringRecord::from(vec!["id", "value", "timestamp"]);
        let record = StringRecord::from(vec!["7", "3.5"]);
        let row = CsvRow::from_record(&headers, &record);

        assert_eq!(row.timestamp, "");
        assert_eq!(row.get("id"), Some("7"));
        assert_eq!(row.get("value"), Some("3.5"));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_validate_file_missing_is_io_error() {
        let err = validate_file(Path::new("/nonexistent/upload.csv"), &REQUIRED_COLUMNS).unwrap_err();
        assert!(matches!(err, GateError::Io(_)));
    }
}
