//! CSV text parsing.
//!
//! Rules:
//!
//! - The first row is the header; each later row becomes one record keyed by header names.
//! - Cells stay strings (no type inference); an empty cell is an empty string.
//! - Rows shorter than the header get `null` for the missing columns; extra cells are dropped.

use std::path::Path;

use crate::error::{TransformError, TransformResult};
use crate::types::{Record, Value};

/// Parses CSV text into records.
pub fn records_from_csv_str(input: &str) -> TransformResult<Vec<Record>> {
    if input.trim().is_empty() {
        return Err(TransformError::NoData);
    }
    let mut rdr = reader_builder().from_reader(input.as_bytes());
    records_from_csv_reader(&mut rdr)
}

/// Reads a `.csv` file into records.
pub fn records_from_csv_path(path: impl AsRef<Path>) -> TransformResult<Vec<Record>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(TransformError::invalid_input(format!(
            "'{}' is not a .csv file",
            path.display()
        )));
    }
    let mut rdr = reader_builder().from_path(path)?;
    records_from_csv_reader(&mut rdr)
}

/// Reads records from an existing CSV reader (headers must be enabled).
pub fn records_from_csv_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
) -> TransformResult<Vec<Record>> {
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(TransformError::NoData);
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let record: Record = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let value = row.get(idx).map_or(Value::Null, Value::from);
                (name.to_string(), value)
            })
            .collect();
        records.push(record);
    }

    if records.is_empty() {
        return Err(TransformError::EmptyData);
    }
    Ok(records)
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).flexible(true);
    builder
}

#[cfg(test)]
mod tests {
    use super::records_from_csv_str;
    use crate::error::TransformError;
    use crate::types::Value;

    #[test]
    fn rows_become_string_records() {
        let records = records_from_csv_str("id,name\n1,Ada\n2,\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("id"), Some(&Value::from("1")));
        assert_eq!(records[1].get("name"), Some(&Value::from("")));
    }

    #[test]
    fn short_rows_fill_with_null() {
        let records = records_from_csv_str("a,b,c\n1,2\n").unwrap();
        assert_eq!(records[0].get("c"), Some(&Value::Null));
    }

    #[test]
    fn header_only_is_empty_data() {
        assert!(matches!(records_from_csv_str("a,b\n"), Err(TransformError::EmptyData)));
        assert!(matches!(records_from_csv_str(""), Err(TransformError::NoData)));
    }
}
