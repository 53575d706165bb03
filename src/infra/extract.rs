//! Reader for bulk Comtrade CSV downloads.

use std::{fs::File, io::Read, path::Path};

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::domain::{normalize, RawRow, RecordSet, SchemaError, EXTRACT_COLUMNS};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to open extract: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse extract: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed extract: {0}")]
    Schema(#[from] SchemaError),
}

/// Read every row as text keyed by its header. Commodity codes stay strings,
/// so leading zeros survive.
pub fn read_raw_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| (header.trim().to_string(), Value::String(field.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Load and normalize one country extract.
pub fn read_extract(path: &Path) -> Result<RecordSet, ExtractError> {
    let file = File::open(path)?;
    let rows = read_raw_rows(file)?;
    let records = normalize(&rows, &EXTRACT_COLUMNS)?;
    info!(path = %path.display(), rows = records.len(), "read extract");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::Flow;

    const EXTRACT: &str = "\
Classification,Year,Period,Trade Flow,Reporter,Partner,Commodity Code,Commodity,Netweight (kg),Trade Value (US$),Flag
H5,2018,2018,Export,Germany,World,100199,\"Wheat and meslin; other than durum wheat, other than seed\",3500000,700000,0
H5,2018,2018,Export,Germany,World,010121,\"Horses; live, pure-bred breeding animals\",,2500000,0
";

    #[test]
    fn reads_rows_by_header() {
        let rows = read_raw_rows(EXTRACT.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["Commodity Code"], Value::String("010121".into()));
    }

    #[test]
    fn extract_file_normalizes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXTRACT.as_bytes()).unwrap();

        let records = read_extract(file.path()).unwrap();
        assert_eq!(records[0].flow, Flow::Export);
        assert_eq!(records[0].weight_mton(), 3.5);
        assert_eq!(records[0].unit_price(), Some(200.0));
        assert_eq!(records[1].code.as_str(), "010121");
        assert_eq!(records[1].unit_price(), None);
    }

    #[test]
    fn missing_header_is_schema_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Year,Reporter\n2018,Germany\n").unwrap();
        assert!(matches!(
            read_extract(file.path()),
            Err(ExtractError::Schema(SchemaError::MissingColumn { .. }))
        ));
    }
}
