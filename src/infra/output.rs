use std::{fs, path::Path};

use thiserror::Error;
use tracing::info;

use crate::domain::OutputRow;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write table: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The target already existed and was left alone.
    Skipped,
}

/// Write the classification table once. An existing file is never overwritten;
/// delete it first to refresh.
pub fn write_table(path: &Path, rows: &[OutputRow]) -> Result<WriteOutcome, OutputError> {
    if path.exists() {
        info!(path = %path.display(), "output exists, skipping");
        return Ok(WriteOutcome::Skipped);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "wrote output table");
    Ok(WriteOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<OutputRow> {
        vec![
            OutputRow {
                group: "infant".into(),
                code: "190110".into(),
                weight_mton: 2.0,
                value_musd: 1.0,
                price: Some(500.0),
                description: "Food preparations for infant use".into(),
            },
            OutputRow {
                group: String::new(),
                code: "190190".into(),
                weight_mton: 0.0,
                value_musd: 0.1,
                price: None,
                description: "Malt extract".into(),
            },
        ]
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("germany.csv");

        assert_eq!(write_table(&path, &rows()).unwrap(), WriteOutcome::Written);

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("group,code,weight_mton,value_musd,price,description"));
        assert_eq!(lines.next(), Some("infant,190110,2.0,1.0,500.0,Food preparations for infant use"));
        assert_eq!(lines.next(), Some(",190190,0.0,0.1,,Malt extract"));
    }

    #[test]
    fn existing_target_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("russia.csv");
        fs::write(&path, "keep me").unwrap();

        assert_eq!(write_table(&path, &rows()).unwrap(), WriteOutcome::Skipped);
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
    }
}
