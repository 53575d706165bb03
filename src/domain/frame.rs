//! Record store: projects raw rows onto the canonical trade record shape.
//!
//! Raw rows come either from the Comtrade JSON API or from bulk CSV extracts.
//! Both carry the same eight facts under different column names, so one
//! `normalize` serves both, parameterised by a [`ColumnSchema`].

use serde_json::{Map, Value};
use thiserror::Error;

use super::code::CommodityCode;
use super::entities::{Flow, RecordSet, TradeRecord};

/// Maximum description length shown in tables and logs.
pub const DISPLAY_DESCRIPTION_LEN: usize = 35;

/// A raw row keyed by source column name.
pub type RawRow = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("missing column {column:?} in row {row}")]
    MissingColumn { column: String, row: usize },
    #[error("invalid value {value} for column {column:?} in row {row}")]
    InvalidValue {
        column: String,
        value: String,
        row: usize,
    },
}

/// Source column names for each canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSchema {
    pub year: &'static str,
    pub flow: &'static str,
    pub reporter: &'static str,
    pub partner: &'static str,
    pub code: &'static str,
    pub weight_kg: &'static str,
    pub value_usd: &'static str,
    pub description: &'static str,
}

/// Column names of the legacy `/api/get` JSON dataset.
pub const API_COLUMNS: ColumnSchema = ColumnSchema {
    year: "yr",
    flow: "rgDesc",
    reporter: "rtTitle",
    partner: "ptTitle",
    code: "cmdCode",
    weight_kg: "NetWeight",
    value_usd: "TradeValue",
    description: "cmdDescE",
};

/// Column names of the bulk CSV download.
pub const EXTRACT_COLUMNS: ColumnSchema = ColumnSchema {
    year: "Year",
    flow: "Trade Flow",
    reporter: "Reporter",
    partner: "Partner",
    code: "Commodity Code",
    weight_kg: "Netweight (kg)",
    value_usd: "Trade Value (US$)",
    description: "Commodity",
};

/// Turn raw rows into trade records, failing on the first malformed row.
pub fn normalize(rows: &[RawRow], schema: &ColumnSchema) -> Result<RecordSet, SchemaError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| normalize_row(index, row, schema))
        .collect::<Result<Vec<_>, _>>()
        .map(RecordSet::new)
}

fn normalize_row(row: usize, raw: &RawRow, schema: &ColumnSchema) -> Result<TradeRecord, SchemaError> {
    let field = Field { raw, row };

    Ok(TradeRecord {
        year: field.year(schema.year)?,
        flow: field.flow(schema.flow)?,
        reporter: field.text(schema.reporter)?,
        partner: field.text(schema.partner)?,
        code: field.code(schema.code)?,
        weight_kg: field.quantity(schema.weight_kg)?,
        value_usd: field.quantity(schema.value_usd)?,
        description: field.text(schema.description)?,
    })
}

struct Field<'a> {
    raw: &'a RawRow,
    row: usize,
}

impl<'a> Field<'a> {
    fn get(&self, column: &str) -> Result<&'a Value, SchemaError> {
        self.raw.get(column).ok_or_else(|| SchemaError::MissingColumn {
            column: column.to_string(),
            row: self.row,
        })
    }

    fn invalid(&self, column: &str, value: &Value) -> SchemaError {
        SchemaError::InvalidValue {
            column: column.to_string(),
            value: value.to_string(),
            row: self.row,
        }
    }

    fn text(&self, column: &str) -> Result<String, SchemaError> {
        match self.get(column)? {
            Value::String(text) => Ok(text.clone()),
            Value::Null => Ok(String::new()),
            Value::Number(number) => Ok(number.to_string()),
            other => Err(self.invalid(column, other)),
        }
    }

    fn year(&self, column: &str) -> Result<i32, SchemaError> {
        let value = self.get(column)?;
        let parsed = match value {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .and_then(|year| i32::try_from(year).ok())
            .ok_or_else(|| self.invalid(column, value))
    }

    fn flow(&self, column: &str) -> Result<Flow, SchemaError> {
        let value = self.get(column)?;
        let parsed: Option<Flow> = match value {
            Value::String(text) => text.parse().ok(),
            Value::Number(number) => number.to_string().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(column, value))
    }

    fn code(&self, column: &str) -> Result<CommodityCode, SchemaError> {
        let value = self.get(column)?;
        let parsed = match value {
            Value::String(text) => CommodityCode::new(text.as_str()).ok(),
            Value::Number(number) if number.is_u64() => CommodityCode::new(number.to_string()).ok(),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(column, value))
    }

    /// Non-negative amount; an unreported (null or blank) amount reads as zero.
    fn quantity(&self, column: &str) -> Result<f64, SchemaError> {
        let value = self.get(column)?;
        let parsed = match value {
            Value::Null => Some(0.0),
            Value::Number(number) => number.as_f64(),
            Value::String(text) if text.trim().is_empty() => Some(0.0),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|amount| amount.is_finite() && *amount >= 0.0)
            .ok_or_else(|| self.invalid(column, value))
    }
}

/// Concatenate record sets in order. Duplicates are kept.
pub fn merge<I>(sets: I) -> RecordSet
where
    I: IntoIterator<Item = RecordSet>,
{
    sets.into_iter().flatten().collect()
}

/// Shortened description for human-facing output only.
pub fn display_description(description: &str) -> String {
    description.chars().take(DISPLAY_DESCRIPTION_LEN).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn api_row(code: Value, weight: Value, value: Value) -> RawRow {
        let row = json!({
            "yr": 2018,
            "rgDesc": "Export",
            "rtTitle": "Germany",
            "ptTitle": "World",
            "cmdCode": code,
            "NetWeight": weight,
            "TradeValue": value,
            "cmdDescE": "Food preparations; sweet biscuits, whether or not containing cocoa",
            "qtCode": 8
        });
        row.as_object().cloned().unwrap()
    }

    #[test]
    fn normalizes_api_rows() {
        let rows = vec![api_row(json!("190531"), json!(1_000_000), json!(500_000))];
        let set = normalize(&rows, &API_COLUMNS).unwrap();
        let record = &set[0];
        assert_eq!(record.code.as_str(), "190531");
        assert_eq!(record.flow, Flow::Export);
        assert_eq!(record.year, 2018);
        assert_eq!(record.weight_mton(), 1.0);
        assert_eq!(record.value_musd(), 0.5);
        assert_eq!(record.unit_price(), Some(500.0));
    }

    #[test]
    fn numeric_codes_and_null_weights() {
        let rows = vec![api_row(json!(3102), Value::Null, json!(12.5))];
        let set = normalize(&rows, &API_COLUMNS).unwrap();
        assert_eq!(set[0].code.as_str(), "3102");
        assert_eq!(set[0].weight_kg, 0.0);
        assert_eq!(set[0].unit_price(), None);
    }

    #[test]
    fn missing_column_is_schema_error() {
        let mut row = api_row(json!("1001"), json!(1), json!(1));
        row.remove("TradeValue");
        let err = normalize(&[row], &API_COLUMNS).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumn {
                column: "TradeValue".into(),
                row: 0
            }
        );
    }

    #[test]
    fn negative_amount_is_rejected() {
        let rows = vec![
            api_row(json!("1001"), json!(1), json!(1)),
            api_row(json!("1001"), json!(-5), json!(1)),
        ];
        match normalize(&rows, &API_COLUMNS) {
            Err(SchemaError::InvalidValue { column, row, .. }) => {
                assert_eq!(column, "NetWeight");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn extract_rows_use_their_own_headers() {
        let row = json!({
            "Year": "2018",
            "Trade Flow": "Import",
            "Reporter": "Russian Federation",
            "Partner": "World",
            "Commodity Code": "110100",
            "Netweight (kg)": "2500000",
            "Trade Value (US$)": "",
            "Commodity": "Wheat or meslin flour"
        });
        let set = normalize(&[row.as_object().cloned().unwrap()], &EXTRACT_COLUMNS).unwrap();
        assert_eq!(set[0].flow, Flow::Import);
        assert_eq!(set[0].weight_mton(), 2.5);
        assert_eq!(set[0].value_usd, 0.0);
    }

    #[test]
    fn merge_keeps_order_and_duplicates() {
        let a = normalize(&[api_row(json!("1001"), json!(1), json!(1))], &API_COLUMNS).unwrap();
        let b = normalize(&[api_row(json!("1002"), json!(1), json!(1))], &API_COLUMNS).unwrap();
        let merged = merge([a.clone(), b, a]);
        let codes: Vec<&str> = merged.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["1001", "1002", "1001"]);
    }

    #[test]
    fn display_truncation_leaves_record_untouched() {
        let rows = vec![api_row(json!("190531"), json!(1), json!(1))];
        let set = normalize(&rows, &API_COLUMNS).unwrap();
        let shown = display_description(&set[0].description);
        assert_eq!(shown, "Food preparations; sweet biscuits, ");
        assert_eq!(shown.chars().count(), DISPLAY_DESCRIPTION_LEN);
        assert!(set[0].description.len() > DISPLAY_DESCRIPTION_LEN);
        assert_eq!(display_description("Beer"), "Beer");
    }
}
