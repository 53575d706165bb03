use std::{collections::HashSet, fmt, ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize};

use super::code::CommodityCode;

/// Round to one decimal place, the precision every derived column is reported at.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Trade direction as reported by Comtrade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flow {
    Import,
    #[default]
    Export,
    ReExport,
    ReImport,
}

impl Flow {
    /// The `rg` value the API expects for this direction.
    pub fn code(&self) -> u8 {
        match self {
            Flow::Import => 1,
            Flow::Export => 2,
            Flow::ReExport => 3,
            Flow::ReImport => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Flow::Import => "Import",
            Flow::Export => "Export",
            Flow::ReExport => "Re-Export",
            Flow::ReImport => "Re-Import",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Flow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "import" | "imports" | "1" => Ok(Flow::Import),
            "export" | "exports" | "2" => Ok(Flow::Export),
            "reexport" | "reexports" | "3" => Ok(Flow::ReExport),
            "reimport" | "reimports" | "4" => Ok(Flow::ReImport),
            _ => Err(s.to_string()),
        }
    }
}

/// One reported row of trade between a reporter and a partner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub year: i32,
    pub flow: Flow,
    pub reporter: String,
    pub partner: String,
    pub code: CommodityCode,
    pub weight_kg: f64,
    pub value_usd: f64,
    /// Full commodity description. Never truncated here; see `frame::display_description`.
    pub description: String,
}

impl TradeRecord {
    /// Trade value in millions of USD.
    pub fn value_musd(&self) -> f64 {
        round1(self.value_usd / 1e6)
    }

    /// Net weight in millions of kilograms.
    pub fn weight_mton(&self) -> f64 {
        round1(self.weight_kg / 1e6)
    }

    /// USD per ton, `None` when no weight was reported.
    pub fn unit_price(&self) -> Option<f64> {
        if self.weight_kg > 0.0 {
            Some(round1(self.value_usd / self.weight_kg * 1000.0))
        } else {
            None
        }
    }
}

/// An ordered, read-only collection of trade records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<TradeRecord>,
}

impl RecordSet {
    pub fn new(records: Vec<TradeRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    /// Copy sorted by descending trade value, the order API tables are read in.
    pub fn sorted_by_value(&self) -> RecordSet {
        let mut records = self.records.clone();
        records.sort_by(|a, b| b.value_usd.total_cmp(&a.value_usd));
        Self { records }
    }

    /// Copy without exact duplicate rows, keeping first occurrences.
    pub fn dedup(&self) -> RecordSet {
        let mut seen = HashSet::with_capacity(self.records.len());
        let records = self
            .records
            .iter()
            .filter(|record| seen.insert(RowKey::of(*record)))
            .cloned()
            .collect();
        Self { records }
    }
}

/// Hashable identity of a row; amounts compare by bit pattern.
#[derive(PartialEq, Eq, Hash)]
struct RowKey<'a> {
    year: i32,
    flow: Flow,
    reporter: &'a str,
    partner: &'a str,
    code: &'a CommodityCode,
    weight_kg: u64,
    value_usd: u64,
    description: &'a str,
}

impl<'a> RowKey<'a> {
    fn of(record: &'a TradeRecord) -> Self {
        Self {
            year: record.year,
            flow: record.flow,
            reporter: &record.reporter,
            partner: &record.partner,
            code: &record.code,
            weight_kg: record.weight_kg.to_bits(),
            value_usd: record.value_usd.to_bits(),
            description: &record.description,
        }
    }
}

impl Deref for RecordSet {
    type Target = [TradeRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl FromIterator<TradeRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = TradeRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RecordSet {
    type Item = TradeRecord;
    type IntoIter = std::vec::IntoIter<TradeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a TradeRecord;
    type IntoIter = std::slice::Iter<'a, TradeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A selected record together with the group its exact code maps to.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledRecord {
    pub group: Option<String>,
    pub record: TradeRecord,
}

/// Value-weighted totals for one group, reporter or code.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AggregateResult {
    pub total_value_musd: f64,
    pub total_weight_mton: f64,
    pub price_usd_per_ton: f64,
    /// Records that contributed to the totals.
    pub records: usize,
    /// Unrounded sums the derived columns come from.
    pub value_usd: f64,
    pub weight_kg: f64,
}

/// One line of the exported classification table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputRow {
    pub group: String,
    pub code: String,
    pub weight_mton: f64,
    pub value_musd: f64,
    pub price: Option<f64>,
    pub description: String,
}

impl From<&LabeledRecord> for OutputRow {
    fn from(row: &LabeledRecord) -> Self {
        Self {
            group: row.group.clone().unwrap_or_default(),
            code: row.record.code.to_string(),
            weight_mton: row.record.weight_mton(),
            value_musd: row.record.value_musd(),
            price: row.record.unit_price(),
            description: row.record.description.clone(),
        }
    }
}
