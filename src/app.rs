//! Pipelines that tie the client, the classifier and the aggregator together.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{error, info};

use crate::domain::{
    aggregate_by, combined_price, merge, top_contributors, AggregateKey, AggregateResult,
    Classifier, CommodityCode, LabeledRecord, OutputRow, RecordSet, DEFAULT_MIN_VALUE_MUSD,
};
use crate::infra::{
    comtrade::{ClientError, ComtradeClient},
    extract::{read_extract, ExtractError},
    output::{write_table, OutputError, WriteOutcome},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Headline price of one configured group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupPrice {
    pub label: String,
    pub codes: Vec<CommodityCode>,
    pub price: Option<f64>,
}

/// Result of a batch over all groups. Failed groups are listed, not fatal.
#[derive(Debug, Default)]
pub struct GroupPriceTable {
    pub prices: Vec<GroupPrice>,
    pub failures: Vec<(String, ClientError)>,
}

/// What the classify pipeline produced for one country.
#[derive(Debug)]
pub struct ClassifyReport {
    pub output: PathBuf,
    pub rows: Vec<LabeledRecord>,
    pub outcome: WriteOutcome,
}

pub struct App {
    client: ComtradeClient,
    classifier: Classifier,
}

impl App {
    pub fn new(client: ComtradeClient, classifier: Classifier) -> Self {
        Self { client, classifier }
    }

    pub fn client(&self) -> &ComtradeClient {
        &self.client
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Exporters of every code in `codes`, merged in argument order. Rows
    /// repeated by overlapping fetches are kept once.
    pub async fn exporters_of(&self, codes: &[CommodityCode], year: i32) -> Result<RecordSet, ClientError> {
        let mut sets = Vec::with_capacity(codes.len());
        for code in codes {
            sets.push(self.client.exporters(code.as_str(), year).await?);
        }
        Ok(merge(sets).dedup())
    }

    /// Per-reporter totals across `codes`, largest first, without reporters
    /// below `min_value_musd`.
    pub async fn exporters_by_list(
        &self,
        codes: &[CommodityCode],
        year: i32,
        min_value_musd: f64,
    ) -> Result<Vec<(String, AggregateResult)>, ClientError> {
        let records = self.exporters_of(codes, year).await?;
        Ok(top_contributors(&records, AggregateKey::Reporter, usize::MAX, min_value_musd))
    }

    /// Value-weighted price of `codes` across the top `n` rows of
    /// [`App::exporters_by_list`].
    pub async fn average_price(
        &self,
        codes: &[CommodityCode],
        n: usize,
        year: i32,
    ) -> Result<Option<f64>, ClientError> {
        let table = self.exporters_by_list(codes, year, DEFAULT_MIN_VALUE_MUSD).await?;
        Ok(combined_price(table.iter().take(n).map(|(_, result)| result)))
    }

    /// Full commodity description of each code, taken from its largest exporter.
    pub async fn describe(&self, codes: &[CommodityCode], year: i32) -> Result<Vec<Option<String>>, ClientError> {
        let mut descriptions = Vec::with_capacity(codes.len());
        for code in codes {
            let records = self.client.exporters(code.as_str(), year).await?;
            descriptions.push(records.first().map(|record| record.description.clone()));
        }
        Ok(descriptions)
    }

    /// Price per code over all exporters.
    pub async fn price_by_code(
        &self,
        codes: &[CommodityCode],
        year: i32,
    ) -> Result<BTreeMap<String, AggregateResult>, ClientError> {
        let records = self.exporters_of(codes, year).await?;
        Ok(aggregate_by(&records, AggregateKey::Code))
    }

    /// [`App::average_price`] for every configured group.
    pub async fn group_prices(&self, n: usize, year: i32) -> GroupPriceTable {
        let mut table = GroupPriceTable::default();
        for group in self.classifier.groups() {
            match self.average_price(&group.codes, n, year).await {
                Ok(price) => table.prices.push(GroupPrice {
                    label: group.label.clone(),
                    codes: group.codes.clone(),
                    price,
                }),
                Err(e) => {
                    error!(group = %group.label, "failed to price group: {e}");
                    table.failures.push((group.label.clone(), e));
                }
            }
        }
        table
    }

    /// Classify `<data_dir>/<country>.csv` and write `<out_dir>/<country>.csv`.
    /// An existing output file is left untouched.
    pub fn classify_extract(&self, data_dir: &Path, country: &str, out_dir: &Path) -> Result<ClassifyReport, AppError> {
        let input = data_dir.join(format!("{country}.csv"));
        let output = out_dir.join(format!("{country}.csv"));

        let records = read_extract(&input)?;
        let rows = self.classifier.apply(&records);
        info!(country, total = records.len(), selected = rows.len(), "classified extract");

        let table: Vec<OutputRow> = rows.iter().map(OutputRow::from).collect();
        let outcome = write_table(&output, &table)?;
        Ok(ClassifyReport { output, rows, outcome })
    }
}
