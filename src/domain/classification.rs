//! Prefix-based selection of trade records and exact-code group labelling.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::code::CommodityCode;
use super::entities::{LabeledRecord, TradeRecord};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("code {code} is listed in both {first:?} and {second:?}")]
    DuplicateCode {
        code: CommodityCode,
        first: String,
        second: String,
    },
    #[error("group label must not be empty")]
    EmptyLabel,
    #[error("invalid classification config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A curated product bucket, e.g. `biscuit = [190531, 190532]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub label: String,
    pub codes: Vec<CommodityCode>,
}

/// Static classification table as loaded from config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub groups: Vec<Group>,
    /// Include prefixes. Defaults to every code listed in `groups`.
    #[serde(default)]
    pub include: Option<Vec<CommodityCode>>,
    /// Exclude prefixes, applied after `include`.
    #[serde(default)]
    pub exclude: Vec<CommodityCode>,
}

impl ClassificationConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Selection mask: a record is kept iff it matches some include prefix and
/// no exclude prefix. Exclusion wins regardless of rule order.
pub fn select(
    records: &[TradeRecord],
    include: &[CommodityCode],
    exclude: &[CommodityCode],
) -> Vec<bool> {
    records
        .iter()
        .map(|record| is_selected(&record.code, include, exclude))
        .collect()
}

fn is_selected(code: &CommodityCode, include: &[CommodityCode], exclude: &[CommodityCode]) -> bool {
    include.iter().any(|prefix| code.matches(prefix))
        && !exclude.iter().any(|prefix| code.matches(prefix))
}

/// Immutable classifier built once from a [`ClassificationConfig`].
#[derive(Clone, Debug)]
pub struct Classifier {
    groups: Vec<Group>,
    labels: HashMap<CommodityCode, String>,
    include: Vec<CommodityCode>,
    exclude: Vec<CommodityCode>,
}

impl Classifier {
    pub fn new(config: ClassificationConfig) -> Result<Self, ConfigError> {
        let mut labels: HashMap<CommodityCode, String> = HashMap::new();
        for group in &config.groups {
            if group.label.trim().is_empty() {
                return Err(ConfigError::EmptyLabel);
            }
            for code in &group.codes {
                if let Some(first) = labels.get(code) {
                    if first != &group.label {
                        return Err(ConfigError::DuplicateCode {
                            code: code.clone(),
                            first: first.clone(),
                            second: group.label.clone(),
                        });
                    }
                }
                labels.insert(code.clone(), group.label.clone());
            }
        }

        let include = config.include.unwrap_or_else(|| {
            config
                .groups
                .iter()
                .flat_map(|group| group.codes.iter().cloned())
                .collect()
        });

        Ok(Self {
            groups: config.groups,
            labels,
            include,
            exclude: config.exclude,
        })
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn include(&self) -> &[CommodityCode] {
        &self.include
    }

    pub fn exclude(&self) -> &[CommodityCode] {
        &self.exclude
    }

    pub fn select(&self, records: &[TradeRecord]) -> Vec<bool> {
        select(records, &self.include, &self.exclude)
    }

    /// Group label by exact code. Prefixes are not consulted here: a code
    /// selected through a broad prefix may legitimately have no label.
    pub fn group_of(&self, code: &CommodityCode) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// Selected records paired with their (possibly absent) group label.
    pub fn apply(&self, records: &[TradeRecord]) -> Vec<LabeledRecord> {
        let mask = self.select(records);
        records
            .iter()
            .zip(mask)
            .filter(|(_, selected)| *selected)
            .map(|(record, _)| {
                let group = self.group_of(&record.code).map(str::to_string);
                if group.is_none() {
                    debug!(code = %record.code, "selected record has no group label");
                }
                LabeledRecord {
                    group,
                    record: record.clone(),
                }
            })
            .collect()
    }
}
