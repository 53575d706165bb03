//! Value-weighted price estimation.
//!
//! Prices are always derived from summed value over summed weight, never from
//! an average of per-row prices, so a handful of tiny shipments cannot drag
//! the estimate around.

use std::collections::BTreeMap;

use tracing::debug;

use super::entities::{round1, AggregateResult, LabeledRecord, TradeRecord};

/// Default number of top reporters behind a headline price.
pub const DEFAULT_TOP_N: usize = 10;

/// Reporters below this value (USD millions) are treated as noise.
pub const DEFAULT_MIN_VALUE_MUSD: f64 = 0.5;

/// Anything that can be folded into an aggregate.
pub trait Tradable {
    fn record(&self) -> &TradeRecord;

    fn group(&self) -> Option<&str> {
        None
    }
}

impl Tradable for TradeRecord {
    fn record(&self) -> &TradeRecord {
        self
    }
}

impl Tradable for LabeledRecord {
    fn record(&self) -> &TradeRecord {
        &self.record
    }

    fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateKey {
    /// Group label; unlabeled rows share the empty key.
    Group,
    Reporter,
    Code,
}

impl AggregateKey {
    fn key_of<T: Tradable>(&self, item: &T) -> String {
        match self {
            AggregateKey::Group => item.group().unwrap_or_default().to_string(),
            AggregateKey::Reporter => item.record().reporter.clone(),
            AggregateKey::Code => item.record().code.to_string(),
        }
    }
}

#[derive(Default)]
struct Totals {
    value_usd: f64,
    weight_kg: f64,
    records: usize,
}

impl Totals {
    fn add(&mut self, value_usd: f64, weight_kg: f64, records: usize) {
        self.value_usd += value_usd;
        self.weight_kg += weight_kg;
        self.records += records;
    }

    /// Rounding happens here, on the totals, never per row.
    fn finish(self) -> Option<AggregateResult> {
        if self.weight_kg <= 0.0 {
            return None;
        }
        Some(AggregateResult {
            total_value_musd: round1(self.value_usd / 1e6),
            total_weight_mton: round1(self.weight_kg / 1e6),
            price_usd_per_ton: round1(self.value_usd / self.weight_kg * 1000.0),
            records: self.records,
            value_usd: self.value_usd,
            weight_kg: self.weight_kg,
        })
    }
}

/// Sum value and weight per key and derive a price from the totals.
///
/// Rows without weight are dropped before summation; a key whose rows all
/// lack weight does not appear in the result.
pub fn aggregate_by<T: Tradable>(records: &[T], key: AggregateKey) -> BTreeMap<String, AggregateResult> {
    let mut totals: BTreeMap<String, Totals> = BTreeMap::new();
    let mut dropped = 0_usize;

    for item in records {
        let record = item.record();
        if record.weight_kg <= 0.0 {
            dropped += 1;
            continue;
        }
        totals
            .entry(key.key_of(item))
            .or_default()
            .add(record.value_usd, record.weight_kg, 1);
    }

    if dropped > 0 {
        debug!(dropped, ?key, "excluded rows without weight from aggregation");
    }

    totals
        .into_iter()
        .filter_map(|(name, totals)| totals.finish().map(|result| (name, result)))
        .collect()
}

/// Whether a total clears the noise floor. A total exactly at the floor is kept.
pub fn above_noise_floor(result: &AggregateResult, min_value_musd: f64) -> bool {
    result.value_usd / 1e6 >= min_value_musd
}

/// The `n` largest keys by value, minus those below `min_value_musd`.
pub fn top_contributors<T: Tradable>(
    records: &[T],
    key: AggregateKey,
    n: usize,
    min_value_musd: f64,
) -> Vec<(String, AggregateResult)> {
    let mut ranked: Vec<(String, AggregateResult)> = aggregate_by(records, key).into_iter().collect();
    ranked.sort_by(|(a_name, a), (b_name, b)| {
        b.value_usd
            .total_cmp(&a.value_usd)
            .then_with(|| a_name.cmp(b_name))
    });
    ranked.truncate(n);
    ranked.retain(|(_, result)| above_noise_floor(result, min_value_musd));
    ranked
}

/// Price of several totals taken together, from their unrounded sums.
pub fn combined_price<'a, I>(results: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a AggregateResult>,
{
    let mut totals = Totals::default();
    for result in results {
        totals.add(result.value_usd, result.weight_kg, result.records);
    }
    totals.finish().map(|result| result.price_usd_per_ton)
}

/// Headline price: value-weighted USD/t across the top `n` reporters.
pub fn top_n_price<T: Tradable>(records: &[T], n: usize, min_value_musd: f64) -> Option<f64> {
    top_n_price_by(records, AggregateKey::Reporter, n, min_value_musd)
}

/// [`top_n_price`] ranked by an arbitrary key.
pub fn top_n_price_by<T: Tradable>(
    records: &[T],
    key: AggregateKey,
    n: usize,
    min_value_musd: f64,
) -> Option<f64> {
    let top = top_contributors(records, key, n, min_value_musd);
    combined_price(top.iter().map(|(_, result)| result))
}

/// Volume in millions of tons implied by a value total at a given price.
pub fn apparent_volume(value_musd: f64, price_usd_per_ton: f64) -> Option<f64> {
    if price_usd_per_ton > 0.0 {
        Some(round1(value_musd / price_usd_per_ton))
    } else {
        None
    }
}
