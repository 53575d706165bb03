//! Domain logic for commodity classification and price estimation lives here.

pub mod aggregation;
pub mod classification;
pub mod code;
pub mod entities;
pub mod frame;

pub use aggregation::{
    above_noise_floor, aggregate_by, apparent_volume, combined_price, top_contributors,
    top_n_price, top_n_price_by, AggregateKey, Tradable, DEFAULT_MIN_VALUE_MUSD, DEFAULT_TOP_N,
};
pub use classification::{select, ClassificationConfig, Classifier, ConfigError, Group};
pub use code::{matches, CommodityCode, InvalidCode};
pub use entities::{
    round1, AggregateResult, Flow, LabeledRecord, OutputRow, RecordSet, TradeRecord,
};
pub use frame::{
    display_description, merge, normalize, ColumnSchema, RawRow, SchemaError, API_COLUMNS,
    EXTRACT_COLUMNS,
};
