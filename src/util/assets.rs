use std::borrow::Cow;

use rust_embed::RustEmbed;

use crate::domain::{ClassificationConfig, ConfigError};

/// Embed the entire `assets/` directory into the binary.
#[derive(RustEmbed)]
#[folder = "assets"]
struct EmbeddedAssets;

const DEFAULT_CLASSIFICATION: &str = "classification.json";

/// Raw JSON of the built-in grain-chain classification table.
pub fn default_classification_json() -> Cow<'static, str> {
    match EmbeddedAssets::get(DEFAULT_CLASSIFICATION).map(|file| file.data) {
        Some(Cow::Borrowed(bytes)) => String::from_utf8_lossy(bytes),
        Some(Cow::Owned(bytes)) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
        None => Cow::Borrowed(""),
    }
}

/// The built-in classification table, parsed.
pub fn default_classification() -> Result<ClassificationConfig, ConfigError> {
    ClassificationConfig::from_json(&default_classification_json())
}
