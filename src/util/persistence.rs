use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::{debug, info};

use crate::domain::{ClassificationConfig, ConfigError};
use crate::util::assets::default_classification;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "ComtradePrices";
const APP_NAME: &str = "ComtradePrices";
const CLASSIFICATION_FILE: &str = "classification.json";

/// Where a user override of the classification table is looked up.
pub fn classification_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CLASSIFICATION_FILE))
}

/// Resolve the classification table: an explicit path, then the user config
/// directory, then the embedded default.
pub fn load_classification(explicit: Option<&Path>) -> Result<ClassificationConfig, LoadError> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    if let Some(path) = classification_file().filter(|path| path.exists()) {
        return read_config(&path);
    }
    debug!("using built-in classification table");
    Ok(default_classification()?)
}

fn read_config(path: &Path) -> Result<ClassificationConfig, LoadError> {
    let data = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = ClassificationConfig::from_json(&data)?;
    info!(path = %path.display(), groups = config.groups.len(), "loaded classification table");
    Ok(config)
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
