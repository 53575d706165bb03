//! Persistent on-disk cache for raw API responses.
//!
//! Entries are keyed by the SHA-256 of the request URL and never expire;
//! delete the cache directory to force a refetch.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, warn};

use super::comtrade::{ClientError, Transport};

const APP_DIR: &str = "comtrade-prices";
const RESPONSES_DIR: &str = "responses";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt cache entry {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One cached response together with where and when it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    /// RFC 3339 timestamp of the original fetch.
    pub cached_at: String,
    pub body: Value,
}

impl CacheEntry {
    pub fn new(url: &Url, body: Value) -> Self {
        let cached_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            url: url.to_string(),
            cached_at,
            body,
        }
    }

    /// Human-readable age string.
    pub fn age_string(&self) -> String {
        let Ok(cached_at) = OffsetDateTime::parse(&self.cached_at, &Rfc3339) else {
            return "unknown".to_string();
        };
        let secs = (OffsetDateTime::now_utc() - cached_at).whole_seconds().max(0);
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }
}

/// Default cache location in the user's local data directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(RESPONSES_DIR)
}

pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: PathBuf) -> Result<Self, CacheError> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, url: &Url) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        self.dir.join(format!("{:x}.json", hasher.finalize()))
    }

    /// Cached entry for `url`, if any. A file that does not parse is an error,
    /// not a miss.
    pub fn load(&self, url: &Url) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.path_for(url);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CacheError::Corrupt { path, source })
    }

    pub fn store(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let url = Url::parse(&entry.url).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let path = self.path_for(&url);
        // Compact, not pretty: AG6 country responses run to tens of MB.
        let content = serde_json::to_string(entry).map_err(|source| CacheError::Corrupt {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, content)?;
        Ok(())
    }
}

/// A [`Transport`] that answers from the cache and falls back to `inner`.
pub struct CachedTransport<T> {
    inner: T,
    cache: ResponseCache,
}

impl<T: Transport> CachedTransport<T> {
    pub fn new(inner: T, cache: ResponseCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}

#[async_trait]
impl<T: Transport> Transport for CachedTransport<T> {
    async fn get_json(&self, url: &Url) -> Result<Value, ClientError> {
        if let Some(entry) = self.cache.load(url)? {
            debug!(%url, age = %entry.age_string(), "cache hit");
            return Ok(entry.body);
        }

        debug!(%url, "cache miss");
        let body = self.inner.get_json(url).await?;
        let entry = CacheEntry::new(url, body);
        if let Err(e) = self.cache.store(&entry) {
            warn!(%url, "failed to save cache entry: {e}");
        }
        Ok(entry.body)
    }
}
