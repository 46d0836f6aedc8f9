use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::loader::{LoadError, ManifestLoader};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to fetch channel list: {0}")]
    Fetch(#[from] LoadError),
    #[error("Failed to read channel list {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("channels.json is not valid JSON: {0}")]
    Parse(String),
    #[error("channels.json is not an array")]
    NotArray,
}

/// Supplies the raw, unvalidated channel records.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Value>, CatalogError>;

    /// Where the records come from, for log lines.
    fn describe(&self) -> String;
}

pub fn parse_catalog(body: &str) -> Result<Vec<Value>, CatalogError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(records)) => Ok(records),
        Ok(_) => Err(CatalogError::NotArray),
        Err(e) => Err(CatalogError::Parse(e.to_string())),
    }
}

/// Catalog served over HTTP. Fetched once per call, never retried.
pub struct UrlCatalog {
    url: String,
    loader: Arc<dyn ManifestLoader>,
}

impl UrlCatalog {
    pub fn new(url: impl Into<String>, loader: Arc<dyn ManifestLoader>) -> Self {
        Self {
            url: url.into(),
            loader,
        }
    }
}

#[async_trait]
impl CatalogSource for UrlCatalog {
    async fn fetch(&self) -> Result<Vec<Value>, CatalogError> {
        debug!(url = %self.url, "Fetching channel list");
        let body = self.loader.load(&self.url).await?;
        parse_catalog(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Catalog stored as a local JSON file.
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalog {
    async fn fetch(&self) -> Result<Vec<Value>, CatalogError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CatalogError::Io {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        parse_catalog(&body)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
