//! Text fetching for channel lists, manifests and embed pages.

mod http;

pub use http::HttpLoader;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Bad HTTP status {status} for {url}")]
    Status { url: String, status: u16, attempts: u32 },
    #[error("Request to {url} failed: {reason}")]
    Network {
        url: String,
        reason: String,
        attempts: u32,
    },
    #[error("Request to {url} timed out")]
    Timeout { url: String, attempts: u32 },
    #[error("Cannot build HTTP client: {0}")]
    Client(String),
}

impl LoadError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Requests sent before giving up. Zero when no request left the client.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Status { attempts, .. }
            | Self::Network { attempts, .. }
            | Self::Timeout { attempts, .. } => *attempts,
            Self::Client(_) => 0,
        }
    }

    /// Client errors other than 429 are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => !(400..500).contains(status) || *status == 429,
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Client(_) => false,
        }
    }
}

/// Fetches a manifest, catalog or embed document as text.
///
/// Shared by the headless engines and the URL catalog so both go through the
/// same pooled client and retry policy.
#[async_trait]
pub trait ManifestLoader: Send + Sync {
    async fn load(&self, uri: &str) -> Result<String, LoadError>;
}
