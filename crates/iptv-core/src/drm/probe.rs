//! Key-system capability probing.
//!
//! The two queries run concurrently and settle independently: a rejected or
//! slow Widevine query never fails the ClearKey answer and the combined
//! result only resolves once both have settled. Each query is bounded by a
//! timeout, so a record always settles. The result is cached by
//! [`DrmSupportCache`] for the lifetime of the player.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{DrmSupport, KeySystem};

#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("Key system {0} is not available")]
    Unavailable(KeySystem),
    #[error("Capability query for {key_system} failed: {reason}")]
    Query {
        key_system: KeySystem,
        reason: String,
    },
    #[error("Capability query for {0} timed out")]
    TimedOut(KeySystem),
}

/// One capability query per key system, as a platform DRM module answers it.
#[async_trait]
pub trait KeySystemAccess: Send + Sync {
    async fn request_access(&self, key_system: KeySystem) -> Result<(), ProbeError>;
}

async fn query(
    access: &dyn KeySystemAccess,
    key_system: KeySystem,
    timeout: Duration,
) -> Result<(), ProbeError> {
    tokio::time::timeout(timeout, access.request_access(key_system))
        .await
        .unwrap_or(Err(ProbeError::TimedOut(key_system)))
}

/// Never rejects: a failed or unanswered query reports the key system as unsupported.
pub async fn detect_support(access: &dyn KeySystemAccess, timeout: Duration) -> DrmSupport {
    let (widevine, clearkey) = futures::join!(
        query(access, KeySystem::Widevine, timeout),
        query(access, KeySystem::ClearKey, timeout),
    );

    for (key_system, outcome) in [(KeySystem::Widevine, &widevine), (KeySystem::ClearKey, &clearkey)] {
        match outcome {
            Ok(()) => debug!(%key_system, "Key system supported"),
            Err(e) => debug!(%key_system, error = %e, "Key system not supported"),
        }
    }

    DrmSupport {
        widevine: widevine.is_ok(),
        clearkey: clearkey.is_ok(),
        playready: false,
    }
}

pub struct DrmSupportCache {
    access: Arc<dyn KeySystemAccess>,
    timeout: Duration,
    cached: Mutex<Option<DrmSupport>>,
}

impl DrmSupportCache {
    pub fn new(access: Arc<dyn KeySystemAccess>, timeout: Duration) -> Self {
        Self {
            access,
            timeout,
            cached: Mutex::new(None),
        }
    }

    /// Cached record, probing on first use. Concurrent callers share one probe.
    pub async fn get(&self) -> DrmSupport {
        let mut cached = self.cached.lock().await;
        if let Some(support) = *cached {
            return support;
        }
        let support = detect_support(self.access.as_ref(), self.timeout).await;
        info!(
            widevine = support.widevine,
            clearkey = support.clearkey,
            playready = support.playready,
            "DRM support detected"
        );
        *cached = Some(support);
        support
    }

    pub async fn peek(&self) -> Option<DrmSupport> {
        *self.cached.lock().await
    }

    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }
}

/// Answers capability queries from configuration. Used by the headless backend.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StaticKeySystems {
    #[serde(default)]
    pub widevine: bool,
    #[serde(default)]
    pub clearkey: bool,
    #[serde(default)]
    pub playready: bool,
}

#[async_trait]
impl KeySystemAccess for StaticKeySystems {
    async fn request_access(&self, key_system: KeySystem) -> Result<(), ProbeError> {
        let supported = match key_system {
            KeySystem::Widevine => self.widevine,
            KeySystem::ClearKey => self.clearkey,
            KeySystem::PlayReady => self.playready,
        };
        if supported {
            Ok(())
        } else {
            Err(ProbeError::Unavailable(key_system))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

    struct SlowWidevineFailure {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeySystemAccess for SlowWidevineFailure {
        async fn request_access(&self, key_system: KeySystem) -> Result<(), ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match key_system {
                KeySystem::Widevine => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err(ProbeError::Query {
                        key_system,
                        reason: "NotSupportedError".to_string(),
                    })
                }
                _ => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn queries_settle_independently() {
        let access = SlowWidevineFailure {
            calls: AtomicUsize::new(0),
        };
        let support = detect_support(&access, PROBE_TIMEOUT).await;
        assert!(!support.widevine);
        assert!(support.clearkey);
        assert!(!support.playready);
        assert_eq!(access.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_probes_once_until_invalidated() {
        let access = Arc::new(SlowWidevineFailure {
            calls: AtomicUsize::new(0),
        });
        let cache = DrmSupportCache::new(access.clone(), PROBE_TIMEOUT);
        assert_eq!(cache.peek().await, None);

        let first = cache.get().await;
        let second = cache.get().await;
        assert_eq!(first, second);
        assert_eq!(access.calls.load(Ordering::SeqCst), 2);

        cache.invalidate().await;
        assert_eq!(cache.peek().await, None);
        cache.get().await;
        assert_eq!(access.calls.load(Ordering::SeqCst), 4);
    }

    /// Widevine never answers; ClearKey answers at once.
    struct SilentWidevine;

    #[async_trait]
    impl KeySystemAccess for SilentWidevine {
        async fn request_access(&self, key_system: KeySystem) -> Result<(), ProbeError> {
            if key_system == KeySystem::Widevine {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_query_times_out_as_unsupported() {
        let cache = DrmSupportCache::new(Arc::new(SilentWidevine), PROBE_TIMEOUT);
        let started = tokio::time::Instant::now();

        let support = cache.get().await;
        assert!(!support.widevine);
        assert!(support.clearkey);
        assert!(started.elapsed() >= PROBE_TIMEOUT);
        assert_eq!(cache.peek().await, Some(support));
    }

    #[tokio::test]
    async fn static_key_systems_follow_flags() {
        let access = StaticKeySystems {
            widevine: true,
            clearkey: false,
            playready: false,
        };
        let support = detect_support(&access, PROBE_TIMEOUT).await;
        assert!(support.widevine);
        assert!(!support.clearkey);
    }
}
