//! Network-only engines.
//!
//! They fetch and inspect what a real engine would load (HLS playlists, DASH
//! manifests, embed pages) without decoding or rendering anything, which is
//! enough to drive selection, failure classification and fallback from a
//! terminal or the HTTP API.

mod dash;
mod embed;
mod hls;

pub use dash::{inspect_mpd, HeadlessDash, MpdSummary};
pub use embed::HeadlessEmbed;
pub use hls::HeadlessHls;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

use super::{
    codes, AdaptiveEngine, EmbedFrame, EncryptedEngine, EngineError, EngineFactory, MediaSurface,
    PlayError,
};
use crate::config::BufferProfile;
use crate::loader::{LoadError, ManifestLoader};

pub struct HeadlessFactory {
    loader: Arc<dyn ManifestLoader>,
    autoplay_blocked: bool,
}

impl HeadlessFactory {
    pub fn new(loader: Arc<dyn ManifestLoader>) -> Self {
        Self {
            loader,
            autoplay_blocked: false,
        }
    }

    /// Surfaces created by this factory reject `play()` like a browser without a user gesture.
    pub fn with_autoplay_blocked(mut self, blocked: bool) -> Self {
        self.autoplay_blocked = blocked;
        self
    }
}

impl EngineFactory for HeadlessFactory {
    fn create_surface(&self) -> Arc<dyn MediaSurface> {
        Arc::new(HeadlessSurface::new(self.autoplay_blocked))
    }

    fn create_embed(&self) -> Arc<dyn EmbedFrame> {
        Arc::new(HeadlessEmbed::new(Arc::clone(&self.loader)))
    }

    fn create_adaptive(&self, profile: &BufferProfile) -> Result<Arc<dyn AdaptiveEngine>, EngineError> {
        Ok(Arc::new(HeadlessHls::new(Arc::clone(&self.loader), profile.clone())))
    }

    fn create_encrypted(&self) -> Result<Arc<dyn EncryptedEngine>, EngineError> {
        Ok(Arc::new(HeadlessDash::new(Arc::clone(&self.loader))))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SurfaceState {
    pub playing: bool,
    pub paused: bool,
    pub source_detached: bool,
    pub removed: bool,
}

pub struct HeadlessSurface {
    autoplay_blocked: bool,
    state: Mutex<SurfaceState>,
}

impl HeadlessSurface {
    pub fn new(autoplay_blocked: bool) -> Self {
        Self {
            autoplay_blocked,
            state: Mutex::new(SurfaceState::default()),
        }
    }

    pub fn state(&self) -> SurfaceState {
        *lock(&self.state)
    }
}

#[async_trait]
impl MediaSurface for HeadlessSurface {
    async fn play(&self) -> Result<(), PlayError> {
        let mut state = lock(&self.state);
        if state.removed {
            return Err(PlayError::Failed("surface was removed".to_string()));
        }
        if self.autoplay_blocked {
            return Err(PlayError::AutoplayBlocked("NotAllowedError".to_string()));
        }
        state.playing = true;
        state.paused = false;
        Ok(())
    }

    fn pause(&self) -> Result<(), EngineError> {
        let mut state = lock(&self.state);
        state.playing = false;
        state.paused = true;
        Ok(())
    }

    fn detach_source(&self) -> Result<(), EngineError> {
        lock(&self.state).source_detached = true;
        Ok(())
    }

    fn remove(&self) -> Result<(), EngineError> {
        lock(&self.state).removed = true;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Trips once on destroy/stop; in-flight loads observe it and bail out.
#[derive(Debug)]
struct Kill {
    tx: watch::Sender<bool>,
}

impl Kill {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    fn trip(&self) {
        self.tx.send_replace(true);
    }

    fn is_tripped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Runs `fut` unless the switch trips first.
    async fn guard<T, F>(&self, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        if self.is_tripped() {
            return Err(EngineError::interrupted());
        }
        let mut rx = self.tx.subscribe();
        tokio::select! {
            _ = async { rx.wait_for(|tripped| *tripped).await.is_ok() } => {
                Err(EngineError::interrupted())
            }
            result = fut => result,
        }
    }
}

fn load_error(err: LoadError) -> EngineError {
    let code = match &err {
        LoadError::Status { .. } => codes::BAD_HTTP_STATUS,
        LoadError::Timeout { .. } => codes::TIMEOUT,
        LoadError::Network { .. } => codes::HTTP_ERROR,
        LoadError::Client(_) => codes::ENGINE_UNSUPPORTED,
    };
    EngineError::fatal(code, err.to_string())
}
