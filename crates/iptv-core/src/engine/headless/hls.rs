use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use m3u8_rs::Playlist;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use super::{load_error, lock, Kill};
use crate::config::BufferProfile;
use crate::engine::{codes, AdaptiveEngine, EngineError, MediaSurface, QualityLevel};
use crate::loader::ManifestLoader;

/// Fetches and parses HLS playlists; master playlists yield the quality ladder.
pub struct HeadlessHls {
    loader: Arc<dyn ManifestLoader>,
    profile: BufferProfile,
    surface: Mutex<Option<Arc<dyn MediaSurface>>>,
    level: AtomicI32,
    errors_tx: UnboundedSender<EngineError>,
    errors_rx: Mutex<Option<UnboundedReceiver<EngineError>>>,
    kill: Kill,
}

impl HeadlessHls {
    pub fn new(loader: Arc<dyn ManifestLoader>, profile: BufferProfile) -> Self {
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        Self {
            loader,
            profile,
            surface: Mutex::new(None),
            level: AtomicI32::new(-1),
            errors_tx,
            errors_rx: Mutex::new(Some(errors_rx)),
            kill: Kill::new(),
        }
    }

    pub fn current_level(&self) -> i32 {
        self.level.load(Ordering::SeqCst)
    }

    pub fn profile(&self) -> &BufferProfile {
        &self.profile
    }
}

#[async_trait]
impl AdaptiveEngine for HeadlessHls {
    fn attach_media(&self, surface: Arc<dyn MediaSurface>) -> Result<(), EngineError> {
        if self.kill.is_tripped() {
            return Err(EngineError::fatal(codes::MEDIA_ABORTED, "Engine destroyed"));
        }
        *lock(&self.surface) = Some(surface);
        Ok(())
    }

    async fn load_source(&self, manifest: &str) -> Result<Vec<QualityLevel>, EngineError> {
        if lock(&self.surface).is_none() {
            return Err(EngineError::fatal(codes::MEDIA_ABORTED, "No media attached"));
        }

        let body = self
            .kill
            .guard(async { self.loader.load(manifest).await.map_err(load_error) })
            .await?;

        match m3u8_rs::parse_playlist_res(body.as_bytes()) {
            Ok(Playlist::MasterPlaylist(master)) => {
                let levels: Vec<QualityLevel> = master
                    .variants
                    .iter()
                    .filter(|v| !v.is_i_frame)
                    .map(|v| QualityLevel {
                        height: v.resolution.as_ref().and_then(|r| u32::try_from(r.height).ok()),
                        bitrate: Some(v.bandwidth),
                    })
                    .collect();
                debug!(manifest, levels = levels.len(), "Master playlist parsed");
                Ok(levels)
            }
            Ok(Playlist::MediaPlaylist(media)) => {
                if media.segments.is_empty() {
                    let _ = self.errors_tx.send(EngineError::recoverable(
                        codes::MEDIA_NETWORK,
                        "Media playlist has no segments yet",
                    ));
                }
                debug!(manifest, segments = media.segments.len(), "Media playlist parsed");
                Ok(Vec::new())
            }
            Err(e) => Err(EngineError::fatal(
                codes::MANIFEST_INVALID,
                format!("Manifest parsing error: {e}"),
            )),
        }
    }

    fn take_errors(&self) -> Option<UnboundedReceiver<EngineError>> {
        lock(&self.errors_rx).take()
    }

    fn set_current_level(&self, level: i32) {
        self.level.store(level, Ordering::SeqCst);
    }

    fn stop_load(&self) -> Result<(), EngineError> {
        self.kill.trip();
        Ok(())
    }

    fn destroy(&self) -> Result<(), EngineError> {
        self.kill.trip();
        lock(&self.surface).take();
        Ok(())
    }
}
