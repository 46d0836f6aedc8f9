use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use super::{load_error, lock, Kill};
use crate::config::StreamingProfile;
use crate::drm::DrmConfig;
use crate::engine::{codes, EncryptedEngine, EngineError, MediaSurface};
use crate::loader::ManifestLoader;

/// What the headless DASH engine learns from an MPD without fetching segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MpdSummary {
    /// `type="dynamic"` on the root element.
    pub live: bool,
    /// `schemeIdUri` of every `ContentProtection` element, in document order.
    pub protection_schemes: Vec<String>,
}

impl MpdSummary {
    pub fn is_protected(&self) -> bool {
        !self.protection_schemes.is_empty()
    }
}

pub fn inspect_mpd(body: &str) -> Result<MpdSummary, String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut summary = MpdSummary::default();
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"MPD" => {
                    saw_root = true;
                    summary.live = get_attribute(e, b"type").as_deref() == Some("dynamic");
                }
                b"ContentProtection" => {
                    if let Some(scheme) = get_attribute(e, b"schemeIdUri") {
                        summary.protection_schemes.push(scheme);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {e}",
                    reader.error_position()
                ))
            }
            _ => {}
        }
    }

    if saw_root {
        Ok(summary)
    } else {
        Err("Document has no MPD element".to_string())
    }
}

fn get_attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .map(|attr| String::from_utf8_lossy(attr.value.as_ref()).into_owned())
}

/// Fetches an MPD and checks that protected content has a key system configured.
pub struct HeadlessDash {
    loader: Arc<dyn ManifestLoader>,
    surface: Mutex<Option<Arc<dyn MediaSurface>>>,
    drm: Mutex<Option<DrmConfig>>,
    streaming: Mutex<Option<StreamingProfile>>,
    live: AtomicBool,
    errors_tx: UnboundedSender<EngineError>,
    errors_rx: Mutex<Option<UnboundedReceiver<EngineError>>>,
    kill: Kill,
}

impl HeadlessDash {
    pub fn new(loader: Arc<dyn ManifestLoader>) -> Self {
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        Self {
            loader,
            surface: Mutex::new(None),
            drm: Mutex::new(None),
            streaming: Mutex::new(None),
            live: AtomicBool::new(false),
            errors_tx,
            errors_rx: Mutex::new(Some(errors_rx)),
            kill: Kill::new(),
        }
    }

    pub fn drm(&self) -> Option<DrmConfig> {
        lock(&self.drm).clone()
    }

    pub fn streaming(&self) -> Option<StreamingProfile> {
        lock(&self.streaming).clone()
    }

    /// Pushes an error onto the post-load stream, as a running player would.
    pub fn report(&self, error: EngineError) {
        let _ = self.errors_tx.send(error);
    }
}

#[async_trait]
impl EncryptedEngine for HeadlessDash {
    async fn attach(&self, surface: Arc<dyn MediaSurface>) -> Result<(), EngineError> {
        if self.kill.is_tripped() {
            return Err(EngineError::interrupted());
        }
        *lock(&self.surface) = Some(surface);
        Ok(())
    }

    fn configure(
        &self,
        drm: Option<&DrmConfig>,
        streaming: &StreamingProfile,
    ) -> Result<(), EngineError> {
        *lock(&self.drm) = drm.cloned();
        *lock(&self.streaming) = Some(streaming.clone());
        Ok(())
    }

    async fn load(&self, manifest: &str) -> Result<(), EngineError> {
        if lock(&self.surface).is_none() {
            return Err(EngineError::fatal(codes::MEDIA_ABORTED, "No media attached"));
        }

        let body = self
            .kill
            .guard(async { self.loader.load(manifest).await.map_err(load_error) })
            .await?;

        let summary = inspect_mpd(&body)
            .map_err(|reason| EngineError::fatal(codes::MANIFEST_INVALID, reason))?;

        if summary.is_protected() {
            let has_keys = lock(&self.drm).as_ref().is_some_and(|drm| !drm.is_empty());
            if !has_keys {
                return Err(EngineError::fatal(
                    codes::KEY_SYSTEM_UNAVAILABLE,
                    "No key system configured for protected content",
                ));
            }
        }

        self.live.store(summary.live, Ordering::SeqCst);
        debug!(
            manifest,
            live = summary.live,
            schemes = summary.protection_schemes.len(),
            "MPD loaded"
        );
        Ok(())
    }

    fn take_errors(&self) -> Option<UnboundedReceiver<EngineError>> {
        lock(&self.errors_rx).take()
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn destroy(&self) -> Result<(), EngineError> {
        self.kill.trip();
        lock(&self.surface).take();
        Ok(())
    }
}
