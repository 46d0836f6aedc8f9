//! Playback backends as the orchestrator sees them.
//!
//! Three engine families with different error-reporting shapes:
//!
//! - [`EmbedFrame`]: a third-party player in a frame; one load-or-error signal.
//! - [`AdaptiveEngine`]: segmented HTTP streaming; resolves when the manifest is
//!   parsed, then reports errors on a stream where only fatal ones matter.
//! - [`EncryptedEngine`]: DRM-capable adaptive streaming; promise-like load plus
//!   asynchronous errors after load.
//!
//! An [`EngineFactory`] produces concrete instances; [`headless`] is the
//! network-only implementation used by the CLI and the API.

pub mod headless;
pub mod plan;
pub mod quality;

pub use plan::{build_plan, select_drm, EnginePlan};
pub use quality::{quality_options, QualityChoice, QualityLevel, QualityOption};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::{BufferProfile, StreamingProfile};
use crate::drm::DrmConfig;

/// Error codes shared by the engines. Media element codes are 1-4, the
/// encrypted engine uses its own four-digit taxonomy.
pub mod codes {
    pub const MEDIA_ABORTED: u32 = 1;
    pub const MEDIA_NETWORK: u32 = 2;
    pub const MEDIA_DECODE: u32 = 3;
    pub const MEDIA_UNSUPPORTED: u32 = 4;
    pub const BAD_HTTP_STATUS: u32 = 1001;
    pub const HTTP_ERROR: u32 = 1002;
    pub const TIMEOUT: u32 = 1003;
    pub const MANIFEST_INVALID: u32 = 4001;
    pub const KEY_SYSTEM_UNAVAILABLE: u32 = 6001;
    pub const LICENSE_REQUEST_FAILED: u32 = 6007;
    pub const LOAD_INTERRUPTED: u32 = 7000;
    pub const ENGINE_UNSUPPORTED: u32 = 9000;
    pub const NO_STREAM_LINK: u32 = 9001;
    pub const UNSUPPORTED_TYPE: u32 = 9002;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    None,
    EmbeddedVideo,
    AdaptiveHttp,
    EncryptedAdaptive,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::EmbeddedVideo => write!(f, "embedded-video"),
            Self::AdaptiveHttp => write!(f, "adaptive-http"),
            Self::EncryptedAdaptive => write!(f, "encrypted-adaptive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct EngineError {
    pub code: u32,
    pub fatal: bool,
    pub message: String,
}

impl EngineError {
    pub fn fatal(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            fatal: true,
            message: message.into(),
        }
    }

    pub fn recoverable(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            fatal: false,
            message: message.into(),
        }
    }

    pub fn interrupted() -> Self {
        Self::fatal(codes::LOAD_INTERRUPTED, "Load interrupted by teardown")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayError {
    /// The runtime refused to start playback without a user gesture.
    #[error("Autoplay prevented: {0}")]
    AutoplayBlocked(String),
    #[error("Playback did not start: {0}")]
    Failed(String),
}

/// The video element the engines render into.
#[async_trait]
pub trait MediaSurface: Send + Sync {
    async fn play(&self) -> Result<(), PlayError>;
    fn pause(&self) -> Result<(), EngineError>;
    fn detach_source(&self) -> Result<(), EngineError>;
    fn remove(&self) -> Result<(), EngineError>;
}

#[async_trait]
pub trait EmbedFrame: Send + Sync {
    /// Resolves when the frame signals load or error.
    async fn load(&self, src: &str) -> Result<(), EngineError>;
    fn remove(&self) -> Result<(), EngineError>;
}

#[async_trait]
pub trait AdaptiveEngine: Send + Sync {
    fn attach_media(&self, surface: Arc<dyn MediaSurface>) -> Result<(), EngineError>;
    /// Resolves with the quality ladder once the manifest is parsed, or with the first fatal error.
    async fn load_source(&self, manifest: &str) -> Result<Vec<QualityLevel>, EngineError>;
    /// Errors reported after load, fatal and recoverable alike. Yields `Some` once.
    fn take_errors(&self) -> Option<UnboundedReceiver<EngineError>>;
    /// `-1` restores automatic level selection.
    fn set_current_level(&self, level: i32);
    fn stop_load(&self) -> Result<(), EngineError>;
    fn destroy(&self) -> Result<(), EngineError>;
}

#[async_trait]
pub trait EncryptedEngine: Send + Sync {
    async fn attach(&self, surface: Arc<dyn MediaSurface>) -> Result<(), EngineError>;
    fn configure(
        &self,
        drm: Option<&DrmConfig>,
        streaming: &StreamingProfile,
    ) -> Result<(), EngineError>;
    async fn load(&self, manifest: &str) -> Result<(), EngineError>;
    /// Errors reported after load. Yields `Some` once.
    fn take_errors(&self) -> Option<UnboundedReceiver<EngineError>>;
    fn is_live(&self) -> bool;
    fn destroy(&self) -> Result<(), EngineError>;
}

pub trait EngineFactory: Send + Sync {
    fn create_surface(&self) -> Arc<dyn MediaSurface>;
    fn create_embed(&self) -> Arc<dyn EmbedFrame>;
    fn create_adaptive(&self, profile: &BufferProfile) -> Result<Arc<dyn AdaptiveEngine>, EngineError>;
    fn create_encrypted(&self) -> Result<Arc<dyn EncryptedEngine>, EngineError>;
}

/// The one engine a session may hold.
#[derive(Clone)]
pub enum EngineHandle {
    Embed(Arc<dyn EmbedFrame>),
    Adaptive(Arc<dyn AdaptiveEngine>),
    Encrypted(Arc<dyn EncryptedEngine>),
}

impl EngineHandle {
    pub fn kind(&self) -> EngineKind {
        match self {
            Self::Embed(_) => EngineKind::EmbeddedVideo,
            Self::Adaptive(_) => EngineKind::AdaptiveHttp,
            Self::Encrypted(_) => EngineKind::EncryptedAdaptive,
        }
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineHandle({})", self.kind())
    }
}
