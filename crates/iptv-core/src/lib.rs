#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod drm;
pub mod engine;
pub mod loader;
pub mod player;
pub mod view;

pub use catalog::{CatalogError, CatalogSource, Channel, ChannelKind, FileCatalog, UrlCatalog};
pub use config::{BufferProfile, PlayerConfig, StreamingProfile};
pub use drm::{DrmConfig, DrmSupport, KeySystem, KeySystemAccess, StaticKeySystems};
pub use engine::headless::HeadlessFactory;
pub use engine::{EngineError, EngineFactory, EngineKind, QualityChoice, QualityLevel};
pub use loader::{HttpLoader, LoadError, ManifestLoader};
pub use player::{
    AttemptStage, EventKind, FailureType, LoadOutcome, PlaybackFailure, PlaybackState, Player,
    PlayerEvent, PlayerInfo, QualityError, SelectError,
};
pub use view::{PlayerView, StatusBoard, ViewSnapshot};
