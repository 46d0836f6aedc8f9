//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! catalog = "https://tv.example.com/channels.json"
//!
//! [server]
//! listen = "0.0.0.0:8080"
//! log_format = "json"
//!
//! [player]
//! max_fallback_attempts = 2
//! max_total_retries = 10
//! switch_guard_timeout_ms = 8000
//! drm_probe_timeout_ms = 3000
//! license_error_codes = [4032, 6001]
//! autoplay = true
//!
//! [drm]
//! widevine = true
//! clearkey = true
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use iptv_core::{CatalogSource, FileCatalog, ManifestLoader, PlayerConfig, StaticKeySystems, UrlCatalog};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Channel list location: an http(s) URL or a local path.
    #[serde(default)]
    pub catalog: Option<String>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub player: PlayerSection,

    #[serde(default)]
    pub drm: DrmSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_format: default_log_format(),
        }
    }
}

pub fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_log_format() -> String {
    "pretty".into()
}

/// Overrides on top of [`PlayerConfig::default`].
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSection {
    #[serde(default)]
    pub max_fallback_attempts: Option<u32>,

    #[serde(default)]
    pub max_total_retries: Option<u32>,

    #[serde(default)]
    pub autoplay_delay_ms: Option<u64>,

    #[serde(default)]
    pub fallback_delay_ms: Option<u64>,

    #[serde(default)]
    pub switch_guard_timeout_ms: Option<u64>,

    #[serde(default)]
    pub drm_probe_timeout_ms: Option<u64>,

    #[serde(default)]
    pub license_error_codes: Option<Vec<u32>>,

    #[serde(default)]
    pub encrypted_manifest_ext: Option<String>,

    #[serde(default)]
    pub clear_manifest_ext: Option<String>,

    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    #[serde(default)]
    pub max_retries: Option<u32>,

    #[serde(default)]
    pub event_limit: Option<usize>,

    #[serde(default)]
    pub error_limit: Option<usize>,

    /// Select the first channel once the catalog is loaded.
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            max_fallback_attempts: None,
            max_total_retries: None,
            autoplay_delay_ms: None,
            fallback_delay_ms: None,
            switch_guard_timeout_ms: None,
            drm_probe_timeout_ms: None,
            license_error_codes: None,
            encrypted_manifest_ext: None,
            clear_manifest_ext: None,
            request_timeout_ms: None,
            max_retries: None,
            event_limit: None,
            error_limit: None,
            autoplay: default_autoplay(),
        }
    }
}

fn default_autoplay() -> bool {
    true
}

impl PlayerSection {
    pub fn to_player_config(&self) -> PlayerConfig {
        let mut c = PlayerConfig::default();
        if let Some(v) = self.max_fallback_attempts {
            c = c.with_max_fallback_attempts(v);
        }
        if let Some(v) = self.max_total_retries {
            c = c.with_max_total_retries(v);
        }
        if let Some(v) = self.autoplay_delay_ms {
            c = c.with_autoplay_delay(v);
        }
        if let Some(v) = self.fallback_delay_ms {
            c = c.with_fallback_delay(v);
        }
        if let Some(v) = self.switch_guard_timeout_ms {
            c = c.with_switch_guard_timeout(v);
        }
        if let Some(v) = self.drm_probe_timeout_ms {
            c = c.with_drm_probe_timeout(v);
        }
        if let Some(ref v) = self.license_error_codes {
            c = c.with_license_error_codes(v.clone());
        }
        if self.encrypted_manifest_ext.is_some() || self.clear_manifest_ext.is_some() {
            let encrypted = self
                .encrypted_manifest_ext
                .clone()
                .unwrap_or_else(|| c.encrypted_manifest_ext.clone());
            let clear = self
                .clear_manifest_ext
                .clone()
                .unwrap_or_else(|| c.clear_manifest_ext.clone());
            c = c.with_manifest_extensions(encrypted, clear);
        }
        if let Some(v) = self.request_timeout_ms {
            c = c.with_request_timeout(v);
        }
        if let Some(v) = self.max_retries {
            c = c.with_max_retries(v);
        }
        if let Some(v) = self.event_limit {
            c = c.with_event_limit(v);
        }
        if let Some(v) = self.error_limit {
            c = c.with_error_limit(v);
        }
        c
    }
}

/// Key systems the headless backends report as available.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DrmSection {
    #[serde(default = "enabled")]
    pub widevine: bool,

    #[serde(default = "enabled")]
    pub clearkey: bool,

    #[serde(default)]
    pub playready: bool,
}

impl Default for DrmSection {
    fn default() -> Self {
        Self {
            widevine: true,
            clearkey: true,
            playready: false,
        }
    }
}

fn enabled() -> bool {
    true
}

impl DrmSection {
    pub fn to_key_systems(self) -> StaticKeySystems {
        StaticKeySystems {
            widevine: self.widevine,
            clearkey: self.clearkey,
            playready: self.playready,
        }
    }
}

/// Where a channel list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    Url(String),
    File(PathBuf),
}

impl CatalogLocation {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid("catalog", "must not be empty"));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            url::Url::parse(raw).map_err(|e| invalid("catalog", format!("{raw} ({e})")))?;
            return Ok(Self::Url(raw.to_string()));
        }
        Ok(Self::File(PathBuf::from(raw)))
    }

    pub fn into_source(self, loader: Arc<dyn ManifestLoader>) -> Box<dyn CatalogSource> {
        match self {
            Self::Url(url) => Box::new(UrlCatalog::new(url, loader)),
            Self::File(path) => Box::new(FileCatalog::new(path)),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn catalog_location(&self) -> Result<Option<CatalogLocation>, ConfigError> {
        self.catalog.as_deref().map(CatalogLocation::parse).transpose()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.catalog_location()?;

        match self.server.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(invalid(
                    "server.log_format",
                    format!("'{}': must be 'pretty' or 'json'", other),
                ));
            }
        }

        let player = &self.player;
        if player.request_timeout_ms == Some(0) {
            return Err(invalid("player.request_timeout_ms", "must be greater than 0"));
        }
        if player.switch_guard_timeout_ms == Some(0) {
            return Err(invalid("player.switch_guard_timeout_ms", "must be greater than 0"));
        }
        if player.drm_probe_timeout_ms == Some(0) {
            return Err(invalid("player.drm_probe_timeout_ms", "must be greater than 0"));
        }
        for (field, ext) in [
            ("player.encrypted_manifest_ext", &player.encrypted_manifest_ext),
            ("player.clear_manifest_ext", &player.clear_manifest_ext),
        ] {
            if let Some(ext) = ext {
                if !ext.starts_with('.') || ext.len() < 2 {
                    return Err(invalid(field, format!("'{}': must look like '.ext'", ext)));
                }
            }
        }
        if let (Some(enc), Some(clear)) = (&player.encrypted_manifest_ext, &player.clear_manifest_ext) {
            if enc == clear {
                return Err(invalid(
                    "player.clear_manifest_ext",
                    "must differ from player.encrypted_manifest_ext",
                ));
            }
        }

        Ok(())
    }
}
