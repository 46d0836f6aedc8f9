pub mod probe;

pub use probe::{detect_support, DrmSupportCache, KeySystemAccess, ProbeError, StaticKeySystems};

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::catalog::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySystem {
    Widevine,
    ClearKey,
    PlayReady,
}

impl KeySystem {
    pub fn id(self) -> &'static str {
        match self {
            Self::Widevine => "com.widevine.alpha",
            Self::ClearKey => "org.w3.clearkey",
            Self::PlayReady => "com.microsoft.playready",
        }
    }
}

impl fmt::Display for KeySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Which key systems the runtime can use. Probed once, then cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrmSupport {
    pub widevine: bool,
    pub clearkey: bool,
    pub playready: bool,
}

impl DrmSupport {
    pub fn supports(&self, key_system: KeySystem) -> bool {
        match key_system {
            KeySystem::Widevine => self.widevine,
            KeySystem::ClearKey => self.clearkey,
            KeySystem::PlayReady => self.playready,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobustnessConfig {
    pub video_robustness: String,
    pub audio_robustness: String,
}

impl RobustnessConfig {
    fn software_crypto() -> Self {
        Self {
            video_robustness: "SW_SECURE_CRYPTO".to_string(),
            audio_robustness: "SW_SECURE_CRYPTO".to_string(),
        }
    }
}

/// DRM section handed to the encrypted-adaptive engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrmConfig {
    /// Key system id to license server URI.
    pub servers: BTreeMap<String, String>,
    pub advanced: BTreeMap<String, RobustnessConfig>,
    /// Key id to key value.
    pub clear_keys: BTreeMap<String, String>,
}

impl DrmConfig {
    pub fn widevine(license_server: &str) -> Self {
        let mut config = Self::default();
        config
            .servers
            .insert(KeySystem::Widevine.id().to_string(), license_server.to_string());
        config.advanced.insert(
            KeySystem::Widevine.id().to_string(),
            RobustnessConfig::software_crypto(),
        );
        config
    }

    pub fn clear_key(keys: &BTreeMap<String, String>) -> Self {
        let mut config = Self::default();
        config
            .servers
            .insert(KeySystem::ClearKey.id().to_string(), clear_key_license_uri());
        config.clear_keys = keys.clone();
        config
    }

    /// Credentials taken verbatim from the channel record, no capability checks.
    pub fn from_channel_credentials(channel: &Channel) -> Self {
        let mut config = Self {
            clear_keys: channel.clear_keys.clone(),
            ..Self::default()
        };
        if let Some(ref server) = channel.license_server {
            config
                .servers
                .insert(KeySystem::Widevine.id().to_string(), server.clone());
        }
        config
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty() && self.clear_keys.is_empty()
    }

    pub fn key_system(&self) -> Option<KeySystem> {
        if self.servers.contains_key(KeySystem::Widevine.id()) {
            Some(KeySystem::Widevine)
        } else if !self.clear_keys.is_empty() || self.servers.contains_key(KeySystem::ClearKey.id()) {
            Some(KeySystem::ClearKey)
        } else {
            None
        }
    }
}

/// Inline license for local keys: an empty temporary key set as a data URI.
pub fn clear_key_license_uri() -> String {
    let body = serde_json::json!({ "keys": [], "type": "temporary" });
    format!("data:application/json;base64,{}", STANDARD.encode(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_key_license_is_empty_temporary_set() {
        assert_eq!(
            clear_key_license_uri(),
            "data:application/json;base64,eyJrZXlzIjpbXSwidHlwZSI6InRlbXBvcmFyeSJ9"
        );
    }

    #[test]
    fn widevine_config_carries_robustness() {
        let config = DrmConfig::widevine("https://lic");
        assert_eq!(config.servers["com.widevine.alpha"], "https://lic");
        assert_eq!(
            config.advanced["com.widevine.alpha"].video_robustness,
            "SW_SECURE_CRYPTO"
        );
        assert_eq!(config.key_system(), Some(KeySystem::Widevine));
    }

    #[test]
    fn empty_config_has_no_key_system() {
        let config = DrmConfig::default();
        assert!(config.is_empty());
        assert_eq!(config.key_system(), None);
    }

    #[test]
    fn support_lookup_by_key_system() {
        let support = DrmSupport {
            widevine: false,
            clearkey: true,
            playready: false,
        };
        assert!(support.supports(KeySystem::ClearKey));
        assert!(!support.supports(KeySystem::Widevine));
    }
}
