use crate::catalog::{Channel, ChannelKind, DrmKind};
use crate::config::{BufferProfile, PlayerConfig, StreamingProfile};
use crate::drm::{DrmConfig, DrmSupport};

use super::{codes, EngineError, EngineKind};

/// What to attach for a channel. Built without side effects.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePlan {
    Embed {
        src: String,
    },
    Adaptive {
        manifest: String,
        profile: BufferProfile,
    },
    Encrypted {
        manifest: String,
        drm: Option<DrmConfig>,
        streaming: StreamingProfile,
    },
}

impl EnginePlan {
    pub fn engine_kind(&self) -> EngineKind {
        match self {
            Self::Embed { .. } => EngineKind::EmbeddedVideo,
            Self::Adaptive { .. } => EngineKind::AdaptiveHttp,
            Self::Encrypted { .. } => EngineKind::EncryptedAdaptive,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Embed { src } => src,
            Self::Adaptive { manifest, .. } | Self::Encrypted { manifest, .. } => manifest,
        }
    }

    pub fn adaptive(manifest: impl Into<String>, config: &PlayerConfig) -> Self {
        Self::Adaptive {
            manifest: manifest.into(),
            profile: config.buffer_profile.clone(),
        }
    }

    pub fn encrypted(manifest: impl Into<String>, drm: Option<DrmConfig>, config: &PlayerConfig) -> Self {
        Self::Encrypted {
            manifest: manifest.into(),
            drm,
            streaming: config.streaming_profile.clone(),
        }
    }
}

/// Chooses the backend for `channel`. Fails only for channels that can never play.
pub fn build_plan(
    channel: &Channel,
    support: &DrmSupport,
    config: &PlayerConfig,
) -> Result<EnginePlan, EngineError> {
    if !channel.is_playable() {
        return Err(EngineError::fatal(codes::NO_STREAM_LINK, "No stream link"));
    }
    match channel.kind {
        ChannelKind::EmbeddedVideo => Ok(EnginePlan::Embed {
            src: channel.link.clone(),
        }),
        ChannelKind::AdaptiveHttp => Ok(EnginePlan::adaptive(&channel.link, config)),
        ChannelKind::EncryptedAdaptive => Ok(EnginePlan::encrypted(
            &channel.link,
            select_drm(channel, support),
            config,
        )),
        ChannelKind::Unsupported => Err(EngineError::fatal(
            codes::UNSUPPORTED_TYPE,
            format!("Unsupported stream type: {}", channel.raw_type),
        )),
    }
}

/// Explicit declaration first, then auto-detection preferring the license
/// server, then nothing (clear playback).
pub fn select_drm(channel: &Channel, support: &DrmSupport) -> Option<DrmConfig> {
    let license_server = channel.license_server.as_deref();
    let widevine_ready = support.widevine && license_server.is_some();
    let clearkey_ready = support.clearkey && channel.has_clear_keys();

    match channel.drm_type {
        Some(DrmKind::Widevine) if widevine_ready => return license_server.map(DrmConfig::widevine),
        Some(DrmKind::ClearKey) if clearkey_ready => return Some(DrmConfig::clear_key(&channel.clear_keys)),
        _ => {}
    }

    if widevine_ready {
        license_server.map(DrmConfig::widevine)
    } else if clearkey_ready {
        Some(DrmConfig::clear_key(&channel.clear_keys))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::catalog::validate_channels;
    use crate::drm::KeySystem;
    use serde_json::json;

    fn both() -> DrmSupport {
        DrmSupport {
            widevine: true,
            clearkey: true,
            playready: false,
        }
    }

    fn channel(record: serde_json::Value) -> Channel {
        validate_channels(&[record]).remove(0)
    }

    fn keys() -> BTreeMap<String, String> {
        BTreeMap::from([("kid".to_string(), "key".to_string())])
    }

    #[test]
    fn embedded_channel_attaches_frame() {
        let ch = channel(json!({"type": "youtube", "link": "https://embed/x"}));
        let plan = build_plan(&ch, &both(), &PlayerConfig::default()).unwrap();
        assert_eq!(
            plan,
            EnginePlan::Embed {
                src: "https://embed/x".to_string()
            }
        );
    }

    #[test]
    fn adaptive_channel_uses_buffer_profile() {
        let config = PlayerConfig::default();
        let ch = channel(json!({"link": "https://x/live.m3u8"}));
        match build_plan(&ch, &both(), &config).unwrap() {
            EnginePlan::Adaptive { manifest, profile } => {
                assert_eq!(manifest, "https://x/live.m3u8");
                assert_eq!(profile, config.buffer_profile);
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn empty_link_cannot_be_planned() {
        let ch = channel(json!({"name": "Dead"}));
        let err = build_plan(&ch, &both(), &PlayerConfig::default()).unwrap_err();
        assert_eq!(err.code, codes::NO_STREAM_LINK);
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let ch = channel(json!({"type": "rtmp", "link": "rtmp://x"}));
        let err = build_plan(&ch, &both(), &PlayerConfig::default()).unwrap_err();
        assert_eq!(err.message, "Unsupported stream type: rtmp");
    }

    #[test]
    fn explicit_widevine_with_server() {
        let ch = channel(json!({
            "type": "mpd",
            "link": "https://x/a.mpd",
            "drmType": "widevine",
            "licenseServer": "https://lic",
        }));
        let support = DrmSupport {
            widevine: true,
            ..DrmSupport::default()
        };
        match build_plan(&ch, &support, &PlayerConfig::default()).unwrap() {
            EnginePlan::Encrypted { drm: Some(drm), .. } => {
                assert_eq!(drm.key_system(), Some(KeySystem::Widevine));
                assert_eq!(drm.servers["com.widevine.alpha"], "https://lic");
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn explicit_clearkey_beats_available_license_server() {
        let ch = channel(json!({
            "type": "mpd",
            "link": "https://x/a.mpd",
            "drmType": "clearkey",
            "licenseServer": "https://lic",
            "clearkey": "kid:key",
        }));
        let drm = select_drm(&ch, &both()).unwrap();
        assert_eq!(drm.key_system(), Some(KeySystem::ClearKey));
        assert_eq!(drm.clear_keys, keys());
        assert!(!drm.servers.contains_key("com.widevine.alpha"));
    }

    #[test]
    fn auto_detect_prefers_license_server() {
        let ch = channel(json!({
            "type": "mpd",
            "link": "https://x/a.mpd",
            "licenseServer": "https://lic",
            "clearkey": "kid:key",
        }));
        let drm = select_drm(&ch, &both()).unwrap();
        assert_eq!(drm.key_system(), Some(KeySystem::Widevine));
    }

    #[test]
    fn unsupported_declaration_falls_back_to_auto_detect() {
        let ch = channel(json!({
            "type": "mpd",
            "link": "https://x/a.mpd",
            "drmType": "widevine",
            "licenseServer": "https://lic",
            "clearkey": "kid:key",
        }));
        let support = DrmSupport {
            clearkey: true,
            ..DrmSupport::default()
        };
        let drm = select_drm(&ch, &support).unwrap();
        assert_eq!(drm.key_system(), Some(KeySystem::ClearKey));
    }

    #[test]
    fn no_credentials_means_clear_playback() {
        let ch = channel(json!({"type": "mpd", "link": "https://x/a.mpd", "drmType": "clearkey"}));
        assert_eq!(select_drm(&ch, &both()), None);
        assert_eq!(select_drm(&ch.without_drm(), &DrmSupport::default()), None);
    }
}
