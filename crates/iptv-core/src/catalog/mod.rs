//! Channel descriptors and the validation applied to raw catalog records.
//!
//! The catalog itself is an untyped JSON array. Every record is turned into a
//! [`Channel`] with a non-empty name and a kind; a missing link is kept as an
//! empty string so the channel stays listed but fails as soon as it is played.

mod source;

pub use source::{parse_catalog, CatalogError, CatalogSource, FileCatalog, UrlCatalog};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    EmbeddedVideo,
    AdaptiveHttp,
    EncryptedAdaptive,
    /// A type string the player has no engine for. Kept so catalog indices stay stable.
    Unsupported,
}

impl ChannelKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "youtube" | "embed" | "iframe" => Self::EmbeddedVideo,
            "m3u8" | "hls" => Self::AdaptiveHttp,
            "mpd" | "dash" => Self::EncryptedAdaptive,
            _ => Self::Unsupported,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmbeddedVideo => write!(f, "embedded-video"),
            Self::AdaptiveHttp => write!(f, "adaptive-http"),
            Self::EncryptedAdaptive => write!(f, "encrypted-adaptive"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// DRM family a channel may declare explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrmKind {
    /// Key-system managed: keys come from a license server.
    Widevine,
    /// Local keys supplied in the channel record.
    ClearKey,
}

impl DrmKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "widevine" => Some(Self::Widevine),
            "clearkey" => Some(Self::ClearKey),
            _ => None,
        }
    }
}

/// One selectable stream. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub index: usize,
    pub name: String,
    pub kind: ChannelKind,
    /// The type string as it appeared in the catalog (or the default).
    pub raw_type: String,
    pub link: String,
    pub logo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drm_type: Option<DrmKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_server: Option<String>,
    /// Key id to key value.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub clear_keys: BTreeMap<String, String>,
}

impl Channel {
    pub fn is_playable(&self) -> bool {
        !self.link.is_empty()
    }

    pub fn has_clear_keys(&self) -> bool {
        !self.clear_keys.is_empty()
    }

    /// Same channel with every DRM field removed.
    pub fn without_drm(&self) -> Self {
        Self {
            drm_type: None,
            license_server: None,
            clear_keys: BTreeMap::new(),
            ..self.clone()
        }
    }
}

const DEFAULT_TYPE: &str = "m3u8";

pub fn validate_channels(records: &[Value]) -> Vec<Channel> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| validate_record(index, record))
        .collect()
}

fn validate_record(index: usize, record: &Value) -> Channel {
    let empty = Map::new();
    let fields = match record.as_object() {
        Some(map) => map,
        None => {
            warn!(index, "Channel record is not an object");
            &empty
        }
    };
    let text = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let name = text("name").unwrap_or_else(|| format!("Channel {}", index + 1));
    let raw_type = text("type").unwrap_or_else(|| DEFAULT_TYPE.to_string());
    let kind = ChannelKind::parse(&raw_type);
    if kind == ChannelKind::Unsupported {
        warn!(channel = %name, stream_type = %raw_type, "Unsupported stream type");
    }

    let link = text("link").unwrap_or_default();
    if link.is_empty() {
        warn!(channel = %name, "Channel has no stream link");
    }

    let logo = text("logo")
        .filter(|logo| logo != "undefined")
        .unwrap_or_default();

    let drm_type = text("drmType").and_then(|raw| {
        let parsed = DrmKind::parse(&raw);
        if parsed.is_none() {
            warn!(channel = %name, drm_type = %raw, "Ignoring unknown DRM type");
        }
        parsed
    });

    let clear_keys = fields
        .get("clearkey")
        .or_else(|| fields.get("clearKeys"))
        .map(normalize_clear_keys)
        .unwrap_or_default();
    for (kid, key) in &clear_keys {
        if !is_key_hex(kid) || !is_key_hex(key) {
            warn!(channel = %name, kid = %kid, "Clear key is not a 16-byte hex value");
        }
    }

    Channel {
        index,
        name,
        kind,
        raw_type,
        link,
        logo,
        drm_type,
        license_server: text("licenseServer"),
        clear_keys,
    }
}

/// Accepts `"kid:key"`, `[{"keyId": .., "key": ..}]` or `{"kid": "key"}`.
pub fn normalize_clear_keys(value: &Value) -> BTreeMap<String, String> {
    let mut keys = BTreeMap::new();
    match value {
        Value::String(pair) => {
            let mut parts = pair.split(':');
            if let (Some(kid), Some(key)) = (parts.next(), parts.next()) {
                if !kid.is_empty() && !key.is_empty() {
                    keys.insert(kid.to_string(), key.to_string());
                }
            }
        }
        Value::Array(entries) => {
            for entry in entries {
                let kid = entry.get("keyId").and_then(Value::as_str).unwrap_or("");
                let key = entry.get("key").and_then(Value::as_str).unwrap_or("");
                if !kid.is_empty() && !key.is_empty() {
                    keys.insert(kid.to_string(), key.to_string());
                }
            }
        }
        Value::Object(map) => {
            for (kid, key) in map {
                if let Some(key) = key.as_str() {
                    keys.insert(kid.clone(), key.to_string());
                }
            }
        }
        _ => {}
    }
    keys
}

fn is_key_hex(value: &str) -> bool {
    hex::decode(value).map(|bytes| bytes.len() == 16).unwrap_or(false)
}
