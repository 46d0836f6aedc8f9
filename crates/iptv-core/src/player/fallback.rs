//! Bounded fallback decisions for failed encrypted-adaptive channels.
//!
//! Pure: the policy reads and bumps [`RetryCounters`] and returns the next
//! action; the orchestrator performs it. Order of escalation:
//!
//! 1. license rejection on the first attempt: same manifest, DRM stripped
//! 2. encrypted engine with the channel's own credentials
//! 3. clear manifest substituted for the encrypted one
//!
//! A failed substitute goes back to step 2 until a ceiling is hit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;
use crate::engine::EngineError;

/// Global counter is never reset; the per-channel counter and the
/// strip-DRM flag reset on every selection and catalog load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCounters {
    pub global: u32,
    pub channel: u32,
    pub drm_stripped: bool,
}

impl RetryCounters {
    pub fn reset_channel(&mut self) {
        self.channel = 0;
        self.drm_stripped = false;
    }
}

/// Which plan an attempt ran with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStage {
    /// The plan the engine selector built.
    Primary,
    /// Primary manifest with every DRM field removed.
    DrmStripped,
    /// Encrypted engine with credentials taken verbatim from the channel.
    EncryptedOverride,
    /// Plain adaptive engine on the substituted clear manifest.
    ClearSubstitute,
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::DrmStripped => write!(f, "drm-stripped"),
            Self::EncryptedOverride => write!(f, "encrypted-override"),
            Self::ClearSubstitute => write!(f, "clear-substitute"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    MaxRetriesExceeded,
    UnableToLoad,
    FailedToLoad,
    PlaybackFailed,
}

impl Terminal {
    /// Suffix appended to the channel label.
    pub fn message(self) -> &'static str {
        match self {
            Self::MaxRetriesExceeded => "Maximum retries exceeded",
            Self::UnableToLoad => "Unable to load",
            Self::FailedToLoad => "Failed to load",
            Self::PlaybackFailed => "Playback failed",
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackAction {
    StripDrm,
    RetryEncrypted,
    SubstituteClear { link: String },
    GiveUp(Terminal),
}

impl FallbackAction {
    pub fn next_stage(&self) -> Option<AttemptStage> {
        match self {
            Self::StripDrm => Some(AttemptStage::DrmStripped),
            Self::RetryEncrypted => Some(AttemptStage::EncryptedOverride),
            Self::SubstituteClear { .. } => Some(AttemptStage::ClearSubstitute),
            Self::GiveUp(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    max_channel_attempts: u32,
    max_total_retries: u32,
    license_error_codes: Vec<u32>,
    encrypted_ext: String,
    clear_ext: String,
}

impl FallbackPolicy {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            max_channel_attempts: config.max_fallback_attempts,
            max_total_retries: config.max_total_retries,
            license_error_codes: config.license_error_codes.clone(),
            encrypted_ext: config.encrypted_manifest_ext.clone(),
            clear_ext: config.clear_manifest_ext.clone(),
        }
    }

    /// Links without the encrypted manifest extension have no fallback path.
    pub fn applies_to(&self, link: &str) -> bool {
        !self.encrypted_ext.is_empty() && link.contains(&self.encrypted_ext)
    }

    /// `link` with the first encrypted manifest extension replaced by the clear one.
    pub fn substitute_link(&self, link: &str) -> String {
        if self.encrypted_ext.is_empty() {
            return link.to_string();
        }
        link.replacen(&self.encrypted_ext, &self.clear_ext, 1)
    }

    pub fn decide(
        &self,
        counters: &mut RetryCounters,
        link: &str,
        failed: AttemptStage,
        error: &EngineError,
    ) -> FallbackAction {
        if !self.applies_to(link) {
            return FallbackAction::GiveUp(Terminal::PlaybackFailed);
        }
        if counters.global >= self.max_total_retries {
            return FallbackAction::GiveUp(Terminal::MaxRetriesExceeded);
        }

        match failed {
            AttemptStage::Primary
                if !counters.drm_stripped && self.license_error_codes.contains(&error.code) =>
            {
                counters.drm_stripped = true;
                counters.global += 1;
                FallbackAction::StripDrm
            }
            AttemptStage::EncryptedOverride => {
                let substitute = self.substitute_link(link);
                if substitute == link {
                    return FallbackAction::GiveUp(Terminal::FailedToLoad);
                }
                counters.global += 1;
                FallbackAction::SubstituteClear { link: substitute }
            }
            AttemptStage::Primary | AttemptStage::DrmStripped | AttemptStage::ClearSubstitute => {
                if counters.channel >= self.max_channel_attempts {
                    return FallbackAction::GiveUp(Terminal::UnableToLoad);
                }
                counters.channel += 1;
                counters.global += 1;
                FallbackAction::RetryEncrypted
            }
        }
    }
}
