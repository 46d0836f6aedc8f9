use serde::{Deserialize, Serialize};

use super::fallback::RetryCounters;
use crate::drm::DrmSupport;
use crate::engine::{EngineKind, QualityLevel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
    Failed,
}

impl PlaybackState {
    pub fn can_transition_to(self, target: PlaybackState) -> bool {
        matches!(
            (self, target),
            (PlaybackState::Idle, PlaybackState::Loading)
                | (PlaybackState::Loading, PlaybackState::Playing)
                | (PlaybackState::Loading, PlaybackState::Failed)
                | (PlaybackState::Playing, PlaybackState::Loading)
                | (PlaybackState::Playing, PlaybackState::Failed)
                | (PlaybackState::Failed, PlaybackState::Loading)
                | (PlaybackState::Loading, PlaybackState::Idle)
                | (PlaybackState::Playing, PlaybackState::Idle)
                | (PlaybackState::Failed, PlaybackState::Idle)
        )
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Playing => write!(f, "playing"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub index: usize,
    pub name: String,
}

/// Point-in-time view of the player, for the API and the CLI status line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub state: PlaybackState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelRef>,
    pub engine: EngineKind,
    pub surface_attached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drm_support: Option<DrmSupport>,
    pub retries: RetryCounters,
    pub switching: bool,
    pub quality_levels: Vec<QualityLevel>,
    pub channel_count: usize,
}
