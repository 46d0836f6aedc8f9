use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::engine::QualityOption;

/// The chrome around the video: label, spinner, play prompt, quality menu, badge.
///
/// Calls are fire-and-forget; implementations must not block.
pub trait PlayerView: Send + Sync {
    fn set_channel_label(&self, text: &str);
    fn show_loader(&self, visible: bool);
    /// Manual play / unmute affordance after the runtime refused autoplay.
    fn show_play_prompt(&self, visible: bool);
    /// `None` hides the quality menu.
    fn set_quality_options(&self, options: Option<&[QualityOption]>);
    /// `None` hides the badge.
    fn show_live_badge(&self, text: Option<&str>);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub channel_label: String,
    pub loading: bool,
    pub play_prompt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_options: Option<Vec<QualityOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_badge: Option<String>,
}

/// In-memory view. Holds whatever the player last rendered.
#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: Mutex<ViewSnapshot>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ViewSnapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlayerView for StatusBoard {
    fn set_channel_label(&self, text: &str) {
        self.lock().channel_label = text.to_string();
    }

    fn show_loader(&self, visible: bool) {
        self.lock().loading = visible;
    }

    fn show_play_prompt(&self, visible: bool) {
        self.lock().play_prompt = visible;
    }

    fn set_quality_options(&self, options: Option<&[QualityOption]>) {
        self.lock().quality_options = options.map(<[QualityOption]>::to_vec);
    }

    fn show_live_badge(&self, text: Option<&str>) {
        self.lock().live_badge = text.map(str::to_string);
    }
}
