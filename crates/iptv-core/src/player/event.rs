use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CatalogLoaded,
    CatalogFailed,
    ChannelSelected,
    Playing,
    AutoplayBlocked,
    EngineErrorIgnored,
    FallbackAttempt,
    GaveUp,
    QualityChanged,
    Shutdown,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CatalogLoaded => write!(f, "CATALOG"),
            Self::CatalogFailed => write!(f, "CATALOG-FAILED"),
            Self::ChannelSelected => write!(f, "SELECT"),
            Self::Playing => write!(f, "PLAYING"),
            Self::AutoplayBlocked => write!(f, "AUTOPLAY-BLOCKED"),
            Self::EngineErrorIgnored => write!(f, "IGNORED"),
            Self::FallbackAttempt => write!(f, "FALLBACK"),
            Self::GaveUp => write!(f, "GAVE-UP"),
            Self::QualityChanged => write!(f, "QUALITY"),
            Self::Shutdown => write!(f, "SHUTDOWN"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<usize>,
    pub details: String,
}

impl PlayerEvent {
    pub fn new(kind: EventKind, channel: Option<usize>, details: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            channel,
            details: details.into(),
        }
    }
}

/// Fixed-capacity circular buffer for recent events. O(1) insert, evicts oldest when full.
#[derive(Debug, Clone)]
pub struct EventRing {
    buffer: VecDeque<PlayerEvent>,
    capacity: usize,
}

impl EventRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: PlayerEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn list(&self) -> Vec<PlayerEvent> {
        self.buffer.iter().rev().cloned().collect()
    }

    pub fn list_chronological(&self) -> Vec<PlayerEvent> {
        self.buffer.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
