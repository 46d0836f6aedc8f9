use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::fallback::AttemptStage;
use crate::engine::EngineKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    /// Catalog fetch or parse failure.
    Catalog,
    /// The channel can never play (no link, unsupported type).
    Channel,
    /// Attach or load failure.
    EngineLoad,
    /// Fatal error reported after playback started.
    EngineRuntime,
    /// Error code in the license-rejection set.
    License,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => write!(f, "Catalog"),
            Self::Channel => write!(f, "Channel"),
            Self::EngineLoad => write!(f, "Engine Load"),
            Self::EngineRuntime => write!(f, "Engine Runtime"),
            Self::License => write!(f, "License"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackFailure {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub failure_type: FailureType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<usize>,
    pub channel_name: String,
    pub engine: EngineKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<AttemptStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    pub message: String,
}

impl PlaybackFailure {
    pub fn new(
        failure_type: FailureType,
        channel: Option<usize>,
        channel_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            failure_type,
            channel,
            channel_name: channel_name.into(),
            engine: EngineKind::None,
            stage: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_engine(mut self, engine: EngineKind, stage: AttemptStage) -> Self {
        self.engine = engine;
        self.stage = Some(stage);
        self
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }
}

/// Fixed-capacity circular buffer for recent failures. O(1) insert, evicts oldest when full.
#[derive(Debug, Clone)]
pub struct FailureRing {
    buffer: VecDeque<PlaybackFailure>,
    capacity: usize,
}

impl FailureRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, failure: PlaybackFailure) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(failure);
    }

    pub fn list(&self) -> Vec<PlaybackFailure> {
        self.buffer.iter().rev().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
