use serde::{Deserialize, Serialize};

/// One rung of the adaptive ladder as the engine reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityLevel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Bits per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityChoice {
    Auto,
    Level(usize),
}

impl QualityChoice {
    /// Value understood by [`super::AdaptiveEngine::set_current_level`].
    pub fn engine_level(self) -> i32 {
        match self {
            Self::Auto => -1,
            Self::Level(index) => i32::try_from(index).unwrap_or(i32::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityOption {
    pub choice: QualityChoice,
    pub label: String,
}

/// "Auto" followed by one option per level, in engine order.
pub fn quality_options(levels: &[QualityLevel]) -> Vec<QualityOption> {
    let mut options = Vec::with_capacity(levels.len() + 1);
    options.push(QualityOption {
        choice: QualityChoice::Auto,
        label: "Auto".to_string(),
    });
    options.extend(levels.iter().enumerate().map(|(index, level)| QualityOption {
        choice: QualityChoice::Level(index),
        label: level_label(level),
    }));
    options
}

fn level_label(level: &QualityLevel) -> String {
    let height = match level.height {
        Some(h) => format!("{h}p"),
        None => "Unknown".to_string(),
    };
    match level.bitrate {
        Some(bps) if bps > 0 => format!("{height} ({}kbps)", (bps as f64 / 1000.0).round() as u64),
        _ => height,
    }
}
