use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Buffering profile handed to the adaptive-HTTP engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferProfile {
    /// Seconds of media the engine tries to keep ahead of the playhead.
    pub max_buffer_length: f64,
    /// Hard upper bound on the forward buffer, in seconds.
    pub max_max_buffer_length: f64,
    /// Seconds of already played media retained behind the playhead.
    pub back_buffer_length: f64,
    pub enable_worker: bool,
}

impl Default for BufferProfile {
    fn default() -> Self {
        Self {
            max_buffer_length: 30.0,
            max_max_buffer_length: 60.0,
            back_buffer_length: 30.0,
            enable_worker: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryParameters {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: u32,
}

/// Streaming profile handed to the encrypted-adaptive engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingProfile {
    pub buffering_goal: f64,
    pub rebuffering_goal: f64,
    pub buffer_behind: f64,
    pub low_latency_mode: bool,
    pub retry: RetryParameters,
}

impl Default for StreamingProfile {
    fn default() -> Self {
        Self {
            buffering_goal: 15.0,
            rebuffering_goal: 2.0,
            buffer_behind: 25.0,
            low_latency_mode: false,
            retry: RetryParameters {
                max_attempts: 5,
                base_delay: Duration::from_millis(1000),
                backoff_factor: 2,
            },
        }
    }
}

/// Configuration for a player instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Fallback rounds allowed per channel selection (default: 2).
    pub max_fallback_attempts: u32,
    /// Retry attempts allowed over the whole session (default: 10).
    pub max_total_retries: u32,
    /// Delay before the first catalog channel is auto-selected.
    pub autoplay_delay: Duration,
    /// Pause between a failure and the next fallback attempt.
    pub fallback_delay: Duration,
    /// The switch guard is force-released after this long even if no engine signalled.
    pub switch_guard_timeout: Duration,
    /// A key-system query that has not answered by then counts as unsupported.
    pub drm_probe_timeout: Duration,
    /// Encrypted engine error codes treated as license rejection.
    pub license_error_codes: Vec<u32>,
    pub encrypted_manifest_ext: String,
    pub clear_manifest_ext: String,
    pub buffer_profile: BufferProfile,
    pub streaming_profile: StreamingProfile,
    /// HTTP request timeout for manifest and catalog fetches.
    pub request_timeout: Duration,
    /// Maximum number of retries for failed manifest fetches.
    pub max_retries: u32,
    /// Base backoff duration for retries (doubled each attempt).
    pub retry_backoff: Duration,
    /// Maximum number of events kept in the event ring.
    pub event_limit: usize,
    /// Maximum number of failures kept in the failure ring.
    pub error_limit: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_fallback_attempts: 2,
            max_total_retries: 10,
            autoplay_delay: Duration::from_millis(500),
            fallback_delay: Duration::from_millis(500),
            switch_guard_timeout: Duration::from_secs(8),
            drm_probe_timeout: Duration::from_secs(3),
            license_error_codes: vec![4032, 6001],
            encrypted_manifest_ext: ".mpd".to_string(),
            clear_manifest_ext: ".m3u8".to_string(),
            buffer_profile: BufferProfile::default(),
            streaming_profile: StreamingProfile::default(),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
            event_limit: 200,
            error_limit: 100,
        }
    }
}

impl PlayerConfig {
    pub fn with_max_fallback_attempts(mut self, attempts: u32) -> Self {
        self.max_fallback_attempts = attempts;
        self
    }

    pub fn with_max_total_retries(mut self, retries: u32) -> Self {
        self.max_total_retries = retries;
        self
    }

    pub fn with_autoplay_delay(mut self, ms: u64) -> Self {
        self.autoplay_delay = Duration::from_millis(ms);
        self
    }

    pub fn with_fallback_delay(mut self, ms: u64) -> Self {
        self.fallback_delay = Duration::from_millis(ms);
        self
    }

    pub fn with_switch_guard_timeout(mut self, ms: u64) -> Self {
        // A zero timeout would release the guard before the load even starts.
        self.switch_guard_timeout = Duration::from_millis(ms.max(1));
        self
    }

    pub fn with_drm_probe_timeout(mut self, ms: u64) -> Self {
        self.drm_probe_timeout = Duration::from_millis(ms.max(1));
        self
    }

    pub fn with_license_error_codes(mut self, codes: Vec<u32>) -> Self {
        self.license_error_codes = codes;
        self
    }

    pub fn with_manifest_extensions(
        mut self,
        encrypted: impl Into<String>,
        clear: impl Into<String>,
    ) -> Self {
        self.encrypted_manifest_ext = encrypted.into();
        self.clear_manifest_ext = clear.into();
        self
    }

    pub fn with_request_timeout(mut self, ms: u64) -> Self {
        self.request_timeout = Duration::from_millis(ms);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_event_limit(mut self, limit: usize) -> Self {
        self.event_limit = limit.max(1);
        self
    }

    pub fn with_error_limit(mut self, limit: usize) -> Self {
        self.error_limit = limit.max(1);
        self
    }

    pub fn is_license_error(&self, code: u32) -> bool {
        self.license_error_codes.contains(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_player_constants() {
        let c = PlayerConfig::default();
        assert_eq!(c.max_fallback_attempts, 2);
        assert_eq!(c.max_total_retries, 10);
        assert_eq!(c.autoplay_delay, Duration::from_millis(500));
        assert!(c.drm_probe_timeout < c.switch_guard_timeout);
        assert_eq!(c.buffer_profile.max_buffer_length, 30.0);
        assert_eq!(c.streaming_profile.retry.max_attempts, 5);
        assert!(c.is_license_error(6001));
        assert!(c.is_license_error(4032));
        assert!(!c.is_license_error(1001));
    }

    #[test]
    fn zero_guard_timeout_is_clamped() {
        let c = PlayerConfig::default().with_switch_guard_timeout(0);
        assert_eq!(c.switch_guard_timeout, Duration::from_millis(1));
        let c = PlayerConfig::default().with_drm_probe_timeout(0);
        assert_eq!(c.drm_probe_timeout, Duration::from_millis(1));
    }

    #[test]
    fn license_codes_are_configurable() {
        let c = PlayerConfig::default().with_license_error_codes(vec![7000]);
        assert!(c.is_license_error(7000));
        assert!(!c.is_license_error(6001));
    }
}
