//! Scheduler configuration and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default silence before the first segment.
pub const DEFAULT_LEAD_SILENCE: Duration = Duration::from_millis(100);

/// Default pause between consecutive segments.
pub const DEFAULT_INTER_SEGMENT_DELAY: Duration = Duration::from_millis(100);

/// Default number of throw-away synthesis passes run by `warm_up`.
pub const DEFAULT_WARMUP_PASSES: u32 = 2;

/// Upper bound for either padding duration.
pub const MAX_PADDING: Duration = Duration::from_secs(10);

/// Upper bound for warm-up passes.
pub const MAX_WARMUP_PASSES: u32 = 16;

/// Configuration for the [`SpeechScheduler`](crate::scheduler::SpeechScheduler).
///
/// Durations are (de)serialized as fractional seconds:
///
/// ```json
/// { "lead_silence_secs": 0.25, "inter_segment_delay_secs": 0.1, "warmup_passes": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Silence prepended to the first segment.
    #[serde(rename = "lead_silence_secs", with = "secs")]
    pub lead_silence: Duration,

    /// Silence prepended to every later segment, and extra wait after each
    /// unit finishes playing.
    #[serde(rename = "inter_segment_delay_secs", with = "secs")]
    pub inter_segment_delay: Duration,

    /// Throw-away synthesis calls made by `warm_up`.
    pub warmup_passes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lead_silence: DEFAULT_LEAD_SILENCE,
            inter_segment_delay: DEFAULT_INTER_SEGMENT_DELAY,
            warmup_passes: DEFAULT_WARMUP_PASSES,
        }
    }
}

impl SchedulerConfig {
    /// Build a config from padding durations in seconds.
    pub fn from_secs(lead_silence: f64, inter_segment_delay: f64) -> Result<Self, ConfigError> {
        let config = Self {
            lead_silence: secs_to_duration("lead_silence", lead_silence)?,
            inter_segment_delay: secs_to_duration("inter_segment_delay", inter_segment_delay)?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_padding("lead_silence", self.lead_silence)?;
        check_padding("inter_segment_delay", self.inter_segment_delay)?;

        if self.warmup_passes > MAX_WARMUP_PASSES {
            return Err(ConfigError::TooManyWarmupPasses(self.warmup_passes));
        }

        Ok(())
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be a finite, non-negative number of seconds, got {value}")]
    InvalidSeconds { field: &'static str, value: f64 },

    #[error("{field} must be at most 10s, got {value:?}")]
    PaddingTooLong { field: &'static str, value: Duration },

    #[error("Warm-up passes must be at most 16, got {0}")]
    TooManyWarmupPasses(u32),
}

/// Reject a padding duration longer than [`MAX_PADDING`].
pub fn check_padding(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value > MAX_PADDING {
        return Err(ConfigError::PaddingTooLong { field, value });
    }
    Ok(())
}

fn secs_to_duration(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidSeconds { field, value })
}

/// Serde adapter: `Duration` ⇄ fractional seconds.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let value = f64::deserialize(deserializer)?;
        super::secs_to_duration("duration", value).map_err(serde::de::Error::custom)
    }
}
