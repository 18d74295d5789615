//! Audio clips: the atomic unit handed from synthesis to playback.

use std::time::Duration;

/// Mono PCM audio plus its intended playback duration.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// PCM f32 samples.
    pub samples: Vec<f32>,

    /// Sample rate of the audio (e.g., 22 050 Hz).
    pub sample_rate: u32,

    /// Duration of the audio.
    pub duration: Duration,
}

impl AudioClip {
    /// Wrap raw samples, deriving the duration from the sample count.
    #[must_use]
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration = samples_to_duration(samples.len(), sample_rate);
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// A clip of digital silence lasting `duration`.
    #[must_use]
    pub fn silence(duration: Duration, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; duration_to_samples(duration, sample_rate)],
            sample_rate,
            duration,
        }
    }

    /// Prepend `silence` to this clip (`silence ++ clip`).
    ///
    /// The resulting duration is the exact sum of both parts, so timing
    /// computed from it never drifts by sample rounding.
    #[must_use]
    pub fn with_leading_silence(self, silence: Duration) -> Self {
        if silence.is_zero() {
            return self;
        }

        let pad = duration_to_samples(silence, self.sample_rate);
        let mut samples = Vec::with_capacity(pad + self.samples.len());
        samples.resize(pad, 0.0);
        samples.extend_from_slice(&self.samples);

        Self {
            samples,
            sample_rate: self.sample_rate,
            duration: silence.saturating_add(self.duration),
        }
    }

    /// Whether the clip carries no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn duration_to_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)).round() as usize
}

#[allow(clippy::cast_precision_loss)]
fn samples_to_duration(len: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(len as f64 / f64::from(sample_rate))
}
