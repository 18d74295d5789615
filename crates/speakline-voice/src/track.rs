//! Track accumulation: the exportable concatenation of every spoken unit.
//!
//! The accumulator has no timing logic: the scheduler appends each unit in
//! the order it emits them and finalizes once at the end of a call.

use std::path::Path;
use std::time::Duration;

use crate::clip::AudioClip;
use crate::error::VoiceError;

/// One segment's clip with its leading silence, as emitted to the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechUnit {
    /// Position of the segment in the input text.
    pub index: usize,

    /// The segment text that was synthesized.
    pub text: String,

    /// Leading silence followed by the synthesized audio.
    pub clip: AudioClip,
}

impl SpeechUnit {
    /// Playback duration of the whole unit (silence included).
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.clip.duration
    }
}

/// Location of one unit inside a [`Track`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackUnit {
    pub index: usize,
    pub text: String,
    pub start_sample: usize,
    pub sample_count: usize,
    pub duration: Duration,
}

/// A finalized, ordered concatenation of speech units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    samples: Vec<f32>,
    sample_rate: u32,
    duration: Duration,
    units: Vec<TrackUnit>,
}

impl Track {
    /// Concatenated PCM samples.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate shared by every unit (0 for an empty track).
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Sum of all unit durations.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Units in emission order.
    #[must_use]
    pub fn units(&self) -> &[TrackUnit] {
        &self.units
    }

    /// Whether the track holds no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Write the track as a mono 16-bit WAV file.
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), VoiceError> {
        crate::export::write_wav(self, path)
    }

    /// Consume the track, returning its raw samples.
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Append-only builder for a [`Track`].
///
/// [`finalize`](Self::finalize) succeeds exactly once; afterwards both
/// `append` and `finalize` fail with [`VoiceError::TrackClosed`].
#[derive(Debug, Default)]
pub struct TrackAccumulator {
    track: Track,
    closed: bool,
}

impl TrackAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit to the end of the track.
    ///
    /// The first unit fixes the track's sample rate. Units at any other rate
    /// are rejected; nothing is ever resampled.
    pub fn append(&mut self, unit: &SpeechUnit) -> Result<(), VoiceError> {
        if self.closed {
            return Err(VoiceError::TrackClosed);
        }

        let track = &mut self.track;
        if track.units.is_empty() {
            track.sample_rate = unit.clip.sample_rate;
        } else if unit.clip.sample_rate != track.sample_rate {
            return Err(VoiceError::SampleRateMismatch {
                expected: track.sample_rate,
                actual: unit.clip.sample_rate,
            });
        }

        track.units.push(TrackUnit {
            index: unit.index,
            text: unit.text.clone(),
            start_sample: track.samples.len(),
            sample_count: unit.clip.samples.len(),
            duration: unit.clip.duration,
        });
        track.samples.extend_from_slice(&unit.clip.samples);
        track.duration += unit.clip.duration;

        Ok(())
    }

    /// Number of units appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.track.units.len()
    }

    /// Whether no unit has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.track.units.is_empty()
    }

    /// Close the accumulator and hand out the finished track.
    pub fn finalize(&mut self) -> Result<Track, VoiceError> {
        if self.closed {
            return Err(VoiceError::TrackClosed);
        }
        self.closed = true;
        Ok(std::mem::take(&mut self.track))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(index: usize, samples: usize, sample_rate: u32) -> SpeechUnit {
        SpeechUnit {
            index,
            text: format!("segment {index}"),
            clip: AudioClip::from_samples(vec![0.25; samples], sample_rate),
        }
    }

    #[test]
    fn units_are_concatenated_in_order() {
        let mut acc = TrackAccumulator::new();
        acc.append(&unit(0, 4, 4)).unwrap();
        acc.append(&unit(1, 8, 4)).unwrap();
        assert_eq!(acc.len(), 2);

        let track = acc.finalize().unwrap();
        assert_eq!(track.samples().len(), 12);
        assert_eq!(track.sample_rate(), 4);
        assert_eq!(track.duration(), Duration::from_secs(3));

        let indices: Vec<usize> = track.units().iter().map(|u| u.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(track.units()[1].start_sample, 4);
        assert_eq!(track.units()[1].sample_count, 8);
    }

    #[test]
    fn finalize_twice_is_rejected() {
        let mut acc = TrackAccumulator::new();
        acc.append(&unit(0, 1, 1)).unwrap();
        assert!(acc.finalize().is_ok());
        assert!(matches!(acc.finalize(), Err(VoiceError::TrackClosed)));
    }

    #[test]
    fn append_after_finalize_is_rejected() {
        let mut acc = TrackAccumulator::new();
        acc.finalize().unwrap();
        assert!(matches!(
            acc.append(&unit(0, 1, 1)),
            Err(VoiceError::TrackClosed)
        ));
    }

    #[test]
    fn sample_rate_mismatch_is_rejected() {
        let mut acc = TrackAccumulator::new();
        acc.append(&unit(0, 10, 22_050)).unwrap();
        let err = acc.append(&unit(1, 10, 24_000)).unwrap_err();
        assert!(matches!(
            err,
            VoiceError::SampleRateMismatch {
                expected: 22_050,
                actual: 24_000
            }
        ));
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn empty_accumulator_finalizes_to_empty_track() {
        let mut acc = TrackAccumulator::new();
        assert!(acc.is_empty());
        let track = acc.finalize().unwrap();
        assert!(track.is_empty());
        assert_eq!(track.sample_rate(), 0);
        assert_eq!(track.duration(), Duration::ZERO);
    }
}
