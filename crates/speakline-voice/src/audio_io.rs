//! `AudioSink`: the output seam of the speech scheduler.
//!
//! The scheduler hands each finished [`SpeechUnit`] to a sink and moves on
//! immediately; it never waits for playback. Timing is enforced by the
//! scheduler's own clock, so a sink only has to start the audio and return.
//!
//! | Implementor | Where used |
//! |---|---|
//! | [`NullSink`] | Headless runs, export-only, tests |
//! | [`WavDirSink`](crate::export::WavDirSink) | One WAV file per unit |
//! | `LocalAudioSink` (feature `playback`) | Desktop: rodio playback on a dedicated audio thread |
//!
//! The trait is **object-safe** (`Box<dyn AudioSink>`). All methods take
//! `&self`; implementations use interior mutability (channels, atomics).

use std::sync::Arc;

use crate::error::VoiceError;
use crate::track::SpeechUnit;

/// Abstraction over an audio output (playback device, network stream, …).
#[cfg_attr(test, mockall::automock)]
pub trait AudioSink: Send + Sync {
    /// Start playing `unit` and return without waiting for it to finish.
    ///
    /// Errors are reported back but the scheduler only logs them; playback
    /// problems never abort a `speak` call.
    fn emit(&self, unit: &SpeechUnit) -> Result<(), VoiceError>;

    /// Stop all audio started by this sink.
    fn stop(&self) -> Result<(), VoiceError> {
        Ok(())
    }
}

impl<T: AudioSink + ?Sized> AudioSink for Arc<T> {
    fn emit(&self, unit: &SpeechUnit) -> Result<(), VoiceError> {
        (**self).emit(unit)
    }

    fn stop(&self) -> Result<(), VoiceError> {
        (**self).stop()
    }
}

/// A sink that discards every unit.
///
/// Useful when only the exported [`Track`](crate::track::Track) matters; the
/// scheduler still paces emission in real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn emit(&self, unit: &SpeechUnit) -> Result<(), VoiceError> {
        tracing::trace!(index = unit.index, "NullSink discarding unit");
        Ok(())
    }
}
