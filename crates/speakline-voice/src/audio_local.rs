//! Local (rodio) adapter for the [`AudioSink`] trait.
//!
//! [`LocalAudioSink`] is a thin wrapper around [`AudioThreadHandle`]: the
//! audio OS thread owns the rodio output stream, and every method here only
//! sends a command to it.
//!
//! ```no_run
//! # use speakline_voice::VoiceError;
//! use speakline_voice::audio_local::LocalAudioSink;
//! let sink = LocalAudioSink::new()?;
//! # Ok::<(), VoiceError>(())
//! ```

use crate::audio_io::AudioSink;
use crate::audio_thread::AudioThreadHandle;
use crate::error::VoiceError;
use crate::track::SpeechUnit;

/// Plays each emitted unit on the default output device.
pub struct LocalAudioSink {
    handle: AudioThreadHandle,
}

impl LocalAudioSink {
    /// Spawn the audio thread and open the default output device.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceError`] if the audio thread fails to start (e.g. no
    /// output device present).
    pub fn new() -> Result<Self, VoiceError> {
        Ok(Self {
            handle: AudioThreadHandle::spawn()?,
        })
    }

    /// Whether any unit is still audible.
    pub fn is_playing(&self) -> bool {
        self.handle.is_playing()
    }
}

impl AudioSink for LocalAudioSink {
    fn emit(&self, unit: &SpeechUnit) -> Result<(), VoiceError> {
        self.handle
            .play(unit.clip.samples.clone(), unit.clip.sample_rate)
    }

    fn stop(&self) -> Result<(), VoiceError> {
        self.handle.stop()
    }
}
