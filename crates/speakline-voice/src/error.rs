//! Speech pipeline error types.

use crate::config::ConfigError;

/// Errors that can occur while scheduling, accumulating, or exporting speech.
///
/// Underruns are deliberately absent: they are reported as
/// [`SchedulerEvent::Underrun`](crate::scheduler::SchedulerEvent::Underrun)
/// and never abort a call.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// Segmentation produced no segments.
    #[error("Nothing to speak: input produced no segments")]
    EmptyInput,

    /// The synthesis engine failed for one segment.
    #[error("Speech synthesis failed for segment {index}: {message}")]
    Synthesis { index: usize, message: String },

    /// The track was already finalized.
    #[error("Track is closed: it has already been finalized")]
    TrackClosed,

    /// A unit does not match the sample rate the track was started with.
    #[error("Sample rate mismatch: track is {expected} Hz, unit is {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    /// Failed to open or use the audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStream(String),

    /// The dedicated audio thread is no longer running.
    #[error("Audio thread died unexpectedly")]
    AudioThreadDied,

    /// WAV encoding failed.
    #[error("WAV export failed: {0}")]
    Export(#[from] hound::Error),

    /// IO error (export destination).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid scheduler configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl VoiceError {
    /// Build a [`VoiceError::Synthesis`] for the segment at `index`.
    pub fn synthesis(index: usize, message: impl Into<String>) -> Self {
        Self::Synthesis {
            index,
            message: message.into(),
        }
    }
}
