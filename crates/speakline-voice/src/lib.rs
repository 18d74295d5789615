//! Streaming sentence-pipelined speech synthesis.
//!
//! Text is split into sentences; each sentence is synthesized while the
//! previous one is still playing, and emitted exactly when the previous one
//! finishes. See [`scheduler`] for the timing rules.
//!
//! ```no_run
//! # async fn demo(tts: Box<dyn speakline_voice::TtsBackend>) -> Result<(), speakline_voice::VoiceError> {
//! use speakline_voice::{NullSink, SpeechScheduler};
//!
//! let (mut scheduler, _events) = SpeechScheduler::with_defaults(tts, Box::new(NullSink));
//! let track = scheduler.speak_with_config("Hello there. How are you?").await?;
//! track.write_wav("outputs/full.wav")?;
//! # Ok(())
//! # }
//! ```

pub mod audio_io;
pub mod backend;
pub mod clip;
pub mod config;
pub mod error;
pub mod export;
pub mod scheduler;
pub mod text_utils;
pub mod track;

#[cfg(feature = "playback")]
pub mod audio_local;
#[cfg(feature = "playback")]
pub mod audio_thread;
#[cfg(feature = "playback")]
pub mod playback;

// Re-export key types for convenience
pub use audio_io::{AudioSink, NullSink};
pub use backend::TtsBackend;
pub use clip::AudioClip;
pub use config::{ConfigError, SchedulerConfig};
pub use error::VoiceError;
pub use export::WavDirSink;
pub use scheduler::{SchedulerEvent, SpeechScheduler, TextSegment, TimingAnchor};
pub use text_utils::{Segmenter, SentenceSegmenter};
pub use track::{SpeechUnit, Track, TrackAccumulator, TrackUnit};
