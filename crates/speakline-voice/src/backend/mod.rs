//! Synthesis engine seam: the engine-agnostic [`TtsBackend`] trait.
//!
//! The [`SpeechScheduler`](crate::scheduler::SpeechScheduler) holds a
//! `Box<dyn TtsBackend>` so that engines can be swapped without touching the
//! scheduling logic. Concrete engines (ONNX models, remote APIs, …) live
//! outside this crate and only have to turn one sentence into one
//! [`AudioClip`].

use std::sync::Arc;

use crate::clip::AudioClip;
use crate::error::VoiceError;

/// Backend-agnostic text-to-speech engine.
///
/// Implementations must be `Send + Sync` so the scheduler can be moved into
/// a spawned task.
///
/// `synthesize` is async (via [`async_trait`]) because most engines either
/// run inference on a blocking pool or talk to a remote service. It may take
/// an arbitrary amount of time; the scheduler charges that time against the
/// playback of the previous segment.
#[async_trait::async_trait]
pub trait TtsBackend: Send + Sync {
    /// Synthesize a single segment of text.
    ///
    /// # Returns
    /// An [`AudioClip`] with the PCM samples, sample rate and duration.
    /// Failures should use [`VoiceError::Synthesis`]; the scheduler re-tags
    /// them with the failing segment index.
    async fn synthesize(&self, text: &str) -> Result<AudioClip, VoiceError>;

    /// Engine name for logs.
    fn name(&self) -> &str {
        "tts"
    }
}

#[async_trait::async_trait]
impl<T: TtsBackend + ?Sized> TtsBackend for Arc<T> {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, VoiceError> {
        (**self).synthesize(text).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
