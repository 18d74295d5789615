//! Audio playback module: unit output via `rodio`.
//!
//! Every emitted unit gets its own detached-style [`Sink`] so that starting
//! a unit never waits for the previous one. Normally the scheduler's timing
//! keeps units back-to-back; during an underrun two units may briefly
//! overlap, which is accepted.

use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::error::VoiceError;

/// Audio playback handle for speech units.
///
/// Must stay on the thread that created it (`OutputStream` is `!Send` on
/// some platforms); see [`AudioThreadHandle`](crate::audio_thread::AudioThreadHandle).
pub struct AudioPlayback {
    /// rodio output stream (must be kept alive).
    _stream: OutputStream,

    /// Handle used to create sinks.
    stream_handle: OutputStreamHandle,

    /// Sinks of units that may still be playing.
    active: Vec<Sink>,
}

impl AudioPlayback {
    /// Create a new audio playback instance using the default output device.
    pub fn new() -> Result<Self, VoiceError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| VoiceError::OutputStream(e.to_string()))?;

        tracing::info!("Audio playback initialized on default output device");

        Ok(Self {
            _stream: stream,
            stream_handle,
            active: Vec::new(),
        })
    }

    /// Start playing mono samples immediately, alongside anything already
    /// playing.
    pub fn play(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<(), VoiceError> {
        self.active.retain(|sink| !sink.empty());

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| VoiceError::OutputStream(e.to_string()))?;
        sink.append(rodio::buffer::SamplesBuffer::new(1, sample_rate, samples));
        self.active.push(sink);

        tracing::debug!(sample_rate, active = self.active.len(), "Unit playback started");
        Ok(())
    }

    /// Stop every active unit immediately.
    pub fn stop(&mut self) {
        for sink in self.active.drain(..) {
            sink.stop();
        }
        tracing::debug!("Audio playback stopped");
    }

    /// Check whether any unit is still playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.active.iter().any(|sink| !sink.empty())
    }
}
