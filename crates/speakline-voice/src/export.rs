//! WAV export via `hound`: the finalized track as one file, or every
//! emitted unit as its own file through [`WavDirSink`].

use std::path::{Path, PathBuf};

use crate::audio_io::AudioSink;
use crate::error::VoiceError;
use crate::track::{SpeechUnit, Track};

/// Write `track` as a mono 16-bit PCM WAV file.
///
/// Samples are scaled by 32767 and clamped to the `i16` range. An empty
/// track has no sample rate and is rejected with [`VoiceError::EmptyInput`]
/// before anything is created on disk.
pub fn write_wav(track: &Track, path: impl AsRef<Path>) -> Result<(), VoiceError> {
    let path = path.as_ref();
    if track.is_empty() || track.sample_rate() == 0 {
        return Err(VoiceError::EmptyInput);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_samples(path, track.samples(), track.sample_rate())?;

    tracing::info!(
        path = %path.display(),
        units = track.units().len(),
        duration_ms = track.duration().as_millis(),
        "Track exported"
    );
    Ok(())
}

// ── Per-unit files ─────────────────────────────────────────────────

/// Sink that persists every emitted unit as `segment-NNNN.wav` under one
/// directory, leading silence included.
///
/// Files are written synchronously inside `emit`; a write failure is
/// returned (and therefore only logged by the scheduler).
#[derive(Debug, Clone)]
pub struct WavDirSink {
    dir: PathBuf,
}

impl WavDirSink {
    /// Create the sink, creating `dir` if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, VoiceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory the unit files are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path used for the unit at `index`.
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("segment-{index:04}.wav"))
    }
}

impl AudioSink for WavDirSink {
    fn emit(&self, unit: &SpeechUnit) -> Result<(), VoiceError> {
        let path = self.path_for(unit.index);
        write_samples(&path, &unit.clip.samples, unit.clip.sample_rate)?;
        tracing::debug!(index = unit.index, path = %path.display(), "Unit saved");
        Ok(())
    }
}

fn write_samples(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), VoiceError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(to_i16(sample))?;
    }
    writer.finalize()?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}
