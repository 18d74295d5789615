//! Speech scheduler: pipelines synthesis of the next sentence against
//! playback of the current one.
//!
//! ```text
//!   segment 0: synthesize ─ emit ─┐ anchor
//!   segment 1:      synthesize ───┴─ wait(remaining + delay) ─ emit ─┐ anchor
//!   segment 2:                          synthesize ──────────────────┴─ …
//! ```
//!
//! Synthesis of segment *i* runs while unit *i − 1* is (conceptually)
//! still playing, so its cost is charged against the previous unit's
//! playback time. The scheduler then sleeps only for whatever playback time
//! is left. If synthesis took longer than that, the transition is an
//! *underrun*: it is reported via [`SchedulerEvent::Underrun`] and the unit
//! is emitted immediately.
//!
//! Timing uses [`tokio::time::Instant`] and [`tokio::time::sleep`], so tests
//! can drive the scheduler on a paused virtual clock.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::audio_io::AudioSink;
use crate::backend::TtsBackend;
use crate::clip::AudioClip;
use crate::config::{self, SchedulerConfig};
use crate::error::VoiceError;
use crate::text_utils::{Segmenter, SentenceSegmenter};
use crate::track::{SpeechUnit, Track, TrackAccumulator};

// ── Segments ───────────────────────────────────────────────────────

/// One sentence of the input, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub index: usize,
    pub text: String,
}

impl TextSegment {
    fn to_unit(&self, clip: AudioClip) -> SpeechUnit {
        SpeechUnit {
            index: self.index,
            text: self.text.clone(),
            clip,
        }
    }
}

// ── Timing anchor ──────────────────────────────────────────────────

/// When the currently playing unit started and how long it should play.
///
/// Replaced (never merged) every time a unit is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingAnchor {
    pub started_at: Instant,
    pub expected_duration: Duration,
}

impl TimingAnchor {
    /// Anchor a unit that starts playing now.
    #[must_use]
    pub fn start(expected_duration: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            expected_duration,
        }
    }

    /// Playback time left for the anchored unit.
    ///
    /// Returns `Ok(remaining)` while strictly positive, otherwise
    /// `Err(lateness)`, how far past the expected end we already are
    /// (zero when exactly on time).
    pub fn remaining(&self) -> Result<Duration, Duration> {
        let elapsed = self.started_at.elapsed();
        match self.expected_duration.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => Ok(remaining),
            _ => Err(elapsed.saturating_sub(self.expected_duration)),
        }
    }
}

// ── Events emitted by the scheduler ────────────────────────────────

/// Events emitted by the scheduler for observability and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A unit was handed to the sink.
    SegmentEmitted {
        index: usize,
        /// Offset from the start of the `speak` call.
        at: Duration,
        /// Playback duration of the unit, silence included.
        duration: Duration,
    },

    /// Synthesis of `index` finished after the previous unit should have
    /// stopped playing. Non-fatal: the unit is emitted without waiting.
    Underrun { index: usize, lateness: Duration },

    /// A `speak` call completed.
    Finished {
        segments: usize,
        underruns: usize,
        elapsed: Duration,
    },
}

// ── Scheduler ──────────────────────────────────────────────────────

/// Drives segmentation, synthesis and real-time emission of speech.
///
/// `speak` takes `&mut self`: one scheduler runs one call at a time, which
/// keeps the timing anchor and the sink's output strictly ordered.
pub struct SpeechScheduler {
    config: SchedulerConfig,
    segmenter: Box<dyn Segmenter>,
    tts: Box<dyn TtsBackend>,
    sink: Box<dyn AudioSink>,
    event_tx: mpsc::UnboundedSender<SchedulerEvent>,
}

impl SpeechScheduler {
    /// Create a scheduler.
    ///
    /// Returns the scheduler and a receiver for [`SchedulerEvent`]s. The
    /// receiver may be dropped if events are not needed.
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        segmenter: Box<dyn Segmenter>,
        tts: Box<dyn TtsBackend>,
        sink: Box<dyn AudioSink>,
    ) -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let scheduler = Self {
            config,
            segmenter,
            tts,
            sink,
            event_tx,
        };

        (scheduler, event_rx)
    }

    /// Create a scheduler with the default config and [`SentenceSegmenter`].
    #[must_use]
    pub fn with_defaults(
        tts: Box<dyn TtsBackend>,
        sink: Box<dyn AudioSink>,
    ) -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        Self::new(
            SchedulerConfig::default(),
            Box::new(SentenceSegmenter::new()),
            tts,
            sink,
        )
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Replace the configuration after validating it.
    pub fn set_config(&mut self, config: SchedulerConfig) -> Result<(), VoiceError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Split `text` into indexed segments, dropping blank ones.
    #[must_use]
    pub fn segments(&self, text: &str) -> Vec<TextSegment> {
        self.segmenter
            .segment(text)
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .enumerate()
            .map(|(index, text)| TextSegment { index, text })
            .collect()
    }

    // ── Warm-up ────────────────────────────────────────────────────

    /// Run `warmup_passes` throw-away syntheses so the first real segment
    /// does not pay one-off engine initialisation cost. Nothing is emitted.
    pub async fn warm_up(&self) -> Result<(), VoiceError> {
        let passes = self.config.warmup_passes;
        let started = Instant::now();

        for pass in 0..passes {
            self.tts.synthesize(&pass.to_string()).await?;
        }

        tracing::info!(
            passes,
            engine = self.tts.name(),
            warmup_ms = started.elapsed().as_millis(),
            "TTS engine warmed up"
        );
        Ok(())
    }

    // ── Speaking ───────────────────────────────────────────────────

    /// [`speak`](Self::speak) using the configured padding durations.
    pub async fn speak_with_config(&mut self, text: &str) -> Result<Track, VoiceError> {
        self.config.validate()?;
        let lead_silence = self.config.lead_silence;
        let inter_segment_delay = self.config.inter_segment_delay;
        self.speak(text, lead_silence, inter_segment_delay).await
    }

    /// Speak `text`, returning the full track once the last unit has had
    /// time to finish playing.
    ///
    /// The track is `lead_silence ++ clip_0`, then
    /// `inter_segment_delay ++ clip_i` for every later segment, in order.
    ///
    /// # Errors
    /// - [`VoiceError::EmptyInput`] if segmentation yields nothing (nothing
    ///   is synthesized or emitted).
    /// - [`VoiceError::Config`] if either padding exceeds
    ///   [`MAX_PADDING`](crate::config::MAX_PADDING).
    /// - [`VoiceError::Synthesis`] if the engine fails; units already
    ///   emitted are not retracted and no track is returned.
    /// - [`VoiceError::SampleRateMismatch`] if a clip's rate differs from the
    ///   first one; the mismatched unit is never emitted.
    pub async fn speak(
        &mut self,
        text: &str,
        lead_silence: Duration,
        inter_segment_delay: Duration,
    ) -> Result<Track, VoiceError> {
        config::check_padding("lead_silence", lead_silence)?;
        config::check_padding("inter_segment_delay", inter_segment_delay)?;

        let segments = self.segments(text);
        let Some((first, rest)) = segments.split_first() else {
            tracing::debug!(text_len = text.len(), "Segmentation produced nothing to speak");
            return Err(VoiceError::EmptyInput);
        };

        tracing::info!(
            segments = segments.len(),
            text_len = text.len(),
            engine = self.tts.name(),
            "Speaking text"
        );

        let call_started = Instant::now();
        let mut track = TrackAccumulator::new();
        let mut underruns: usize = 0;

        let clip = self.synthesize(first).await?;
        let unit = first.to_unit(clip.with_leading_silence(lead_silence));
        track.append(&unit)?;
        self.emit_unit(&unit, call_started);
        let mut anchor = TimingAnchor::start(unit.duration());

        for segment in rest {
            // Runs while the previous unit is still playing.
            let clip = self.synthesize(segment).await?;
            let clip_duration = clip.duration;

            match anchor.remaining() {
                Ok(remaining) => {
                    let wait = remaining.saturating_add(inter_segment_delay);
                    tracing::debug!(
                        index = segment.index,
                        wait_ms = wait.as_millis(),
                        "Waiting for previous unit to finish"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(lateness) => {
                    underruns += 1;
                    tracing::warn!(
                        index = segment.index,
                        lateness_ms = lateness.as_millis(),
                        "Synthesis is slower than realtime"
                    );
                    self.emit(SchedulerEvent::Underrun {
                        index: segment.index,
                        lateness,
                    });
                }
            }

            let unit = segment.to_unit(clip.with_leading_silence(inter_segment_delay));
            track.append(&unit)?;
            self.emit_unit(&unit, call_started);
            anchor = TimingAnchor::start(clip_duration);
        }

        // Do not return before the last unit has finished playing.
        match anchor.remaining() {
            Ok(remaining) => {
                tokio::time::sleep(remaining.saturating_add(inter_segment_delay)).await;
            }
            Err(lateness) if lateness.is_zero() => tokio::time::sleep(inter_segment_delay).await,
            Err(_) => {}
        }

        let track = track.finalize()?;
        let elapsed = call_started.elapsed();

        tracing::info!(
            segments = segments.len(),
            underruns,
            track_ms = track.duration().as_millis(),
            elapsed_ms = elapsed.as_millis(),
            "Finished speaking"
        );
        self.emit(SchedulerEvent::Finished {
            segments: segments.len(),
            underruns,
            elapsed,
        });

        Ok(track)
    }

    /// Stop any audio the sink is still playing.
    pub fn stop(&self) -> Result<(), VoiceError> {
        self.sink.stop()
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Synthesize one segment, tagging failures with its index.
    async fn synthesize(&self, segment: &TextSegment) -> Result<AudioClip, VoiceError> {
        let started = Instant::now();

        let clip = self
            .tts
            .synthesize(&segment.text)
            .await
            .map_err(|e| {
                tracing::warn!(
                    index = segment.index,
                    segment_text = preview(&segment.text),
                    error = %e,
                    "Failed to synthesise segment, aborting"
                );
                match e {
                    VoiceError::Synthesis { message, .. } => {
                        VoiceError::synthesis(segment.index, message)
                    }
                    other => VoiceError::synthesis(segment.index, other.to_string()),
                }
            })?;

        tracing::debug!(
            index = segment.index,
            text_len = segment.text.len(),
            samples = clip.samples.len(),
            duration_ms = clip.duration.as_millis(),
            synth_ms = started.elapsed().as_millis(),
            "Synthesised segment"
        );

        Ok(clip)
    }

    /// Hand a unit to the sink. Sink failures are logged, never fatal.
    fn emit_unit(&self, unit: &SpeechUnit, call_started: Instant) {
        if let Err(e) = self.sink.emit(unit) {
            tracing::warn!(index = unit.index, error = %e, "Audio sink failed to play unit");
        }

        tracing::debug!(
            index = unit.index,
            duration_ms = unit.duration().as_millis(),
            "Unit emitted"
        );
        self.emit(SchedulerEvent::SegmentEmitted {
            index: unit.index,
            at: call_started.elapsed(),
            duration: unit.duration(),
        });
    }

    /// Emit a scheduler event (a dropped receiver is fine).
    fn emit(&self, event: SchedulerEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("Scheduler event receiver dropped");
        }
    }
}

/// First 80 characters of `text`, for log lines.
fn preview(text: &str) -> &str {
    text.char_indices().nth(80).map_or(text, |(end, _)| &text[..end])
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::audio_io::MockAudioSink;
    use crate::config::{ConfigError, MAX_PADDING};
    use crate::text_utils::MockSegmenter;

    /// Instant TTS: every clip lasts 100 ms, optional failure on one text.
    #[derive(Default)]
    struct FakeTts {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
        texts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl TtsBackend for FakeTts {
        async fn synthesize(&self, text: &str) -> Result<AudioClip, VoiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.texts.lock().unwrap().push(text.to_string());
            if self.fail_on == Some(text) {
                return Err(VoiceError::synthesis(0, "model exploded"));
            }
            Ok(AudioClip::from_samples(vec![0.1; 100], 1_000))
        }
    }

    fn segmenter_returning(segments: &[&str]) -> Box<MockSegmenter> {
        let segments: Vec<String> = segments.iter().map(ToString::to_string).collect();
        let mut segmenter = MockSegmenter::new();
        segmenter
            .expect_segment()
            .returning(move |_| segments.clone());
        Box::new(segmenter)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_emits_nothing() {
        let tts = Arc::new(FakeTts::default());
        let mut sink = MockAudioSink::new();
        sink.expect_emit().never();

        let (mut scheduler, mut rx) = SpeechScheduler::new(
            SchedulerConfig::default(),
            segmenter_returning(&[]),
            Box::new(Arc::clone(&tts)),
            Box::new(sink),
        );

        let err = scheduler
            .speak("", Duration::ZERO, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::EmptyInput));
        assert_eq!(tts.calls.load(Ordering::SeqCst), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_segments_are_dropped_and_reindexed() {
        let tts = Arc::new(FakeTts::default());
        let (scheduler, _rx) = SpeechScheduler::new(
            SchedulerConfig::default(),
            segmenter_returning(&["  ", "Hello.", "", " World. "]),
            Box::new(Arc::clone(&tts)),
            Box::new(crate::audio_io::NullSink),
        );

        let segments = scheduler.segments("ignored");
        assert_eq!(
            segments,
            vec![
                TextSegment { index: 0, text: "Hello.".into() },
                TextSegment { index: 1, text: "World.".into() },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn synthesis_failure_aborts_with_segment_index() {
        let tts = Arc::new(FakeTts {
            fail_on: Some("Two."),
            ..FakeTts::default()
        });
        let mut sink = MockAudioSink::new();
        sink.expect_emit()
            .withf(|unit| unit.index == 0)
            .times(1)
            .returning(|_| Ok(()));

        let (mut scheduler, mut rx) = SpeechScheduler::new(
            SchedulerConfig::default(),
            segmenter_returning(&["One.", "Two.", "Three."]),
            Box::new(Arc::clone(&tts)),
            Box::new(sink),
        );

        let err = scheduler
            .speak("One. Two. Three.", Duration::ZERO, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(
            matches!(err, VoiceError::Synthesis { index: 1, .. }),
            "expected Synthesis for segment 1, got {err:?}"
        );
        // No retry, and the third segment is never attempted.
        assert_eq!(*tts.texts.lock().unwrap(), vec!["One.", "Two."]);
        assert!(!drain(&mut rx)
            .iter()
            .any(|e| matches!(e, SchedulerEvent::Finished { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn sink_failure_is_not_fatal() {
        let mut sink = MockAudioSink::new();
        sink.expect_emit()
            .times(2)
            .returning(|_| Err(VoiceError::OutputStream("device unplugged".into())));

        let (mut scheduler, _rx) = SpeechScheduler::new(
            SchedulerConfig::default(),
            segmenter_returning(&["One.", "Two."]),
            Box::new(FakeTts::default()),
            Box::new(sink),
        );

        let track = scheduler
            .speak("One. Two.", Duration::ZERO, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(track.units().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn warm_up_synthesizes_without_emitting() {
        let tts = Arc::new(FakeTts::default());
        let mut sink = MockAudioSink::new();
        sink.expect_emit().never();

        let config = SchedulerConfig {
            warmup_passes: 3,
            ..SchedulerConfig::default()
        };
        let (scheduler, _rx) = SpeechScheduler::new(
            config,
            segmenter_returning(&[]),
            Box::new(Arc::clone(&tts)),
            Box::new(sink),
        );

        scheduler.warm_up().await.unwrap();
        assert_eq!(*tts.texts.lock().unwrap(), vec!["0", "1", "2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn speak_with_config_uses_configured_padding() {
        let config = SchedulerConfig::from_secs(0.2, 0.05).unwrap();
        let (mut scheduler, _rx) = SpeechScheduler::new(
            config,
            segmenter_returning(&["One.", "Two."]),
            Box::new(FakeTts::default()),
            Box::new(crate::audio_io::NullSink),
        );

        let track = scheduler.speak_with_config("One. Two.").await.unwrap();
        assert_eq!(track.units()[0].duration, Duration::from_millis(300));
        assert_eq!(track.units()[1].duration, Duration::from_millis(150));
        assert_eq!(track.samples().len(), 200 + 100 + 50 + 100);
    }

    #[test]
    fn set_config_rejects_invalid_values() {
        let (mut scheduler, _rx) = SpeechScheduler::with_defaults(
            Box::new(FakeTts::default()),
            Box::new(crate::audio_io::NullSink),
        );
        let bad = SchedulerConfig {
            warmup_passes: 1_000,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            scheduler.set_config(bad),
            Err(VoiceError::Config(_))
        ));
        assert_eq!(scheduler.config(), &SchedulerConfig::default());
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        assert_eq!(preview("short"), "short");
        let long = "é".repeat(100);
        assert_eq!(preview(&long).chars().count(), 80);
    }

    #[tokio::test(start_paused = true)]
    async fn anchor_reports_remaining_then_lateness() {
        let anchor = TimingAnchor::start(Duration::from_millis(500));
        assert_eq!(anchor.remaining(), Ok(Duration::from_millis(500)));

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(anchor.remaining(), Ok(Duration::from_millis(300)));

        tokio::time::advance(Duration::from_millis(300)).await;
        assert_eq!(anchor.remaining(), Err(Duration::ZERO));

        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(anchor.remaining(), Err(Duration::from_millis(250)));
    }

    /// Clips for "One." come back at 1 kHz, everything else at 2 kHz.
    struct TwoRateTts;

    #[async_trait::async_trait]
    impl TtsBackend for TwoRateTts {
        async fn synthesize(&self, text: &str) -> Result<AudioClip, VoiceError> {
            let sample_rate = if text == "One." { 1_000 } else { 2_000 };
            Ok(AudioClip::from_samples(vec![0.1; 100], sample_rate))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn mismatched_sample_rate_is_never_emitted() {
        let mut sink = MockAudioSink::new();
        sink.expect_emit()
            .withf(|unit| unit.index == 0)
            .times(1)
            .returning(|_| Ok(()));

        let (mut scheduler, mut rx) = SpeechScheduler::new(
            SchedulerConfig::default(),
            segmenter_returning(&["One.", "Two."]),
            Box::new(TwoRateTts),
            Box::new(sink),
        );

        let err = scheduler
            .speak("One. Two.", Duration::ZERO, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VoiceError::SampleRateMismatch {
                expected: 1_000,
                actual: 2_000
            }
        ));

        let emitted: Vec<usize> = drain(&mut rx)
            .iter()
            .filter_map(|e| match e {
                SchedulerEvent::SegmentEmitted { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(emitted, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_padding_is_rejected_before_synthesis() {
        let tts = Arc::new(FakeTts::default());
        let mut sink = MockAudioSink::new();
        sink.expect_emit().never();

        let (mut scheduler, mut rx) = SpeechScheduler::new(
            SchedulerConfig::default(),
            segmenter_returning(&["One."]),
            Box::new(Arc::clone(&tts)),
            Box::new(sink),
        );

        let err = scheduler
            .speak("One.", Duration::MAX, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VoiceError::Config(ConfigError::PaddingTooLong {
                field: "lead_silence",
                ..
            })
        ));

        let err = scheduler
            .speak("One.", Duration::ZERO, Duration::MAX)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VoiceError::Config(ConfigError::PaddingTooLong {
                field: "inter_segment_delay",
                ..
            })
        ));

        assert_eq!(tts.calls.load(Ordering::SeqCst), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn padding_at_the_limit_is_accepted() {
        let (mut scheduler, _rx) = SpeechScheduler::new(
            SchedulerConfig::default(),
            segmenter_returning(&["One.", "Two."]),
            Box::new(FakeTts::default()),
            Box::new(crate::audio_io::NullSink),
        );

        let track = scheduler
            .speak("One. Two.", MAX_PADDING, MAX_PADDING)
            .await
            .unwrap();
        assert_eq!(
            track.duration(),
            MAX_PADDING * 2 + Duration::from_millis(200)
        );
    }
}
