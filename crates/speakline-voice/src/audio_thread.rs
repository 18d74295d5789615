//! Dedicated audio output thread. Isolates `!Send` rodio resources from the
//! async runtime.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. Rather than using
//! `unsafe impl Send/Sync`, we confine it to a single OS thread and
//! communicate via channels. [`AudioThreadHandle`] is the `Send + Sync`
//! proxy the sink holds.

use std::sync::mpsc;
use std::thread;

use crate::error::VoiceError;
use crate::playback::AudioPlayback;

// ── Commands ───────────────────────────────────────────────────────

/// A command sent from the sink to the audio thread.
enum AudioCommand {
    /// Start playing samples (fire-and-forget).
    Play { samples: Vec<f32>, sample_rate: u32 },

    /// Stop all active playback (fire-and-forget).
    Stop,

    /// Query whether audio is currently playing.
    IsPlaying { reply: mpsc::Sender<bool> },

    /// Shut down the audio thread, releasing all resources.
    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `Send + Sync` handle to the dedicated audio output thread.
///
/// `play` and `stop` never wait for the audio thread; only `is_playing`
/// round-trips.
pub struct AudioThreadHandle {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioThreadHandle {
    /// Spawn the audio thread, open the default output device, and return
    /// the handle.
    ///
    /// Errors from `AudioPlayback::new` are propagated back to the caller
    /// via a one-shot init channel.
    pub fn spawn() -> Result<Self, VoiceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), VoiceError>>();

        let thread = thread::Builder::new()
            .name("speakline-audio".into())
            .spawn(move || Self::run(&cmd_rx, &init_tx))
            .map_err(|e| VoiceError::OutputStream(format!("failed to spawn audio thread: {e}")))?;

        // Wait for the audio thread to finish initialisation.
        init_rx.recv().map_err(|_| VoiceError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    /// Start playing samples without waiting for the audio thread.
    pub fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), VoiceError> {
        self.send(AudioCommand::Play {
            samples,
            sample_rate,
        })
    }

    /// Stop any active playback immediately.
    pub fn stop(&self) -> Result<(), VoiceError> {
        self.send(AudioCommand::Stop)
    }

    /// Check whether audio is currently playing.
    pub fn is_playing(&self) -> bool {
        let (tx, rx) = mpsc::channel();
        if self.send(AudioCommand::IsPlaying { reply: tx }).is_err() {
            return false;
        }
        rx.recv().unwrap_or(false)
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn send(&self, cmd: AudioCommand) -> Result<(), VoiceError> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| VoiceError::AudioThreadDied)
    }

    // ── Audio thread event loop ────────────────────────────────────

    /// The body of the dedicated audio thread. Owns `AudioPlayback` for its
    /// entire lifetime.
    fn run(cmd_rx: &mpsc::Receiver<AudioCommand>, init_tx: &mpsc::Sender<Result<(), VoiceError>>) {
        let mut playback = match AudioPlayback::new() {
            Ok(p) => p,
            Err(e) => {
                let _ = init_tx.send(Err(e));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            // Caller dropped.
            return;
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::Play {
                    samples,
                    sample_rate,
                } => {
                    if let Err(e) = playback.play(samples, sample_rate) {
                        tracing::warn!(error = %e, "Failed to start unit playback");
                    }
                }

                AudioCommand::Stop => playback.stop(),

                AudioCommand::IsPlaying { reply } => {
                    let _ = reply.send(playback.is_playing());
                }

                AudioCommand::Shutdown => break,
            }
        }

        // `playback` is dropped here, on the audio thread.
        tracing::debug!("Audio thread shutting down");
    }
}

impl Drop for AudioThreadHandle {
    fn drop(&mut self) {
        // The thread may already be dead.
        let _ = self.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
