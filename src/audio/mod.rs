//! Sound feedback for the booth.
//!
//! An [`AudioSession`] is built explicitly, handed to the orchestrator and
//! torn down with [`AudioSession::dispose`]. Samples are synthesized locally
//! and pushed to an [`AudioSink`] supplied by the host.

#[cfg(feature = "sound")]
mod device;
mod synth;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

#[cfg(feature = "sound")]
pub use device::RodioSink;
pub use synth::{SoundEffect, Synth, AMBIENT_SCALE, SAMPLE_RATE};

#[derive(Debug, Clone)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub samples: Arc<[f32]>,
}

impl AudioClip {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

/// Output device for synthesized mono clips.
pub trait AudioSink: Send + Sync {
    fn play(&self, clip: AudioClip);
}

/// Sink that drops every clip; used when no output device is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn play(&self, clip: AudioClip) {
        tracing::trace!(duration_ms = clip.duration().as_millis() as u64, "dropping clip");
    }
}

/// Speaker output when built with the `sound` feature and a device opens, otherwise silence.
pub fn default_sink() -> Arc<dyn AudioSink> {
    #[cfg(feature = "sound")]
    {
        match RodioSink::open_default() {
            Ok(sink) => return Arc::new(sink),
            Err(error) => tracing::warn!(%error, "sound disabled"),
        }
    }
    Arc::new(SilentSink)
}

pub struct AudioSession {
    synth: Synth,
    sink: Arc<dyn AudioSink>,
    rng: Mutex<StdRng>,
    ambient: Mutex<Option<CancellationToken>>,
    disposed: AtomicBool,
}

impl AudioSession {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self::from_rng(sink, StdRng::from_rng(&mut rand::rng()))
    }

    /// Deterministic noise and note choices.
    pub fn with_seed(sink: Arc<dyn AudioSink>, seed: u64) -> Self {
        Self::from_rng(sink, StdRng::seed_from_u64(seed))
    }

    fn from_rng(sink: Arc<dyn AudioSink>, mut rng: StdRng) -> Self {
        Self {
            synth: Synth::new(&mut rng),
            sink,
            rng: Mutex::new(rng),
            ambient: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn play(&self, effect: SoundEffect) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        self.sink.play(self.synth.render(effect));
    }

    /// Starts the ambient loop unless it is already running. Needs a Tokio runtime.
    pub fn start_ambient(&self) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            return false;
        }

        let mut ambient = lock(&self.ambient);
        if ambient.is_some() {
            return false;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime, ambient music not started");
            return false;
        };

        let token = CancellationToken::new();
        let task_token = token.clone();
        let synth = self.synth.clone();
        let sink = Arc::clone(&self.sink);
        let mut rng = StdRng::seed_from_u64(lock(&self.rng).random());

        handle.spawn(async move {
            while !task_token.is_cancelled() {
                let frequency = AMBIENT_SCALE[rng.random_range(0..AMBIENT_SCALE.len())];
                let length = Duration::from_secs_f32(rng.random_range(2.0f32..4.0));
                sink.play(synth.ambient_note(frequency, length));

                let gap = Duration::from_millis(rng.random_range(500..1500));
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(gap) => {}
                }
            }
        });

        tracing::debug!("ambient music started");
        *ambient = Some(token);
        true
    }

    pub fn stop_ambient(&self) {
        if let Some(token) = lock(&self.ambient).take() {
            token.cancel();
            tracing::debug!("ambient music stopped");
        }
    }

    pub fn is_ambient_playing(&self) -> bool {
        lock(&self.ambient).is_some()
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.stop_ambient();
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        self.stop_ambient();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
