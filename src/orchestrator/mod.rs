//! The booth's session state machine.
//!
//! `Idle → ProcessingImage → Printing → ReadyToView ⇄ GeneratingVideo/PlayingVideo`,
//! with `reset` returning to `Idle` from anywhere. Every session carries an epoch
//! and a cancellation token; work that outlives its session is dropped.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    audio::{AudioSession, SoundEffect},
    catalog,
    config::BoothConfig,
    error::{AppError, AppResult},
    generation::RemoteClient,
    models::{
        AnimationConfig, CaptionConfig, FrameConfig, Phase, SessionSnapshot, StylizedImage,
        VideoRef,
    },
    panels::{clamp_speed, CaptureIntent},
    render::{flatten, CaptionFonts},
    storage,
};

pub const CAPTURE_FAILED_MESSAGE: &str = "Failed to process image. Please try again.";
pub const ANIMATION_FAILED_MESSAGE: &str = "Failed to generate video.";

/// How an accepted operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The session rolled back; `message` is what the booth shows.
    Failed { message: String },
    /// The session was reset before the result arrived.
    Discarded,
}

struct SessionState {
    id: Uuid,
    epoch: u64,
    phase: Phase,
    frame: FrameConfig,
    caption: Option<CaptionConfig>,
    image: Option<StylizedImage>,
    video: Option<VideoRef>,
    playback_rate: f64,
    error: Option<String>,
    cancel: CancellationToken,
}

impl SessionState {
    fn new(epoch: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            phase: Phase::Idle,
            frame: catalog::default_frame(),
            caption: None,
            image: None,
            video: None,
            playback_rate: 1.0,
            error: None,
            cancel: CancellationToken::new(),
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            phase: self.phase,
            frame: self.frame,
            caption: self.caption.clone(),
            image: self.image.clone(),
            video: self.video.clone(),
            playback_rate: self.playback_rate,
            error: self.error.clone(),
        }
    }
}

struct Shared {
    client: RemoteClient,
    audio: Arc<AudioSession>,
    print_delay: Duration,
    state: Mutex<SessionState>,
    snapshots: watch::Sender<SessionSnapshot>,
}

#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    pub fn new(client: RemoteClient, audio: Arc<AudioSession>, print_delay: Duration) -> Self {
        let state = SessionState::new(0);
        let (snapshots, _) = watch::channel(state.snapshot());

        Self {
            shared: Arc::new(Shared {
                client,
                audio,
                print_delay,
                state: Mutex::new(state),
                snapshots,
            }),
        }
    }

    pub fn from_config(
        client: RemoteClient,
        audio: Arc<AudioSession>,
        config: &BoothConfig,
    ) -> Self {
        Self::new(client.with_poll_policy(config.poll), audio, config.print_delay)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshots.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.snapshot().phase
    }

    /// Waits until the session reaches `phase`, or gives up once it falls back to `Idle`.
    pub async fn wait_for_phase(&self, phase: Phase) -> AppResult<SessionSnapshot> {
        let mut snapshots = self.subscribe();
        let snapshot = snapshots
            .wait_for(|snapshot| snapshot.phase == phase || snapshot.phase == Phase::Idle)
            .await
            .map_err(|_| AppError::msg("session closed"))?
            .clone();

        if snapshot.phase != phase {
            return Err(AppError::InvalidTransition {
                action: "wait",
                phase: snapshot.phase,
            });
        }
        Ok(snapshot)
    }

    /// Restyles a captured photo and prints it.
    ///
    /// Returns once the photo is printing; the move to `ReadyToView` happens
    /// after the print delay unless the session is reset first.
    pub async fn submit_capture(&self, intent: CaptureIntent) -> AppResult<Outcome> {
        let CaptureIntent {
            file,
            style,
            caption,
            frame,
        } = intent;
        let caption = caption.map(CaptionConfig::clamped);

        let (session_id, epoch, cancel) = self.update(|state| {
            if state.phase != Phase::Idle {
                return Err(AppError::InvalidTransition {
                    action: "capture",
                    phase: state.phase,
                });
            }
            state.frame = frame;
            state.caption = caption;
            state.image = None;
            state.video = None;
            state.error = None;
            state.phase = Phase::ProcessingImage;
            Ok((state.id, state.epoch, state.cancel.clone()))
        })?;

        self.shared.audio.play(SoundEffect::Shutter);
        tracing::info!(%session_id, style = style.as_str(), frame = frame.id, "capture submitted");

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            image = self.shared.client.restyle_image(&file, style) => image,
        };

        match result {
            Ok(image) => {
                let printing = self.update_current(epoch, |state| {
                    if state.phase != Phase::ProcessingImage {
                        return false;
                    }
                    state.image = Some(image);
                    state.phase = Phase::Printing;
                    true
                });
                if !printing {
                    return Ok(Outcome::Discarded);
                }

                self.shared.audio.play(SoundEffect::Print);
                self.schedule_ready(epoch, cancel);
                Ok(Outcome::Completed)
            }
            Err(error) if error.is_cancelled() => Ok(Outcome::Discarded),
            Err(error) => {
                tracing::error!(%session_id, %error, "restyle failed");
                let rolled_back = self.update_current(epoch, |state| {
                    state.image = None;
                    state.error = Some(CAPTURE_FAILED_MESSAGE.to_string());
                    state.phase = Phase::Idle;
                    true
                });
                Ok(if rolled_back {
                    Outcome::Failed {
                        message: CAPTURE_FAILED_MESSAGE.to_string(),
                    }
                } else {
                    Outcome::Discarded
                })
            }
        }
    }

    fn schedule_ready(&self, epoch: u64, cancel: CancellationToken) {
        let this = self.clone();
        let delay = self.shared.print_delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(epoch, "print delay cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    this.update_current(epoch, |state| {
                        if state.phase != Phase::Printing {
                            return false;
                        }
                        state.phase = Phase::ReadyToView;
                        true
                    });
                }
            }
        });
    }

    /// Animates the printed photo.
    pub async fn submit_animation(&self, config: AnimationConfig) -> AppResult<Outcome> {
        let (session_id, epoch, cancel, image) = self.update(|state| {
            let ready = matches!(state.phase, Phase::ReadyToView | Phase::PlayingVideo);
            let image = match (&state.image, ready) {
                (Some(image), true) => image.clone(),
                _ => {
                    return Err(AppError::InvalidTransition {
                        action: "animate",
                        phase: state.phase,
                    })
                }
            };
            state.error = None;
            state.playback_rate = clamp_speed(config.speed);
            state.phase = Phase::GeneratingVideo;
            Ok((state.id, state.epoch, state.cancel.clone(), image))
        })?;

        self.shared.audio.play(SoundEffect::Click);
        tracing::info!(
            %session_id,
            style = config.style.as_str(),
            speed = config.speed,
            "animation submitted"
        );

        let result = self
            .shared
            .client
            .animate_image(&image, &config.prompt, config.style, &cancel)
            .await;

        match result {
            Ok(video) => {
                let playing = self.update_current(epoch, |state| {
                    if state.phase != Phase::GeneratingVideo {
                        return false;
                    }
                    state.video = Some(video);
                    state.phase = Phase::PlayingVideo;
                    true
                });
                Ok(if playing {
                    Outcome::Completed
                } else {
                    Outcome::Discarded
                })
            }
            Err(error) if error.is_cancelled() => Ok(Outcome::Discarded),
            Err(error) => {
                tracing::error!(%session_id, %error, "animation failed");
                let message = match error.to_string() {
                    text if text.trim().is_empty() => ANIMATION_FAILED_MESSAGE.to_string(),
                    text => text,
                };
                let rolled_back = self.update_current(epoch, |state| {
                    state.error = Some(message.clone());
                    state.phase = Phase::ReadyToView;
                    true
                });
                Ok(if rolled_back {
                    Outcome::Failed { message }
                } else {
                    Outcome::Discarded
                })
            }
        }
    }

    /// Flips between playing the video and showing the still photo.
    pub fn toggle_playback(&self) -> AppResult<Phase> {
        let next = self.update(|state| {
            let next = match (state.phase, state.video.is_some()) {
                (Phase::PlayingVideo, true) => Phase::ReadyToView,
                (Phase::ReadyToView, true) => Phase::PlayingVideo,
                _ => {
                    return Err(AppError::InvalidTransition {
                        action: "toggle playback",
                        phase: state.phase,
                    })
                }
            };
            state.phase = next;
            Ok(next)
        })?;
        self.shared.audio.play(SoundEffect::Click);
        Ok(next)
    }

    /// Drops the session and everything still running for it.
    pub fn reset(&self) {
        self.shared.audio.play(SoundEffect::Click);
        let (old, new) = self.update(|state| {
            state.cancel.cancel();
            let mut next = SessionState::new(state.epoch + 1);
            next.frame = state.frame;
            next.caption = state.caption.take();
            next.playback_rate = state.playback_rate;
            let old = std::mem::replace(state, next);
            (old.id, state.id)
        });
        tracing::info!(old_session = %old, session_id = %new, "session reset");
    }

    /// Flattens the printed photo into a PNG inside `dir`.
    pub async fn export(&self, fonts: &CaptionFonts, dir: &Path) -> AppResult<PathBuf> {
        let (session_id, image, frame, caption) = {
            let state = self.lock();
            let Some(image) = state.image.clone() else {
                return Err(AppError::InvalidTransition {
                    action: "export",
                    phase: state.phase,
                });
            };
            (state.id, image, state.frame, state.caption.clone())
        };

        self.shared.audio.play(SoundEffect::Click);
        let fonts = fonts.clone();
        let png = tokio::task::spawn_blocking(move || {
            flatten(&image.bytes, &frame, caption.as_ref(), &fonts)?.to_png()
        })
        .await
        .map_err(|error| AppError::msg(format!("export task failed: {error}")))??;

        let path = storage::write_export(dir, &png)?;
        tracing::info!(%session_id, path = %path.display(), "exported photo");
        Ok(path)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `apply` under the lock and publishes the result before releasing it.
    fn update<R>(&self, apply: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.lock();
        let result = apply(&mut state);
        self.publish(&state);
        result
    }

    /// Like [`Self::update`] but only for the session `epoch`; publishes when `apply` returns true.
    fn update_current(&self, epoch: u64, apply: impl FnOnce(&mut SessionState) -> bool) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch || !apply(&mut state) {
            tracing::debug!(epoch, current = state.epoch, "stale session result dropped");
            return false;
        }
        self.publish(&state);
        true
    }

    /// Sends the snapshot and syncs ambient audio. Callers hold the session lock so
    /// publications follow mutation order.
    fn publish(&self, state: &SessionState) {
        let snapshot = state.snapshot();
        let phase = snapshot.phase;
        let mut previous = phase;
        self.shared.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            previous = current.phase;
            *current = snapshot;
            true
        });
        if previous != phase {
            tracing::info!(from = %previous, to = %phase, "phase changed");
        }

        if phase == Phase::PlayingVideo {
            self.shared.audio.start_ambient();
        } else {
            self.shared.audio.stop_ambient();
        }
    }
}
