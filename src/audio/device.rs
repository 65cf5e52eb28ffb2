//! Speaker output through rodio.

use std::{
    sync::{mpsc, Mutex},
    thread,
};

use rodio::{buffer::SamplesBuffer, OutputStream, Sink};

use super::{AudioClip, AudioSink};
use crate::error::{AppError, AppResult};

/// Plays clips on the default output device.
///
/// The rodio stream is not `Send`, so it lives on its own thread and clips are
/// queued to it.
pub struct RodioSink {
    clips: Mutex<mpsc::Sender<AudioClip>>,
}

impl RodioSink {
    pub fn open_default() -> AppResult<Self> {
        let (clips, queue) = mpsc::channel::<AudioClip>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        thread::Builder::new()
            .name("woolify-audio".into())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(output) => {
                        let _ = ready_tx.send(Ok(()));
                        output
                    }
                    Err(error) => {
                        let _ = ready_tx.send(Err(error.to_string()));
                        return;
                    }
                };

                for clip in queue {
                    let source =
                        SamplesBuffer::new(1, clip.sample_rate, clip.samples.to_vec());
                    match Sink::try_new(&handle) {
                        Ok(sink) => {
                            sink.append(source);
                            sink.detach();
                        }
                        Err(error) => tracing::warn!(%error, "audio output unavailable"),
                    }
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::debug!("audio output opened");
                Ok(Self {
                    clips: Mutex::new(clips),
                })
            }
            Ok(Err(message)) => Err(AppError::msg(format!("no audio output: {message}"))),
            Err(_) => Err(AppError::msg("audio thread exited before opening a device")),
        }
    }
}

impl AudioSink for RodioSink {
    fn play(&self, clip: AudioClip) {
        let clips = self
            .clips
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if clips.send(clip).is_err() {
            tracing::warn!("audio thread stopped, dropping clip");
        }
    }
}
