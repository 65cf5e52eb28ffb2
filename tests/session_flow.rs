//! End-to-end session behaviour of the booth orchestrator against a scripted
//! generation service, with Tokio's clock paused.

mod common;

use std::{sync::atomic::Ordering, time::Duration};

use assert_matches::assert_matches;
use tokio::time::{sleep, Instant};
use woolify_booth::{
    models::{AnimationConfig, AnimationStyle, CaptionConfig, FontFamily, GenerationStyle, Phase},
    orchestrator::CAPTURE_FAILED_MESSAGE,
    panels::{CaptureDraft, CaptureIntent},
    AppError, Outcome,
};

use common::{booth, fast_booth, png, RestyleScript, VideoScript, API_KEY, PRINT_DELAY, VIDEO_URI};

fn capture(style: GenerationStyle) -> CaptureIntent {
    let mut draft = CaptureDraft::default();
    draft.select_style(style);
    draft.select_frame("dots");
    draft.set_caption_text("Hi");
    draft.submit(png([10, 20, 30]))
}

fn animation(speed: f64) -> AnimationConfig {
    AnimationConfig {
        prompt: "waving happily".into(),
        style: AnimationStyle::Cartoon,
        speed,
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn capture_prints_then_becomes_ready_after_print_delay() {
    let booth = booth();
    booth.api.set_restyle_delay(Duration::from_secs(1));

    let task = {
        let orchestrator = booth.orchestrator.clone();
        tokio::spawn(async move { orchestrator.submit_capture(capture(GenerationStyle::Wool)).await })
    };
    sleep(Duration::from_millis(100)).await;
    assert_eq!(booth.orchestrator.phase(), Phase::ProcessingImage);

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome, Outcome::Completed);
    let printed_at = Instant::now();

    let snapshot = booth.orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Printing);
    assert!(snapshot.image.is_some());
    assert_eq!(snapshot.frame.id, "dots");
    assert_eq!(snapshot.caption.as_ref().map(|c| c.text.as_str()), Some("Hi"));

    let ready = booth
        .orchestrator
        .wait_for_phase(Phase::ReadyToView)
        .await
        .unwrap();
    assert!(printed_at.elapsed() >= PRINT_DELAY);
    assert!(ready.image.is_some());
    assert_eq!(booth.api.content_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn original_style_skips_the_remote_service() {
    let booth = booth();
    let intent = capture(GenerationStyle::Original);
    let upload = intent.file.clone();

    let outcome = booth.orchestrator.submit_capture(intent).await.unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(booth.api.remote_calls(), 0);
    let image = booth.orchestrator.snapshot().image.unwrap();
    assert_eq!(&*image.bytes, upload.as_slice());
}

#[tokio::test(start_paused = true)]
async fn restyle_failure_returns_to_idle_without_stale_image() {
    let booth = booth();

    booth
        .orchestrator
        .submit_capture(capture(GenerationStyle::Wool))
        .await
        .unwrap();
    booth.orchestrator.wait_for_phase(Phase::ReadyToView).await.unwrap();
    booth.orchestrator.reset();

    booth.api.set_restyle(RestyleScript::Fail("model overloaded"));
    let outcome = booth
        .orchestrator
        .submit_capture(capture(GenerationStyle::Clay))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Failed {
            message: CAPTURE_FAILED_MESSAGE.into()
        }
    );
    let snapshot = booth.orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.image.is_none());
    assert_eq!(snapshot.error.as_deref(), Some(CAPTURE_FAILED_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn response_without_image_fails_the_capture() {
    let booth = booth();
    booth.api.set_restyle(RestyleScript::TextOnly);

    let outcome = booth
        .orchestrator
        .submit_capture(capture(GenerationStyle::Sketch))
        .await
        .unwrap();

    assert_matches!(outcome, Outcome::Failed { .. });
    assert_eq!(booth.orchestrator.phase(), Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn malformed_upload_fails_like_a_remote_error() {
    let booth = booth();
    let mut intent = capture(GenerationStyle::Wool);
    intent.file = b"definitely not a photo".to_vec();

    let outcome = booth.orchestrator.submit_capture(intent).await.unwrap();

    assert_matches!(outcome, Outcome::Failed { .. });
    assert_eq!(booth.api.remote_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn overlong_caption_is_cut_before_reaching_the_session() {
    let booth = booth();
    let mut intent = capture(GenerationStyle::Original);
    intent.caption = Some(CaptionConfig {
        text: "a caption that is far too long".into(),
        color: "#374151".into(),
        font: FontFamily::Handwriting,
    });

    booth.orchestrator.submit_capture(intent).await.unwrap();

    let caption = booth.orchestrator.snapshot().caption.unwrap();
    assert_eq!(caption.text, "a caption that is fa");
}

#[tokio::test(start_paused = true)]
async fn second_capture_is_rejected_while_busy() {
    let booth = booth();
    booth
        .orchestrator
        .submit_capture(capture(GenerationStyle::Wool))
        .await
        .unwrap();

    let result = booth
        .orchestrator
        .submit_capture(capture(GenerationStyle::Wool))
        .await;

    assert_matches!(
        result,
        Err(AppError::InvalidTransition { action: "capture", phase: Phase::Printing })
    );
}

#[tokio::test(start_paused = true)]
async fn reset_during_print_delay_suppresses_ready_transition() {
    let booth = booth();
    booth
        .orchestrator
        .submit_capture(capture(GenerationStyle::Wool))
        .await
        .unwrap();

    sleep(Duration::from_secs(1)).await;
    booth.orchestrator.reset();
    sleep(PRINT_DELAY * 2).await;

    let snapshot = booth.orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.image.is_none());

    let outcome = booth
        .orchestrator
        .submit_capture(capture(GenerationStyle::Wool))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn reset_while_restyling_discards_the_result() {
    let booth = booth();
    booth.api.set_restyle_delay(Duration::from_secs(2));

    let task = {
        let orchestrator = booth.orchestrator.clone();
        tokio::spawn(async move { orchestrator.submit_capture(capture(GenerationStyle::Wool)).await })
    };
    sleep(Duration::from_millis(500)).await;
    booth.orchestrator.reset();

    assert_eq!(task.await.unwrap().unwrap(), Outcome::Discarded);
    assert_eq!(booth.orchestrator.phase(), Phase::Idle);
    assert!(booth.orchestrator.snapshot().image.is_none());
}

// ---------------------------------------------------------------------------
// Animation and playback
// ---------------------------------------------------------------------------

async fn printed_booth() -> common::Booth {
    let booth = booth();
    booth
        .orchestrator
        .submit_capture(capture(GenerationStyle::Wool))
        .await
        .unwrap();
    booth.orchestrator.wait_for_phase(Phase::ReadyToView).await.unwrap();
    booth
}

#[tokio::test(start_paused = true)]
async fn animation_plays_with_keyed_video_url() {
    let booth = printed_booth().await;

    let outcome = booth.orchestrator.submit_animation(animation(1.54)).await.unwrap();

    assert_eq!(outcome, Outcome::Completed);
    let snapshot = booth.orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::PlayingVideo);
    assert_eq!(snapshot.playback_rate, 1.5);
    assert_eq!(
        snapshot.video.unwrap().url,
        format!("{VIDEO_URI}?key={API_KEY}")
    );
    assert_eq!(booth.api.start_calls.load(Ordering::SeqCst), 1);
    assert_eq!(booth.api.poll_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn toggle_declines_without_video_then_alternates() {
    let booth = printed_booth().await;

    assert_matches!(
        booth.orchestrator.toggle_playback(),
        Err(AppError::InvalidTransition { .. })
    );

    booth.orchestrator.submit_animation(animation(1.0)).await.unwrap();
    let calls = booth.api.remote_calls();

    assert_eq!(booth.orchestrator.toggle_playback().unwrap(), Phase::ReadyToView);
    assert_eq!(booth.orchestrator.toggle_playback().unwrap(), Phase::PlayingVideo);
    assert_eq!(booth.orchestrator.toggle_playback().unwrap(), Phase::ReadyToView);
    assert_eq!(booth.api.remote_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn rejected_toggle_plays_no_click() {
    let booth = printed_booth().await;
    let clips = booth.clips_played();

    assert!(booth.orchestrator.toggle_playback().is_err());
    assert_eq!(booth.clips_played(), clips);

    booth.orchestrator.submit_animation(animation(1.0)).await.unwrap();
    let clips = booth.clips_played();
    booth.orchestrator.toggle_playback().unwrap();
    assert_eq!(booth.clips_played(), clips + 1);
}

#[tokio::test(start_paused = true)]
async fn animation_failure_keeps_the_still_photo() {
    let booth = printed_booth().await;
    booth.api.set_video(VideoScript::StartFails("quota exceeded"));

    let outcome = booth.orchestrator.submit_animation(animation(1.0)).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Failed {
            message: "quota exceeded".into()
        }
    );
    let snapshot = booth.orchestrator.snapshot();
    assert_eq!(snapshot.phase, Phase::ReadyToView);
    assert!(snapshot.image.is_some());
    assert!(snapshot.video.is_none());
    assert_eq!(snapshot.error.as_deref(), Some("quota exceeded"));
}

#[tokio::test(start_paused = true)]
async fn finished_job_without_video_fails() {
    let booth = printed_booth().await;
    booth.api.set_video(VideoScript::DoneWithoutUri);

    let outcome = booth.orchestrator.submit_animation(animation(1.0)).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Failed {
            message: "Failed to generate video URI".into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn reset_stops_video_polling() {
    let booth = printed_booth().await;
    booth.api.set_video(VideoScript::DoneAfter(u32::MAX));

    let task = {
        let orchestrator = booth.orchestrator.clone();
        tokio::spawn(async move { orchestrator.submit_animation(animation(1.0)).await })
    };
    sleep(Duration::from_secs(12)).await;
    assert_eq!(booth.orchestrator.phase(), Phase::GeneratingVideo);

    booth.orchestrator.reset();
    assert_eq!(task.await.unwrap().unwrap(), Outcome::Discarded);

    let polls = booth.api.poll_calls.load(Ordering::SeqCst);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(booth.api.poll_calls.load(Ordering::SeqCst), polls);
    assert_eq!(booth.orchestrator.phase(), Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn animation_is_rejected_while_generating() {
    let booth = printed_booth().await;
    booth.api.set_video(VideoScript::DoneAfter(3));

    let task = {
        let orchestrator = booth.orchestrator.clone();
        tokio::spawn(async move { orchestrator.submit_animation(animation(1.0)).await })
    };
    sleep(Duration::from_millis(10)).await;

    assert_matches!(
        booth.orchestrator.submit_animation(animation(1.0)).await,
        Err(AppError::InvalidTransition { phase: Phase::GeneratingVideo, .. })
    );
    assert_eq!(task.await.unwrap().unwrap(), Outcome::Completed);
}

// ---------------------------------------------------------------------------
// Ambient audio
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn ambient_music_follows_video_playback() {
    let booth = printed_booth().await;
    assert!(!booth.audio.is_ambient_playing());

    booth.orchestrator.submit_animation(animation(1.0)).await.unwrap();
    assert!(booth.audio.is_ambient_playing());

    booth.orchestrator.toggle_playback().unwrap();
    assert!(!booth.audio.is_ambient_playing());

    booth.orchestrator.toggle_playback().unwrap();
    assert!(booth.audio.is_ambient_playing());

    booth.orchestrator.reset();
    assert!(!booth.audio.is_ambient_playing());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_keep_ambient_music_in_step() {
    let booth = fast_booth();
    booth
        .orchestrator
        .submit_capture(capture(GenerationStyle::Wool))
        .await
        .unwrap();
    booth.orchestrator.wait_for_phase(Phase::ReadyToView).await.unwrap();
    booth.orchestrator.submit_animation(animation(1.0)).await.unwrap();

    for round in 0..40 {
        let toggles = [10, 11].map(|count| {
            let orchestrator = booth.orchestrator.clone();
            tokio::task::spawn_blocking(move || {
                for _ in 0..count {
                    orchestrator.toggle_playback().unwrap();
                }
            })
        });
        for toggle in toggles {
            toggle.await.unwrap();
        }

        let playing = booth.orchestrator.phase() == Phase::PlayingVideo;
        assert_eq!(booth.audio.is_ambient_playing(), playing, "round {round}");
    }

    booth.orchestrator.reset();
    assert!(!booth.audio.is_ambient_playing());
}
