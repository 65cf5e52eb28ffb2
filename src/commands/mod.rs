//! Command handlers behind the `woolify-booth` binary.

use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    catalog::{self, StyleOption, TextColor, FRAME_OPTIONS, GENERATION_STYLES, TEXT_COLORS},
    error::{AppError, AppResult},
    models::{AnimationStyle, FontFamily, FrameConfig, GenerationStyle, Phase},
    orchestrator::Outcome,
    panels::{AnimationDraft, CaptureDraft},
    render::flatten,
    storage, AppState,
};

pub fn list_styles() -> Vec<StyleOption> {
    GENERATION_STYLES.to_vec()
}

pub fn list_frames() -> Vec<FrameConfig> {
    FRAME_OPTIONS.to_vec()
}

pub fn list_text_colors() -> Vec<TextColor> {
    TEXT_COLORS.to_vec()
}

/// Caption and frame choices shared by `snap` and `flatten`.
#[derive(Debug, Clone, Default)]
pub struct PrintOptions {
    pub frame_id: Option<String>,
    pub caption: Option<String>,
    pub text_color: Option<String>,
    pub font: Option<FontFamily>,
}

impl PrintOptions {
    fn draft(&self) -> AppResult<CaptureDraft> {
        let mut draft = CaptureDraft::default();
        if let Some(frame_id) = non_empty_opt(self.frame_id.as_deref()) {
            if catalog::find_frame(frame_id).id != frame_id {
                return Err(AppError::validation(format!("unknown frame: {frame_id}")));
            }
            draft.select_frame(frame_id);
        }
        if let Some(caption) = self.caption.as_deref() {
            draft.set_caption_text(caption);
        }
        if let Some(color) = non_empty_opt(self.text_color.as_deref()) {
            draft.set_text_color(color)?;
        }
        if let Some(font) = self.font {
            draft.set_font(font);
        }
        Ok(draft)
    }
}

#[derive(Debug, Clone)]
pub struct SnapRequest {
    /// File path or base64 data URL.
    pub input: String,
    pub style: GenerationStyle,
    pub print: PrintOptions,
    pub motion: Option<String>,
    pub motion_style: AnimationStyle,
    pub speed: f64,
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapResult {
    pub session_id: Uuid,
    pub export_path: PathBuf,
    pub video_url: Option<String>,
    pub animation_error: Option<String>,
}

/// Runs one full booth session: capture, print, optional animation, export.
pub async fn snap(state: &AppState, req: SnapRequest) -> AppResult<SnapResult> {
    let bytes = storage::load_image_input(&req.input)?;
    let mut draft = req.print.draft()?;
    draft.select_style(req.style);

    let booth = &state.orchestrator;
    if booth.phase() != Phase::Idle {
        booth.reset();
    }

    if let Outcome::Failed { message } = booth.submit_capture(draft.submit(bytes)).await? {
        return Err(AppError::generation(message));
    }
    let printed = booth.wait_for_phase(Phase::ReadyToView).await?;

    let mut animation_error = None;
    if let Some(motion) = non_empty_opt(req.motion.as_deref()) {
        let mut animation = AnimationDraft::default();
        animation.set_prompt(motion);
        animation.set_style(req.motion_style);
        animation.set_speed(req.speed);

        if let Outcome::Failed { message } = booth.submit_animation(animation.submit()?).await? {
            tracing::warn!(session_id = %printed.session_id, %message, "keeping the still photo");
            animation_error = Some(message);
        }
    }

    let out_dir = req.out_dir.unwrap_or_else(|| state.config.output_dir.clone());
    let export_path = booth.export(&state.fonts, &out_dir).await?;

    Ok(SnapResult {
        session_id: printed.session_id,
        export_path,
        video_url: booth.snapshot().video.map(|video| video.url),
        animation_error,
    })
}

#[derive(Debug, Clone)]
pub struct FlattenRequest {
    /// File path or base64 data URL.
    pub input: String,
    pub print: PrintOptions,
    pub out_dir: Option<PathBuf>,
}

/// Frames a local image without touching the remote service.
pub async fn flatten_local(state: &AppState, req: FlattenRequest) -> AppResult<PathBuf> {
    let bytes = storage::load_image_input(&req.input)?;
    let draft = req.print.draft()?;
    let frame = draft.frame();
    let caption = draft.caption();
    let fonts = state.fonts.clone();

    let png = tokio::task::spawn_blocking(move || {
        flatten(&bytes, &frame, caption.as_ref(), &fonts)?.to_png()
    })
    .await
    .map_err(|error| AppError::msg(format!("flatten task failed: {error}")))??;

    let out_dir = req.out_dir.unwrap_or_else(|| state.config.output_dir.clone());
    let path = storage::write_export(&out_dir, &png)?;
    tracing::info!(path = %path.display(), frame = frame.id, "flattened local image");
    Ok(path)
}

fn non_empty_opt(value: Option<&str>) -> Option<&str> {
    value.and_then(non_empty)
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
