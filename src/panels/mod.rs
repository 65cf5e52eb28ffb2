//! Working drafts behind the camera controls and the animation controls.
//!
//! Drafts are freely editable; `submit` hands the orchestrator an immutable
//! intent so later edits never reach an in-flight session.

use crate::{
    catalog::{self, CAPTION_MAX_CHARS, TEXT_COLORS},
    error::{AppError, AppResult},
    models::{
        AnimationConfig, AnimationStyle, CaptionConfig, FontFamily, FrameConfig, GenerationStyle,
        Phase, SessionSnapshot,
    },
    render::parse_hex_color,
};

pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 2.0;
const SPEED_STEP: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureIntent {
    pub file: Vec<u8>,
    pub style: GenerationStyle,
    pub caption: Option<CaptionConfig>,
    pub frame: FrameConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDraft {
    style: GenerationStyle,
    frame_id: &'static str,
    caption_text: String,
    text_color: String,
    font: FontFamily,
}

impl Default for CaptureDraft {
    fn default() -> Self {
        Self {
            style: GenerationStyle::Wool,
            frame_id: catalog::default_frame().id,
            caption_text: String::new(),
            text_color: TEXT_COLORS[0].value.to_string(),
            font: FontFamily::Handwriting,
        }
    }
}

impl CaptureDraft {
    pub fn style(&self) -> GenerationStyle {
        self.style
    }

    pub fn frame(&self) -> FrameConfig {
        catalog::find_frame(self.frame_id)
    }

    pub fn caption_text(&self) -> &str {
        &self.caption_text
    }

    pub fn text_color(&self) -> &str {
        &self.text_color
    }

    pub fn font(&self) -> FontFamily {
        self.font
    }

    pub fn select_style(&mut self, style: GenerationStyle) {
        self.style = style;
    }

    /// Selects a frame; frames with a suggested text color also switch the caption color.
    pub fn select_frame(&mut self, id: &str) {
        let frame = catalog::find_frame(id);
        self.frame_id = frame.id;
        if let Some(color) = frame.text_color {
            self.text_color = color.to_string();
        }
    }

    /// Sets the caption, keeping at most 20 characters.
    pub fn set_caption_text(&mut self, text: &str) {
        self.caption_text = text.chars().take(CAPTION_MAX_CHARS).collect();
    }

    pub fn set_text_color(&mut self, color: &str) -> AppResult<()> {
        parse_hex_color(color)?;
        self.text_color = color.to_string();
        Ok(())
    }

    pub fn set_font(&mut self, font: FontFamily) {
        self.font = font;
    }

    pub fn caption(&self) -> Option<CaptionConfig> {
        if self.caption_text.trim().is_empty() {
            return None;
        }

        Some(CaptionConfig {
            text: self.caption_text.clone(),
            color: self.text_color.clone(),
            font: self.font,
        })
    }

    pub fn submit(&self, file: Vec<u8>) -> CaptureIntent {
        CaptureIntent {
            file,
            style: self.style,
            caption: self.caption(),
            frame: self.frame(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDraft {
    prompt: String,
    style: AnimationStyle,
    speed: f64,
}

impl Default for AnimationDraft {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            style: AnimationStyle::Wool,
            speed: 1.0,
        }
    }
}

impl AnimationDraft {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn style(&self) -> AnimationStyle {
        self.style
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
    }

    pub fn set_style(&mut self, style: AnimationStyle) {
        self.style = style;
    }

    /// Clamps to the slider range and snaps to its 0.1 step.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = clamp_speed(speed);
    }

    pub fn can_submit(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    pub fn submit(&self) -> AppResult<AnimationConfig> {
        if !self.can_submit() {
            return Err(AppError::validation("describe what should happen first"));
        }

        Ok(AnimationConfig {
            prompt: self.prompt.clone(),
            style: self.style,
            speed: self.speed,
        })
    }
}

pub fn clamp_speed(speed: f64) -> f64 {
    if !speed.is_finite() {
        return 1.0;
    }

    let snapped = (speed / SPEED_STEP).round() * SPEED_STEP;
    (snapped.clamp(MIN_SPEED, MAX_SPEED) * 10.0).round() / 10.0
}

/// What the animation panel shows for a given session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPanelMode {
    Hidden,
    Form,
    Generating,
    Player { playing: bool },
}

impl AnimationPanelMode {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        match snapshot.phase {
            Phase::Idle | Phase::ProcessingImage | Phase::Printing => Self::Hidden,
            Phase::GeneratingVideo => Self::Generating,
            Phase::ReadyToView | Phase::PlayingVideo => match snapshot.video {
                Some(_) => Self::Player {
                    playing: snapshot.phase == Phase::PlayingVideo,
                },
                None => Self::Form,
            },
        }
    }
}
