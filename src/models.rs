use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    catalog::CAPTION_MAX_CHARS,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    ProcessingImage,
    Printing,
    ReadyToView,
    GeneratingVideo,
    PlayingVideo,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ProcessingImage => "processing image",
            Self::Printing => "printing",
            Self::ReadyToView => "ready to view",
            Self::GeneratingVideo => "generating video",
            Self::PlayingVideo => "playing video",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Solid,
    Pattern,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FramePattern {
    None,
    Stars,
    Hearts,
    Dots,
    Rainbow,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FrameConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: FrameKind,
    pub color: &'static str,
    pub border_color: &'static str,
    pub pattern: FramePattern,
    pub text_color: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Handwriting,
    Sans,
    Serif,
}

impl FontFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handwriting => "handwriting",
            Self::Sans => "sans",
            Self::Serif => "serif",
        }
    }
}

impl FromStr for FontFamily {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "handwriting" => Ok(Self::Handwriting),
            "sans" => Ok(Self::Sans),
            "serif" => Ok(Self::Serif),
            other => Err(AppError::validation(format!(
                "unknown font family: {other}. allowed: handwriting/sans/serif"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionConfig {
    pub text: String,
    pub color: String,
    pub font: FontFamily,
}

impl CaptionConfig {
    /// Caption text to draw, or `None` when the placeholder should be shown.
    pub fn visible_text(caption: Option<&CaptionConfig>) -> Option<&str> {
        caption
            .map(|caption| caption.text.as_str())
            .filter(|text| !text.trim().is_empty())
    }

    /// Cuts the text down to the caption limit.
    pub fn clamped(mut self) -> Self {
        if let Some((cut, _)) = self.text.char_indices().nth(CAPTION_MAX_CHARS) {
            self.text.truncate(cut);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStyle {
    Original,
    #[default]
    Wool,
    Watercolor,
    Clay,
    Pixel,
    Sketch,
}

impl GenerationStyle {
    pub const ALL: [GenerationStyle; 6] = [
        Self::Original,
        Self::Wool,
        Self::Watercolor,
        Self::Clay,
        Self::Pixel,
        Self::Sketch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Wool => "wool",
            Self::Watercolor => "watercolor",
            Self::Clay => "clay",
            Self::Pixel => "pixel",
            Self::Sketch => "sketch",
        }
    }
}

impl FromStr for GenerationStyle {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == value)
            .ok_or_else(|| AppError::validation(format!("unknown photo style: {value}")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AnimationStyle {
    #[default]
    #[serde(rename = "wool")]
    Wool,
    #[serde(rename = "cartoon")]
    Cartoon,
    #[serde(rename = "watercolor")]
    Watercolor,
    #[serde(rename = "3d")]
    ThreeD,
}

impl AnimationStyle {
    pub const ALL: [AnimationStyle; 4] = [Self::Wool, Self::Cartoon, Self::Watercolor, Self::ThreeD];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wool => "wool",
            Self::Cartoon => "cartoon",
            Self::Watercolor => "watercolor",
            Self::ThreeD => "3d",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Wool => "Wool/Felt",
            Self::Cartoon => "Cartoon",
            Self::Watercolor => "Watercolor",
            Self::ThreeD => "3D Render",
        }
    }
}

impl FromStr for AnimationStyle {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == value)
            .ok_or_else(|| AppError::validation(format!("unknown motion style: {value}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnimationConfig {
    pub prompt: String,
    pub style: AnimationStyle,
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylizedImage {
    pub bytes: Arc<[u8]>,
    pub mime: &'static str,
}

impl StylizedImage {
    pub fn new(bytes: Vec<u8>, mime: &'static str) -> Self {
        Self {
            bytes: bytes.into(),
            mime,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoRef {
    pub url: String,
}

/// Read-only copy of the orchestrator's session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub frame: FrameConfig,
    pub caption: Option<CaptionConfig>,
    pub image: Option<StylizedImage>,
    pub video: Option<VideoRef>,
    pub playback_rate: f64,
    pub error: Option<String>,
}
