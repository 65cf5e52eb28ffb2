//! View model for the live polaroid frame, plus video playback syncing.

use super::{font_class, HEART_COLOR, PANEL_COLOR, PLACEHOLDER_COLOR, RAINBOW_STOPS, STAR_COLOR};
use crate::{
    catalog::PLACEHOLDER_CAPTION,
    error::AppResult,
    models::{
        CaptionConfig, FrameConfig, FrameKind, FramePattern, Phase, SessionSnapshot,
        StylizedImage, VideoRef,
    },
};

const STAR_TILE_PX: u32 = 30;
const HEART_TILE_PX: u32 = 24;
const DOT_TILE_PX: u32 = 16;
const RAINBOW_ANGLE_DEG: f32 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameProps<'a> {
    pub image: &'a StylizedImage,
    pub video: Option<&'a VideoRef>,
    pub frame: &'a FrameConfig,
    pub caption: Option<&'a CaptionConfig>,
    pub is_animating: bool,
    pub playback_rate: f64,
}

impl<'a> FrameProps<'a> {
    /// Props for the printed photo, or `None` while no stylized image exists.
    pub fn from_snapshot(snapshot: &'a SessionSnapshot) -> Option<Self> {
        Some(Self {
            image: snapshot.image.as_ref()?,
            video: snapshot.video.as_ref(),
            frame: &snapshot.frame,
            caption: snapshot.caption.as_ref(),
            is_animating: snapshot.phase == Phase::PlayingVideo,
            playback_rate: snapshot.playback_rate,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Star,
    Heart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Solid {
        color: &'static str,
    },
    Dots {
        color: &'static str,
        dot_color: &'static str,
        tile_px: u32,
    },
    Rainbow {
        angle_deg: f32,
        stops: &'static [(f32, &'static str)],
    },
    Glyphs {
        color: &'static str,
        glyph: Glyph,
        glyph_color: &'static str,
        tile_px: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhotoContent {
    Still,
    /// Image and video stacked; opacities select the visible layer.
    CrossFade {
        video_url: String,
        image_opacity: f32,
        video_opacity: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionView {
    pub text: String,
    pub color: String,
    pub font_class: &'static str,
    pub placeholder: bool,
    pub backing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    pub background: Background,
    pub border_color: &'static str,
    pub panel_color: &'static str,
    pub content: PhotoContent,
    pub caption: CaptionView,
}

pub fn compose(props: &FrameProps<'_>) -> FrameView {
    FrameView {
        background: background(props.frame),
        border_color: props.frame.border_color,
        panel_color: PANEL_COLOR,
        content: content(props),
        caption: caption_view(props.frame, props.caption),
    }
}

fn background(frame: &FrameConfig) -> Background {
    if frame.kind == FrameKind::Solid {
        return Background::Solid { color: frame.color };
    }

    match frame.pattern {
        FramePattern::None => Background::Solid { color: frame.color },
        FramePattern::Dots => Background::Dots {
            color: frame.color,
            dot_color: frame.border_color,
            tile_px: DOT_TILE_PX,
        },
        FramePattern::Rainbow => Background::Rainbow {
            angle_deg: RAINBOW_ANGLE_DEG,
            stops: &RAINBOW_STOPS,
        },
        FramePattern::Stars => Background::Glyphs {
            color: frame.color,
            glyph: Glyph::Star,
            glyph_color: STAR_COLOR,
            tile_px: STAR_TILE_PX,
        },
        FramePattern::Hearts => Background::Glyphs {
            color: frame.color,
            glyph: Glyph::Heart,
            glyph_color: HEART_COLOR,
            tile_px: HEART_TILE_PX,
        },
    }
}

fn content(props: &FrameProps<'_>) -> PhotoContent {
    let Some(video) = props.video else {
        return PhotoContent::Still;
    };

    let (image_opacity, video_opacity) = if props.is_animating {
        (0.0, 1.0)
    } else {
        (1.0, 0.0)
    };

    PhotoContent::CrossFade {
        video_url: video.url.clone(),
        image_opacity,
        video_opacity,
    }
}

fn caption_view(frame: &FrameConfig, caption: Option<&CaptionConfig>) -> CaptionView {
    let backing = frame.kind == FrameKind::Pattern;

    match (CaptionConfig::visible_text(caption), caption) {
        (Some(text), Some(caption)) => CaptionView {
            text: text.to_string(),
            color: caption.color.clone(),
            font_class: font_class(caption.font),
            placeholder: false,
            backing,
        },
        _ => CaptionView {
            text: PLACEHOLDER_CAPTION.to_string(),
            color: PLACEHOLDER_COLOR.to_string(),
            font_class: font_class(Default::default()),
            placeholder: true,
            backing,
        },
    }
}

/// The host's video element.
pub trait VideoSurface {
    fn set_playback_rate(&mut self, rate: f64);
    fn play(&mut self) -> AppResult<()>;
    fn pause(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
struct AppliedState {
    video_url: String,
    rate: f64,
    animating: bool,
}

/// Keeps a [`VideoSurface`] in step with the frame props.
#[derive(Debug, Default)]
pub struct PlaybackSync {
    applied: Option<AppliedState>,
}

impl PlaybackSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies rate and play state when the video, rate or animating flag changed.
    /// Returns whether anything was applied.
    pub fn reconcile(&mut self, props: &FrameProps<'_>, surface: &mut dyn VideoSurface) -> bool {
        let Some(video) = props.video else {
            self.applied = None;
            return false;
        };

        let next = AppliedState {
            video_url: video.url.clone(),
            rate: props.playback_rate,
            animating: props.is_animating,
        };
        if self.applied.as_ref() == Some(&next) {
            return false;
        }

        surface.set_playback_rate(next.rate);
        if next.animating {
            if let Err(error) = surface.play() {
                tracing::warn!(%error, video = %next.video_url, "video playback failed to start");
            }
        } else {
            surface.pause();
        }

        self.applied = Some(next);
        true
    }
}
