//! Frame rendering: the live view model and the flattened PNG export.

pub mod flatten;
pub mod view;

use resvg::tiny_skia::Color;

use crate::{
    error::{AppError, AppResult},
    models::FontFamily,
};

pub use flatten::{flatten, CaptionFonts, CaptionLayout, FlattenedFrame};
pub use view::{compose, FrameProps, FrameView, PlaybackSync, VideoSurface};

pub const PANEL_COLOR: &str = "#ffffff";
pub const PLACEHOLDER_COLOR: &str = "#cbd5e1";
pub const STAR_COLOR: &str = "#fbbf24";
pub const HEART_COLOR: &str = "#f43f5e";

/// Diagonal rainbow shared by the live frame and the export.
pub const RAINBOW_STOPS: [(f32, &str); 6] = [
    (0.0, "#ff9a9e"),
    (0.2, "#fad0c4"),
    (0.4, "#fad0c4"),
    (0.6, "#a1c4fd"),
    (0.8, "#c2e9fb"),
    (1.0, "#fbc2eb"),
];

/// Parses `#rgb` or `#rrggbb` into its channels.
pub fn parse_hex_color(value: &str) -> AppResult<[u8; 3]> {
    let hex = value
        .trim()
        .strip_prefix('#')
        .ok_or_else(|| AppError::validation(format!("expected a #hex color, got {value}")))?;

    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return Err(AppError::validation(format!("invalid hex color: {value}"))),
    };

    let channel = |index: usize| {
        expanded
            .get(index..index + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .ok_or_else(|| AppError::validation(format!("invalid hex color: {value}")))
    };

    Ok([channel(0)?, channel(2)?, channel(4)?])
}

pub(crate) fn skia_color(value: &str, alpha: u8) -> AppResult<Color> {
    let [r, g, b] = parse_hex_color(value)?;
    Ok(Color::from_rgba8(r, g, b, alpha))
}

/// CSS class the live caption uses for each font choice.
pub fn font_class(font: FontFamily) -> &'static str {
    match font {
        FontFamily::Handwriting => "font-handwriting",
        FontFamily::Sans => "font-sans tracking-wide",
        FontFamily::Serif => "font-serif italic",
    }
}

pub(crate) fn font_stack(font: FontFamily) -> &'static str {
    match font {
        FontFamily::Handwriting => "'Gochi Hand', cursive, sans-serif",
        FontFamily::Sans => "sans-serif",
        FontFamily::Serif => "serif",
    }
}
