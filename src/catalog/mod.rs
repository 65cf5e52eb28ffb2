//! Static choices offered by the booth: frames, caption colors and photo styles.

use serde::Serialize;

use crate::models::{FrameConfig, FrameKind, FramePattern, GenerationStyle};

pub const CAPTION_MAX_CHARS: usize = 20;
pub const PLACEHOLDER_CAPTION: &str = "#WoolifyMemory";

pub const FRAME_OPTIONS: [FrameConfig; 10] = [
    solid("classic-white", "Classic White", "#ffffff", "#e2e8f0", None),
    solid("warm-cream", "Warm Cream", "#fffdd0", "#fef08a", None),
    solid("pastel-pink", "Pastel Pink", "#fce7f3", "#fbcfe8", None),
    solid("mint-green", "Mint Green", "#d1fae5", "#a7f3d0", None),
    solid("sky-blue", "Sky Blue", "#e0f2fe", "#bae6fd", None),
    solid("midnight", "Midnight", "#1e293b", "#475569", Some("#f8fafc")),
    patterned(
        "stars",
        "Starry Night",
        "#312e81",
        "#4338ca",
        FramePattern::Stars,
        Some("#fef08a"),
    ),
    patterned(
        "hearts",
        "Love Hearts",
        "#ffe4e6",
        "#fda4af",
        FramePattern::Hearts,
        None,
    ),
    patterned("dots", "Polka Dots", "#f0f9ff", "#7dd3fc", FramePattern::Dots, None),
    patterned(
        "rainbow",
        "Rainbow",
        "#ffffff",
        "#e2e8f0",
        FramePattern::Rainbow,
        None,
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextColor {
    pub name: &'static str,
    pub value: &'static str,
}

pub const TEXT_COLORS: [TextColor; 7] = [
    TextColor { name: "Graphite", value: "#374151" },
    TextColor { name: "Ink Blue", value: "#1e3a8a" },
    TextColor { name: "Red Marker", value: "#dc2626" },
    TextColor { name: "Forest", value: "#166534" },
    TextColor { name: "Purple", value: "#6b21a8" },
    TextColor { name: "White", value: "#ffffff" },
    TextColor { name: "Gold", value: "#b45309" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleOption {
    pub style: GenerationStyle,
    pub label: &'static str,
    pub description: &'static str,
}

pub const GENERATION_STYLES: [StyleOption; 6] = [
    StyleOption {
        style: GenerationStyle::Original,
        label: "📷 Original",
        description: "No style change",
    },
    StyleOption {
        style: GenerationStyle::Wool,
        label: "🧶 Wool Felt",
        description: "Cozy 3D needle felting",
    },
    StyleOption {
        style: GenerationStyle::Watercolor,
        label: "🎨 Watercolor",
        description: "Soft, dreamy painting",
    },
    StyleOption {
        style: GenerationStyle::Clay,
        label: "🗿 Clay",
        description: "Cute plasticine stop-motion",
    },
    StyleOption {
        style: GenerationStyle::Pixel,
        label: "👾 Pixel Art",
        description: "Retro 8-bit game style",
    },
    StyleOption {
        style: GenerationStyle::Sketch,
        label: "✏️ Sketch",
        description: "Hand-drawn pencil sketch",
    },
];

pub fn default_frame() -> FrameConfig {
    FRAME_OPTIONS[0]
}

/// Looks a frame up by id, falling back to the first catalog entry.
pub fn find_frame(id: &str) -> FrameConfig {
    FRAME_OPTIONS
        .iter()
        .find(|frame| frame.id == id)
        .copied()
        .unwrap_or_else(default_frame)
}

pub fn style_option(style: GenerationStyle) -> StyleOption {
    GENERATION_STYLES
        .iter()
        .find(|option| option.style == style)
        .copied()
        .unwrap_or(GENERATION_STYLES[0])
}

const fn solid(
    id: &'static str,
    name: &'static str,
    color: &'static str,
    border_color: &'static str,
    text_color: Option<&'static str>,
) -> FrameConfig {
    FrameConfig {
        id,
        name,
        kind: FrameKind::Solid,
        color,
        border_color,
        pattern: FramePattern::None,
        text_color,
    }
}

const fn patterned(
    id: &'static str,
    name: &'static str,
    color: &'static str,
    border_color: &'static str,
    pattern: FramePattern,
    text_color: Option<&'static str>,
) -> FrameConfig {
    FrameConfig {
        id,
        name,
        kind: FrameKind::Pattern,
        color,
        border_color,
        pattern,
        text_color,
    }
}
