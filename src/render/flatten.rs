//! Flattens a printed photo into a single 800×960 polaroid PNG.

use std::sync::Arc;

use image::imageops::FilterType;
use resvg::tiny_skia::{
    FillRule, GradientStop, IntSize, LinearGradient, Paint, Path, PathBuilder, Pixmap,
    PixmapPaint, Point, Rect, SpreadMode, Stroke, Transform,
};
use usvg::fontdb;

use super::{
    font_stack, skia_color, HEART_COLOR, PANEL_COLOR, PLACEHOLDER_COLOR, RAINBOW_STOPS, STAR_COLOR,
};
use crate::{
    catalog::PLACEHOLDER_CAPTION,
    error::{AppError, AppResult},
    models::{CaptionConfig, FontFamily, FrameConfig, FramePattern},
    storage::encode_png_optimized,
};

pub const EXPORT_WIDTH: u32 = 800;
pub const EXPORT_HEIGHT: u32 = 960;
pub const PANEL_MARGIN: u32 = 40;
pub const PANEL_SIZE: u32 = 720;
pub const PHOTO_PADDING: u32 = 20;
pub const PHOTO_SIZE: u32 = PANEL_SIZE - 2 * PHOTO_PADDING;
pub const CAPTION_FONT_SIZE: f32 = 60.0;
pub const PLACEHOLDER_FONT_SIZE: f32 = 40.0;

const BORDER_WIDTH: f32 = 2.0;
const SHADOW_SPREAD: u32 = 10;
const SHADOW_ALPHA: u8 = 5;
const DOT_SPACING: u32 = 30;
const DOT_RADIUS: f32 = 4.0;
const STAR_TILE: u32 = 30;
const HEART_TILE: u32 = 24;

/// Font database used for caption text.
#[derive(Clone)]
pub struct CaptionFonts {
    db: Arc<fontdb::Database>,
}

impl CaptionFonts {
    /// Loads the system fonts and points any unresolved generic family at the first face found.
    pub fn system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        fill_generic_families(&mut db);
        tracing::debug!(faces = db.len(), "caption fonts loaded");
        Self { db: Arc::new(db) }
    }

    /// Only the given font files, e.g. fonts shipped next to the binary.
    pub fn from_font_data(fonts: impl IntoIterator<Item = Vec<u8>>) -> Self {
        let mut db = fontdb::Database::new();
        for data in fonts {
            db.load_font_data(data);
        }
        fill_generic_families(&mut db);
        Self { db: Arc::new(db) }
    }

    /// No faces at all; captions are laid out but draw no glyphs.
    pub fn empty() -> Self {
        Self {
            db: Arc::new(fontdb::Database::new()),
        }
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }
}

fn fill_generic_families(db: &mut fontdb::Database) {
    let Some(fallback) = db
        .faces()
        .next()
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone())
    else {
        return;
    };

    let resolves = |db: &fontdb::Database, family: fontdb::Family<'_>| {
        db.query(&fontdb::Query {
            families: &[family],
            ..Default::default()
        })
        .is_some()
    };

    if !resolves(db, fontdb::Family::SansSerif) {
        db.set_sans_serif_family(fallback.clone());
    }
    if !resolves(db, fontdb::Family::Serif) {
        db.set_serif_family(fallback.clone());
    }
    if !resolves(db, fontdb::Family::Cursive) {
        db.set_cursive_family(fallback);
    }
}

/// Where and how the caption was drawn on the export.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLayout {
    pub text: String,
    pub color: String,
    pub font: FontFamily,
    pub font_size: f32,
    pub center: (f32, f32),
    pub placeholder: bool,
}

impl CaptionLayout {
    pub fn for_caption(caption: Option<&CaptionConfig>) -> Self {
        let band_top = (PANEL_MARGIN + PANEL_SIZE) as f32;
        let center = (
            EXPORT_WIDTH as f32 / 2.0,
            band_top + (EXPORT_HEIGHT as f32 - band_top) / 2.0,
        );

        match (CaptionConfig::visible_text(caption), caption) {
            (Some(text), Some(caption)) => Self {
                text: text.to_string(),
                color: caption.color.clone(),
                font: caption.font,
                font_size: CAPTION_FONT_SIZE,
                center,
                placeholder: false,
            },
            _ => Self {
                text: PLACEHOLDER_CAPTION.to_string(),
                color: PLACEHOLDER_COLOR.to_string(),
                font: FontFamily::Handwriting,
                font_size: PLACEHOLDER_FONT_SIZE,
                center,
                placeholder: true,
            },
        }
    }

    fn to_svg(&self) -> String {
        let style = match self.font {
            FontFamily::Serif => r#" font-style="italic""#,
            FontFamily::Sans => r#" letter-spacing="1.5""#,
            FontFamily::Handwriting => "",
        };

        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}"><text x="{x}" y="{y}" font-family="{family}" font-size="{size}" fill="{fill}" text-anchor="middle" dominant-baseline="middle"{style}>{text}</text></svg>"#,
            w = EXPORT_WIDTH,
            h = EXPORT_HEIGHT,
            x = self.center.0,
            y = self.center.1,
            family = font_stack(self.font),
            size = self.font_size,
            fill = self.color,
            text = escape_xml(&self.text),
        )
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub struct FlattenedFrame {
    pixmap: Pixmap,
    caption: CaptionLayout,
}

impl FlattenedFrame {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn caption(&self) -> &CaptionLayout {
        &self.caption
    }

    /// Straight-alpha RGBA of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect()
    }

    pub fn to_png(&self) -> AppResult<Vec<u8>> {
        encode_png_optimized(&self.to_rgba(), self.width(), self.height())
    }
}

/// Draws frame, panel, photo and caption onto a fresh 800×960 canvas.
///
/// The photo is decoded completely before anything is drawn; an undecodable
/// image fails the whole export.
pub fn flatten(
    image_bytes: &[u8],
    frame: &FrameConfig,
    caption: Option<&CaptionConfig>,
    fonts: &CaptionFonts,
) -> AppResult<FlattenedFrame> {
    let photo = decode_photo(image_bytes)?;

    let mut pixmap = Pixmap::new(EXPORT_WIDTH, EXPORT_HEIGHT)
        .ok_or_else(|| AppError::render("failed to allocate export canvas"))?;

    pixmap.fill(skia_color(frame.color, 255)?);
    draw_pattern(&mut pixmap, frame)?;
    draw_border(&mut pixmap, frame.border_color)?;
    draw_panel(&mut pixmap)?;

    pixmap.draw_pixmap(
        (PANEL_MARGIN + PHOTO_PADDING) as i32,
        (PANEL_MARGIN + PHOTO_PADDING) as i32,
        photo.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );

    let caption = CaptionLayout::for_caption(caption);
    draw_caption(&mut pixmap, &caption, fonts)?;

    tracing::debug!(frame = frame.id, placeholder = caption.placeholder, "flattened export");
    Ok(FlattenedFrame { pixmap, caption })
}

fn decode_photo(bytes: &[u8]) -> AppResult<Pixmap> {
    let decoded = image::load_from_memory(bytes)?;
    let rgba = decoded
        .resize_to_fill(PHOTO_SIZE, PHOTO_SIZE, FilterType::Lanczos3)
        .to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut premultiplied = rgba.into_raw();
    premultiply_rgba8_in_place(&mut premultiplied);

    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| AppError::render("photo has an empty size"))?;
    Pixmap::from_vec(premultiplied, size)
        .ok_or_else(|| AppError::render("photo buffer does not match its size"))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn solid_paint(hex: &str, alpha: u8) -> AppResult<Paint<'static>> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(hex, alpha)?);
    paint.anti_alias = true;
    Ok(paint)
}

fn draw_pattern(pixmap: &mut Pixmap, frame: &FrameConfig) -> AppResult<()> {
    match frame.pattern {
        FramePattern::None => Ok(()),
        FramePattern::Dots => {
            let paint = solid_paint(frame.border_color, 255)?;
            for y in (0..=EXPORT_HEIGHT).step_by(DOT_SPACING as usize) {
                for x in (0..=EXPORT_WIDTH).step_by(DOT_SPACING as usize) {
                    if let Some(dot) = PathBuilder::from_circle(x as f32, y as f32, DOT_RADIUS) {
                        pixmap.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
                    }
                }
            }
            Ok(())
        }
        FramePattern::Rainbow => {
            let stops = RAINBOW_STOPS
                .iter()
                .map(|(position, hex)| Ok(GradientStop::new(*position, skia_color(hex, 255)?)))
                .collect::<AppResult<Vec<_>>>()?;
            let shader = LinearGradient::new(
                Point::from_xy(0.0, 0.0),
                Point::from_xy(EXPORT_WIDTH as f32, EXPORT_HEIGHT as f32),
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            )
            .ok_or_else(|| AppError::render("invalid rainbow gradient"))?;

            let paint = Paint {
                shader,
                anti_alias: true,
                ..Paint::default()
            };
            let canvas = canvas_rect()?;
            pixmap.fill_rect(canvas, &paint, Transform::identity(), None);
            Ok(())
        }
        FramePattern::Stars => tile_glyph(pixmap, STAR_TILE, STAR_COLOR, star_path),
        FramePattern::Hearts => tile_glyph(pixmap, HEART_TILE, HEART_COLOR, heart_path),
    }
}

fn tile_glyph(
    pixmap: &mut Pixmap,
    tile: u32,
    color: &str,
    glyph: fn(f32, f32, f32) -> Option<Path>,
) -> AppResult<()> {
    let paint = solid_paint(color, 153)?;
    for row in 0..EXPORT_HEIGHT.div_ceil(tile) {
        for col in 0..EXPORT_WIDTH.div_ceil(tile) {
            // Odd rows shift by half a tile.
            let offset = if row % 2 == 1 { tile as f32 / 2.0 } else { 0.0 };
            let cx = (col * tile) as f32 + tile as f32 / 2.0 + offset;
            let cy = (row * tile) as f32 + tile as f32 / 2.0;
            if let Some(path) = glyph(cx, cy, tile as f32) {
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
    }
    Ok(())
}

fn star_path(cx: f32, cy: f32, tile: f32) -> Option<Path> {
    let outer = tile * 0.3;
    let inner = outer * 0.4;
    let mut builder = PathBuilder::new();
    for k in 0..10 {
        let angle = -std::f32::consts::FRAC_PI_2 + k as f32 * std::f32::consts::PI / 5.0;
        let radius = if k % 2 == 0 { outer } else { inner };
        let (x, y) = (cx + radius * angle.cos(), cy + radius * angle.sin());
        if k == 0 {
            builder.move_to(x, y);
        } else {
            builder.line_to(x, y);
        }
    }
    builder.close();
    builder.finish()
}

fn heart_path(cx: f32, cy: f32, tile: f32) -> Option<Path> {
    let s = tile * 0.55;
    let (x0, y0) = (cx - s / 2.0, cy - s / 2.0);
    let p = |u: f32, v: f32| (x0 + u * s, y0 + v * s);

    let mut builder = PathBuilder::new();
    let (sx, sy) = p(0.5, 0.9);
    builder.move_to(sx, sy);
    for [(ax, ay), (bx, by), (ex, ey)] in [
        [p(0.1, 0.6), p(0.0, 0.35), p(0.15, 0.2)],
        [p(0.3, 0.05), p(0.5, 0.15), p(0.5, 0.3)],
        [p(0.5, 0.15), p(0.7, 0.05), p(0.85, 0.2)],
        [p(1.0, 0.35), p(0.9, 0.6), p(0.5, 0.9)],
    ] {
        builder.cubic_to(ax, ay, bx, by, ex, ey);
    }
    builder.close();
    builder.finish()
}

fn canvas_rect() -> AppResult<Rect> {
    Rect::from_xywh(0.0, 0.0, EXPORT_WIDTH as f32, EXPORT_HEIGHT as f32)
        .ok_or_else(|| AppError::render("invalid canvas rect"))
}

fn draw_border(pixmap: &mut Pixmap, border_color: &str) -> AppResult<()> {
    let half = BORDER_WIDTH / 2.0;
    let rect = Rect::from_xywh(
        half,
        half,
        EXPORT_WIDTH as f32 - BORDER_WIDTH,
        EXPORT_HEIGHT as f32 - BORDER_WIDTH,
    )
    .ok_or_else(|| AppError::render("invalid border rect"))?;

    let stroke = Stroke {
        width: BORDER_WIDTH,
        ..Stroke::default()
    };
    let paint = solid_paint(border_color, 255)?;
    pixmap.stroke_path(&PathBuilder::from_rect(rect), &paint, &stroke, Transform::identity(), None);
    Ok(())
}

/// White photo panel over a soft shadow built from stacked translucent rings.
fn draw_panel(pixmap: &mut Pixmap) -> AppResult<()> {
    let shadow = solid_paint("#000000", SHADOW_ALPHA)?;
    for spread in (1..=SHADOW_SPREAD).rev() {
        let rect = panel_rect(spread as f32)?;
        pixmap.fill_rect(rect, &shadow, Transform::identity(), None);
    }

    let panel = solid_paint(PANEL_COLOR, 255)?;
    pixmap.fill_rect(panel_rect(0.0)?, &panel, Transform::identity(), None);
    Ok(())
}

fn panel_rect(spread: f32) -> AppResult<Rect> {
    Rect::from_xywh(
        PANEL_MARGIN as f32 - spread,
        PANEL_MARGIN as f32 - spread,
        PANEL_SIZE as f32 + 2.0 * spread,
        PANEL_SIZE as f32 + 2.0 * spread,
    )
    .ok_or_else(|| AppError::render("invalid panel rect"))
}

fn draw_caption(
    pixmap: &mut Pixmap,
    caption: &CaptionLayout,
    fonts: &CaptionFonts,
) -> AppResult<()> {
    let options = usvg::Options {
        fontdb: Arc::clone(&fonts.db),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(&caption.to_svg(), &options)?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    Ok(())
}
