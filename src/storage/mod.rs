use std::{
    fs,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use image::{
    codecs::png::{CompressionType, FilterType, PngEncoder},
    ColorType, ImageEncoder, ImageFormat,
};

use crate::error::{AppError, AppResult};

const SUPPORTED_MIMES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];
const EXPORT_PREFIX: &str = "woolify-memory";

pub struct ParsedDataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub fn parse_data_url(data_url: &str) -> AppResult<ParsedDataUrl> {
    if !data_url.starts_with("data:") {
        return Err(AppError::msg("expected a data URL with image payload"));
    }

    let (metadata, payload) = data_url
        .split_once(',')
        .ok_or_else(|| AppError::msg("invalid data URL format"))?;

    if !metadata.contains(";base64") {
        return Err(AppError::msg("data URL must be base64 encoded"));
    }

    let mime = metadata
        .trim_start_matches("data:")
        .split(';')
        .next()
        .unwrap_or_default();
    if !SUPPORTED_MIMES.contains(&mime) {
        return Err(AppError::msg(format!(
            "unsupported image mime type: {mime}. allowed: png/jpeg/webp"
        )));
    }

    let bytes = STANDARD.decode(payload.trim())?;
    Ok(ParsedDataUrl {
        mime: mime.to_string(),
        bytes,
    })
}

/// Mime type of an uploaded photo, judged from its magic bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> AppResult<&'static str> {
    if bytes.is_empty() {
        return Err(AppError::validation("uploaded file is empty"));
    }

    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok("image/png"),
        Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
        Ok(ImageFormat::WebP) => Ok("image/webp"),
        Ok(other) => Err(AppError::validation(format!(
            "unsupported image format: {other:?}. allowed: png/jpeg/webp"
        ))),
        Err(_) => Err(AppError::validation("uploaded file is not an image")),
    }
}

pub fn read_image_file(path: &Path) -> AppResult<Vec<u8>> {
    if !path.exists() {
        return Err(AppError::msg(format!(
            "image path not found: {}",
            path.display()
        )));
    }

    let bytes = fs::read(path)?;
    sniff_image_mime(&bytes)?;
    Ok(bytes)
}

/// Reads a photo given either as a base64 data URL or as a file path.
pub fn load_image_input(input: &str) -> AppResult<Vec<u8>> {
    if input.starts_with("data:") {
        let parsed = parse_data_url(input)?;
        sniff_image_mime(&parsed.bytes)?;
        return Ok(parsed.bytes);
    }

    read_image_file(Path::new(input))
}

pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("{EXPORT_PREFIX}-{}.png", at.timestamp_millis())
}

/// Writes an exported PNG into `dir` under the timestamped export name.
pub fn write_export(dir: &Path, png_bytes: &[u8]) -> AppResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(Utc::now()));
    fs::write(&path, png_bytes)?;
    Ok(path)
}

pub fn encode_png_optimized(rgba: &[u8], width: u32, height: u32) -> AppResult<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = PngEncoder::new_with_quality(
            &mut png_bytes,
            CompressionType::Best,
            FilterType::Adaptive,
        );
        encoder
            .write_image(rgba, width, height, ColorType::Rgba8)
            .map_err(|error| AppError::msg(format!("failed to encode png: {error}")))?;
    }

    let mut options = oxipng::Options::from_preset(3);
    options.strip = oxipng::StripChunks::Safe;

    oxipng::optimize_from_memory(&png_bytes, &options)
        .map_err(|error| AppError::msg(format!("failed to optimize png: {error}")))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn export_name_uses_millisecond_timestamp() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(export_file_name(at), "woolify-memory-1700000000123.png");
    }

    fn data_url(mime: &str, bytes: &[u8]) -> String {
        format!("data:{mime};base64,{}", STANDARD.encode(bytes))
    }

    #[test]
    fn data_url_payload_is_decoded() {
        let parsed = parse_data_url(&data_url("image/png", b"\x89PNG")).unwrap();
        assert_eq!(parsed.mime, "image/png");
        assert_eq!(parsed.bytes, b"\x89PNG");
    }

    #[test]
    fn data_url_rejects_unsupported_mime() {
        assert!(parse_data_url(&data_url("image/gif", b"GIF89a")).is_err());
        assert!(parse_data_url("data:image/png,plain").is_err());
    }

    #[test]
    fn image_input_accepts_data_urls_and_paths() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00];
        assert_eq!(load_image_input(&data_url("image/jpeg", &jpeg)).unwrap(), jpeg);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        fs::write(&path, jpeg).unwrap();
        assert_eq!(load_image_input(path.to_str().unwrap()).unwrap(), jpeg);

        assert!(load_image_input(dir.path().join("missing.png").to_str().unwrap()).is_err());
    }

    #[test]
    fn sniffing_rejects_non_images() {
        assert!(sniff_image_mime(b"").is_err());
        assert!(sniff_image_mime(b"hello world").is_err());
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap(), "image/jpeg");
    }

    #[test]
    fn encoded_png_decodes_back() {
        let rgba = vec![255u8; 4 * 4 * 4];
        let png = encode_png_optimized(&rgba, 4, 4).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn export_is_written_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), b"png").unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("woolify-memory-")));
    }
}
