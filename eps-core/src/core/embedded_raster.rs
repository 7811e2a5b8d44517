//! Recovery of inline hex-encoded RGB pixel data.
//!
//! Image-based documents (typically written by ImageMagick) carry their
//! pixels as lines of hex digits following an `image` operator. The
//! interpreter cannot draw these, so they are decoded directly.

use std::sync::LazyLock;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use regex::Regex;

use super::prescan::BoundingBox;
use crate::rendering::RasterImage;

static WIDTH_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Width\s+(\d+)").expect("valid width regex"));
static HEIGHT_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Height\s+(\d+)").expect("valid height regex"));

/// Markers of inline raster content.
const IMAGE_KEYWORDS: [&str; 4] = ["image", "colorimage", "readhexstring", "/DirectClassPacket"];

/// Operators that introduce the hex data region.
const IMAGE_OPERATORS: [&str; 2] = ["image", "colorimage"];

/// Whitespace-delimited words of `line` before any `%` comment, with
/// procedure and array brackets stripped.
fn code_words(line: &str) -> impl Iterator<Item = &str> {
    let code = line.split_once('%').map_or(line, |(code, _)| code);
    code.split_whitespace()
        .map(|w| w.trim_matches(|c| matches!(c, '{' | '}' | '[' | ']')))
        .filter(|w| !w.is_empty())
}

fn has_word(line: &str, words: &[&str]) -> bool {
    code_words(line).any(|w| words.contains(&w))
}

/// Whether the document carries inline raster data rather than vector art.
///
/// Only words outside comments count, so a title or file name mentioning
/// "image" does not qualify.
pub fn is_image_based(text: &str) -> bool {
    text.lines().any(|line| has_word(line, &IMAGE_KEYWORDS))
}

/// Pixel dimensions of the embedded raster.
///
/// Defaults to the bounding box size; `/Width N` and `/Height N` entries
/// override each axis independently.
pub fn image_dimensions(text: &str, bbox: &BoundingBox) -> (u32, u32) {
    let entry = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
    };
    let width = entry(&WIDTH_ENTRY).unwrap_or(bbox.width().max(0) as u32);
    let height = entry(&HEIGHT_ENTRY).unwrap_or(bbox.height().max(0) as u32);
    (width, height)
}

/// Concatenate the hex-only lines of the image data region.
///
/// The region opens after the first line invoking the `image` or
/// `colorimage` operator outside a comment, and closes at the first line
/// containing `grestore`, `showpage` or `%%Trailer`.
pub fn collect_hex_data(text: &str) -> String {
    let mut hex = String::new();
    let mut in_data = false;
    let mut lines = 0usize;

    for line in text.lines() {
        let trimmed = line.trim();
        if !in_data && has_word(trimmed, &IMAGE_OPERATORS) {
            in_data = true;
            continue;
        }
        if !in_data {
            continue;
        }
        if trimmed.contains("grestore")
            || trimmed.contains("showpage")
            || trimmed.contains("%%Trailer")
        {
            break;
        }
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            hex.push_str(trimmed);
            lines += 1;
        }
    }

    log::debug!("collected {} hex digits from {} lines", hex.len(), lines);
    hex
}

/// Decode the document's hex pixel data into a `width` x `height` image.
///
/// Six hex digits make one RGB pixel, filled in row-major order. A group
/// that fails to decode is skipped by advancing two digits. Pixels left
/// unfilled are opaque white. Returns `None` when fewer than half of the
/// pixels could be filled.
pub fn decode_hex_image(text: &str, width: u32, height: u32) -> Option<RasterImage> {
    let total = width as usize * height as usize;
    if total == 0 {
        return None;
    }

    let hex = collect_hex_data(text);
    // Each pixel needs six digits; bail before allocating for a hopeless case
    if (hex.len() / 6) * 2 < total {
        log::debug!(
            "not enough hex data for {}x{}: {} digits",
            width,
            height,
            hex.len()
        );
        return None;
    }

    let mut data = vec![255u8; total * 4];
    let bytes = hex.as_bytes();
    let mut filled = 0usize;
    let mut i = 0usize;

    while i + 6 <= bytes.len() && filled < total {
        let mut rgb = [0u8; 3];
        match hex::decode_to_slice(&bytes[i..i + 6], &mut rgb) {
            Ok(()) => {
                let at = filled * 4;
                data[at..at + 3].copy_from_slice(&rgb);
                filled += 1;
                i += 6;
            }
            Err(_) => i += 2,
        }
    }

    if filled * 2 < total {
        log::warn!("only decoded {}/{} pixels", filled, total);
        return None;
    }

    log::debug!("decoded {}/{} pixels", filled, total);
    RgbaImage::from_raw(width, height, data).map(RasterImage::from_rgba_image)
}

/// Decode the embedded raster and scale it to `target_width` x
/// `target_height`.
pub fn extract_embedded_raster(
    text: &str,
    bbox: &BoundingBox,
    target_width: u32,
    target_height: u32,
) -> Option<RasterImage> {
    let (width, height) = image_dimensions(text, bbox);
    log::debug!("embedded raster dimensions: {}x{}", width, height);

    let decoded = decode_hex_image(text, width, height)?;
    if (width, height) == (target_width, target_height) {
        return Some(decoded);
    }

    let scaled = imageops::resize(
        &decoded.to_rgba_image(),
        target_width,
        target_height,
        FilterType::Triangle,
    );
    Some(RasterImage::from_rgba_image(scaled))
}
