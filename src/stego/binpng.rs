// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! `.binpng` video wrapping.
//!
//! Large videos are carried as a PNG whose RGB samples, read row by row, are
//! the raw bytes of an MP4 file padded with zeros to fill the last row. When a
//! recovered payload is named `*.binpng` it is unwrapped and written as
//! `<stem>.mp4`. Trailing zero bytes are indistinguishable from padding and
//! are always stripped.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::stego::error::StegoError;
use crate::stego::output::FALLBACK_FILE_NAME;

/// Filename suffix marking a wrapped video.
pub const BINPNG_SUFFIX: &str = ".binpng";

/// Extension given to unwrapped output.
pub const UNWRAPPED_EXTENSION: &str = "mp4";

pub fn is_binpng(file_name: &str) -> bool {
    file_name.ends_with(BINPNG_SUFFIX)
}

/// Output name for an unwrapped `.binpng` payload: `clip.binpng` -> `clip.mp4`.
pub fn unwrapped_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(BINPNG_SUFFIX).unwrap_or(file_name);
    let stem = if stem.is_empty() { FALLBACK_FILE_NAME } else { stem };
    format!("{stem}.{UNWRAPPED_EXTENSION}")
}

/// Recover the wrapped bytes from an encoded PNG.
///
/// # Errors
/// [`StegoError::InvalidBinPng`] if `png` does not decode as an image.
pub fn unpack(png: &[u8]) -> Result<Vec<u8>, StegoError> {
    let img = image::load_from_memory(png).map_err(|e| {
        tracing::debug!(error = %e, "binpng payload failed to decode");
        StegoError::InvalidBinPng
    })?;
    let mut raw = img.to_rgb8().into_raw();
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    raw.truncate(end);
    Ok(raw)
}

/// Wrap `data` into a near-square RGB PNG.
pub fn pack(data: &[u8]) -> Result<Vec<u8>, StegoError> {
    let pixels = data.len().div_ceil(3).max(1);
    let width = ((pixels as f64).sqrt().ceil() as usize).max(1);
    let height = pixels.div_ceil(width);

    let mut samples = data.to_vec();
    samples.resize(width * height * 3, 0);

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        &samples,
        width as u32,
        height as u32,
        ExtendedColorType::Rgb8,
    )?;
    Ok(png)
}
