// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Carrier sample grids and the deterministic scan order.
//!
//! A carrier is an interleaved, row-major grid of 8-bit samples as produced
//! by any image decoder (`width * height * channels` bytes). The scan order
//! visits pixels row by row, left to right, and the channels of each pixel in
//! storage order (R, G, B, then A). Pixels inside the watermark region, the
//! top-left rectangle spanning 40% of the width and 8% of the height, are
//! skipped. The scan order is part of the wire format: encoder and decoder
//! must agree on it exactly.

use std::path::Path;

use crate::stego::error::StegoError;

/// Share of the width (in percent) covered by the skipped watermark region.
pub const WATERMARK_SKIP_W_PERCENT: usize = 40;

/// Share of the height (in percent) covered by the skipped watermark region.
pub const WATERMARK_SKIP_H_PERCENT: usize = 8;

/// Shape of a carrier grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarrierLayout {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl CarrierLayout {
    /// Validate and build a layout.
    ///
    /// # Errors
    /// [`StegoError::InvalidCarrier`] for zero dimensions, a channel count
    /// outside 1..=4, or a sample count that overflows `usize`.
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self, StegoError> {
        if width == 0 || height == 0 {
            return Err(StegoError::InvalidCarrier("zero-sized dimensions"));
        }
        if !(1..=4).contains(&channels) {
            return Err(StegoError::InvalidCarrier("unsupported channel count"));
        }
        width
            .checked_mul(height)
            .and_then(|p| p.checked_mul(channels))
            .ok_or(StegoError::InvalidCarrier("dimensions overflow"))?;
        Ok(Self { width, height, channels })
    }

    /// Total number of samples in the grid.
    pub fn sample_count(&self) -> usize {
        self.width * self.height * self.channels
    }

    /// Columns and rows of the skipped top-left region.
    ///
    /// The region is only applied when both extents are non-zero.
    pub fn watermark_region(&self) -> (usize, usize) {
        let skip_w = self.width * WATERMARK_SKIP_W_PERCENT / 100;
        let skip_h = self.height * WATERMARK_SKIP_H_PERCENT / 100;
        if skip_w > 0 && skip_h > 0 {
            (skip_w, skip_h)
        } else {
            (0, 0)
        }
    }

    /// Number of samples visited by the scan order.
    pub fn usable_samples(&self) -> usize {
        let (skip_w, skip_h) = self.watermark_region();
        (self.width * self.height - skip_w * skip_h) * self.channels
    }

    /// Iterate over sample indices in scan order.
    pub fn scan(&self) -> ScanOrder {
        let (skip_w, skip_h) = self.watermark_region();
        ScanOrder {
            layout: *self,
            skip_w,
            skip_h,
            row: 0,
            col: if skip_h > 0 { skip_w } else { 0 },
            channel: 0,
        }
    }
}

/// Iterator over flat sample indices in the wire-format scan order.
#[derive(Debug, Clone)]
pub struct ScanOrder {
    layout: CarrierLayout,
    skip_w: usize,
    skip_h: usize,
    row: usize,
    col: usize,
    channel: usize,
}

impl Iterator for ScanOrder {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let CarrierLayout { width, height, channels } = self.layout;
        if self.row >= height {
            return None;
        }
        let idx = (self.row * width + self.col) * channels + self.channel;

        self.channel += 1;
        if self.channel == channels {
            self.channel = 0;
            self.col += 1;
            if self.col == width {
                self.col = 0;
                self.row += 1;
                if self.row < self.skip_h {
                    self.col = self.skip_w;
                }
            }
        }
        Some(idx)
    }
}

/// Read-only view of a decoded carrier image, borrowed for one call.
#[derive(Debug, Clone, Copy)]
pub struct SampleGrid<'a> {
    layout: CarrierLayout,
    samples: &'a [u8],
}

impl<'a> SampleGrid<'a> {
    /// Wrap an interleaved sample buffer.
    ///
    /// # Errors
    /// [`StegoError::InvalidCarrier`] if the shape is invalid or the buffer
    /// length does not match `width * height * channels`.
    pub fn new(
        samples: &'a [u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> Result<Self, StegoError> {
        let layout = CarrierLayout::new(width, height, channels)?;
        if samples.len() != layout.sample_count() {
            return Err(StegoError::InvalidCarrier("sample buffer length mismatch"));
        }
        Ok(Self { layout, samples })
    }

    pub fn layout(&self) -> CarrierLayout {
        self.layout
    }

    pub fn samples(&self) -> &'a [u8] {
        self.samples
    }

    /// Lazily yield sample values in scan order.
    pub fn scan_samples(&self) -> impl Iterator<Item = u8> + 'a {
        let samples = self.samples;
        self.layout.scan().map(move |i| samples[i])
    }
}

/// Mutable view of a carrier, used by the encoder.
#[derive(Debug)]
pub struct SampleGridMut<'a> {
    layout: CarrierLayout,
    samples: &'a mut [u8],
}

impl<'a> SampleGridMut<'a> {
    /// Same validation as [`SampleGrid::new`].
    pub fn new(
        samples: &'a mut [u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> Result<Self, StegoError> {
        let layout = CarrierLayout::new(width, height, channels)?;
        if samples.len() != layout.sample_count() {
            return Err(StegoError::InvalidCarrier("sample buffer length mismatch"));
        }
        Ok(Self { layout, samples })
    }

    pub fn layout(&self) -> CarrierLayout {
        self.layout
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [u8] {
        &mut *self.samples
    }

    pub fn as_grid(&self) -> SampleGrid<'_> {
        SampleGrid { layout: self.layout, samples: &*self.samples }
    }
}

/// A carrier that owns its samples.
///
/// Front-ends load images into this form; it is also what
/// [`spawn_decode`](crate::stego::pipeline::spawn_decode) and batch decoding
/// move across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedCarrier {
    layout: CarrierLayout,
    samples: Vec<u8>,
}

impl OwnedCarrier {
    pub fn new(
        samples: Vec<u8>,
        width: usize,
        height: usize,
        channels: usize,
    ) -> Result<Self, StegoError> {
        let layout = SampleGrid::new(&samples, width, height, channels)?.layout();
        Ok(Self { layout, samples })
    }

    /// Decode an image file into 8-bit samples.
    ///
    /// The channel layout (gray, gray+alpha, RGB, RGBA) is kept, so a carrier
    /// written by [`save`](Self::save) reopens with the same scan order.
    /// Deeper formats are reduced to 8 bits per sample.
    pub fn open(path: &Path) -> Result<Self, StegoError> {
        let img = image::open(path)?;
        let (w, h) = (img.width() as usize, img.height() as usize);
        let color = img.color();
        let (samples, channels) = match (color.has_color(), color.has_alpha()) {
            (false, false) => (img.into_luma8().into_raw(), 1),
            (false, true) => (img.into_luma_alpha8().into_raw(), 2),
            (true, false) => (img.into_rgb8().into_raw(), 3),
            (true, true) => (img.into_rgba8().into_raw(), 4),
        };
        Self::new(samples, w, h, channels)
    }

    /// Write the carrier as a lossless PNG (or BMP, by extension).
    pub fn save(&self, path: &Path) -> Result<(), StegoError> {
        let color = match self.layout.channels {
            1 => image::ExtendedColorType::L8,
            2 => image::ExtendedColorType::La8,
            3 => image::ExtendedColorType::Rgb8,
            _ => image::ExtendedColorType::Rgba8,
        };
        image::save_buffer(
            path,
            &self.samples,
            self.layout.width as u32,
            self.layout.height as u32,
            color,
        )?;
        Ok(())
    }

    pub fn layout(&self) -> CarrierLayout {
        self.layout
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn as_grid(&self) -> SampleGrid<'_> {
        SampleGrid { layout: self.layout, samples: &self.samples }
    }

    pub fn as_grid_mut(&mut self) -> SampleGridMut<'_> {
        SampleGridMut { layout: self.layout, samples: &mut self.samples }
    }
}
