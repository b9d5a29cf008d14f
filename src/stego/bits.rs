// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Bit-level access to the carrier's least-significant bits.
//!
//! [`BitReader`] pulls [`BITS_PER_SAMPLE`] low-order bits from each sample in
//! scan order and packs them MSB-first into bytes. It reads incrementally, so
//! the container header can be checked before the payload region is touched.
//! [`BitWriter`] is the encoder-side inverse.

use crate::stego::carrier::{CarrierLayout, SampleGrid, SampleGridMut, ScanOrder};
use crate::stego::error::StegoError;

/// Number of low-order bits carried by each sample. Format constant.
pub const BITS_PER_SAMPLE: usize = 2;

/// Mask selecting the carried bits of a sample.
const SAMPLE_MASK: u8 = ((1u16 << BITS_PER_SAMPLE) - 1) as u8;

/// Samples consumed per output byte.
const SAMPLES_PER_BYTE: usize = 8 / BITS_PER_SAMPLE;

// Every byte must map onto a whole number of samples.
const _: () = assert!(8 % BITS_PER_SAMPLE == 0);

/// Total extractable bytes for a carrier layout: `floor(bits / 8)`.
pub fn capacity_bytes(layout: &CarrierLayout) -> usize {
    layout.usable_samples() * BITS_PER_SAMPLE / 8
}

/// Incremental reader over the carrier's LSB bitstream.
pub struct BitReader<'a> {
    samples: &'a [u8],
    scan: ScanOrder,
    remaining: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(grid: &SampleGrid<'a>) -> Self {
        let layout = grid.layout();
        Self {
            samples: grid.samples(),
            scan: layout.scan(),
            remaining: capacity_bytes(&layout),
        }
    }

    /// Bytes still available before the carrier is exhausted.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Read one byte, or `None` when the carrier is exhausted.
    pub fn read_byte(&mut self) -> Option<u8> {
        if self.remaining == 0 {
            return None;
        }
        let mut byte = 0u8;
        for _ in 0..SAMPLES_PER_BYTE {
            let idx = self.scan.next()?;
            byte = (byte << BITS_PER_SAMPLE) | (self.samples[idx] & SAMPLE_MASK);
        }
        self.remaining -= 1;
        Some(byte)
    }

    /// Fill `buf` completely.
    ///
    /// # Errors
    /// [`StegoError::CorruptContainer`] if the carrier runs out first. Callers
    /// that need a different classification check [`remaining`](Self::remaining)
    /// before reading.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), StegoError> {
        if buf.len() > self.remaining {
            return Err(StegoError::CorruptContainer);
        }
        for slot in buf.iter_mut() {
            *slot = self.read_byte().ok_or(StegoError::CorruptContainer)?;
        }
        Ok(())
    }

    /// Read `len` bytes into a new vector.
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, StegoError> {
        let mut out = vec![0u8; len];
        self.read_exact(&mut out)?;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], StegoError> {
        let mut out = [0u8; N];
        self.read_exact(&mut out)?;
        Ok(out)
    }
}

/// Writer replacing the carrier's LSBs with container bytes.
pub struct BitWriter<'g, 'a> {
    grid: &'g mut SampleGridMut<'a>,
    scan: ScanOrder,
    remaining: usize,
}

impl<'g, 'a> BitWriter<'g, 'a> {
    pub fn new(grid: &'g mut SampleGridMut<'a>) -> Self {
        let layout = grid.layout();
        Self {
            grid,
            scan: layout.scan(),
            remaining: capacity_bytes(&layout),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Embed `data` at the current position.
    ///
    /// # Errors
    /// [`StegoError::PayloadTooLarge`] if `data` does not fit; nothing is
    /// written in that case.
    pub fn write_all(&mut self, data: &[u8]) -> Result<(), StegoError> {
        if data.len() > self.remaining {
            return Err(StegoError::PayloadTooLarge {
                needed: data.len(),
                available: self.remaining,
            });
        }
        let samples = self.grid.samples_mut();
        for &byte in data {
            for k in (0..SAMPLES_PER_BYTE).rev() {
                let Some(idx) = self.scan.next() else {
                    return Err(StegoError::PayloadTooLarge { needed: data.len(), available: 0 });
                };
                let chunk = (byte >> (k * BITS_PER_SAMPLE)) & SAMPLE_MASK;
                samples[idx] = (samples[idx] & !SAMPLE_MASK) | chunk;
            }
            self.remaining -= 1;
        }
        Ok(())
    }
}
