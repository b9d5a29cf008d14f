// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Carrier capacity.
//!
//! The container stream holds `floor(usable_samples * BITS_PER_SAMPLE / 8)`
//! bytes. From that we subtract the container header, the one-byte filename
//! length, the filename itself and, for protected containers, the cipher's
//! authentication tag. What remains is the largest file that fits without
//! compression; compressible files may fit even when larger.

use crate::stego::bits::capacity_bytes;
use crate::stego::carrier::CarrierLayout;
use crate::stego::crypto::TAG_LEN;
use crate::stego::frame::{PLAIN_HEADER_LEN, PROTECTED_HEADER_LEN};

/// Fixed per-container overhead in bytes, excluding the filename itself.
pub fn container_overhead(protected: bool) -> usize {
    let inner = 1; // filename length byte
    if protected {
        PROTECTED_HEADER_LEN + TAG_LEN + inner
    } else {
        PLAIN_HEADER_LEN + inner
    }
}

/// Largest file content (in bytes) that fits into a carrier of this shape,
/// assuming the content is stored uncompressed.
///
/// Returns 0 when the carrier cannot even hold the container overhead.
pub fn capacity(layout: &CarrierLayout, protected: bool, file_name_len: usize) -> usize {
    let total = capacity_bytes(layout);
    let payload_cap = total
        .saturating_sub(container_overhead(protected))
        .saturating_sub(file_name_len);
    // The length field is a u32 and must also cover name and tag bytes.
    let framing = file_name_len
        .saturating_add(1)
        .saturating_add(if protected { TAG_LEN } else { 0 });
    let field_cap = (u32::MAX as usize).saturating_sub(framing);
    payload_cap.min(field_cap)
}
