// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! LSB container codec.
//!
//! A container is written into the two least-significant bits of each carrier
//! sample, in a fixed scan order that skips the top-left watermark region.
//! The container holds a filename and file content, optionally compressed
//! with Brotli and optionally encrypted with AES-256-GCM-SIV under an
//! Argon2id-derived key. A CRC-32 over header and payload detects damage.
//!
//! Decoding is a forward-only pass ([`parser::ContainerParser`]) that
//! classifies every failure: no container, unreadable container, or missing
//! / wrong password.

pub mod error;
pub mod carrier;
pub mod bits;
pub mod crypto;
pub mod frame;
pub mod payload;
pub mod parser;
pub mod capacity;
pub mod output;
pub mod binpng;
pub mod progress;
mod pipeline;
#[cfg(feature = "parallel")]
pub mod batch;

pub use error::StegoError;
pub use carrier::{CarrierLayout, OwnedCarrier, SampleGrid, SampleGridMut};
pub use capacity::capacity;
pub use payload::DecodedPayload;
pub use pipeline::{
    decode, decode_with, encode, encode_with, extract, spawn_decode, DecodeJob, DecodeOutcome,
    EncodeOptions, DECODE_STEPS, ENCODE_STEPS, EXTRACT_STEPS,
};
pub use progress::{CancelToken, Progress, ProgressEvent};
