// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! # duck-core
//!
//! Pure-Rust steganography codec for hiding a file in the low bits of an
//! image's pixel samples and recovering it again. Recovered files are
//! checked with CRC-32 and, when a password was used, authenticated with
//! AES-256-GCM-SIV under an Argon2id-derived key.
//!
//! The core works on an abstract grid of 8-bit samples ([`SampleGrid`]); it
//! does not depend on an image format. [`OwnedCarrier::open`] loads PNG or BMP
//! files for front-ends.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use duck_core::{decode, encode, EncodeOptions, OwnedCarrier};
//!
//! let mut carrier = OwnedCarrier::open("cover.png".as_ref()).unwrap();
//! let opts = EncodeOptions::default();
//! encode(&mut carrier.as_grid_mut(), "notes.txt", b"hello", Some("pw"), &opts).unwrap();
//! carrier.save("stego.png".as_ref()).unwrap();
//!
//! let stego = OwnedCarrier::open("stego.png".as_ref()).unwrap();
//! let outcome = decode(&stego.as_grid(), Some("pw"), "out".as_ref()).unwrap();
//! println!("{} ({})", outcome.written_path.display(), outcome.size_display());
//! ```

pub mod config;
pub mod stego;

pub use stego::{capacity, decode, decode_with, encode, encode_with, extract, spawn_decode};
pub use stego::{CarrierLayout, OwnedCarrier, SampleGrid, SampleGridMut};
pub use stego::{DecodeJob, DecodeOutcome, DecodedPayload, EncodeOptions, StegoError};
pub use stego::{CancelToken, Progress, ProgressEvent, DECODE_STEPS, ENCODE_STEPS, EXTRACT_STEPS};
pub use stego::progress;
