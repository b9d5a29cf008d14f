// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Concurrent decoding of many carriers.
//!
//! Each carrier is an independent decode with its own [`Progress`]; results
//! come back in input order. Name collisions between carriers that recover
//! the same filename are resolved by the atomic, non-clobbering commit.

use std::path::Path;

use rayon::prelude::*;

use crate::stego::carrier::OwnedCarrier;
use crate::stego::error::StegoError;
use crate::stego::pipeline::{decode_with, DecodeOutcome};
use crate::stego::progress::{CancelToken, Progress};

/// Decode every carrier with the same password into `output_dir`.
pub fn decode_batch(
    carriers: &[OwnedCarrier],
    password: Option<&str>,
    output_dir: &Path,
) -> Vec<Result<DecodeOutcome, StegoError>> {
    decode_batch_with_cancel(carriers, password, output_dir, &CancelToken::new())
}

/// [`decode_batch`] sharing one cancellation token across all decodes.
pub fn decode_batch_with_cancel(
    carriers: &[OwnedCarrier],
    password: Option<&str>,
    output_dir: &Path,
    cancel: &CancelToken,
) -> Vec<Result<DecodeOutcome, StegoError>> {
    tracing::info!(count = carriers.len(), "batch decode started");
    carriers
        .par_iter()
        .map(|carrier| {
            let mut progress = Progress::silent().with_cancel(cancel.clone());
            decode_with(&carrier.as_grid(), password, output_dir, &mut progress)
        })
        .collect()
}
