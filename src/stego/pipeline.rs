// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Encode/decode pipelines.
//!
//! Decode runs the stages in order and stops at the first failure:
//! 1. Scan the carrier's samples and pull their low bits into bytes
//! 2. Parse and validate the container (magic, version, length, CRC-32)
//! 3. Derive the key and decrypt, for protected containers
//! 4. Unpack the filename and content, decompressing if flagged
//! 5. Unwrap `.binpng` videos
//! 6. Stage the file in the output directory and commit it atomically
//!
//! Encode is the inverse of steps 1-4 and only touches the carrier's low
//! sample bits.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use zeroize::Zeroizing;

use crate::stego::binpng;
use crate::stego::bits::{capacity_bytes, BitWriter};
use crate::stego::carrier::{OwnedCarrier, SampleGrid, SampleGridMut};
use crate::stego::crypto::{self, TAG_LEN};
use crate::stego::error::StegoError;
use crate::stego::frame::{self, FLAG_COMPRESSED, FLAG_PROTECTED};
use crate::stego::output::{self, format_size};
use crate::stego::parser::ContainerParser;
use crate::stego::payload::{self, DecodedPayload};
use crate::stego::progress::{CancelToken, Progress, ProgressEvent, DEFAULT_CHANNEL_CAPACITY};

/// Progress steps reported by [`extract`]: header, payload, decryption.
pub const EXTRACT_STEPS: u32 = 3;

/// Progress steps reported by [`decode_with`]: the extract steps plus saving
/// and the final report.
pub const DECODE_STEPS: u32 = EXTRACT_STEPS + 2;

/// Progress steps reported by [`encode_with`].
pub const ENCODE_STEPS: u32 = 4;

/// Result of a successful decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Final path of the recovered file.
    pub written_path: PathBuf,
    /// Filename on disk (sanitized, possibly numbered or unwrapped).
    pub file_name: String,
    /// Size of the written file in bytes.
    pub size: u64,
}

impl DecodeOutcome {
    /// File type as shown to the user: the extension without the dot.
    pub fn file_type(&self) -> Option<&str> {
        self.written_path.extension().and_then(|e| e.to_str())
    }

    pub fn size_display(&self) -> String {
        format_size(self.size)
    }
}

/// Options for [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Try Brotli on the inner payload; kept only when it shrinks it.
    pub compress: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { compress: true }
    }
}

/// Recover the hidden file from `carrier` and write it into `output_dir`.
///
/// # Errors
/// - [`StegoError::NotSteganographic`] if the carrier holds no container.
/// - [`StegoError::UnsupportedVersion`] / [`StegoError::CorruptContainer`] if
///   a container is present but unreadable.
/// - [`StegoError::PasswordRequired`] / [`StegoError::AuthenticationFailed`]
///   for protected containers.
/// - [`StegoError::Io`] if the file cannot be written.
pub fn decode(
    carrier: &SampleGrid<'_>,
    password: Option<&str>,
    output_dir: &Path,
) -> Result<DecodeOutcome, StegoError> {
    decode_with(carrier, password, output_dir, &mut Progress::silent())
}

/// [`decode`] with caller-supplied progress reporting and cancellation.
///
/// Cancellation is checked at every stage boundary, the last time right
/// before the staged file is renamed into place. Once the rename happened the
/// call completes.
pub fn decode_with(
    carrier: &SampleGrid<'_>,
    password: Option<&str>,
    output_dir: &Path,
    progress: &mut Progress,
) -> Result<DecodeOutcome, StegoError> {
    progress.init(DECODE_STEPS);
    let decoded = run_parser(carrier, password, progress)?;

    let (file_name, content) = if binpng::is_binpng(&decoded.file_name) {
        progress.log("Unwrapping .binpng video...");
        let video = binpng::unpack(&decoded.content)?;
        (binpng::unwrapped_name(&decoded.file_name), video)
    } else {
        (decoded.file_name, decoded.content)
    };

    progress.check_cancelled()?;
    progress.advance("Saving file...");
    let staged = output::stage(output_dir, &file_name, &content)?;
    // Last point at which a cancel leaves nothing behind.
    progress.check_cancelled()?;
    let written_path = staged.commit()?;

    let outcome = DecodeOutcome {
        file_name: written_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        written_path,
        size: content.len() as u64,
    };
    progress.finish(format!(
        "Recovered {} ({})",
        outcome.file_name,
        outcome.size_display()
    ));
    Ok(outcome)
}

/// Parse and decrypt the container without touching the filesystem.
pub fn extract(
    carrier: &SampleGrid<'_>,
    password: Option<&str>,
    progress: &mut Progress,
) -> Result<DecodedPayload, StegoError> {
    progress.init(EXTRACT_STEPS);
    let decoded = run_parser(carrier, password, progress)?;
    progress.finish("Container extracted");
    Ok(decoded)
}

fn run_parser(
    carrier: &SampleGrid<'_>,
    password: Option<&str>,
    progress: &mut Progress,
) -> Result<DecodedPayload, StegoError> {
    let layout = carrier.layout();
    tracing::debug!(
        width = layout.width,
        height = layout.height,
        channels = layout.channels,
        capacity = capacity_bytes(&layout),
        "scanning carrier"
    );
    let result = ContainerParser::new(carrier, password).run(progress);
    match &result {
        Ok(decoded) => tracing::info!(
            file_name = %decoded.file_name,
            bytes = decoded.content.len(),
            "container decoded"
        ),
        Err(e) if e.is_not_steganographic() => tracing::info!("no container found"),
        Err(e) => tracing::warn!(error = %e, "container decode failed"),
    }
    result
}

/// Hide `content` under `file_name` in the carrier's low sample bits.
///
/// An empty password is treated as no password.
///
/// # Errors
/// - [`StegoError::FileNameTooLong`] if `file_name` exceeds 255 bytes.
/// - [`StegoError::PayloadTooLarge`] if the container does not fit; the
///   carrier is left unmodified.
pub fn encode(
    carrier: &mut SampleGridMut<'_>,
    file_name: &str,
    content: &[u8],
    password: Option<&str>,
    options: &EncodeOptions,
) -> Result<(), StegoError> {
    encode_with(carrier, file_name, content, password, options, &mut Progress::silent())
}

/// [`encode`] with caller-supplied progress reporting and cancellation.
pub fn encode_with(
    carrier: &mut SampleGridMut<'_>,
    file_name: &str,
    content: &[u8],
    password: Option<&str>,
    options: &EncodeOptions,
    progress: &mut Progress,
) -> Result<(), StegoError> {
    progress.init(ENCODE_STEPS);
    let password = password.filter(|p| !p.is_empty());

    progress.advance("Packing payload...");
    let inner = payload::encode_payload(file_name, content, options.compress)?;
    let mut flags = if inner.compressed { FLAG_COMPRESSED } else { 0 };
    if password.is_some() {
        flags |= FLAG_PROTECTED;
    }

    // Check the fit before paying for key derivation.
    let region_len = inner.bytes.len() + if password.is_some() { TAG_LEN } else { 0 };
    let needed = frame::header_len(flags) + region_len;
    let available = capacity_bytes(&carrier.layout());
    if needed > available || region_len > u32::MAX as usize {
        return Err(StegoError::PayloadTooLarge { needed, available });
    }
    progress.check_cancelled()?;

    let (salt, region) = match password {
        Some(pw) => {
            progress.advance("Deriving key and encrypting...");
            let salt = crypto::random_salt();
            (Some(salt), Zeroizing::new(crypto::encrypt(&inner.bytes, pw, &salt)?))
        }
        None => (None, inner.bytes),
    };
    let container = Zeroizing::new(frame::build_container(flags, salt, &region));
    progress.check_cancelled()?;

    progress.advance("Embedding container...");
    BitWriter::new(carrier).write_all(&container)?;
    tracing::info!(
        file_name,
        container_bytes = container.len(),
        available,
        protected = salt.is_some(),
        compressed = inner.compressed,
        "container embedded"
    );
    progress.finish("Done");
    Ok(())
}

/// A decode running on a background thread.
pub struct DecodeJob {
    handle: JoinHandle<Result<DecodeOutcome, StegoError>>,
    events: Receiver<ProgressEvent>,
    cancel: CancelToken,
}

impl DecodeJob {
    /// Progress events in order. Events are dropped if not drained in time.
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the decode to finish.
    pub fn join(self) -> Result<DecodeOutcome, StegoError> {
        self.handle.join().unwrap_or_else(|_| {
            Err(StegoError::Io(std::io::Error::other("decode thread panicked")))
        })
    }
}

/// Run [`decode_with`] on a new thread, for front-ends that must stay
/// responsive.
pub fn spawn_decode(
    carrier: OwnedCarrier,
    password: Option<String>,
    output_dir: PathBuf,
) -> DecodeJob {
    let (progress, events) = Progress::channel(DEFAULT_CHANNEL_CAPACITY);
    let cancel = progress.cancel_token().clone();
    let password = password.map(Zeroizing::new);
    let handle = thread::spawn(move || {
        let mut progress = progress;
        decode_with(
            &carrier.as_grid(),
            password.as_ref().map(|p| p.as_str()),
            &output_dir,
            &mut progress,
        )
    });
    DecodeJob { handle, events, cancel }
}
