// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Inner payload serialization and compression.
//!
//! The inner payload is what gets (optionally) compressed and then
//! (optionally) encrypted before it is placed in the container:
//!
//! ```text
//! [1 byte ] filename_len (0–255)
//! [N bytes] filename (UTF-8, best-effort on decode)
//! [M bytes] file content (rest of the buffer)
//! ```
//!
//! Brotli compression is applied to the whole inner payload when it makes
//! the result strictly smaller; the container's `FLAG_COMPRESSED` bit records
//! the choice.

use std::io::{Read, Write};

use zeroize::Zeroizing;

use crate::stego::error::StegoError;

/// Brotli compression quality (0-11).
const BROTLI_QUALITY: u32 = 9;

/// Brotli LG_WINDOW_SIZE. 22 is the default (4 MB window).
const BROTLI_LG_WINDOW_SIZE: u32 = 22;

/// Upper bound on decompressed size, guarding against decompression bombs.
pub const MAX_DECOMPRESSED_LEN: usize = 512 * 1024 * 1024;

/// Maximum filename length in bytes.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// A recovered file: bytes plus the filename recorded by the encoder.
///
/// The filename is untrusted; it is sanitized before it touches the
/// filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl DecodedPayload {
    /// Extension of the recovered filename, without the dot.
    pub fn extension(&self) -> Option<&str> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
    }
}

/// Serialized inner payload and whether it was compressed.
pub struct EncodedPayload {
    pub bytes: Zeroizing<Vec<u8>>,
    pub compressed: bool,
}

/// Serialize `file_name` and `content`, compressing when allowed and useful.
///
/// # Errors
/// [`StegoError::FileNameTooLong`] if the name exceeds 255 bytes.
pub fn encode_payload(
    file_name: &str,
    content: &[u8],
    allow_compression: bool,
) -> Result<EncodedPayload, StegoError> {
    let name = file_name.as_bytes();
    if name.len() > MAX_FILE_NAME_LEN {
        return Err(StegoError::FileNameTooLong);
    }

    let mut inner = Zeroizing::new(Vec::with_capacity(1 + name.len() + content.len()));
    inner.push(name.len() as u8);
    inner.extend_from_slice(name);
    inner.extend_from_slice(content);

    if allow_compression {
        let compressed = compress_brotli(&inner)?;
        // Use compressed only if it's strictly smaller.
        if compressed.len() < inner.len() {
            return Ok(EncodedPayload { bytes: compressed, compressed: true });
        }
    }
    Ok(EncodedPayload { bytes: inner, compressed: false })
}

/// Parse an inner payload, decompressing first if `compressed`.
///
/// # Errors
/// [`StegoError::CorruptContainer`] for an invalid Brotli stream, output
/// beyond [`MAX_DECOMPRESSED_LEN`], or a truncated filename record.
pub fn decode_payload(data: &[u8], compressed: bool) -> Result<DecodedPayload, StegoError> {
    let decompressed;
    let inner: &[u8] = if compressed {
        decompressed = decompress_brotli(data)?;
        &decompressed
    } else {
        data
    };

    let (&name_len, rest) = inner.split_first().ok_or(StegoError::CorruptContainer)?;
    let name_len = name_len as usize;
    if rest.len() < name_len {
        return Err(StegoError::CorruptContainer);
    }
    let (name, content) = rest.split_at(name_len);

    Ok(DecodedPayload {
        file_name: String::from_utf8_lossy(name).into_owned(),
        content: content.to_vec(),
    })
}

/// Compress data with Brotli.
fn compress_brotli(data: &[u8]) -> Result<Zeroizing<Vec<u8>>, StegoError> {
    let mut output = Zeroizing::new(Vec::new());
    {
        let mut compressor = brotli::CompressorWriter::new(
            &mut *output,
            4096, // buffer size
            BROTLI_QUALITY,
            BROTLI_LG_WINDOW_SIZE,
        );
        compressor.write_all(data)?;
        compressor.flush()?;
        // CompressorWriter finishes the stream on drop
    }
    Ok(output)
}

/// Decompress Brotli data.
fn decompress_brotli(data: &[u8]) -> Result<Zeroizing<Vec<u8>>, StegoError> {
    let mut output = Zeroizing::new(Vec::new());
    let decompressor = brotli::Decompressor::new(data, 4096);
    decompressor
        .take(MAX_DECOMPRESSED_LEN as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|_| StegoError::CorruptContainer)?;
    if output.len() > MAX_DECOMPRESSED_LEN {
        return Err(StegoError::CorruptContainer);
    }
    Ok(output)
}
