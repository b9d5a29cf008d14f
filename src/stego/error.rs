// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Error types for the steganography pipeline.
//!
//! [`StegoError`] covers every failure mode from carrier validation through
//! container parsing, decryption and writing the recovered file. The variants
//! fall into three user-facing classes:
//!
//! - nothing is hidden here ([`StegoError::NotSteganographic`]),
//! - something is hidden but cannot be recovered
//!   ([`StegoError::CorruptContainer`], [`StegoError::UnsupportedVersion`]),
//! - the password is missing or wrong ([`StegoError::PasswordRequired`],
//!   [`StegoError::AuthenticationFailed`]).

use thiserror::Error;

/// Errors that can occur during steganographic encoding or decoding.
#[derive(Debug, Error)]
pub enum StegoError {
    /// The sample grid violates its shape invariants.
    #[error("invalid carrier: {0}")]
    InvalidCarrier(&'static str),
    /// No container magic was found. The expected outcome for ordinary images.
    #[error("no hidden content found in this image")]
    NotSteganographic,
    /// The container was written by a format version this build does not read.
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u8),
    /// Checksum mismatch, inconsistent header, or malformed inner payload.
    #[error("hidden container is corrupted (was the image recompressed or resized?)")]
    CorruptContainer,
    /// The container is password-protected and no password was supplied.
    #[error("password required")]
    PasswordRequired,
    /// The cipher's authentication tag did not verify.
    #[error("authentication failed (wrong password?)")]
    AuthenticationFailed,
    /// Writing the recovered file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The payload does not fit into the carrier.
    #[error("payload too large for this image ({needed} bytes needed, {available} available)")]
    PayloadTooLarge { needed: usize, available: usize },
    /// The embedded filename exceeds 255 bytes.
    #[error("file name longer than 255 bytes")]
    FileNameTooLong,
    /// The recovered `.binpng` payload is not a valid RGB image.
    #[error("recovered .binpng payload is not a valid image")]
    InvalidBinPng,
    /// The carrier file could not be decoded into pixels.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    /// The operation was cancelled by the caller.
    #[error("operation cancelled by user")]
    Cancelled,
}

impl StegoError {
    /// `true` when the image simply carries no container.
    pub fn is_not_steganographic(&self) -> bool {
        matches!(self, Self::NotSteganographic)
    }

    /// `true` when a container is present but its content cannot be trusted.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::CorruptContainer | Self::UnsupportedVersion(_))
    }

    /// `true` when re-prompting for a password may help.
    pub fn needs_password(&self) -> bool {
        matches!(self, Self::PasswordRequired | Self::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_disjoint() {
        let all = [
            StegoError::NotSteganographic,
            StegoError::CorruptContainer,
            StegoError::UnsupportedVersion(9),
            StegoError::PasswordRequired,
            StegoError::AuthenticationFailed,
        ];
        for e in &all {
            let hits = [e.is_not_steganographic(), e.is_unrecoverable(), e.needs_password()]
                .iter()
                .filter(|&&b| b)
                .count();
            assert_eq!(hits, 1, "{e:?} must belong to exactly one class");
        }
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StegoError = io.into();
        assert!(matches!(err, StegoError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }
}
