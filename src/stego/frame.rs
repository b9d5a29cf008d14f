// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Container frame construction and header layout.
//!
//! The container is the byte layout embedded in the carrier's LSB stream:
//!
//! ```text
//! [4 bytes ] magic "DUCK"
//! [1 byte  ] format version
//! [1 byte  ] flags (bit 0 protected, bit 1 Brotli-compressed)
//! [16 bytes] Argon2 salt (only when protected)
//! [4 bytes ] payload length (big-endian u32)
//! [4 bytes ] CRC-32 of every header byte above and the payload
//! [N bytes ] payload (ciphertext + 16-byte tag when protected)
//! ```
//!
//! The header is 14 bytes for plain containers and 30 bytes for protected
//! ones. It is always extracted first so it can be validated before the
//! payload region is read.

use crate::stego::crypto::SALT_LEN;

/// Marker identifying a carrier that holds a container.
pub const MAGIC: [u8; 4] = *b"DUCK";

/// Format version written by this build.
pub const FORMAT_VERSION: u8 = 1;

/// Format versions this build can read.
pub const SUPPORTED_VERSIONS: &[u8] = &[1];

/// Flag bit: payload is encrypted with a password-derived key.
pub const FLAG_PROTECTED: u8 = 0b0000_0001;
/// Flag bit: inner payload is Brotli-compressed.
pub const FLAG_COMPRESSED: u8 = 0b0000_0010;
/// All flag bits understood by this build.
pub const KNOWN_FLAGS: u8 = FLAG_PROTECTED | FLAG_COMPRESSED;

/// magic(4) + version(1) + flags(1).
pub const PREAMBLE_LEN: usize = 6;
/// Header length without salt: preamble + length(4) + crc(4).
pub const PLAIN_HEADER_LEN: usize = PREAMBLE_LEN + 4 + 4; // 14
/// Header length with salt.
pub const PROTECTED_HEADER_LEN: usize = PLAIN_HEADER_LEN + SALT_LEN; // 30

/// Header length for a given flags byte.
pub fn header_len(flags: u8) -> usize {
    if flags & FLAG_PROTECTED != 0 {
        PROTECTED_HEADER_LEN
    } else {
        PLAIN_HEADER_LEN
    }
}

/// Fixed-size container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub version: u8,
    pub flags: u8,
    /// Present only when [`FLAG_PROTECTED`] is set.
    pub salt: Option<[u8; SALT_LEN]>,
    /// Declared payload length in bytes.
    pub payload_len: u32,
    /// Stored CRC-32 over header fields and payload.
    pub checksum: u32,
}

impl ContainerHeader {
    pub fn is_protected(&self) -> bool {
        self.flags & FLAG_PROTECTED != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    /// Encoded header length in bytes.
    pub fn encoded_len(&self) -> usize {
        header_len(self.flags)
    }

    /// Header bytes covered by the checksum (everything except the CRC).
    pub fn checksummed_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len() - 4);
        buf.extend_from_slice(&MAGIC);
        buf.push(self.version);
        buf.push(self.flags);
        if let Some(salt) = &self.salt {
            buf.extend_from_slice(salt);
        }
        buf.extend_from_slice(&self.payload_len.to_be_bytes());
        buf
    }

    /// CRC-32 this header should carry for `payload`.
    pub fn compute_checksum(&self, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.checksummed_bytes());
        hasher.update(payload);
        hasher.finalize()
    }
}

/// Build a complete container: header, CRC-32 and payload.
///
/// `salt` must be `Some` exactly when `flags` carries [`FLAG_PROTECTED`].
pub fn build_container(flags: u8, salt: Option<[u8; SALT_LEN]>, payload: &[u8]) -> Vec<u8> {
    debug_assert_eq!(flags & FLAG_PROTECTED != 0, salt.is_some(), "salt/flag mismatch");
    debug_assert!(payload.len() <= u32::MAX as usize, "payload exceeds u32 length field");

    let mut header = ContainerHeader {
        version: FORMAT_VERSION,
        flags,
        salt,
        payload_len: payload.len() as u32,
        checksum: 0,
    };
    header.checksum = header.compute_checksum(payload);

    let mut frame = header.checksummed_bytes();
    frame.reserve(4 + payload.len());
    frame.extend_from_slice(&header.checksum.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_layout() {
        let frame = build_container(0, None, b"abc");
        assert_eq!(frame.len(), PLAIN_HEADER_LEN + 3);
        assert_eq!(&frame[..4], b"DUCK");
        assert_eq!(frame[4], FORMAT_VERSION);
        assert_eq!(frame[5], 0);
        assert_eq!(&frame[6..10], &[0, 0, 0, 3]);
        assert_eq!(&frame[14..], b"abc");
        let mut covered = frame[..10].to_vec();
        covered.extend_from_slice(b"abc");
        let stored = u32::from_be_bytes([frame[10], frame[11], frame[12], frame[13]]);
        assert_eq!(stored, crc32fast::hash(&covered));
    }

    #[test]
    fn protected_layout_carries_salt() {
        let salt = [9u8; SALT_LEN];
        let frame = build_container(FLAG_PROTECTED, Some(salt), &[0u8; 20]);
        assert_eq!(frame.len(), PROTECTED_HEADER_LEN + 20);
        assert_eq!(&frame[6..22], &salt);
        assert_eq!(&frame[22..26], &[0, 0, 0, 20]);
    }

    #[test]
    fn checksum_covers_flags_and_payload() {
        let a = build_container(0, None, b"payload");
        let b = build_container(FLAG_COMPRESSED, None, b"payload");
        let c = build_container(0, None, b"paylaod");
        assert_ne!(a[10..14], b[10..14]);
        assert_ne!(a[10..14], c[10..14]);
    }

    #[test]
    fn header_len_by_flags() {
        assert_eq!(header_len(0), 14);
        assert_eq!(header_len(FLAG_COMPRESSED), 14);
        assert_eq!(header_len(FLAG_PROTECTED), 30);
        assert_eq!(header_len(KNOWN_FLAGS), 30);
    }
}
