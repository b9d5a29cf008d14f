// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Forward-only container parsing state machine.
//!
//! ```text
//! AwaitingHeader -> HeaderValidated -> AwaitingPayload -> PayloadValidated
//!     -> (protected) AwaitingDecryption -> Done
//! ```
//!
//! Any state can move to `Failed`. No state is revisited, so the carrier is
//! walked exactly once: the header window first, then the payload region.

use zeroize::Zeroizing;

use crate::stego::bits::BitReader;
use crate::stego::carrier::SampleGrid;
use crate::stego::crypto::{self, SALT_LEN, TAG_LEN};
use crate::stego::error::StegoError;
use crate::stego::frame::{
    ContainerHeader, FLAG_PROTECTED, KNOWN_FLAGS, MAGIC, PREAMBLE_LEN, SUPPORTED_VERSIONS,
};
use crate::stego::payload::{self, DecodedPayload};
use crate::stego::progress::Progress;

/// Parser state. `Done` and `Failed` are terminal.
#[derive(Debug)]
pub enum ParseState {
    AwaitingHeader,
    HeaderValidated(ContainerHeader),
    AwaitingPayload(ContainerHeader),
    PayloadValidated {
        header: ContainerHeader,
        payload: Zeroizing<Vec<u8>>,
    },
    AwaitingDecryption {
        header: ContainerHeader,
        payload: Zeroizing<Vec<u8>>,
    },
    Done(DecodedPayload),
    Failed(StegoError),
}

impl ParseState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingHeader => "AwaitingHeader",
            Self::HeaderValidated(_) => "HeaderValidated",
            Self::AwaitingPayload(_) => "AwaitingPayload",
            Self::PayloadValidated { .. } => "PayloadValidated",
            Self::AwaitingDecryption { .. } => "AwaitingDecryption",
            Self::Done(_) => "Done",
            Self::Failed(_) => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

/// Parses one container out of a carrier.
pub struct ContainerParser<'a, 'p> {
    reader: BitReader<'a>,
    password: Option<&'p str>,
    state: ParseState,
}

impl<'a, 'p> ContainerParser<'a, 'p> {
    /// An empty password is treated the same as no password.
    pub fn new(grid: &SampleGrid<'a>, password: Option<&'p str>) -> Self {
        Self {
            reader: BitReader::new(grid),
            password: password.filter(|p| !p.is_empty()),
            state: ParseState::AwaitingHeader,
        }
    }

    pub fn state(&self) -> &ParseState {
        &self.state
    }

    /// Perform one transition. Terminal states are left unchanged.
    pub fn step(&mut self, progress: &mut Progress) {
        if self.state.is_terminal() {
            return;
        }
        if let Err(e) = progress.check_cancelled() {
            self.state = ParseState::Failed(e);
            return;
        }
        let current = std::mem::replace(&mut self.state, ParseState::AwaitingHeader);
        let from = current.name();
        self.state = self.transition(current, progress).unwrap_or_else(ParseState::Failed);
        tracing::debug!(from, to = self.state.name(), "container parser transition");
    }

    /// Drive the machine to a terminal state.
    pub fn run(mut self, progress: &mut Progress) -> Result<DecodedPayload, StegoError> {
        loop {
            match self.state {
                ParseState::Done(decoded) => return Ok(decoded),
                ParseState::Failed(e) => return Err(e),
                _ => self.step(progress),
            }
        }
    }

    fn transition(
        &mut self,
        state: ParseState,
        progress: &mut Progress,
    ) -> Result<ParseState, StegoError> {
        match state {
            ParseState::AwaitingHeader => {
                progress.advance("Reading container header...");
                self.read_header().map(ParseState::HeaderValidated)
            }
            ParseState::HeaderValidated(header) => {
                if !SUPPORTED_VERSIONS.contains(&header.version) {
                    return Err(StegoError::UnsupportedVersion(header.version));
                }
                if header.payload_len as usize > self.reader.remaining() {
                    tracing::debug!(
                        declared = header.payload_len,
                        available = self.reader.remaining(),
                        "declared payload exceeds carrier capacity"
                    );
                    return Err(StegoError::CorruptContainer);
                }
                Ok(ParseState::AwaitingPayload(header))
            }
            ParseState::AwaitingPayload(header) => {
                progress.advance(format!("Extracting {} payload bytes...", header.payload_len));
                let payload = Zeroizing::new(self.reader.read_vec(header.payload_len as usize)?);
                if header.compute_checksum(&payload) != header.checksum {
                    return Err(StegoError::CorruptContainer);
                }
                Ok(ParseState::PayloadValidated { header, payload })
            }
            ParseState::PayloadValidated { header, payload } => {
                if header.flags & !KNOWN_FLAGS != 0 {
                    return Err(StegoError::UnsupportedVersion(header.version));
                }
                if header.is_protected() {
                    Ok(ParseState::AwaitingDecryption { header, payload })
                } else {
                    payload::decode_payload(&payload, header.is_compressed()).map(ParseState::Done)
                }
            }
            ParseState::AwaitingDecryption { header, payload } => {
                let password = self.password.ok_or(StegoError::PasswordRequired)?;
                let salt = header.salt.ok_or(StegoError::CorruptContainer)?;
                if payload.len() < TAG_LEN {
                    return Err(StegoError::CorruptContainer);
                }
                progress.advance("Deriving key and decrypting...");
                let plaintext = crypto::decrypt(&payload, password, &salt)?;
                payload::decode_payload(&plaintext, header.is_compressed()).map(ParseState::Done)
            }
            terminal @ (ParseState::Done(_) | ParseState::Failed(_)) => Ok(terminal),
        }
    }

    fn read_header(&mut self) -> Result<ContainerHeader, StegoError> {
        if self.reader.remaining() < PREAMBLE_LEN {
            return Err(StegoError::NotSteganographic);
        }
        let preamble: [u8; PREAMBLE_LEN] = self.reader.read_array()?;
        if preamble[..4] != MAGIC {
            return Err(StegoError::NotSteganographic);
        }
        let version = preamble[4];
        let flags = preamble[5];

        let salt = if flags & FLAG_PROTECTED != 0 {
            Some(self.reader.read_array::<SALT_LEN>()?)
        } else {
            None
        };
        let payload_len = u32::from_be_bytes(self.reader.read_array()?);
        let checksum = u32::from_be_bytes(self.reader.read_array()?);

        Ok(ContainerHeader { version, flags, salt, payload_len, checksum })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stego::bits::BitWriter;
    use crate::stego::carrier::{OwnedCarrier, SampleGridMut};
    use crate::stego::frame::{build_container, FLAG_COMPRESSED, FORMAT_VERSION};

    fn carrier_with(container: &[u8], width: usize, height: usize) -> OwnedCarrier {
        let samples: Vec<u8> = (0..width * height * 3).map(|i| (i * 31 % 251) as u8).collect();
        let mut carrier = OwnedCarrier::new(samples, width, height, 3).unwrap();
        {
            let mut grid: SampleGridMut<'_> = carrier.as_grid_mut();
            BitWriter::new(&mut grid).write_all(container).unwrap();
        }
        carrier
    }

    fn plain_container(name: &str, content: &[u8]) -> Vec<u8> {
        let inner = payload::encode_payload(name, content, false).unwrap();
        build_container(0, None, &inner.bytes)
    }

    fn parse(carrier: &OwnedCarrier, password: Option<&str>) -> Result<DecodedPayload, StegoError> {
        ContainerParser::new(&carrier.as_grid(), password).run(&mut Progress::silent())
    }

    #[test]
    fn plain_container_parses() {
        let carrier = carrier_with(&plain_container("a.txt", b"hello"), 32, 32);
        let decoded = parse(&carrier, None).unwrap();
        assert_eq!(decoded.file_name, "a.txt");
        assert_eq!(decoded.content, b"hello");
    }

    #[test]
    fn states_progress_forward() {
        let carrier = carrier_with(&plain_container("a", b"x"), 32, 32);
        let grid = carrier.as_grid();
        let mut parser = ContainerParser::new(&grid, None);
        let mut progress = Progress::silent();
        let mut seen = vec![parser.state().name()];
        while !parser.state().is_terminal() {
            parser.step(&mut progress);
            seen.push(parser.state().name());
        }
        assert_eq!(
            seen,
            ["AwaitingHeader", "HeaderValidated", "AwaitingPayload", "PayloadValidated", "Done"]
        );
    }

    #[test]
    fn ordinary_image_is_not_steganographic() {
        let samples: Vec<u8> = (0..32 * 32 * 3).map(|i| (i % 256) as u8).collect();
        let carrier = OwnedCarrier::new(samples, 32, 32, 3).unwrap();
        assert!(matches!(parse(&carrier, None), Err(StegoError::NotSteganographic)));
    }

    #[test]
    fn tiny_carrier_is_not_steganographic() {
        let carrier = OwnedCarrier::new(vec![0u8; 6], 2, 1, 3).unwrap();
        assert!(matches!(parse(&carrier, None), Err(StegoError::NotSteganographic)));
    }

    #[test]
    fn unknown_version_rejected() {
        let mut container = plain_container("a", b"x");
        container[4] = FORMAT_VERSION + 1;
        let carrier = carrier_with(&container, 32, 32);
        assert!(matches!(
            parse(&carrier, None),
            Err(StegoError::UnsupportedVersion(v)) if v == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn unknown_flags_with_valid_checksum_rejected() {
        let inner = payload::encode_payload("a", b"x", false).unwrap();
        let container = build_container(0b1000_0000, None, &inner.bytes);
        let carrier = carrier_with(&container, 32, 32);
        assert!(matches!(parse(&carrier, None), Err(StegoError::UnsupportedVersion(_))));
    }

    #[test]
    fn oversized_length_is_corrupt() {
        let mut container = plain_container("a", b"x");
        container[6..10].copy_from_slice(&u32::MAX.to_be_bytes());
        let carrier = carrier_with(&container, 32, 32);
        assert!(matches!(parse(&carrier, None), Err(StegoError::CorruptContainer)));
    }

    #[test]
    fn payload_bit_flip_is_corrupt() {
        let mut container = plain_container("a.txt", b"hello");
        let last = container.len() - 1;
        container[last] ^= 0x04;
        let carrier = carrier_with(&container, 32, 32);
        assert!(matches!(parse(&carrier, None), Err(StegoError::CorruptContainer)));
    }

    #[test]
    fn protected_without_password_requires_one() {
        let salt = [1u8; SALT_LEN];
        // Payload content is irrelevant: the password check comes first.
        let container = build_container(FLAG_PROTECTED, Some(salt), &[0u8; 40]);
        let carrier = carrier_with(&container, 32, 32);
        assert!(matches!(parse(&carrier, None), Err(StegoError::PasswordRequired)));
        assert!(matches!(parse(&carrier, Some("")), Err(StegoError::PasswordRequired)));
    }

    #[test]
    fn protected_roundtrip_and_wrong_password() {
        let salt = [2u8; SALT_LEN];
        let inner = payload::encode_payload("s.bin", b"secret bytes", false).unwrap();
        let ct = crypto::encrypt(&inner.bytes, "pw", &salt).unwrap();
        let container = build_container(FLAG_PROTECTED, Some(salt), &ct);
        let carrier = carrier_with(&container, 32, 32);

        let decoded = parse(&carrier, Some("pw")).unwrap();
        assert_eq!(decoded.file_name, "s.bin");
        assert_eq!(decoded.content, b"secret bytes");

        assert!(matches!(parse(&carrier, Some("nope")), Err(StegoError::AuthenticationFailed)));
    }

    #[test]
    fn compressed_plain_container() {
        let content = b"abcabcabc".repeat(200);
        let inner = payload::encode_payload("c.txt", &content, true).unwrap();
        assert!(inner.compressed);
        let container = build_container(FLAG_COMPRESSED, None, &inner.bytes);
        let carrier = carrier_with(&container, 32, 32);
        assert_eq!(parse(&carrier, None).unwrap().content, content);
    }

    #[test]
    fn cancelled_before_start() {
        let carrier = carrier_with(&plain_container("a", b"x"), 32, 32);
        let token = crate::stego::progress::CancelToken::new();
        token.cancel();
        let mut progress = Progress::silent().with_cancel(token);
        let result = ContainerParser::new(&carrier.as_grid(), None).run(&mut progress);
        assert!(matches!(result, Err(StegoError::Cancelled)));
    }
}
