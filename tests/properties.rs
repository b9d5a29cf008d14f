// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Property tests: arbitrary content survives a round trip, and every single
//! bit flip in an embedded container is detected and classified.

use duck_core::stego::bits::{BitReader, BitWriter};
use duck_core::stego::frame::header_len;
use duck_core::{encode, extract, EncodeOptions, OwnedCarrier, Progress, StegoError};
use proptest::prelude::*;

fn make_cover(width: usize, height: usize) -> OwnedCarrier {
    let samples = (0..width * height * 3).map(|i| (i * 37 % 253) as u8).collect();
    OwnedCarrier::new(samples, width, height, 3).unwrap()
}

/// Read the embedded container bytes back out of the carrier.
fn read_container(carrier: &OwnedCarrier) -> Vec<u8> {
    let grid = carrier.as_grid();
    let mut reader = BitReader::new(&grid);
    let preamble: [u8; 6] = reader.read_array().unwrap();
    let header_rest = header_len(preamble[5]) - 6;
    let rest = reader.read_vec(header_rest).unwrap();
    let len_at = header_rest - 8;
    let payload_len = u32::from_be_bytes(rest[len_at..len_at + 4].try_into().unwrap()) as usize;
    let payload = reader.read_vec(payload_len).unwrap();
    [preamble.as_slice(), &rest, &payload].concat()
}

fn rewrite_container(carrier: &mut OwnedCarrier, container: &[u8]) {
    BitWriter::new(&mut carrier.as_grid_mut()).write_all(container).unwrap();
}

fn assert_every_flip_detected(original: &OwnedCarrier, password: Option<&str>) {
    let container = read_container(original);
    for bit in 0..container.len() * 8 {
        let byte = bit / 8;
        let mut flipped = container.clone();
        flipped[byte] ^= 0x80 >> (bit % 8);
        let mut carrier = original.clone();
        rewrite_container(&mut carrier, &flipped);

        let result = extract(&carrier.as_grid(), password, &mut Progress::silent());
        match byte {
            0..=3 => assert!(
                matches!(result, Err(StegoError::NotSteganographic)),
                "magic flip at bit {bit}: {result:?}"
            ),
            4 => assert!(
                matches!(result, Err(StegoError::UnsupportedVersion(_))),
                "version flip at bit {bit}: {result:?}"
            ),
            _ => assert!(
                matches!(result, Err(StegoError::CorruptContainer)),
                "flip at bit {bit} (byte {byte}): {result:?}"
            ),
        }
    }
}

#[test]
fn every_bit_flip_in_plain_container_is_detected() {
    let mut carrier = make_cover(48, 48);
    encode(
        &mut carrier.as_grid_mut(),
        "note.txt",
        b"integrity matters",
        None,
        &EncodeOptions::default(),
    )
    .unwrap();
    assert_every_flip_detected(&carrier, None);
}

#[test]
fn every_bit_flip_in_compressed_container_is_detected() {
    let mut carrier = make_cover(48, 48);
    let content = b"abcd".repeat(64);
    encode(&mut carrier.as_grid_mut(), "abcd.txt", &content, None, &EncodeOptions::default())
        .unwrap();
    assert_every_flip_detected(&carrier, None);
}

#[test]
fn every_bit_flip_in_protected_container_is_detected() {
    // The checksum is verified before the key is derived, so flips never
    // reach decryption.
    let mut carrier = make_cover(48, 48);
    encode(&mut carrier.as_grid_mut(), "k", b"locked", Some("pw"), &EncodeOptions::default())
        .unwrap();
    assert_every_flip_detected(&carrier, Some("pw"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arbitrary_content_roundtrips(
        content in proptest::collection::vec(any::<u8>(), 0..600),
        name in "[a-zA-Z0-9 ._-]{0,40}",
        compress in any::<bool>(),
    ) {
        let mut carrier = make_cover(64, 64);
        encode(&mut carrier.as_grid_mut(), &name, &content, None, &EncodeOptions { compress })
            .unwrap();
        let decoded = extract(&carrier.as_grid(), None, &mut Progress::silent()).unwrap();
        prop_assert_eq!(decoded.file_name, name);
        prop_assert_eq!(decoded.content, content);
    }

    #[test]
    fn random_noise_is_not_steganographic(
        samples in proptest::collection::vec(any::<u8>(), 16 * 16 * 3),
        password in proptest::option::of("[a-z]{0,8}"),
    ) {
        let carrier = OwnedCarrier::new(samples, 16, 16, 3).unwrap();
        let result = extract(&carrier.as_grid(), password.as_deref(), &mut Progress::silent());
        prop_assert!(matches!(result, Err(StegoError::NotSteganographic)), "got {:?}", result);
    }
}
