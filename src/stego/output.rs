// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Writing recovered files to disk.
//!
//! The filename stored in a container is attacker-controlled, so it is
//! reduced to a single safe path component before use. Content is written to
//! a temporary file in the output directory and flushed; the file only
//! appears under its final name when [`StagedFile::commit`] renames it. A
//! [`StagedFile`] that is dropped without committing removes its temporary
//! file, so a failed or cancelled decode never leaves a partial result.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::stego::error::StegoError;

/// Name used when the embedded filename is empty or unusable.
pub const FALLBACK_FILE_NAME: &str = "duck_recovered";

/// Maximum sanitized filename length in bytes.
const MAX_NAME_BYTES: usize = 255;

/// Extensions longer than this are not preserved when truncating a name.
const MAX_KEPT_EXTENSION_BYTES: usize = 32;

/// Give up on collision resolution after this many numbered candidates.
const MAX_COLLISION_ATTEMPTS: u32 = 10_000;

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reduce an untrusted filename to one safe path component.
pub fn sanitize_file_name(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let replaced: String = last
        .chars()
        .map(|c| if c.is_control() || FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_end_matches(['.', ' ']).trim_start_matches(' ');

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return FALLBACK_FILE_NAME.to_string();
    }

    let mut name = trimmed.to_string();
    let device = name.split('.').next().unwrap_or("").trim_end();
    if RESERVED_DEVICE_NAMES.iter().any(|r| r.eq_ignore_ascii_case(device)) {
        name.insert(0, '_');
    }
    truncate_name(&name, MAX_NAME_BYTES)
}

/// Shorten `name` to at most `max` bytes, keeping a short extension intact.
fn truncate_name(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    if !ext.is_empty() && ext.len() <= MAX_KEPT_EXTENSION_BYTES {
        let stem = floor_char_boundary(stem, max - ext.len());
        format!("{stem}{ext}")
    } else {
        floor_char_boundary(name, max).to_string()
    }
}

fn floor_char_boundary(s: &str, max: usize) -> &str {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Split into stem and extension (extension includes the dot). A leading dot
/// does not start an extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    }
}

/// `n`-th candidate name: `name` itself for 0, `stem-n.ext` otherwise.
fn numbered_name(name: &str, n: u32) -> String {
    if n == 0 {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    format!("{stem}-{n}{ext}")
}

/// Recovered content flushed to a temporary file, not yet visible under its
/// final name.
#[derive(Debug)]
pub struct StagedFile {
    temp: NamedTempFile,
    dir: PathBuf,
    file_name: String,
    size: u64,
}

impl StagedFile {
    /// Sanitized target filename (before collision numbering).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically move the staged file to its final name.
    ///
    /// Existing files are never overwritten: on a collision the next
    /// `stem-N.ext` candidate is tried. Returns the final path.
    pub fn commit(self) -> Result<PathBuf, StegoError> {
        let mut temp = self.temp;
        for n in 0..MAX_COLLISION_ATTEMPTS {
            let candidate = self.dir.join(numbered_name(&self.file_name, n));
            match temp.persist_noclobber(&candidate) {
                Ok(_) => {
                    tracing::debug!(path = %candidate.display(), "recovered file committed");
                    return Ok(candidate);
                }
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => temp = e.file,
                Err(e) => return Err(e.error.into()),
            }
        }
        Err(StegoError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free name for {} in {}", self.file_name, self.dir.display()),
        )))
    }
}

/// Write `content` to a temporary file in `dir` (created if missing).
pub fn stage(dir: &Path, file_name: &str, content: &[u8]) -> Result<StagedFile, StegoError> {
    fs::create_dir_all(dir)?;
    let mut temp = tempfile::Builder::new()
        .prefix(".duck-")
        .suffix(".part")
        .tempfile_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    Ok(StagedFile {
        temp,
        dir: dir.to_path_buf(),
        file_name: sanitize_file_name(file_name),
        size: content.len() as u64,
    })
}

/// Human-readable size: `bytes` up to 1 KiB, then `KB`, then `MB`.
pub fn format_size(size: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if size > MIB {
        format!("{:.2} MB", size as f64 / MIB as f64)
    } else if size > KIB {
        format!("{:.2} KB", size as f64 / KIB as f64)
    } else {
        format!("{size} bytes")
    }
}
