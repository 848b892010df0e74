//! Text-versus-binary decision for file contents.
//!
//! The heuristic is intentionally simple: content that is not valid UTF-8, or
//! that has a NUL byte within the first [`BINARY_SNIFF_LEN`] bytes, is binary.
//! Known limitations: text in other encodings (Latin-1, UTF-16, ...) is
//! reported as binary, and binary formats that happen to be valid UTF-8
//! without an early NUL are reported as text.

use crate::fs::FileSystem;
use log;
use std::io;
use std::path::Path;

/// Files strictly larger than this are never read.
pub const MAX_EMBED_SIZE: u64 = 10 * 1024 * 1024;

pub const BINARY_SNIFF_LEN: usize = 1024;

#[derive(Debug)]
pub enum Classification {
    Include(String),
    SkipTooLarge { size: u64 },
    SkipBinary,
    SkipError(io::Error),
}

pub fn exceeds_size_limit(size: u64) -> bool {
    size > MAX_EMBED_SIZE
}

/// Returns the decoded text, or `None` if the bytes look binary.
pub fn classify_bytes(bytes: Vec<u8>) -> Option<String> {
    let text = String::from_utf8(bytes).ok()?;
    let sniff = &text.as_bytes()[..text.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return None;
    }
    Some(text)
}

/// Size-gates, reads and classifies one file.
pub fn classify_file(fs: &dyn FileSystem, path: &Path) -> Classification {
    let meta = match fs.stat(path) {
        Ok(meta) => meta,
        Err(e) => return Classification::SkipError(e),
    };
    if exceeds_size_limit(meta.len) {
        log::debug!(
            "Not reading {} ({} bytes exceeds limit)",
            path.display(),
            meta.len
        );
        return Classification::SkipTooLarge { size: meta.len };
    }
    match fs.read_file(path) {
        Ok(bytes) => match classify_bytes(bytes) {
            Some(text) => Classification::Include(text),
            None => Classification::SkipBinary,
        },
        Err(e) => Classification::SkipError(e),
    }
}
