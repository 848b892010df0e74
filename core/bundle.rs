use crate::error::{AppError, Result};
use serde::Serialize;
use std::fmt;

/// Wraps each section's path on both sides of the header line.
pub const HEADER_DELIMITER: &str = "=====";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    File { path: String, content: String },
    TooLarge { path: String, size: u64 },
    ReadError { path: String, cause: String },
}

impl Section {
    pub fn path(&self) -> &str {
        match self {
            Section::File { path, .. }
            | Section::TooLarge { path, .. }
            | Section::ReadError { path, .. } => path,
        }
    }
}

pub fn header_line(path: &str) -> String {
    format!("{} {} {}", HEADER_DELIMITER, path, HEADER_DELIMITER)
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", header_line(self.path()))?;
        match self {
            Section::File { content, .. } => f.write_str(content)?,
            Section::TooLarge { size, .. } => write!(
                f,
                "[skipped: file size {} bytes exceeds the 10 MiB limit]",
                size
            )?,
            Section::ReadError { cause, .. } => {
                write!(f, "[skipped: error reading file: {}]", cause)?
            }
        }
        f.write_str("\n\n")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStats {
    pub included: usize,
    pub included_bytes: u64,
    pub too_large: usize,
    pub read_errors: usize,
    pub binary_skipped: usize,
    pub ignored: usize,
}

/// Ordered sections of one scan, in the order the walker visited the files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bundle {
    sections: Vec<Section>,
    stats: BundleStats,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, section: Section) {
        match &section {
            Section::File { content, .. } => {
                self.stats.included += 1;
                self.stats.included_bytes += content.len() as u64;
            }
            Section::TooLarge { .. } => self.stats.too_large += 1,
            Section::ReadError { .. } => self.stats.read_errors += 1,
        }
        self.sections.push(section);
    }

    pub(crate) fn note_binary(&mut self) {
        self.stats.binary_skipped += 1;
    }

    pub(crate) fn note_ignored(&mut self) {
        self.stats.ignored += 1;
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn stats(&self) -> &BundleStats {
        &self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// The text blob handed to writers.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            write!(f, "{}", section)?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde_support")]
pub fn serialize_bundle_to_json(bundle: &Bundle, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(bundle).map_err(AppError::JsonSerialize)
    } else {
        serde_json::to_string(bundle).map_err(AppError::JsonSerialize)
    }
}

#[cfg(feature = "serde_support")]
pub fn serialize_bundle_to_yaml(bundle: &Bundle) -> Result<String> {
    serde_yml::to_string(bundle).map_err(AppError::YamlError)
}
