pub mod bundle;
pub mod classify;
pub mod config;
pub mod error;
pub mod fs;
pub mod matcher;
pub mod walk;

pub use bundle::{Bundle, BundleStats, Section};
pub use classify::{Classification, MAX_EMBED_SIZE, classify_bytes, classify_file};
pub use config::{Config, OutputFormat, default_ignore_rules};
pub use error::{AppError, Result};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use matcher::{IgnoreMatcher, IgnoreRuleSet, should_ignore};
pub use walk::{ScanFailure, process_directory};
