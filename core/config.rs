use crate::error::{AppError, Result};
use crate::matcher::{IgnoreMatcher, IgnoreRuleSet};
use log;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_DIR: &str = ".xtools/xbundle";
pub const DEFAULT_CONFIG_FILENAME: &str = "xbundle.toml";
pub const DEFAULT_OUTPUT_DIR: &str = ".xtools/xbundle/out";

/// Rules applied unless `ignore.use_defaults` is turned off.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // VCS and tool state
    ".git/",
    ".hg/",
    ".svn/",
    ".xtools/",
    ".idea/",
    ".vscode/",
    ".DS_Store",
    "Thumbs.db",
    // Dependencies and build output
    "node_modules/",
    "bower_components/",
    "vendor/",
    "target/",
    "dist/",
    "build/",
    "out/",
    ".next/",
    ".nuxt/",
    ".gradle/",
    "__pycache__/",
    ".venv/",
    "venv/",
    ".tox/",
    ".mypy_cache/",
    ".pytest_cache/",
    "coverage/",
    // Lock files
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "poetry.lock",
    "go.sum",
    // Generated or noisy files
    "*.log",
    "*.tmp",
    "*.swp",
    "*.pyc",
    "*.class",
    "*.o",
    "*.so",
    "*.dll",
    "*.exe",
    "*.min.js",
    "*.min.css",
    "*.map",
    ".env",
    ".env.*",
];

static DEFAULT_IGNORE_RULES: Lazy<IgnoreRuleSet> =
    Lazy::new(|| IgnoreRuleSet::new(DEFAULT_IGNORE_PATTERNS));

/// The built-in ignore catalog. Built once, never mutated.
pub fn default_ignore_rules() -> &'static IgnoreRuleSet {
    &DEFAULT_IGNORE_RULES
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub ignore: IgnoreConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IgnoreConfig {
    #[serde(default = "default_true")]
    pub use_defaults: bool,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub filename_base: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown output format '{}'. Use text, json or yaml.",
                other
            ))),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_defaults: default_true(),
            patterns: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::default(),
            filename_base: None,
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to canonicalize project root '{}': {}",
                    path_to_resolve.display(),
                    e
                ),
            ))
        })
    }

    /// Resolves which config file to load. An explicit path must exist; the
    /// default location is optional.
    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&PathBuf>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p) => {
                let expanded = shellexpand::tilde(&p.to_string_lossy()).to_string();
                let mut path = PathBuf::from(expanded);
                if path.is_relative() {
                    path = project_root.join(path);
                }
                if !path.exists() && path.extension().is_none() {
                    path.set_extension("toml");
                }
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => {
                let default_path = project_root
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Config>(content).map_err(|e| {
            AppError::TomlParse(format!("{}. Check TOML syntax and structure.", e))
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Effective rules: the default catalog (when enabled), then the
    /// configured patterns.
    pub fn ignore_rules(&self) -> IgnoreRuleSet {
        let mut rules = if self.ignore.use_defaults {
            default_ignore_rules().clone()
        } else {
            IgnoreRuleSet::default()
        };
        rules.extend(&self.ignore.patterns);
        log::debug!("Effective ignore rules: {:?}", rules.rules());
        rules
    }

    /// Compiled rules plus the output directory, when it lies inside the
    /// project, excluded at its exact location.
    pub fn ignore_matcher(&self, project_root: &Path) -> IgnoreMatcher {
        let matcher = self.ignore_rules().compile();
        match self.output_dir_exclusion(project_root) {
            Some(path) => matcher.exclude_path(path),
            None => matcher,
        }
    }

    /// Absolute output directory. Relative dirs are taken from the project
    /// root; `~` is expanded.
    pub fn resolved_output_dir(&self, project_root: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&self.output.dir.to_string_lossy()).to_string();
        let dir = PathBuf::from(expanded);
        if dir.is_absolute() {
            dir
        } else {
            project_root.join(dir)
        }
    }

    /// The output directory relative to `project_root`, slash-separated, or
    /// `None` when it is outside the project or is the project root itself.
    pub fn output_dir_exclusion(&self, project_root: &Path) -> Option<String> {
        let dir = self.resolved_output_dir(project_root);
        let lexical = normalize_lexically(&dir);
        let root = normalize_lexically(project_root);
        let canonical = dir.canonicalize().ok().zip(project_root.canonicalize().ok());
        let relative = match lexical.strip_prefix(&root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => {
                let (dir, root) = canonical?;
                dir.strip_prefix(root).ok()?.to_path_buf()
            }
        };
        let parts: Vec<_> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("/"))
    }

    pub fn effective_filename_base(&self, scan_root: &Path) -> String {
        self.output.filename_base.clone().unwrap_or_else(|| {
            scan_root
                .file_name()
                .map(|n| sanitize_filename(&n.to_string_lossy()))
                .unwrap_or_else(|| "bundle".to_string())
        })
    }
}

/// Resolves `.` and `..` without touching the disk.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "bundle".to_string()
    } else {
        cleaned
    }
}
