//! User configuration.
//!
//! Read from the first of: the `--config` path, `$SEARCHINDEX_MCP_CONFIG`, or
//! `<config dir>/searchindex-mcp/config.toml`. A missing default file means
//! default settings; a missing file named explicitly is an error.

use crate::search::{Language, Scorer};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "SEARCHINDEX_MCP_CONFIG";

const CONFIG_DIR_NAME: &str = "searchindex-mcp";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Stemmer language; must match the language the site was built with
    pub language: Language,
    /// Result count when a query does not give one
    pub default_limit: usize,
    /// Number of parsed indexes kept in memory
    pub cache_size: usize,
    pub scorer: Scorer,
    /// Index loaded when the server starts
    pub default_index: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::default(),
            default_limit: 10,
            cache_size: 16,
            scorer: Scorer::default(),
            default_index: None,
        }
    }
}

impl Config {
    /// Loads configuration, falling back to defaults when no file is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV)
            && !path.is_empty()
        {
            return Self::from_file(Path::new(expand_tilde(&path).as_ref()));
        }
        match default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        if config.cache_size == 0 {
            anyhow::bail!("cache_size must be at least 1");
        }
        config.default_index = config
            .default_index
            .map(|p| PathBuf::from(expand_tilde(&p.to_string_lossy()).into_owned()));
        Ok(config)
    }
}

/// `<config dir>/searchindex-mcp/config.toml`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Expands a leading `~` to the user's home directory.
///
/// Returns `Cow::Borrowed` when nothing was expanded.
pub fn expand_tilde(path: &str) -> Cow<'_, str> {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Cow::Owned(home.join(stripped).display().to_string());
        }
    } else if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return Cow::Owned(home.display().to_string());
    }
    Cow::Borrowed(path)
}
