//! Service configuration loading
//!
//! Loads configuration from `~/.config/lms-ws/config.toml` (or
//! `LMS_WS_CONFIG` env). Every field has a default, so a missing file is
//! not an error unless it was named explicitly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lms_external::FeatureFlags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Socket to listen on; `default_socket_path()` when unset.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,

    /// Site seed (TOML or JSON). The site starts empty without one.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,

    /// Site root used in generated URLs; overrides the seed's value.
    #[serde(default)]
    pub wwwroot: Option<String>,

    #[serde(default)]
    pub features: FeatureFlags,

    /// Message overrides: `[strings.<component>] <identifier> = "text"`.
    #[serde(default)]
    pub strings: HashMap<String, HashMap<String, String>>,
}

impl ServiceConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "LMS_WS_CONFIG";

    pub const DEFAULT_CONFIG_FILENAME: &'static str = "config.toml";

    /// Load configuration.
    ///
    /// Resolution order:
    /// 1. `explicit` (from `--config`)
    /// 2. `LMS_WS_CONFIG` environment variable
    /// 3. `~/.config/lms-ws/config.toml`
    ///
    /// Only the default location may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return Self::load_from_path(Path::new(&path));
        }

        let path = Self::default_config_path();
        if !path.exists() {
            tracing::info!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| {
                h.join(".config")
                    .join("lms-ws")
                    .join(Self::DEFAULT_CONFIG_FILENAME)
            })
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    /// Socket path with a leading `~/` expanded.
    pub fn resolved_socket_path(&self) -> PathBuf {
        self.socket_path
            .as_deref()
            .map_or_else(crate::default_socket_path, expand_home)
    }

    /// Seed path with a leading `~/` expanded.
    pub fn resolved_seed_path(&self) -> Option<PathBuf> {
        self.seed_path.as_deref().map(expand_home)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    path.to_path_buf()
}
