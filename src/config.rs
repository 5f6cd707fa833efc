//! `healparser.toml` loading and validation.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//! Unknown keys are ignored so older binaries accept newer files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Config file looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "healparser.toml";

/// Prayer of Mending as it appears when the buff is applied
pub const DEFAULT_REDIRECT_AURA_SPELL_ID: i32 = 41635;
/// Prayer of Mending as it appears when it heals
pub const DEFAULT_REDIRECT_HEAL_SPELL_ID: i32 = 33110;
pub const DEFAULT_ASSUMED_HEALER_COUNT: u32 = 2;
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_OWNER: &str = "SYSTEM";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100_000_000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parser: ParserConfig,
    pub scoring: ScoringConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// `[parser]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Aura whose later heal is logged against the aura's recipient
    pub redirect_aura_spell_id: i32,
    /// Heal that is credited back to the caster of the redirect aura
    pub redirect_heal_spell_id: i32,
    /// Year appended to the log's `month/day` stamps; current UTC year when unset
    pub year: Option<i32>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            redirect_aura_spell_id: DEFAULT_REDIRECT_AURA_SPELL_ID,
            redirect_heal_spell_id: DEFAULT_REDIRECT_HEAL_SPELL_ID,
            year: None,
        }
    }
}

/// `[scoring]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Removed-spell ids that earn dispel points
    pub hi_pri_dispel_ids: HashSet<i32>,
    /// Healers the raid's incoming damage is split between
    pub assumed_healer_count: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            hi_pri_dispel_ids: HashSet::new(),
            assumed_healer_count: DEFAULT_ASSUMED_HEALER_COUNT,
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Owner identity recorded on every upload
    pub owner: String,
    pub max_upload_bytes: usize,
    pub cache_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            owner: DEFAULT_OWNER.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

/// `[storage]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for JSON report files; reports stay in memory when unset
    pub data_dir: Option<PathBuf>,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl Config {
    /// Load from `path`, or from `healparser.toml` in the working directory
    /// when no path is given. A missing default file yields the defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !explicit && !path.exists() {
            tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|e| match e {
            ConfigError::TomlParse { source, .. } => ConfigError::TomlParse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;

        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::TomlParse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "server.port",
                value: "0".to_string(),
                expected: "1..=65535",
            });
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "server.max_upload_bytes",
                value: "0".to_string(),
                expected: "a positive byte count",
            });
        }
        if self.server.cache_ttl_secs == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "server.cache_ttl_secs",
                value: "0".to_string(),
                expected: "a positive number of seconds",
            });
        }
        Ok(())
    }
}
