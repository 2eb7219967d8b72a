//! Configuration for the group system.
//!
//! Maps directly to `legend-groups.toml`. Every section and field has a
//! default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GroupError, Result};

/// Environment variable that overrides `database.url`.
pub const DATABASE_URL_ENV: &str = "LEGEND_GROUPS_DATABASE_URL";

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GroupsConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Group defaults.
    #[serde(default)]
    pub groups: GroupDefaults,
    /// Cache sizing.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Language and message catalog settings.
    #[serde(default)]
    pub language: LanguageConfig,
    /// Rank sign settings.
    #[serde(default)]
    pub signs: SignConfig,
    /// Membership expiry settings.
    #[serde(default)]
    pub expiry: ExpiryConfig,
}

impl GroupsConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `GroupError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| GroupError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Apply environment overrides (currently only [`DATABASE_URL_ENV`]).
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
        self
    }

    /// Reject settings that cannot work at runtime.
    ///
    /// # Errors
    /// Returns `GroupError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(GroupError::Config("database.max_connections must be at least 1".into()));
        }
        if self.cache.prefix_capacity == 0 || self.cache.language_capacity == 0 {
            return Err(GroupError::Config("cache capacities must be at least 1".into()));
        }
        if self.language.default_code.trim().is_empty() {
            return Err(GroupError::Config("language.default_code must not be empty".into()));
        }
        if !(self.signs.view_distance > 0.0) {
            return Err(GroupError::Config("signs.view_distance must be positive".into()));
        }
        if self.signs.refresh_interval_ticks == 0 {
            return Err(GroupError::Config("signs.refresh_interval_ticks must be at least 1".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// PostgreSQL over a connection pool.
    #[default]
    Postgres,
    /// Embedded SQLite file.
    Sqlite,
}

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: Backend,
    /// PostgreSQL connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,
    /// User name; overrides any user in the URL when set.
    #[serde(default)]
    pub user: Option<String>,
    /// Password; overrides any password in the URL when set.
    #[serde(default)]
    pub password: Option<String>,
    /// PostgreSQL schema holding the tables.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    /// SQLite database file (backend = "sqlite").
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
    /// Use WAL mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            url: default_database_url(),
            user: None,
            password: None,
            schema: default_schema(),
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
            sqlite_path: default_sqlite_path(),
            wal_mode: true,
        }
    }
}

/// Group defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDefaults {
    /// Group new players join on first login.
    #[serde(default = "default_group")]
    pub default_group: String,
    /// Prefix shown for players without any group.
    #[serde(default = "default_none_prefix")]
    pub none_prefix: String,
}

impl Default for GroupDefaults {
    fn default() -> Self {
        Self {
            default_group: default_group(),
            none_prefix: default_none_prefix(),
        }
    }
}

/// Cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum cached player prefixes.
    #[serde(default = "default_cache_capacity")]
    pub prefix_capacity: usize,
    /// Maximum cached player languages.
    #[serde(default = "default_cache_capacity")]
    pub language_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix_capacity: default_cache_capacity(),
            language_capacity: default_cache_capacity(),
        }
    }
}

/// A language seeded into an empty language table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSeed {
    /// Display name.
    pub name: String,
    /// Catalog code.
    pub code: String,
}

/// Language and message catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Language used when a player has not chosen one.
    #[serde(default = "default_language_code")]
    pub default_code: String,
    /// Directory with `messages-<code>.toml` overrides.
    #[serde(default)]
    pub messages_dir: Option<PathBuf>,
    /// Languages inserted when the language table is empty.
    #[serde(default = "default_seed_languages")]
    pub seed: Vec<LanguageSeed>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            default_code: default_language_code(),
            messages_dir: None,
            seed: default_seed_languages(),
        }
    }
}

/// Rank sign settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignConfig {
    /// Players within this many blocks see sign updates.
    #[serde(default = "default_view_distance")]
    pub view_distance: f64,
    /// Server ticks between sign refreshes.
    #[serde(default = "default_refresh_ticks")]
    pub refresh_interval_ticks: u64,
}

impl Default for SignConfig {
    fn default() -> Self {
        Self {
            view_distance: default_view_distance(),
            refresh_interval_ticks: default_refresh_ticks(),
        }
    }
}

/// Membership expiry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryConfig {
    /// Seconds between background sweeps; `0` disables the sweeper.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_database_url() -> String { "postgres://localhost:5432/postgres".to_string() }
fn default_schema() -> String { "group".to_string() }
fn default_sqlite_path() -> PathBuf { PathBuf::from("legend-groups.db") }
fn default_group() -> String { "default".to_string() }
fn default_none_prefix() -> String { "&4none".to_string() }
fn default_language_code() -> String { "en".to_string() }
fn default_seed_languages() -> Vec<LanguageSeed> {
    vec![
        LanguageSeed { name: "English".to_string(), code: "en".to_string() },
        LanguageSeed { name: "Deutsch".to_string(), code: "de".to_string() },
    ]
}
fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 10 }
fn default_cache_capacity() -> usize { 1024 }
fn default_view_distance() -> f64 { 128.0 }
fn default_refresh_ticks() -> u64 { 50 }
fn default_sweep_interval() -> u64 { 60 }
