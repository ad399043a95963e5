use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::filters::{DEFAULT_MAX_CONDITIONS, DEFAULT_MAX_JSON_BYTES, FilterLimits};
use crate::data::types::IDENTITY_FIELD;
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, APP_NAME, CONFIG_FILE_NAME, DEFAULT_ACTOR, DEFAULT_NOTIFY_CAPACITY,
    SQLITE_DB_FILENAME,
};

// =============================================================================
// File Configuration Types (JSON)
// =============================================================================

/// Database configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub path: Option<String>,
}

/// Filter boundary limits section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FiltersFileConfig {
    pub max_json_bytes: Option<usize>,
    pub max_conditions: Option<usize>,
}

/// Audit configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AuditFileConfig {
    pub identity_field: Option<String>,
    pub notify: Option<bool>,
    pub notify_capacity: Option<usize>,
    pub actor: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub database: Option<DatabaseFileConfig>,
    pub filters: Option<FiltersFileConfig>,
    pub audit: Option<AuditFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Top-level keys this version does not know
    fn unknown_fields(&self) -> Vec<&str> {
        match &self.extra {
            serde_json::Value::Object(map) => map.keys().map(|k| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        let unknown = self.unknown_fields();
        if !unknown.is_empty() {
            tracing::warn!(
                fields = %unknown.join(", "),
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(database) = other.database {
            let current = self.database.get_or_insert_with(DatabaseFileConfig::default);
            if database.path.is_some() {
                tracing::trace!(path = ?database.path, "Merging database.path");
                current.path = database.path;
            }
        }

        if let Some(filters) = other.filters {
            let current = self.filters.get_or_insert_with(FiltersFileConfig::default);
            if filters.max_json_bytes.is_some() {
                tracing::trace!(max = ?filters.max_json_bytes, "Merging filters.max_json_bytes");
                current.max_json_bytes = filters.max_json_bytes;
            }
            if filters.max_conditions.is_some() {
                tracing::trace!(max = ?filters.max_conditions, "Merging filters.max_conditions");
                current.max_conditions = filters.max_conditions;
            }
        }

        if let Some(audit) = other.audit {
            let current = self.audit.get_or_insert_with(AuditFileConfig::default);
            if audit.identity_field.is_some() {
                tracing::trace!(field = ?audit.identity_field, "Merging audit.identity_field");
                current.identity_field = audit.identity_field;
            }
            if audit.notify.is_some() {
                tracing::trace!(notify = ?audit.notify, "Merging audit.notify");
                current.notify = audit.notify;
            }
            if audit.notify_capacity.is_some() {
                tracing::trace!(capacity = ?audit.notify_capacity, "Merging audit.notify_capacity");
                current.notify_capacity = audit.notify_capacity;
            }
            if audit.actor.is_some() {
                tracing::trace!(actor = ?audit.actor, "Merging audit.actor");
                current.actor = audit.actor;
            }
        }

        if other.debug.is_some() {
            self.debug = other.debug;
        }
    }
}

// =============================================================================
// Final Configuration Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub identity_field: String,
    pub notify: bool,
    pub notify_capacity: usize,
    pub actor: String,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub filters: FilterLimits,
    pub audit: AuditConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.coachyard/coachyard.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::from_layers(file_config, cli);
        config.validate()?;

        tracing::debug!(
            database = %config.database.path.display(),
            max_json_bytes = config.filters.max_json_bytes,
            max_conditions = config.filters.max_conditions,
            notify = config.audit.notify,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Layer defaults, merged file config and CLI/env overrides
    fn from_layers(file_config: FileConfig, cli: &CliConfig) -> Self {
        let file_database = file_config.database.unwrap_or_default();
        let file_filters = file_config.filters.unwrap_or_default();
        let file_audit = file_config.audit.unwrap_or_default();

        let path = cli
            .database_path
            .clone()
            .or_else(|| file_database.path.map(|p| expand_path(&p)))
            .unwrap_or_else(default_database_path);

        let filters = FilterLimits {
            max_json_bytes: cli
                .filter_max_json_bytes
                .or(file_filters.max_json_bytes)
                .unwrap_or(DEFAULT_MAX_JSON_BYTES),
            max_conditions: cli
                .filter_max_conditions
                .or(file_filters.max_conditions)
                .unwrap_or(DEFAULT_MAX_CONDITIONS),
        };

        let audit = AuditConfig {
            identity_field: cli
                .audit_identity_field
                .clone()
                .or(file_audit.identity_field)
                .unwrap_or_else(|| IDENTITY_FIELD.to_string()),
            notify: cli.audit_notify.or(file_audit.notify).unwrap_or(true),
            notify_capacity: cli
                .audit_notify_capacity
                .or(file_audit.notify_capacity)
                .unwrap_or(DEFAULT_NOTIFY_CAPACITY),
            actor: cli
                .actor
                .clone()
                .or(file_audit.actor)
                .unwrap_or_else(|| DEFAULT_ACTOR.to_string()),
        };

        // --debug on the CLI wins; the file can only turn it on
        let debug = cli.debug || file_config.debug.unwrap_or(false);

        Self {
            database: DatabaseConfig { path },
            filters,
            audit,
            debug,
        }
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            anyhow::bail!("Configuration error: database.path must not be empty");
        }
        if self.filters.max_json_bytes == 0 {
            anyhow::bail!("Configuration error: filters.max_json_bytes must be greater than 0");
        }
        if self.filters.max_conditions == 0 {
            anyhow::bail!("Configuration error: filters.max_conditions must be greater than 0");
        }
        if self.audit.identity_field.trim().is_empty() {
            anyhow::bail!("Configuration error: audit.identity_field must not be empty");
        }
        if self.audit.notify && self.audit.notify_capacity == 0 {
            anyhow::bail!(
                "Configuration error: audit.notify_capacity must be greater than 0 when notifications are enabled"
            );
        }
        if self.audit.actor.trim().is_empty() {
            anyhow::bail!("Configuration error: audit.actor must not be empty");
        }
        Ok(())
    }
}

/// Get the profile config path (~/.coachyard/coachyard.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Platform data directory, falling back to a local dot folder
fn default_database_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(APP_DOT_FOLDER));
    data_dir.join(SQLITE_DB_FILENAME)
}
