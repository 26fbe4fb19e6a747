//! # Application Configuration
//!
//! Loaded once at startup and read-only afterwards.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`GESTION_*`)
//! 2. Config file (`gestion.toml` in the platform config dir, or `--config`)
//! 3. Defaults (this file)
//!
//! ## File Format
//! ```toml
//! [database]
//! path = "/srv/gestionpro/gestionpro.db"
//! max_connections = 5
//!
//! [store]
//! name = "Droguerie Atlas"
//! ice = "001525478000032"
//! city = "Fès"
//! currency_code = "MAD"
//!
//! [billing]
//! default_tva_bps = 2000
//!
//! [returns]
//! defective_refund_bps = 10000
//!
//! [logging]
//! filter = "info,gestion=debug,sqlx=warn"
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use gestion_core::TvaRate;
use gestion_db::{DbConfig, LedgerSettings};

const CONFIG_FILE: &str = "gestion.toml";
const DATABASE_FILE: &str = "gestionpro.db";
pub const DEFAULT_LOG_FILTER: &str = "info,gestion=debug,sqlx=warn";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Could not determine the application data directory")]
    NoDataDir,
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub store: StoreSection,
    pub billing: BillingSection,
    pub returns: ReturnsSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Defaults to `gestionpro.db` in the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: 5,
        }
    }
}

/// Printed on receipts and invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub name: String,
    pub ice: Option<String>,
    pub city: Option<String>,
    pub currency_code: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            name: "GestionPro".to_string(),
            ice: None,
            city: None,
            currency_code: "MAD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingSection {
    /// 2000 = 20 %
    pub default_tva_bps: u32,
}

impl Default for BillingSection {
    fn default() -> Self {
        BillingSection {
            default_tva_bps: TvaRate::STANDARD.bps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnsSection {
    /// Share of the price refunded for a defective item. 10000 = full refund.
    pub defective_refund_bps: u32,
}

impl Default for ReturnsSection {
    fn default() -> Self {
        ReturnsSection {
            defective_refund_bps: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directives. `RUST_LOG` wins over this.
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the TOML file, then `GESTION_*` variables, and
    /// validates the result.
    ///
    /// An explicit `path` must exist. The default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => AppConfig::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies environment overrides. `lookup` is `std::env::var` in
    /// production.
    ///
    /// ## Environment Variables
    /// - `GESTION_DB_PATH`, `GESTION_DB_MAX_CONNECTIONS`
    /// - `GESTION_STORE_NAME`, `GESTION_STORE_ICE`, `GESTION_STORE_CITY`
    /// - `GESTION_CURRENCY`
    /// - `GESTION_TVA_BPS`, `GESTION_DEFECTIVE_REFUND_BPS`
    /// - `GESTION_LOG`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("GESTION_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(value) = lookup("GESTION_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_number("GESTION_DB_MAX_CONNECTIONS", &value)?;
        }
        if let Some(name) = lookup("GESTION_STORE_NAME") {
            self.store.name = name;
        }
        if let Some(ice) = lookup("GESTION_STORE_ICE") {
            self.store.ice = Some(ice);
        }
        if let Some(city) = lookup("GESTION_STORE_CITY") {
            self.store.city = Some(city);
        }
        if let Some(code) = lookup("GESTION_CURRENCY") {
            self.store.currency_code = code;
        }
        if let Some(value) = lookup("GESTION_TVA_BPS") {
            self.billing.default_tva_bps = parse_number("GESTION_TVA_BPS", &value)?;
        }
        if let Some(value) = lookup("GESTION_DEFECTIVE_REFUND_BPS") {
            self.returns.defective_refund_bps =
                parse_number("GESTION_DEFECTIVE_REFUND_BPS", &value)?;
        }
        if let Some(filter) = lookup("GESTION_LOG") {
            self.logging.filter = filter;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=32).contains(&self.database.max_connections) {
            return Err(ConfigError::invalid(
                "database.max_connections",
                "must be between 1 and 32",
            ));
        }
        if self.store.name.trim().is_empty() {
            return Err(ConfigError::invalid("store.name", "must not be empty"));
        }
        let code = &self.store.currency_code;
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::invalid(
                "store.currency_code",
                "must be a 3-letter ISO 4217 code",
            ));
        }
        if self.billing.default_tva_bps > 10_000 {
            return Err(ConfigError::invalid(
                "billing.default_tva_bps",
                "must be at most 10000",
            ));
        }
        if self.returns.defective_refund_bps > 10_000 {
            return Err(ConfigError::invalid(
                "returns.defective_refund_bps",
                "must be at most 10000",
            ));
        }
        Ok(())
    }

    /// Configured database path, or the platform default.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        let dirs = project_dirs().ok_or(ConfigError::NoDataDir)?;
        Ok(dirs.data_dir().join(DATABASE_FILE))
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            defective_refund_bps: self.returns.defective_refund_bps,
            default_tva: TvaRate::from_bps(self.billing.default_tva_bps),
        }
    }

    pub fn db_config(&self) -> Result<DbConfig, ConfigError> {
        let mut config =
            DbConfig::new(self.database_path()?).max_connections(self.database.max_connections);
        config.ledger = self.ledger_settings();
        Ok(config)
    }
}

/// Platform config file location.
///
/// - **Linux**: `~/.config/gestionpro/gestion.toml`
/// - **macOS**: `~/Library/Application Support/ma.gestionpro.GestionPro/gestion.toml`
/// - **Windows**: `%APPDATA%\gestionpro\GestionPro\config\gestion.toml`
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("ma", "gestionpro", "GestionPro")
}

fn parse_number(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a number", value)))
}
