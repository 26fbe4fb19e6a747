//! # Application State
//!
//! What every command handler gets: the database handle and the loaded
//! configuration.
//!
//! ## Thread Safety
//! `Database` is a pool plus the write gate, both cheap to clone and safe
//! to share. The configuration is read-only after startup.

use gestion_db::{Database, DbConfig};

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct AppState {
    db: Database,
    config: AppConfig,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState { db, config }
    }

    /// Opens the configured database and applies pending migrations.
    pub async fn open(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_config = config.db_config()?;
        if let Some(dir) = db_config.database_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let db = Database::new(db_config).await?;
        Ok(AppState::new(db, config))
    }

    /// In-memory database with the configuration's ledger settings.
    pub async fn in_memory(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_config = DbConfig {
            ledger: config.ledger_settings(),
            ..DbConfig::in_memory()
        };
        let db = Database::new(db_config).await?;
        Ok(AppState::new(db, config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
