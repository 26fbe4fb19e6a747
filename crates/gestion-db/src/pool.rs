//! # Store Database Handle
//!
//! Opens the SQLite store file and hands out repositories and ledger engines.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Handle                                    │
//! │                                                                         │
//! │  Backend startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← pool sizes, timeouts, ledger settings           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← pool + migrations + write gate          │
//! │       │                                                                 │
//! │       ├── db.products() / clients() / credits() / lots()  repositories │
//! │       ├── db.sales_ledger() / returns()                   engines      │
//! │       └── db.invoices() / quotes() / dashboard()          documents    │
//! │                                                                         │
//! │  One Database per process. Clones share the pool and the gate.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## SQLite settings
//! - WAL journal: readers never block the single writer
//! - NORMAL synchronous
//! - Foreign keys enabled (off by default in SQLite)

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use gestion_core::TvaRate;

use crate::error::{DbError, DbResult};
use crate::ledger::returns::ReturnsEngine;
use crate::ledger::sales::SalesLedger;
use crate::migrations;
use crate::repository::client::ClientRepository;
use crate::repository::credit::CreditRepository;
use crate::repository::dashboard::DashboardRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::lot::StockLotRepository;
use crate::repository::product::ProductRepository;
use crate::repository::quote::QuoteRepository;
use crate::repository::returns::ReturnRepository;
use crate::repository::sale::SaleRepository;
use crate::tx::WriteGate;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Business settings the ledger needs at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Share of the price refunded for a DEFECTIVE returned item, in bps.
    pub defective_refund_bps: u32,
    /// TVA rate used when an invoice or quote does not name one.
    pub default_tva: TvaRate,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            defective_refund_bps: 10_000,
            default_tva: TvaRate::STANDARD,
        }
    }
}

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/gestionpro.db")
///     .max_connections(4)
///     .defective_refund_bps(5000);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Default: 5. Readers share these, the writer takes one at a time.
    pub max_connections: u32,

    pub min_connections: u32,

    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps them open.
    pub idle_timeout: Option<Duration>,

    /// Whether to run migrations on connect.
    pub run_migrations: bool,

    pub ledger: LedgerSettings,
}

impl DbConfig {
    /// Creates a configuration for a database file, created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
            ledger: LedgerSettings::default(),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn defective_refund_bps(mut self, bps: u32) -> Self {
        self.ledger.defective_refund_bps = bps;
        self
    }

    pub fn default_tva(mut self, rate: TvaRate) -> Self {
        self.ledger.default_tva = rate;
        self
    }

    /// Creates an in-memory database configuration (for tests).
    ///
    /// A single connection that never idles out: an in-memory database
    /// lives exactly as long as its connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            run_migrations: true,
            ledger: LedgerSettings::default(),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(MEMORY_PATH)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository and engine access.
///
/// Built once at process start and passed by reference to whatever needs
/// it. There is no global connection.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    gate: WriteGate,
    settings: LedgerSettings,
}

impl Database {
    /// Opens the pool, applies pending migrations and sets up the gate.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening store database"
        );

        let base_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };
        let connect_options = base_options
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        debug!(in_memory = config.is_in_memory(), "SQLite options ready");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);
        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None::<Duration>);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            gate: WriteGate::new(pool.clone()),
            pool,
            settings: config.ledger,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies all pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Applying schema migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Schema up to date");
        Ok(())
    }

    /// Returns (total, applied) migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// The connection pool, for reads not covered by a repository.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn write_gate(&self) -> &WriteGate {
        &self.gate
    }

    pub fn settings(&self) -> LedgerSettings {
        self.settings
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.gate.clone())
    }

    pub fn lots(&self) -> StockLotRepository {
        StockLotRepository::new(self.pool.clone(), self.gate.clone())
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone(), self.gate.clone())
    }

    pub fn credits(&self) -> CreditRepository {
        CreditRepository::new(self.pool.clone(), self.gate.clone())
    }

    /// Read side of the sales journal.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// `process` and `edit` of sales.
    pub fn sales_ledger(&self) -> SalesLedger {
        SalesLedger::new(self.gate.clone())
    }

    /// Read side of returns.
    pub fn return_records(&self) -> ReturnRepository {
        ReturnRepository::new(self.pool.clone())
    }

    /// `validate` and `process` of returns.
    pub fn returns(&self) -> ReturnsEngine {
        ReturnsEngine::new(self.gate.clone(), self.settings.defective_refund_bps)
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone(), self.gate.clone(), self.settings.default_tva)
    }

    pub fn quotes(&self) -> QuoteRepository {
        QuoteRepository::new(self.pool.clone(), self.gate.clone(), self.settings.default_tva)
    }

    pub fn dashboard(&self) -> DashboardRepository {
        DashboardRepository::new(self.pool.clone())
    }

    /// Closes the pool. Every later operation fails.
    pub async fn close(&self) {
        info!("Closing store database");
        self.pool.close().await;
    }

    /// Checks that the database answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
