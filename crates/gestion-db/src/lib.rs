//! # gestion-db: Storage and Ledger Engines for GestionPro
//!
//! Every SQL statement of the application lives here, on SQLite through
//! sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        GestionPro Data Flow                             │
//! │                                                                         │
//! │  Backend command (sales.process)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   gestion-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │    Ledger     │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  sales.rs     │    │  (embedded)  │  │   │
//! │  │   │               │    │  returns.rs   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  numbering.rs │    │ 001_init.sql │  │   │
//! │  │   │ WriteGate     │    ├───────────────┤    │ ...          │  │   │
//! │  │   │               │◄───│ Repositories  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - connection pool and the [`Database`] handle
//! - [`tx`] - the write gate: one writer at a time, whole transaction
//! - [`migrations`] - embedded schema migrations
//! - [`error`] - database error type
//! - [`repository`] - table-level access
//! - [`ledger`] - sales, edits, returns and document numbering
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gestion_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("gestionpro.db")).await?;
//! let receipt = db.sales_ledger().process(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod tx;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use ledger::{ReturnsEngine, SalesLedger};
pub use pool::{Database, DbConfig, LedgerSettings};
pub use tx::{WriteGate, WriteTx};

// Repository re-exports for convenience
pub use repository::{
    ClientRepository, CreditRepository, DashboardRepository, InvoiceRepository,
    ProductRepository, QuoteRepository, ReturnRepository, SaleRepository, StockLotRepository,
};
