//! # Database Migrations
//!
//! Embedded SQL migrations for GestionPro.
//!
//! ## Migration History
//! ```text
//! migrations/sqlite/
//! ├── 001_core_schema.sql       products, clients (+ walk-in seed), sales,
//! │                             sale_items, credit_payments, stock_adjustments
//! ├── 002_returns.sql           returns, return_items; sales.has_returns,
//! │                             sales.original_sale_id, sale_items cost snapshot
//! ├── 003_billing_documents.sql invoices, quotes and their lines
//! ├── 004_stock_lots.sql        stock_lots, stock_movements
//! └── 005_sale_item_units.sql   sale_items.units_per_item
//! ```
//!
//! ## Adding New Migrations
//! 1. Next sequence number, `NNN_description.sql`
//! 2. Additive only: new tables, new columns with defaults
//! 3. **NEVER** edit an applied migration, the checksum is recorded

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations embedded at compile time from `migrations/sqlite`.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns (total_migrations, applied_migrations).
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    // The bookkeeping table does not exist before the first run
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    Ok((total, applied as usize))
}
