//! # Write Transactions
//!
//! Every operation that changes stock, credit or the sales journal runs
//! inside one `WriteTx`.
//!
//! ## Single Writer
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  sales.process ──┐                                                     │
//! │  sales.edit ─────┤        ┌────────────┐       ┌──────────────────┐    │
//! │  returns ────────┼──────► │ WriteGate  │ ────► │ BEGIN            │    │
//! │  adjustStock ────┤ queue  │ (Mutex)    │ one   │   read stock     │    │
//! │  recordPayment ──┘        └────────────┘ at a  │   write rows     │    │
//! │                                          time  │ COMMIT/ROLLBACK  │    │
//! │                                                └──────────────────┘    │
//! │                                                                         │
//! │  Reads go straight to the pool and never wait on the gate.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gate is held from `BEGIN` to `COMMIT`, so a stock level read inside
//! a `WriteTx` cannot change before the same transaction writes it back.
//!
//! ## Scoped Rollback
//! `commit()` consumes the `WriteTx`. Any other exit path (an `?` on a
//! business rule error, a panic) drops it, which rolls the transaction
//! back and releases the gate.

use std::sync::Arc;

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use crate::error::DbResult;

/// Serializes writers across the whole process.
#[derive(Debug, Clone)]
pub struct WriteGate {
    pool: SqlitePool,
    gate: Arc<Mutex<()>>,
}

impl WriteGate {
    pub fn new(pool: SqlitePool) -> Self {
        WriteGate {
            pool,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Waits for the gate, then opens a transaction.
    pub async fn begin(&self) -> DbResult<WriteTx> {
        let guard = Arc::clone(&self.gate).lock_owned().await;
        let tx = self.pool.begin().await?;
        trace!("Write transaction started");
        Ok(WriteTx { tx, _guard: guard })
    }
}

/// An open write transaction holding the gate.
pub struct WriteTx {
    tx: Transaction<'static, Sqlite>,
    _guard: OwnedMutexGuard<()>,
}

impl WriteTx {
    /// The connection statements of this transaction run on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Commits and releases the gate.
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        trace!("Write transaction committed");
        Ok(())
    }
}
