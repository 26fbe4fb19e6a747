//! # Credit Repository
//!
//! Payments against a client's credit balance and manually recorded debt.
//!
//! ```text
//! credit_balance_cents   + credit portion of a sale      (SalesLedger)
//!                        − credit refunded on a return   (ReturnsEngine)
//!                        ± reversal/reapply on edit      (SalesLedger)
//!                        − payment                       record_payment
//!                        + manual debt                   add_manual_credit
//! ```
//!
//! Payments larger than the balance are accepted: the balance goes
//! negative and stands as store credit for the client.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::DbResult;
use crate::repository::client::ClientRepository;
use crate::tx::WriteGate;
use gestion_core::validation::validate_credit_amount;
use gestion_core::{CreditEntry, CreditEntryKind, CreditPaymentRequest};

#[derive(Debug, Clone)]
pub struct CreditRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl CreditRepository {
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        CreditRepository { pool, gate }
    }

    /// Records a payment: balance −= amount, plus a journal row.
    pub async fn record_payment(&self, req: &CreditPaymentRequest) -> DbResult<CreditEntry> {
        validate_credit_amount(req.client_id, req.amount_paid_cents)?;

        let mut tx = self.gate.begin().await?;
        let entry = Self::write_entry(
            tx.conn(),
            req.client_id,
            req.user_id,
            CreditEntryKind::Payment,
            req.amount_paid_cents,
            req.note.as_deref(),
        )
        .await?;
        tx.commit().await?;

        info!(
            client_id = req.client_id,
            amount = req.amount_paid_cents,
            balance = entry.balance_after_cents,
            "Credit payment recorded"
        );
        Ok(entry)
    }

    /// Records a debt not tied to a sale: balance += amount.
    pub async fn add_manual_credit(&self, req: &CreditPaymentRequest) -> DbResult<CreditEntry> {
        validate_credit_amount(req.client_id, req.amount_paid_cents)?;

        let mut tx = self.gate.begin().await?;
        let entry = Self::write_entry(
            tx.conn(),
            req.client_id,
            req.user_id,
            CreditEntryKind::ManualDebt,
            req.amount_paid_cents,
            req.note.as_deref(),
        )
        .await?;
        tx.commit().await?;

        info!(
            client_id = req.client_id,
            amount = req.amount_paid_cents,
            balance = entry.balance_after_cents,
            "Manual debt recorded"
        );
        Ok(entry)
    }

    /// Journal of a client, newest first.
    pub async fn history(&self, client_id: i64) -> DbResult<Vec<CreditEntry>> {
        let entries = sqlx::query_as::<_, CreditEntry>(
            r#"
            SELECT id, client_id, user_id, kind, amount_cents, balance_after_cents, note, created_at
            FROM credit_payments
            WHERE client_id = ?1
            ORDER BY id DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn write_entry(
        conn: &mut SqliteConnection,
        client_id: i64,
        user_id: Option<i64>,
        kind: CreditEntryKind,
        amount_cents: i64,
        note: Option<&str>,
    ) -> DbResult<CreditEntry> {
        let delta = match kind {
            CreditEntryKind::Payment => -amount_cents,
            CreditEntryKind::ManualDebt => amount_cents,
        };
        let balance = ClientRepository::apply_credit_delta(conn, client_id, delta).await?;

        let entry = sqlx::query_as::<_, CreditEntry>(
            r#"
            INSERT INTO credit_payments (
                client_id, user_id, kind, amount_cents, balance_after_cents, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id, client_id, user_id, kind, amount_cents, balance_after_cents, note, created_at
            "#,
        )
        .bind(client_id)
        .bind(user_id)
        .bind(kind)
        .bind(amount_cents)
        .bind(balance)
        .bind(note.map(str::trim).filter(|n| !n.is_empty()))
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(entry)
    }
}
