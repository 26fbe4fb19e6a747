//! Picks the next free document number inside the inserting transaction.
//!
//! The sequence starts at (numbers issued today) + 1 and is re-checked
//! against existing rows, so a hole left by a deleted document or a
//! clock change never produces a duplicate. The UNIQUE column is the
//! final guard.

use chrono::{Local, NaiveDate};
use sqlx::SqliteConnection;
use tracing::warn;

use crate::error::DbResult;
use gestion_core::numbering::{day_prefix, format_number, DocumentKind};

const MAX_ATTEMPTS: i64 = 50;

/// Table and column a kind of number is stored in.
fn location(kind: DocumentKind) -> (&'static str, &'static str) {
    match kind {
        DocumentKind::Sale => ("sales", "ticket_number"),
        DocumentKind::Return => ("returns", "return_number"),
        DocumentKind::Invoice => ("invoices", "invoice_number"),
        DocumentKind::Quote => ("quotes", "quote_number"),
    }
}

/// Next number for `kind` on today's local date.
pub async fn next_number(conn: &mut SqliteConnection, kind: DocumentKind) -> DbResult<String> {
    next_number_on(conn, kind, Local::now().date_naive()).await
}

pub async fn next_number_on(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    date: NaiveDate,
) -> DbResult<String> {
    let (table, column) = location(kind);
    let prefix = day_prefix(kind, date);

    let count_sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} LIKE ?1");
    let issued: i64 = sqlx::query_scalar(&count_sql)
        .bind(format!("{prefix}%"))
        .fetch_one(&mut *conn)
        .await?;

    let exists_sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE {column} = ?1)");
    for sequence in (issued + 1)..=(issued + MAX_ATTEMPTS) {
        let candidate = format_number(kind, date, sequence);
        let taken: bool = sqlx::query_scalar(&exists_sql)
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await?;
        if !taken {
            return Ok(candidate);
        }
    }

    // Every candidate was taken; continue past the highest sequence issued today.
    let max_sql = format!(
        "SELECT COALESCE(MAX(CAST(SUBSTR({column}, ?2) AS INTEGER)), 0) FROM {table} WHERE {column} LIKE ?1"
    );
    let highest: i64 = sqlx::query_scalar(&max_sql)
        .bind(format!("{prefix}%"))
        .bind(prefix.len() as i64 + 1)
        .fetch_one(&mut *conn)
        .await?;

    let mut sequence = highest.max(issued + MAX_ATTEMPTS) + 1;
    loop {
        let candidate = format_number(kind, date, sequence);
        let taken: bool = sqlx::query_scalar(&exists_sql)
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await?;
        if !taken {
            warn!(number = %candidate, ?kind, "Document sequence exhausted its attempts");
            return Ok(candidate);
        }
        sequence += 1;
    }
}
