//! # Client Repository
//!
//! Client CRUD with duplicate detection, and the credit balance primitive.
//!
//! ## Insert Checks
//! ```text
//! add(input)                         force_add(input)
//!   │                                  │
//!   ├─ (name, phone) taken? ─► ClientExists
//!   ├─ ICE taken?           ─► IceExists        same three hard checks
//!   ├─ phone taken?         ─► PhoneExists
//!   │                                  │
//!   ├─ similar name?        ─► SimilarNameFound (soft)   skipped
//!   ▼                                  ▼
//! INSERT                             INSERT
//! ```
//!
//! Conflicts carry the existing client's id, name, phone and ICE so the
//! GUI can offer "use existing client". Checks and insert share one write
//! transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::product::like_pattern;
use crate::tx::WriteGate;
use gestion_core::similarity::find_similar;
use gestion_core::validation::{validate_client, validate_search_query, NormalizedClient};
use gestion_core::{Client, ClientInput, CoreError, WALK_IN_CLIENT_ID};

const SELECT_CLIENT: &str = r#"
    SELECT id, name, phone, address, ice, credit_balance_cents, created_at, updated_at
    FROM clients
"#;

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        ClientRepository { pool, gate }
    }

    /// Creates a client after the uniqueness and similarity checks.
    pub async fn add(&self, input: &ClientInput) -> DbResult<Client> {
        self.insert(input, true).await
    }

    /// Creates a client after the uniqueness checks only.
    ///
    /// Used when the cashier confirmed a `SimilarNameFound` warning.
    pub async fn force_add(&self, input: &ClientInput) -> DbResult<Client> {
        self.insert(input, false).await
    }

    async fn insert(&self, input: &ClientInput, check_similar: bool) -> DbResult<Client> {
        let client = validate_client(input)?;

        debug!(name = %client.name, check_similar, "Adding client");

        let mut tx = self.gate.begin().await?;

        Self::check_conflicts(tx.conn(), &client, None).await?;

        if check_similar {
            let existing = Self::all_named(tx.conn()).await?;
            let candidates: Vec<_> = find_similar(&client.name, &existing, |c| c.name.as_str())
                .into_iter()
                .map(Client::conflict)
                .collect();
            if !candidates.is_empty() {
                debug!(count = candidates.len(), "Similar client names found");
                return Err(CoreError::SimilarNameFound { candidates }.into());
            }
        }

        let now = Utc::now();
        let sql = r#"
            INSERT INTO clients (name, phone, address, ice, credit_balance_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
            RETURNING id, name, phone, address, ice, credit_balance_cents, created_at, updated_at
        "#;
        let created = sqlx::query_as::<_, Client>(sql)
            .bind(&client.name)
            .bind(&client.phone)
            .bind(&client.address)
            .bind(&client.ice)
            .bind(now)
            .fetch_one(tx.conn())
            .await?;

        tx.commit().await?;

        info!(client_id = created.id, name = %created.name, "Client created");
        Ok(created)
    }

    /// Updates name, phone, address and ICE. Re-runs the hard checks,
    /// ignoring the row itself. The balance is never touched here.
    pub async fn update(&self, id: i64, input: &ClientInput) -> DbResult<Client> {
        if id == WALK_IN_CLIENT_ID {
            return Err(CoreError::WalkInClientProtected.into());
        }
        let client = validate_client(input)?;

        let mut tx = self.gate.begin().await?;
        Self::fetch(tx.conn(), id).await?;
        Self::check_conflicts(tx.conn(), &client, Some(id)).await?;

        let sql = r#"
            UPDATE clients SET name = ?2, phone = ?3, address = ?4, ice = ?5, updated_at = ?6
            WHERE id = ?1
            RETURNING id, name, phone, address, ice, credit_balance_cents, created_at, updated_at
        "#;
        let updated = sqlx::query_as::<_, Client>(sql)
            .bind(id)
            .bind(&client.name)
            .bind(&client.phone)
            .bind(&client.address)
            .bind(&client.ice)
            .bind(Utc::now())
            .fetch_one(tx.conn())
            .await?;

        tx.commit().await?;

        debug!(client_id = id, "Client updated");
        Ok(updated)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Client>> {
        let sql = format!("{SELECT_CLIENT} WHERE id = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Client>> {
        let sql = format!("{SELECT_CLIENT} ORDER BY name LIMIT ?1 OFFSET ?2");
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    /// Searches name, phone and ICE.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Client>> {
        let query = validate_search_query(query)?;
        if query.is_empty() {
            return self.list(limit, 0).await;
        }

        let sql = format!(
            "{SELECT_CLIENT}
             WHERE name LIKE ?1 ESCAPE '\\'
                OR phone LIKE ?1 ESCAPE '\\'
                OR ice LIKE ?1 ESCAPE '\\'
             ORDER BY name
             LIMIT ?2"
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(like_pattern(&query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    /// Clients who owe money, largest balance first.
    pub async fn debtors(&self) -> DbResult<Vec<Client>> {
        let sql = format!(
            "{SELECT_CLIENT} WHERE credit_balance_cents > 0 ORDER BY credit_balance_cents DESC"
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    /// Deletes a client. Their sales keep existing with no client.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        if id == WALK_IN_CLIENT_ID {
            return Err(CoreError::WalkInClientProtected.into());
        }

        let mut tx = self.gate.begin().await?;
        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(tx.conn())
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::ClientNotFound(id).into());
        }
        tx.commit().await?;

        info!(client_id = id, "Client deleted");
        Ok(())
    }

    // =========================================================================
    // Transaction primitives
    // =========================================================================

    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Client> {
        let sql = format!("{SELECT_CLIENT} WHERE id = ?1");
        sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::ClientNotFound(id).into())
    }

    /// Adds `delta` to a client's credit balance and returns the new one.
    ///
    /// Positive deltas record debt, negative ones settle it. The walk-in
    /// client never carries credit.
    pub async fn apply_credit_delta(
        conn: &mut SqliteConnection,
        client_id: i64,
        delta: i64,
    ) -> DbResult<i64> {
        if client_id == WALK_IN_CLIENT_ID {
            return Err(CoreError::CreditNotAllowedForWalkInClient.into());
        }

        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE clients
            SET credit_balance_cents = credit_balance_cents + ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING credit_balance_cents
            "#,
        )
        .bind(client_id)
        .bind(delta)
        .bind(Utc::now())
        .fetch_optional(&mut *conn)
        .await?;

        let balance = balance.ok_or(DbError::Domain(CoreError::ClientNotFound(client_id)))?;
        debug!(client_id, delta, balance, "Credit balance moved");
        Ok(balance)
    }

    /// Runs the three hard uniqueness checks in order.
    async fn check_conflicts(
        conn: &mut SqliteConnection,
        client: &NormalizedClient,
        exclude_id: Option<i64>,
    ) -> DbResult<()> {
        let exclude = exclude_id.unwrap_or(0);

        let sql = format!(
            "{SELECT_CLIENT} WHERE name = ?1 AND IFNULL(phone, '') = IFNULL(?2, '') AND id != ?3"
        );
        if let Some(existing) = sqlx::query_as::<_, Client>(&sql)
            .bind(&client.name)
            .bind(&client.phone)
            .bind(exclude)
            .fetch_optional(&mut *conn)
            .await?
        {
            return Err(CoreError::ClientExists(existing.conflict()).into());
        }

        if let Some(ice) = &client.ice {
            let sql = format!("{SELECT_CLIENT} WHERE ice = ?1 AND id != ?2");
            if let Some(existing) = sqlx::query_as::<_, Client>(&sql)
                .bind(ice)
                .bind(exclude)
                .fetch_optional(&mut *conn)
                .await?
            {
                return Err(CoreError::IceExists(existing.conflict()).into());
            }
        }

        if let Some(phone) = &client.phone {
            let sql = format!("{SELECT_CLIENT} WHERE phone = ?1 AND id != ?2");
            if let Some(existing) = sqlx::query_as::<_, Client>(&sql)
                .bind(phone)
                .bind(exclude)
                .fetch_optional(&mut *conn)
                .await?
            {
                return Err(CoreError::PhoneExists(existing.conflict()).into());
            }
        }

        Ok(())
    }

    /// Every client except the walk-in one, for similarity matching.
    async fn all_named(conn: &mut SqliteConnection) -> DbResult<Vec<Client>> {
        let sql = format!("{SELECT_CLIENT} WHERE id != ?1");
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(WALK_IN_CLIENT_ID)
            .fetch_all(&mut *conn)
            .await?;

        Ok(clients)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn client(name: &str, phone: Option<&str>, ice: Option<&str>) -> ClientInput {
        ClientInput {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            address: None,
            ice: ice.map(str::to_string),
        }
    }

    async fn client_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_scenario_e_duplicate_ice() {
        let db = db().await;
        let ali = db.clients().add(&client("Ali", None, Some("ICE1"))).await.unwrap();
        let before = client_count(&db).await;

        let err = db
            .clients()
            .add(&client("Omar", None, Some("ICE1")))
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::IceExists(conflict)) => {
                assert_eq!(conflict.id, ali.id);
                assert_eq!(conflict.name, "Ali");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(client_count(&db).await, before);
    }

    #[tokio::test]
    async fn test_duplicate_phone() {
        let db = db().await;
        db.clients()
            .add(&client("Karim", Some("0661234567"), None))
            .await
            .unwrap();

        let err = db
            .clients()
            .force_add(&client("Samir", Some("0661234567"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::PhoneExists(ref c)) if c.name == "Karim"));
    }

    #[tokio::test]
    async fn test_duplicate_name_phone_pair() {
        let db = db().await;
        db.clients().add(&client("Youssef", None, None)).await.unwrap();

        let err = db
            .clients()
            .force_add(&client("Youssef", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ClientExists(_))));
    }

    #[tokio::test]
    async fn test_similar_name_is_soft() {
        let db = db().await;
        db.clients()
            .add(&client("Hassan", Some("0600000001"), None))
            .await
            .unwrap();

        let err = db
            .clients()
            .add(&client("Hasan", Some("0600000002"), None))
            .await
            .unwrap_err();
        match err {
            DbError::Domain(CoreError::SimilarNameFound { candidates }) => {
                assert_eq!(candidates.len(), 1);
                assert_eq!(candidates[0].name, "Hassan");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let forced = db
            .clients()
            .force_add(&client("Hasan", Some("0600000002"), None))
            .await
            .unwrap();
        assert_eq!(forced.name, "Hasan");
    }

    #[tokio::test]
    async fn test_update_excludes_itself() {
        let db = db().await;
        let c = db
            .clients()
            .add(&client("Nadia", Some("0611111111"), Some("ICE9")))
            .await
            .unwrap();

        let mut changed = client("Nadia", Some("0611111111"), Some("ICE9"));
        changed.address = Some("Rue 12, Fès".to_string());
        let updated = db.clients().update(c.id, &changed).await.unwrap();
        assert_eq!(updated.address.as_deref(), Some("Rue 12, Fès"));
    }

    #[tokio::test]
    async fn test_walk_in_client_protected() {
        let db = db().await;
        let err = db.clients().delete(WALK_IN_CLIENT_ID).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::WalkInClientProtected)));

        let err = db
            .clients()
            .update(WALK_IN_CLIENT_ID, &client("Autre", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::WalkInClientProtected)));
    }

    #[tokio::test]
    async fn test_walk_in_cannot_carry_credit() {
        let db = db().await;
        let mut tx = db.write_gate().begin().await.unwrap();
        let err = ClientRepository::apply_credit_delta(tx.conn(), WALK_IN_CLIENT_ID, 100)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CreditNotAllowedForWalkInClient)
        ));
    }

    #[tokio::test]
    async fn test_search_and_debtors() {
        let db = db().await;
        let c = db
            .clients()
            .add(&client("Fatima Zahra", Some("0622222222"), None))
            .await
            .unwrap();
        db.clients().add(&client("Omar", None, None)).await.unwrap();

        let found = db.clients().search("0622", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, c.id);

        let mut tx = db.write_gate().begin().await.unwrap();
        ClientRepository::apply_credit_delta(tx.conn(), c.id, 5_000)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let debtors = db.clients().debtors().await.unwrap();
        assert_eq!(debtors.len(), 1);
        assert_eq!(debtors[0].credit_balance_cents, 5_000);
    }
}
