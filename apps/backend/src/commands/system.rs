//! # System Commands

use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub database: bool,
    pub migrations_total: usize,
    pub migrations_applied: usize,
    pub version: &'static str,
}

pub async fn health(state: &AppState) -> Result<Health, ApiError> {
    let database = state.db().health_check().await;
    let (migrations_total, migrations_applied) = state.db().migration_status().await?;
    Ok(Health {
        database,
        migrations_total,
        migrations_applied,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Header printed on tickets and invoices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    pub name: String,
    pub ice: Option<String>,
    pub city: Option<String>,
    pub currency_code: String,
    pub default_tva_bps: u32,
}

pub async fn store_info(state: &AppState) -> Result<StoreInfo, ApiError> {
    let config = state.config();
    Ok(StoreInfo {
        name: config.store.name.clone(),
        ice: config.store.ice.clone(),
        city: config.store.city.clone(),
        currency_code: config.store.currency_code.clone(),
        default_tva_bps: config.billing.default_tva_bps,
    })
}

#[cfg(test)]
mod tests {
    use crate::commands::{dispatch, testing};
    use serde_json::json;

    #[tokio::test]
    async fn test_health() {
        let state = testing::state().await;
        let health = dispatch(&state, "system.health", json!(null)).await.unwrap();
        assert_eq!(health["database"], true);
        assert_eq!(health["migrationsTotal"], health["migrationsApplied"]);
    }

    #[tokio::test]
    async fn test_store_info() {
        let state = testing::state().await;
        let store = dispatch(&state, "system.store", json!(null)).await.unwrap();
        assert_eq!(store["currencyCode"], "MAD");
        assert_eq!(store["defaultTvaBps"], 2000);
    }
}
