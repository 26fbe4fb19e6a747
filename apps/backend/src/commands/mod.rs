//! # Commands Module
//!
//! Every command the GUI shell can send, and the table routing command
//! names to handlers.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (routing)
//! ├── product.rs    ◄─── products.*
//! ├── client.rs     ◄─── clients.*, credits.*
//! ├── sale.rs       ◄─── sales.* (process, edit, returns, history)
//! ├── document.rs   ◄─── invoices.*, quotes.*
//! ├── lot.rs        ◄─── lots.*
//! ├── dashboard.rs  ◄─── dashboard.*
//! ├── dirhams.rs    ◄─── dirham-valued payload keys → centimes
//! └── system.rs     ◄─── system.*
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  {"command":"products.search","payload":{"query":"thé","limit":20}}     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  dispatch() ── "products.search" ──► product::search_products           │
//! │         │          payload → SearchArgs (serde, camelCase)              │
//! │         ▼                                                               │
//! │  async fn search_products(state: &AppState, args: SearchArgs)           │
//! │      -> Result<Vec<Product>, ApiError>                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  serde_json::Value back to the message loop                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod dashboard;
pub mod dirhams;
pub mod document;
pub mod lot;
pub mod product;
pub mod sale;
pub mod system;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// Parses the payload, calls the handler, serializes its result.
/// `rewrite => handler` first passes the raw payload through `rewrite`.
macro_rules! route {
    ($state:expr, $payload:expr, $rewrite:path => $handler:path) => {{
        let mut payload = $payload;
        $rewrite(&mut payload)?;
        reply($handler($state, args(payload)?).await?)
    }};
    ($state:expr, $payload:expr, $handler:path) => {
        reply($handler($state, args($payload)?).await?)
    };
    ($state:expr, $handler:path) => {
        reply($handler($state).await?)
    };
}

/// Runs one command.
///
/// Unknown commands are a `VALIDATION_ERROR`.
pub async fn dispatch(state: &AppState, command: &str, payload: Value) -> Result<Value, ApiError> {
    match command {
        // Products
        "products.search" => route!(state, payload, product::search_products),
        "products.get" => route!(state, payload, product::get_product),
        "products.getByBarcode" => route!(state, payload, product::get_product_by_barcode),
        "products.list" => route!(state, payload, product::list_products),
        "products.create" => route!(state, payload, product::create_product),
        "products.update" => route!(state, payload, product::update_product),
        "products.delete" => route!(state, payload, product::delete_product),
        "products.lowStock" => route!(state, payload, product::low_stock),
        "products.adjustStock" => route!(state, payload, product::adjust_stock),
        "products.movements" => route!(state, payload, product::stock_movements),
        "products.adjustments" => route!(state, payload, product::stock_adjustments),

        // Clients and credit
        "clients.add" => route!(state, payload, client::add_client),
        "clients.forceAdd" => route!(state, payload, client::force_add_client),
        "clients.update" => route!(state, payload, client::update_client),
        "clients.get" => route!(state, payload, client::get_client),
        "clients.list" => route!(state, payload, client::list_clients),
        "clients.search" => route!(state, payload, client::search_clients),
        "clients.debtors" => route!(state, client::debtors),
        "clients.delete" => route!(state, payload, client::delete_client),
        "credits.recordPayment" => route!(state, payload, dirhams::payment => client::record_payment),
        "credits.addManual" => route!(state, payload, dirhams::payment => client::add_manual_credit),
        "credits.history" => route!(state, payload, client::credit_history),

        // Sales and returns
        "sales.process" => route!(state, payload, dirhams::sale => sale::process_sale),
        "sales.edit" => route!(state, payload, dirhams::sale_edit => sale::edit_sale),
        "sales.get" => route!(state, payload, sale::get_sale),
        "sales.getByTicket" => route!(state, payload, sale::get_sale_by_ticket),
        "sales.history" => route!(state, payload, sale::sale_history),
        "sales.processReturn" => route!(state, payload, dirhams::sale_return => sale::process_return),
        "sales.validateReturn" => route!(state, payload, dirhams::sale_return => sale::validate_return),
        "sales.returnableItems" => route!(state, payload, sale::returnable_items),
        "sales.returns" => route!(state, payload, sale::sale_returns),
        "sales.getReturn" => route!(state, payload, sale::get_return),

        // Billing documents
        "invoices.create" => route!(state, payload, document::create_invoice),
        "invoices.get" => route!(state, payload, document::get_invoice),
        "invoices.list" => route!(state, payload, document::list_invoices),
        "invoices.updateStatus" => route!(state, payload, document::update_invoice_status),
        "invoices.delete" => route!(state, payload, document::delete_invoice),
        "quotes.create" => route!(state, payload, document::create_quote),
        "quotes.get" => route!(state, payload, document::get_quote),
        "quotes.list" => route!(state, payload, document::list_quotes),
        "quotes.updateStatus" => route!(state, payload, document::update_quote_status),
        "quotes.delete" => route!(state, payload, document::delete_quote),
        "quotes.convertToInvoice" => route!(state, payload, document::convert_quote),

        // Stock lots
        "lots.receive" => route!(state, payload, lot::receive_lot),
        "lots.list" => route!(state, payload, lot::list_lots),
        "lots.valuation" => route!(state, payload, lot::valuation),

        // Dashboard
        "dashboard.summary" => route!(state, payload, dashboard::summary),
        "dashboard.topProducts" => route!(state, payload, dashboard::top_products),
        "dashboard.lowStock" => route!(state, payload, product::low_stock),
        "dashboard.outstandingCredit" => route!(state, dashboard::outstanding_credit),

        // System
        "system.health" => route!(state, system::health),
        "system.store" => route!(state, system::store_info),

        _ => Err(ApiError::validation(format!("Unknown command: {}", command))),
    }
}

/// Deserializes a payload. A missing payload reads as `{}`.
fn args<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    let payload = match payload {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    Ok(serde_json::from_value(payload)?)
}

fn reply<T: Serialize>(data: T) -> Result<Value, ApiError> {
    serde_json::to_value(data).map_err(|e| ApiError::internal(e.to_string()))
}

// =============================================================================
// Shared argument shapes
// =============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdArgs {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageArgs {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageArgs {
    /// Default 50, at most 500.
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(50).clamp(1, 500)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArgs {
    pub query: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl SearchArgs {
    /// Default 20, at most 100.
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

/// Handlers that return nothing answer `{"success": true}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Done {
    pub success: bool,
}

impl Done {
    pub const OK: Done = Done { success: true };
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::AppConfig;
    use crate::state::AppState;

    pub async fn state() -> AppState {
        AppState::in_memory(AppConfig::default()).await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_command() {
        let state = testing::state().await;
        let err = dispatch(&state, "sales.refund", Value::Null).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("sales.refund"));
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let state = testing::state().await;
        let err = dispatch(&state, "products.get", json!({ "id": "abc" }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.starts_with("Invalid payload"));
    }

    #[tokio::test]
    async fn test_null_payload_reads_as_empty_object() {
        let state = testing::state().await;
        let data = dispatch(&state, "clients.list", Value::Null).await.unwrap();
        // Walk-in client only
        assert_eq!(data.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_page_limits() {
        let page: PageArgs = args(json!({ "limit": 10_000 })).unwrap();
        assert_eq!(page.limit(), 500);
        assert_eq!(page.offset(), 0);
    }
}
