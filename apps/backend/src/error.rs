//! # API Error Type
//!
//! What the GUI shell receives when a command fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  {"id":"…","command":"sales.process","payload":{…}}                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Command handler ── Result<Value, ApiError>                             │
//! │         │                                                               │
//! │         ├── ValidationError ────────────► VALIDATION_ERROR              │
//! │         ├── CoreError::InsufficientStock ► INSUFFICIENT_STOCK + details │
//! │         ├── CoreError::IceExists ────────► ICE_EXISTS + existing client │
//! │         └── DbError::QueryFailed ────────► DATABASE_ERROR (logged)      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  {"id":"…","ok":false,"error":{"code":"…","message":"…","details":…}}   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `details` carries the structured part of the error (offending product,
//! conflicting client) so the shell never parses `message`.

use serde::Serialize;
use serde_json::{json, Value};

use gestion_core::{CoreError, ValidationError};
use gestion_db::DbError;

/// API error returned from command handlers.
///
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for Huile 1L (#12): available 3, requested 5",
///   "details": { "productId": 12, "productName": "Huile 1L", "available": 3, "requested": 5 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    InsufficientStock,
    CreditNotAllowedForWalkInClient,
    InvalidPaymentAmount,
    OverReturn,
    RefundAmountMismatch,
    SaleHasReturns,
    IceExists,
    PhoneExists,
    ClientExists,
    SimilarNameFound,
    BusinessLogic,
    DatabaseError,
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(e) => ApiError::from(e),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            DbError::UniqueViolation { field, value } => ApiError::validation(format!(
                "{} '{}' already exists",
                field, value
            )),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::new(
                    ErrorCode::BusinessLogic,
                    "Record is referenced elsewhere or references a missing record",
                )
            }
            DbError::CheckViolation { message } => {
                tracing::warn!("Check constraint violation: {}", message);
                ApiError::validation(message)
            }
            DbError::Busy(e) => {
                tracing::warn!("Database busy: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database is busy, retry")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", id),
            CoreError::ClientNotFound(id) => ApiError::not_found("Client", id),
            CoreError::SaleNotFound(id) => ApiError::not_found("Sale", id),
            CoreError::ReturnNotFound(id) => ApiError::not_found("Return", id),
            CoreError::DocumentNotFound { kind, id } => ApiError::not_found(&kind, id),
            CoreError::SaleItemNotFound {
                sale_id,
                sale_item_id,
            } => ApiError::new(ErrorCode::NotFound, message)
                .with_details(json!({ "saleId": sale_id, "saleItemId": sale_item_id })),

            CoreError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            } => ApiError::new(ErrorCode::InsufficientStock, message).with_details(json!({
                "productId": product_id,
                "productName": product_name,
                "available": available,
                "requested": requested,
            })),
            CoreError::CreditNotAllowedForWalkInClient => {
                ApiError::new(ErrorCode::CreditNotAllowedForWalkInClient, message)
            }
            CoreError::InvalidPaymentAmount { .. } => {
                ApiError::new(ErrorCode::InvalidPaymentAmount, message)
            }

            CoreError::OverReturn {
                sale_item_id,
                sold,
                already_returned,
                requested,
            } => ApiError::new(ErrorCode::OverReturn, message).with_details(json!({
                "saleItemId": sale_item_id,
                "sold": sold,
                "alreadyReturned": already_returned,
                "requested": requested,
            })),
            CoreError::RefundAmountMismatch { expected, provided } => {
                ApiError::new(ErrorCode::RefundAmountMismatch, message)
                    .with_details(json!({ "expected": expected, "provided": provided }))
            }
            CoreError::RefundCreditExceedsCredit {
                sale_id,
                available,
                requested,
            } => ApiError::new(ErrorCode::InvalidPaymentAmount, message).with_details(json!({
                "saleId": sale_id,
                "available": available,
                "requested": requested,
            })),
            CoreError::SaleHasReturns(sale_id) => ApiError::new(ErrorCode::SaleHasReturns, message)
                .with_details(json!({ "saleId": sale_id })),
            CoreError::InvalidSaleStatus {
                sale_id,
                current_status,
            } => ApiError::new(ErrorCode::BusinessLogic, message)
                .with_details(json!({ "saleId": sale_id, "status": current_status })),

            CoreError::ClientExists(existing) => {
                ApiError::new(ErrorCode::ClientExists, message).with_details(json!(existing))
            }
            CoreError::IceExists(existing) => {
                ApiError::new(ErrorCode::IceExists, message).with_details(json!(existing))
            }
            CoreError::PhoneExists(existing) => {
                ApiError::new(ErrorCode::PhoneExists, message).with_details(json!(existing))
            }
            CoreError::SimilarNameFound { candidates } => {
                ApiError::new(ErrorCode::SimilarNameFound, message)
                    .with_details(json!({ "candidates": candidates }))
            }
            CoreError::WalkInClientProtected => ApiError::new(ErrorCode::BusinessLogic, message),

            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Malformed payloads.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::validation(format!("Invalid payload: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use gestion_core::ClientConflict;

    #[test]
    fn test_insufficient_stock_carries_product() {
        let err = ApiError::from(DbError::Domain(CoreError::InsufficientStock {
            product_id: 4,
            product_name: "Sucre 2kg".to_string(),
            available: 1,
            requested: 3,
        }));

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        let details = err.details.unwrap();
        assert_eq!(details["productId"], 4);
        assert_eq!(details["requested"], 3);
    }

    #[test]
    fn test_conflicts_carry_existing_client() {
        let existing = ClientConflict {
            id: 9,
            name: "Café Atlas".to_string(),
            phone: Some("0522458796".to_string()),
            ice: Some("002145879000054".to_string()),
        };
        let err = ApiError::from(CoreError::IceExists(existing));
        assert_eq!(err.code, ErrorCode::IceExists);
        assert_eq!(err.details.unwrap()["id"], 9);
    }

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::from(ValidationError::required("cart"));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "VALIDATION_ERROR");
        assert_eq!(value["message"], "cart is required");
        assert!(value.get("details").is_none());

        let err = ApiError::from(CoreError::CreditNotAllowedForWalkInClient);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "CREDIT_NOT_ALLOWED_FOR_WALK_IN_CLIENT");
    }

    #[test]
    fn test_storage_errors_hide_sql() {
        let err = ApiError::from(DbError::QueryFailed("no such table: salez".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("salez"));
    }
}
