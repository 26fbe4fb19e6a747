//! # Error Types
//!
//! Domain-specific error types for gestion-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  gestion-core (this file)                                              │
//! │  ├── ValidationError  - malformed input, rejected before any I/O       │
//! │  └── CoreError        - business rule violations, uniqueness           │
//! │                         conflicts, similarity warnings                 │
//! │                                                                         │
//! │  gestion-db                                                            │
//! │  └── DbError          - storage failures, wraps CoreError              │
//! │                                                                         │
//! │  gestion-backend                                                       │
//! │  └── ApiError         - what the GUI shell sees (code + details)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → GUI          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Errors are enum variants carrying the offending ids, never strings
//!    to be parsed back by the caller
//! 2. Business rule violations raised inside a ledger transaction cause a
//!    full rollback
//! 3. `SimilarNameFound` is a soft warning: the caller may resubmit through
//!    the force path

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Client conflict payloads
// =============================================================================

/// Identity of an existing client that blocks an insert or update.
///
/// The GUI offers "use existing client" from these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ClientConflict {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub ice: Option<String>,
}

// =============================================================================
// Core Error
// =============================================================================

/// Business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Client not found: {0}")]
    ClientNotFound(i64),

    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    #[error("Return not found: {0}")]
    ReturnNotFound(i64),

    /// A sale item id that does not belong to the sale being returned.
    #[error("Sale item {sale_item_id} does not belong to sale {sale_id}")]
    SaleItemNotFound { sale_id: i64, sale_item_id: i64 },

    /// Requested quantity exceeds the product's stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: 5 × "Huile Lesieur 1L"
    ///      │
    ///      ▼
    /// stock = 3 (read inside the sale transaction)
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: 12, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole sale rolled back, caisse shows "Stock insuffisant"
    /// ```
    #[error("Insufficient stock for {product_name} (#{product_id}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// The walk-in client cannot carry credit.
    #[error("Credit is not allowed for the walk-in client")]
    CreditNotAllowedForWalkInClient,

    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// A return would bring the returned quantity above what was sold.
    #[error("Over-return on sale item {sale_item_id}: sold {sold}, already returned {already_returned}, requested {requested}")]
    OverReturn {
        sale_item_id: i64,
        sold: i64,
        already_returned: i64,
        requested: i64,
    },

    /// refund_cash + refund_credit differs from the computed refund.
    #[error("Refund split {provided} does not match computed refund {expected} (centimes)")]
    RefundAmountMismatch { expected: i64, provided: i64 },

    /// refund_credit exceeds the credit portion still open on the sale.
    #[error("Credit refund {requested} exceeds remaining credit portion {available} of sale {sale_id} (centimes)")]
    RefundCreditExceedsCredit {
        sale_id: i64,
        available: i64,
        requested: i64,
    },

    /// Editing a sale that already has returns recorded against it.
    #[error("Sale {0} has returns and can no longer be edited")]
    SaleHasReturns(i64),

    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: i64,
        current_status: String,
    },

    /// Another client already uses this (name, phone) pair.
    #[error("Client already exists: {}", .0.name)]
    ClientExists(ClientConflict),

    /// Another client already uses this ICE.
    #[error("ICE already used by client {}", .0.name)]
    IceExists(ClientConflict),

    /// Another client already uses this phone number.
    #[error("Phone already used by client {}", .0.name)]
    PhoneExists(ClientConflict),

    /// Soft warning: clients with a similar name exist.
    #[error("Similar client names found: {}", .candidates.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", "))]
    SimilarNameFound { candidates: Vec<ClientConflict> },

    /// The walk-in client row cannot be deleted or renamed.
    #[error("The walk-in client cannot be modified or deleted")]
    WalkInClientProtected,

    #[error("Document not found: {kind} {id}")]
    DocumentNotFound { kind: String, id: i64 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any transaction opens, so they never have side effects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} appears more than once: {value}")]
    DuplicateEntry { field: String, value: String },

    #[error("{field} does not match: expected {expected}, got {actual}")]
    Mismatch {
        field: String,
        expected: i64,
        actual: i64,
    },
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub fn must_be_positive(field: &str) -> Self {
        ValidationError::MustBePositive {
            field: field.to_string(),
        }
    }

    pub fn must_not_be_negative(field: &str) -> Self {
        ValidationError::MustNotBeNegative {
            field: field.to_string(),
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product_id: 12,
            product_name: "Huile 1L".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Huile 1L (#12): available 3, requested 5"
        );
    }

    #[test]
    fn test_conflict_messages_name_the_existing_client() {
        let conflict = ClientConflict {
            id: 7,
            name: "Ali".to_string(),
            phone: Some("0600000000".to_string()),
            ice: Some("ICE1".to_string()),
        };
        let err = CoreError::IceExists(conflict.clone());
        assert_eq!(err.to_string(), "ICE already used by client Ali");

        let err = CoreError::SimilarNameFound {
            candidates: vec![conflict.clone(), ClientConflict { id: 8, name: "Aly".into(), ..conflict }],
        };
        assert_eq!(err.to_string(), "Similar client names found: Ali, Aly");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");
        assert_eq!(
            ValidationError::must_not_be_negative("amount").to_string(),
            "amount must not be negative"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("cart").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
