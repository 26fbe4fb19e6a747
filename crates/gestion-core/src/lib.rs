//! # gestion-core: Pure Business Logic for GestionPro
//!
//! This crate holds the rules of the back-office ledger as pure functions
//! and plain data types. Nothing in here touches the database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       GestionPro Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 GUI shell (caisse, back office)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON lines (stdin/stdout)              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 gestion-backend (commands)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ gestion-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌──────────────────┐  │   │
//! │  │   │  types  │ │  money  │ │ validation │ │ similarity/valu- │  │   │
//! │  │   │ Sale,   │ │ Money,  │ │ carts,     │ │ ation/numbering  │  │   │
//! │  │   │ Return  │ │ TvaRate │ │ returns    │ │                  │  │   │
//! │  │   └─────────┘ └─────────┘ └────────────┘ └──────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            gestion-db (SQLite, repositories, ledger)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Client, Sale, SaleReturn, ...)
//! - [`money`] - Money in centimes and TVA rates in basis points
//! - [`error`] - Domain error types
//! - [`validation`] - Request validation run before any transaction opens
//! - [`similarity`] - Client name folding and fuzzy matching
//! - [`numbering`] - `V-YYYYMMDD-NNNN` style document numbers
//! - [`valuation`] - FIFO / LIFO / average stock valuation over lots
//!
//! ## Example Usage
//!
//! ```rust
//! use gestion_core::money::{Money, TvaRate};
//!
//! let subtotal = Money::from_cents(10_000); // 100.00 DH
//! let tva = subtotal.calculate_tva(TvaRate::from_bps(2000)); // 20 %
//! assert_eq!(tva.cents(), 2_000);
//! ```

pub mod error;
pub mod money;
pub mod numbering;
pub mod similarity;
pub mod types;
pub mod validation;
pub mod valuation;

pub use error::{ClientConflict, CoreError, CoreResult, ValidationError};
pub use money::{Money, TvaRate};
pub use types::*;

/// Id of the walk-in client ("Client de passage").
///
/// The row is created by the first migration and can never carry credit
/// nor be deleted.
pub const WALK_IN_CLIENT_ID: i64 = 1;

/// Maximum lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 200;

/// Maximum quantity on a single cart or return line.
///
/// Catches typing mistakes such as 10000 instead of 10.
pub const MAX_LINE_QUANTITY: i64 = 99_999;

/// Maximum price in centimes (100 000 000 DH) for any unit price or cost.
///
/// With the cart and quantity limits this keeps every line total and cart
/// total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Maximum pieces in one carton.
pub const MAX_PIECES_PER_CARTON: i64 = 10_000;
