//! # Repository Module
//!
//! Table-level access for GestionPro.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command handler                                                        │
//! │       │   db.products().search("thé", 20)                               │
//! │       ▼                                                                 │
//! │  ProductRepository ── reads on the pool, writes behind the WriteGate    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories that own a stock or credit column also expose associated
//! functions over a `&mut SqliteConnection` (`ProductRepository::apply_stock_delta`,
//! `ClientRepository::apply_credit_delta`). The ledger engines compose them
//! inside a single write transaction.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - catalogue, stock adjustments, movement journal
//! - [`StockLotRepository`] - purchase lots and valuation
//! - [`ClientRepository`] - clients and duplicate detection
//! - [`CreditRepository`] - payments and manual debts
//! - [`SaleRepository`] - sale journal reads
//! - [`ReturnRepository`] - return journal reads
//! - [`InvoiceRepository`] / [`QuoteRepository`] - commercial documents
//! - [`DashboardRepository`] - aggregates

pub mod client;
pub mod credit;
pub mod dashboard;
pub mod invoice;
pub mod lot;
pub mod product;
pub mod quote;
pub mod returns;
pub mod sale;

pub use client::ClientRepository;
pub use credit::CreditRepository;
pub use dashboard::DashboardRepository;
pub use invoice::InvoiceRepository;
pub use lot::StockLotRepository;
pub use product::ProductRepository;
pub use quote::QuoteRepository;
pub use returns::ReturnRepository;
pub use sale::SaleRepository;
