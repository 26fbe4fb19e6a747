//! # Ledger Engines
//!
//! The operations that move stock, sales and client credit together.
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │ SalesLedger          │      │ ReturnsEngine        │
//! │  process / edit      │      │  validate / process  │
//! └─────────┬────────────┘      └──────────┬───────────┘
//!           │  one WriteTx per call        │
//!           ▼                              ▼
//!   ProductRepository::apply_stock_delta   (stock + movement journal)
//!   ClientRepository::apply_credit_delta   (credit balance)
//!   SaleRepository / ReturnRepository      (journal rows)
//!   numbering::next_number                 (V-/R-/F-/D- numbers)
//! ```

pub mod numbering;
pub mod returns;
pub mod sales;

pub use returns::ReturnsEngine;
pub use sales::SalesLedger;

/// Shared setup for the ledger tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use crate::pool::{Database, DbConfig};
    use gestion_core::{CartLine, Client, ClientInput, Product, ProductInput, SaleRequest, SaleUnit};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// A product costing 7.00 DH a piece, 12 pieces per carton.
    pub async fn product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        db.products()
            .insert(&ProductInput {
                name: name.to_string(),
                purchase_price_cents: 700,
                price_retail_cents: price_cents,
                price_wholesale_cents: price_cents,
                price_carton_cents: price_cents * 10,
                pieces_per_carton: 12,
                stock,
                ..Default::default()
            })
            .await
            .unwrap()
    }

    /// Changes a product's carton size, keeping everything else.
    pub async fn repack(db: &Database, product: &Product, pieces_per_carton: i64) {
        db.products()
            .update(
                product.id,
                &ProductInput {
                    name: product.name.clone(),
                    purchase_price_cents: product.purchase_price_cents,
                    price_retail_cents: product.price_retail_cents,
                    price_wholesale_cents: product.price_wholesale_cents,
                    price_carton_cents: product.price_carton_cents,
                    pieces_per_carton,
                    stock: product.stock,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    pub fn carton(product_id: i64, quantity: i64, unit_price_cents: i64) -> CartLine {
        CartLine {
            unit: SaleUnit::Carton,
            ..line(product_id, quantity, unit_price_cents)
        }
    }

    pub async fn client(db: &Database, name: &str) -> Client {
        db.clients()
            .force_add(&ClientInput {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    pub fn line(product_id: i64, quantity: i64, unit_price_cents: i64) -> CartLine {
        CartLine {
            product_id,
            quantity,
            unit: SaleUnit::Retail,
            unit_price_cents,
            purchase_price_cents: None,
        }
    }

    /// A fully cash-paid sale of `cart`.
    pub fn cash_sale(client_id: i64, cart: Vec<CartLine>) -> SaleRequest {
        let total: i64 = cart.iter().map(|l| l.line_total().cents()).sum();
        SaleRequest {
            client_id,
            cart,
            total_cents: total,
            amount_paid_cash_cents: total,
            credit_cents: 0,
            payment_method: Default::default(),
            user_id: Some(1),
        }
    }

    pub async fn stock_of(db: &Database, product_id: i64) -> i64 {
        db.products()
            .get_by_id(product_id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    pub async fn balance_of(db: &Database, client_id: i64) -> i64 {
        db.clients()
            .get(client_id)
            .await
            .unwrap()
            .unwrap()
            .credit_balance_cents
    }

    pub async fn sale_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }
}
