//! # Seed Data Generator
//!
//! Populates a database with a demo catalogue, a few clients and a day of
//! sales, for development and screenshots.
//!
//! ## Usage
//! ```bash
//! # Default database, 20 demo sales
//! cargo run -p gestion-db --bin seed
//!
//! # More sales, another file
//! cargo run -p gestion-db --bin seed -- --sales 200 --db ./data/gestionpro.db
//! ```
//!
//! ## Generated Data
//! - Products across grocery categories, each in retail, wholesale and
//!   carton prices, with a barcode `611{category}{index}`
//! - Clients with and without ICE numbers
//! - Cash and part-credit sales through the sales ledger, so stock and
//!   balances stay consistent with the journal

use std::env;

use gestion_core::{
    CartLine, ClientInput, PaymentMethod, Product, ProductInput, SaleRequest, SaleUnit,
    WALK_IN_CLIENT_ID,
};
use gestion_db::{Database, DbConfig};

/// (category, [(name, purchase price in centimes)])
const CATEGORIES: &[(&str, &[(&str, i64)])] = &[
    (
        "Épicerie",
        &[
            ("Sucre en pain 2kg", 1650),
            ("Sucre granulé 1kg", 850),
            ("Farine Mouna 5kg", 3200),
            ("Semoule fine 1kg", 900),
            ("Riz long 1kg", 1400),
            ("Lentilles 1kg", 1600),
            ("Pois chiches 1kg", 1500),
            ("Pâtes Dari 500g", 550),
            ("Sel fin 1kg", 250),
            ("Levure boulangère", 150),
        ],
    ),
    (
        "Boissons",
        &[
            ("Thé vert Sultan 200g", 1450),
            ("Café moulu 250g", 2200),
            ("Eau Sidi Ali 1.5L", 450),
            ("Eau Oulmès 1L", 600),
            ("Jus d'orange 1L", 1100),
            ("Soda cola 1L", 750),
        ],
    ),
    (
        "Crèmerie",
        &[
            ("Lait Centrale 1L", 650),
            ("Beurre 250g", 1800),
            ("Fromage portions x8", 1350),
            ("Yaourt nature x4", 900),
            ("Lben 1L", 700),
        ],
    ),
    (
        "Huiles",
        &[
            ("Huile Lesieur 1L", 1850),
            ("Huile Lesieur 5L", 8900),
            ("Huile d'olive 1L", 6500),
            ("Margarine 500g", 1100),
        ],
    ),
    (
        "Entretien",
        &[
            ("Savon beldi 500g", 1200),
            ("Lessive Tide 1kg", 2400),
            ("Javel 1L", 500),
            ("Liquide vaisselle 750ml", 1300),
            ("Éponges x3", 600),
        ],
    ),
];

const CLIENTS: &[(&str, Option<&str>, Option<&str>)] = &[
    ("Épicerie Al Amal", Some("0661234567"), Some("001525478000032")),
    ("Café Atlas", Some("0522458796"), Some("002145879000054")),
    ("Mohammed Benali", Some("0670112233"), None),
    ("Fatima Zahra Idrissi", None, None),
    ("Snack Chez Hamid", Some("0655443322"), None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut sales: usize = 20;
    let mut db_path = String::from("./gestionpro_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("GestionPro Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>    Number of demo sales (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./gestionpro_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("GestionPro Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Sales:    {}", sales);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    let mut products = Vec::new();
    for (category_idx, (category, items)) in CATEGORIES.iter().enumerate() {
        for (item_idx, (name, purchase)) in items.iter().enumerate() {
            let input = product_input(category, name, *purchase, category_idx, item_idx);
            match db.products().insert(&input).await {
                Ok(product) => products.push(product),
                Err(e) => eprintln!("Failed to insert {}: {}", input.name, e),
            }
        }
    }
    println!("✓ {} products", products.len());

    let mut client_ids = vec![WALK_IN_CLIENT_ID];
    for (name, phone, ice) in CLIENTS {
        let input = ClientInput {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            address: Some("Casablanca".to_string()),
            ice: ice.map(str::to_string),
        };
        match db.clients().add(&input).await {
            Ok(client) => client_ids.push(client.id),
            Err(e) => eprintln!("Failed to insert {}: {}", name, e),
        }
    }
    println!("✓ {} clients", client_ids.len() - 1);

    let mut recorded = 0;
    for n in 0..sales {
        let request = demo_sale(n, &products, &client_ids);
        match db.sales_ledger().process(&request).await {
            Ok(_) => recorded += 1,
            Err(e) => eprintln!("Sale {} skipped: {}", n + 1, e),
        }
    }
    println!("✓ {} sales", recorded);

    let elapsed = start.elapsed();
    println!();
    println!("Seed complete in {:?}", elapsed);
    println!(
        "  Clients owing: {}",
        db.clients().debtors().await?.len()
    );

    Ok(())
}

/// Retail margin 25%, wholesale 15%, carton of 12 at wholesale minus 5%.
fn product_input(
    category: &str,
    name: &str,
    purchase: i64,
    category_idx: usize,
    item_idx: usize,
) -> ProductInput {
    let pieces_per_carton = 12;
    let retail = round_to_ten(purchase * 125 / 100);
    let wholesale = round_to_ten(purchase * 115 / 100);
    let carton = round_to_ten(wholesale * pieces_per_carton * 95 / 100);

    ProductInput {
        barcode: Some(format!("611{:02}{:08}", category_idx, item_idx)),
        name: name.to_string(),
        purchase_price_cents: purchase,
        price_retail_cents: retail,
        price_wholesale_cents: wholesale,
        price_carton_cents: carton,
        pieces_per_carton,
        stock: 20 + ((category_idx * 7 + item_idx * 13) % 180) as i64,
        alert_threshold: 10,
        category: Some(category.to_string()),
    }
}

fn round_to_ten(cents: i64) -> i64 {
    (cents + 5) / 10 * 10
}

/// Deterministic mix: mostly cash at the counter, every fourth sale to a
/// named client on credit for half the total.
fn demo_sale(n: usize, products: &[Product], client_ids: &[i64]) -> SaleRequest {
    let line_count = 1 + n % 4;
    let cart: Vec<CartLine> = (0..line_count)
        .filter_map(|k| products.get((n * 5 + k * 3) % products.len().max(1)))
        .map(|product| {
            let unit = if n % 7 == 0 {
                SaleUnit::Wholesale
            } else {
                SaleUnit::Retail
            };
            CartLine {
                product_id: product.id,
                quantity: 1 + (n % 3) as i64,
                unit,
                unit_price_cents: product.price_for(unit).cents(),
                purchase_price_cents: None,
            }
        })
        .collect();
    let total: i64 = cart.iter().map(|l| l.line_total().cents()).sum();

    let on_credit = n % 4 == 3 && client_ids.len() > 1;
    if on_credit {
        let client_id = client_ids[1 + n % (client_ids.len() - 1)];
        let cash = total / 2;
        SaleRequest {
            client_id,
            cart,
            total_cents: total,
            amount_paid_cash_cents: cash,
            credit_cents: total - cash,
            payment_method: PaymentMethod::Credit,
            user_id: Some(1),
        }
    } else {
        SaleRequest {
            client_id: WALK_IN_CLIENT_ID,
            cart,
            total_cents: total,
            amount_paid_cash_cents: total,
            credit_cents: 0,
            payment_method: PaymentMethod::Cash,
            user_id: Some(1),
        }
    }
}
