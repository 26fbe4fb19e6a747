//! # GestionPro Backend Entry Point
//!
//! ## Startup Sequence
//! 1. Load configuration (`--config <path>` or the platform default)
//! 2. Initialize tracing on stderr
//! 3. Open the database and apply pending migrations
//! 4. Serve requests from stdin until EOF
//!
//! ## Usage
//! ```bash
//! gestion-backend
//! gestion-backend --config ./gestion.toml
//! GESTION_DB_PATH=./dev.db RUST_LOG=debug gestion-backend
//! ```

use std::path::PathBuf;

use tokio::io::BufReader;
use tracing::info;

use gestion_backend::{init_tracing, ipc, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path_arg(std::env::args().skip(1));
    let config = AppConfig::load(config_path.as_deref())?;

    init_tracing(&config.logging.filter);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        store = %config.store.name,
        "Starting GestionPro backend"
    );

    let state = AppState::open(config).await?;
    info!("Database ready, waiting for requests");

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    ipc::run(&state, stdin, stdout).await?;

    info!("stdin closed, shutting down");
    state.db().close().await;
    Ok(())
}

fn config_path_arg(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => return args.next().map(PathBuf::from),
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    return Some(PathBuf::from(path));
                }
            }
        }
    }
    None
}
