//! # GestionPro Backend
//!
//! The process a GUI shell spawns to reach the ledger.
//!
//! ## Module Organization
//! ```text
//! gestion_backend/
//! ├── lib.rs        ◄─── You are here (logging setup, exports)
//! ├── config.rs     ◄─── AppConfig: defaults → TOML → GESTION_* env
//! ├── state.rs      ◄─── AppState: Database + AppConfig
//! ├── ipc.rs        ◄─── JSON-lines loop on stdin/stdout
//! ├── commands/     ◄─── One handler per command
//! └── error.rs      ◄─── ApiError {code, message, details}
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod ipc;
pub mod state;

use tracing_subscriber::EnvFilter;

pub use config::AppConfig;
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG` wins when set
/// - otherwise `filter` (the `[logging] filter` config key)
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
