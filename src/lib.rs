//! Floodgate - request flood protection and Pay2 webhook verification
//!
//! Two independent request-guarding primitives for axum services:
//!
//! # Features
//!
//! - **Anti-flood**: per-actor, per-action attempt counting in one-minute
//!   buckets, shared across instances through a counter store
//! - **Stores**: in-memory (moka) by default, Redis with the `redis` feature
//! - **Pay2 webhooks**: HMAC-SHA256 verification and AES-256-CBC decryption
//!   of the `Pay2-House-Signature` envelope, plus an axum intake route with
//!   idempotent dispatch
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use floodgate::{Actor, AntiFlood, ConfigBuilder, store::build_store};
//!
//! #[tokio::main]
//! async fn main() -> floodgate::Result<()> {
//!     floodgate::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     let store = build_store(&config.store)?;
//!     let antiflood = AntiFlood::new(store, config.antiflood.clone());
//!
//!     if !antiflood.check(&Actor::user("42"), "login", None, None).await? {
//!         // refuse the request
//!     }
//!     Ok(())
//! }
//! ```

pub mod antiflood;
mod config;
mod error;
pub mod store;
pub mod traits;
mod utils;
pub mod webhooks;

// Re-exports for public API
pub use antiflood::{Actor, AntiFlood, AntiFloodConfig, AntiFloodConfigBuilder, Attempt};
pub use config::{Config, ConfigBuilder, LoggingConfig};
pub use error::{FloodgateError, Result};
pub use store::{InMemoryCounterStore, StoreBackend, StoreConfig};
#[cfg(feature = "redis")]
pub use store::RedisCounterStore;
pub use traits::CounterStore;
pub use webhooks::{
    Pay2Config, Pay2Notification, Pay2Verifier, Pay2WebhookState, PaymentEventHandler,
    PaymentStatus, VerificationFailure, pay2_routes,
};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// Call once, early in `main()`.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "antiflood.limited=warn")
/// - `FLOODGATE_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::get_env_with_prefix("LOG_JSON")
        .and_then(|v| utils::parse_flag(&v))
        .unwrap_or(false);

    install_subscriber(env_filter, json_logs);
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    install_subscriber(EnvFilter::new(&config.logging.level), config.logging.json);
}

fn install_subscriber(env_filter: EnvFilter, json: bool) {
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
