//! # qifa-app
//!
//! The application state store: one owned [`AppState`] aggregate, the
//! mutation API the presentation layer calls, the wiring between the active
//! cloud provider's post feed and that state, and local persistence of the
//! device-owned slice.

pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod generation;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::AppConfig;
pub use error::AppError;
pub use generation::{GenerationEvent, GenerationRequest, TextGenerator};
pub use state::{AppState, ProviderStatus, SessionPhase};
pub use store::AppStore;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("qifa_app=debug,qifa_cloud=debug,qifa_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
