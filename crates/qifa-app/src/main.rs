//! # qifa
//!
//! Headless host for the Qifa application store. It opens the local
//! database, activates the provider for the stored mode, restores the
//! provider session and then follows the community feed until Ctrl+C.

use anyhow::Context;
use tracing::info;

use qifa_app::{AppConfig, AppStore};
use qifa_shared::AdviceScope;
use qifa_store::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    qifa_app::init_tracing();
    info!("Starting Qifa v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 1. Configuration and local storage
    // -----------------------------------------------------------------------
    let mut config = AppConfig::from_env();
    info!(
        mode = %config.initial_mode,
        china_configured = config.leancloud.is_some(),
        poll_secs = config.poll_interval.as_secs(),
        "Loaded configuration"
    );

    let db = match &config.data_dir {
        Some(dir) => Database::open_in(dir),
        None => Database::new(),
    }
    .context("failed to open local database")?;
    info!(path = ?db.path(), "Local database ready");
    if config.data_dir.is_none() {
        config.data_dir = db.path().and_then(|p| p.parent().map(|dir| dir.to_path_buf()));
    }

    // -----------------------------------------------------------------------
    // 2. Application store
    // -----------------------------------------------------------------------
    let mut store = AppStore::open(db, config.provider_registry(), config.initial_mode).await;
    let state = store.state();
    info!(
        mode = %state.server_mode,
        provider = ?state.provider_status,
        authenticated = state.is_authenticated(),
        guest = state.is_guest,
        tasks = state.tasks.len(),
        progress = store.progress(None),
        "Store opened"
    );

    if let Some(advice) = store.smart_advice(AdviceScope::Home) {
        info!(title = %advice.title, items = advice.items.len(), "{}", advice.description);
    }

    // -----------------------------------------------------------------------
    // 3. Follow the feed until shutdown
    // -----------------------------------------------------------------------
    if !store.subscription_active() {
        info!("No active provider feed");
    }
    loop {
        let updated = tokio::select! {
            _ = store.next_feed_update() => true,
            _ = tokio::signal::ctrl_c() => false,
        };
        if !updated {
            info!("Received Ctrl+C, shutting down");
            break;
        }
        info!(posts = store.state().posts.len(), "Feed updated");
    }

    Ok(())
}
