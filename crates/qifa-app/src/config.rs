//! Runtime configuration loaded from environment variables.
//!
//! Every setting has a default so the dashboard starts with zero
//! configuration; CHINA mode is simply unavailable until LeanCloud
//! credentials are supplied.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use qifa_cloud::{
    LeanCloudBackend, LeanCloudConfig, MemoryBackend, PollingProvider, ProviderRegistry,
    RealtimeProvider,
};
use qifa_shared::constants::POLL_INTERVAL_SECS;
use qifa_shared::ServerMode;

const LEANCLOUD_SESSION_FILE: &str = "leancloud-session.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Mode used when no persisted record exists.
    /// Env: `QIFA_SERVER_MODE` (`GLOBAL` / `CHINA`)
    /// Default: `GLOBAL`
    pub initial_mode: ServerMode,

    /// CHINA-mode credentials.
    /// Env: `QIFA_LEANCLOUD_APP_ID`, `QIFA_LEANCLOUD_APP_KEY`,
    /// `QIFA_LEANCLOUD_SERVER_URL`
    /// Default: `None` (CHINA unavailable).
    pub leancloud: Option<LeanCloudConfig>,

    /// Env: `QIFA_POLL_INTERVAL_SECS`
    /// Default: `30`
    pub poll_interval: Duration,

    /// Directory holding `qifa.db` and the LeanCloud session token.
    /// Env: `QIFA_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            initial_mode: ServerMode::Global,
            leancloud: None,
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(mode) = lookup("QIFA_SERVER_MODE") {
            match mode.parse::<ServerMode>() {
                Ok(parsed) => config.initial_mode = parsed,
                Err(e) => tracing::warn!(value = %mode, error = %e, "Invalid QIFA_SERVER_MODE, using default"),
            }
        }

        let leancloud = LeanCloudConfig {
            app_id: lookup("QIFA_LEANCLOUD_APP_ID").unwrap_or_default(),
            app_key: lookup("QIFA_LEANCLOUD_APP_KEY").unwrap_or_default(),
            server_url: lookup("QIFA_LEANCLOUD_SERVER_URL").unwrap_or_default(),
        };
        if leancloud.is_usable() {
            config.leancloud = Some(leancloud);
        }

        if let Some(secs) = lookup("QIFA_POLL_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(n) if n > 0 => config.poll_interval = Duration::from_secs(n),
                _ => tracing::warn!(value = %secs, "Invalid QIFA_POLL_INTERVAL_SECS, using default"),
            }
        }

        if let Some(dir) = lookup("QIFA_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        config
    }

    /// Where the CHINA backend keeps its session token between runs.
    pub fn leancloud_session_file(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(LEANCLOUD_SESSION_FILE))
    }

    /// Build the provider set: GLOBAL on an in-process realtime store,
    /// CHINA on LeanCloud when credentials are present.
    pub fn provider_registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(RealtimeProvider::new(
            ServerMode::Global,
            Arc::new(MemoryBackend::new()),
        )));

        match &self.leancloud {
            Some(lc) => {
                let mut backend = LeanCloudBackend::new(lc.clone());
                if let Some(path) = self.leancloud_session_file() {
                    backend = backend.with_session_file(path);
                }
                let backend = Arc::new(backend);
                registry.register(Arc::new(
                    PollingProvider::new(ServerMode::China, backend).with_interval(self.poll_interval),
                ));
            }
            None => {
                registry.mark_unavailable(ServerMode::China, "LeanCloud App ID 未配置");
            }
        }
        registry
    }
}
