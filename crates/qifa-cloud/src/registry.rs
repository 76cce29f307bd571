use std::collections::HashMap;
use std::sync::Arc;

use qifa_shared::ServerMode;

use crate::error::{CloudError, Result};
use crate::provider::Provider;

/// The providers available in this build, keyed by mode.
///
/// A mode without a registered provider is reported as unavailable instead
/// of failing at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ServerMode, Arc<dyn Provider>>,
    unavailable: HashMap<ServerMode, String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) -> &mut Self {
        let mode = provider.mode();
        self.unavailable.remove(&mode);
        self.providers.insert(mode, provider);
        self
    }

    /// Record why `mode` cannot be used.
    pub fn mark_unavailable(&mut self, mode: ServerMode, reason: impl Into<String>) -> &mut Self {
        let reason = reason.into();
        tracing::warn!(%mode, %reason, "provider unavailable");
        self.providers.remove(&mode);
        self.unavailable.insert(mode, reason);
        self
    }

    pub fn get(&self, mode: ServerMode) -> Result<Arc<dyn Provider>> {
        self.providers.get(&mode).cloned().ok_or_else(|| {
            let reason = self
                .unavailable
                .get(&mode)
                .cloned()
                .unwrap_or_else(|| format!("{mode} 未配置"));
            CloudError::Unavailable(reason)
        })
    }

    pub fn is_available(&self, mode: ServerMode) -> bool {
        self.providers.contains_key(&mode)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("available", &self.providers.keys().collect::<Vec<_>>())
            .field("unavailable", &self.unavailable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::realtime::RealtimeProvider;

    #[test]
    fn test_missing_mode_is_unavailable() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(RealtimeProvider::new(
            ServerMode::Global,
            Arc::new(MemoryBackend::new()),
        )));
        registry.mark_unavailable(ServerMode::China, "LeanCloud 未配置");

        assert!(registry.get(ServerMode::Global).is_ok());
        assert!(!registry.is_available(ServerMode::China));
        match registry.get(ServerMode::China) {
            Err(CloudError::Unavailable(reason)) => assert_eq!(reason, "LeanCloud 未配置"),
            _ => panic!("expected unavailable"),
        }
    }
}
