//! Fixtures shared by the command tests.

use std::sync::Arc;

use qifa_cloud::{MemoryBackend, PollingProvider, ProviderRegistry, RealtimeProvider};
use qifa_shared::seed::admin_profile;
use qifa_shared::{ServerMode, UserProfile};

use crate::store::AppStore;

pub const ADMIN_SECRET: &str = "admin-secret";

/// GLOBAL pushes and CHINA polls, both over the same backend.
pub async fn store_with(backend: Arc<MemoryBackend>) -> AppStore {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(RealtimeProvider::new(ServerMode::Global, backend.clone())));
    registry.register(Arc::new(PollingProvider::new(ServerMode::China, backend)));
    AppStore::ephemeral(registry, ServerMode::Global).await
}

pub fn profile(email: &str) -> UserProfile {
    UserProfile {
        name: "Lin".into(),
        email: email.into(),
        program: "Design".into(),
        ..Default::default()
    }
}

/// A fresh backend with the administrator account seeded.
pub fn backend_with_admin() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_account(admin_profile(), ADMIN_SECRET);
    backend
}

/// Store signed in as a new member on `mode`.
pub async fn member_store(backend: Arc<MemoryBackend>, mode: ServerMode, email: &str) -> AppStore {
    let mut store = store_with(backend).await;
    store.switch_server_mode(mode).await;
    store
        .register(profile(email), "secret1")
        .await
        .expect("register member");
    store
}

/// Apply feed deliveries until `done` holds. Panics after two seconds.
pub async fn settle_feed(store: &mut AppStore, done: impl Fn(&AppStore) -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while !done(store) {
            store.next_feed_update().await;
        }
    })
    .await
    .expect("feed did not settle");
}

/// Replays a fixed event script for every request and records the requests.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub script: Vec<Result<crate::GenerationEvent, crate::generation::GenerationError>>,
    pub requests: std::sync::Mutex<Vec<crate::GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<Result<crate::GenerationEvent, crate::generation::GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Default::default(),
        })
    }
}

impl crate::TextGenerator for ScriptedGenerator {
    fn generate(&self, request: crate::GenerationRequest) -> crate::generation::GenerationStream {
        use futures::StreamExt;
        self.requests.lock().unwrap().push(request);
        futures::stream::iter(self.script.clone()).boxed()
    }
}

pub fn text(chunk: &str) -> Result<crate::GenerationEvent, crate::generation::GenerationError> {
    Ok(crate::GenerationEvent::Text { text: chunk.into() })
}
