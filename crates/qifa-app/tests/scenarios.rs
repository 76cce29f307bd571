//! End-to-end flows through the public store API.

use std::sync::Arc;
use std::time::Duration;

use qifa_app::{AppConfig, AppError, AppStore, ProviderStatus};
use qifa_cloud::{MemoryBackend, PollingProvider, ProviderRegistry, RealtimeProvider, RemoteBackend};
use qifa_shared::{
    PostDraft, PreferenceKey, Priority, ServerMode, TaskCategory, TaskStatus, UserProfile, UserRole,
};
use qifa_store::Database;

fn registry(global: Arc<MemoryBackend>, china: Arc<MemoryBackend>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(RealtimeProvider::new(ServerMode::Global, global)));
    registry.register(Arc::new(
        PollingProvider::new(ServerMode::China, china).with_interval(Duration::from_millis(20)),
    ));
    registry
}

fn member(email: &str) -> UserProfile {
    UserProfile {
        name: "Zhang".into(),
        email: email.into(),
        target_city: "Lyon".into(),
        program: "Génie civil".into(),
        ..Default::default()
    }
}

fn draft(title: &str) -> PostDraft {
    PostDraft {
        author_id: "other@x.com".into(),
        author_name: "Other".into(),
        author_role: UserRole::User,
        title: title.into(),
        content: "body".into(),
    }
}

#[tokio::test]
async fn test_guest_task_never_reaches_a_provider() {
    let global = Arc::new(MemoryBackend::new());
    let mut store = AppStore::ephemeral(registry(global.clone(), Arc::new(MemoryBackend::new())), ServerMode::Global).await;

    store.login_as_guest();
    assert!(store.state().is_authenticated());

    let task = store.add_task("办签证", TaskCategory::PreDeparture, "").unwrap();
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.priority, Priority::Medium);
    assert_eq!(task.due_date, None);
    assert_eq!(store.state().tasks, vec![task]);
    assert!(global.list_posts(50).await.unwrap().is_empty());
    assert_eq!(global.current_user().await.unwrap(), None);

    store.logout().await;
    assert!(!store.state().is_authenticated());
    assert!(!store.state().is_guest);
    assert_eq!(store.state().user, UserProfile::default());
}

#[tokio::test]
async fn test_mode_switch_signs_out_and_silences_old_feed() {
    let global = Arc::new(MemoryBackend::new());
    let china = Arc::new(MemoryBackend::new());
    let mut store = AppStore::ephemeral(registry(global.clone(), china.clone()), ServerMode::Global).await;

    store.register(member("zhang@x.com"), "secret1").await.unwrap();
    assert!(store.state().is_authenticated());

    store.switch_server_mode(ServerMode::China).await;
    assert!(!store.state().is_authenticated());
    assert_eq!(store.server_mode(), ServerMode::China);
    assert!(store.subscription_active());
    assert!(store.state().posts.is_empty());

    let leaked = global.insert_post(draft("global only")).await.unwrap();
    let visible = china.insert_post(draft("china only")).await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while !store.state().posts.iter().any(|p| p.id == visible.id) {
            store.next_feed_update().await;
        }
    })
    .await
    .expect("china feed delivered");

    tokio::time::sleep(Duration::from_millis(50)).await;
    store.sync_feed();
    assert!(store.state().posts.iter().all(|p| p.id != leaked.id));
}

#[tokio::test]
async fn test_switching_to_the_same_mode_keeps_the_session() {
    let mut store = AppStore::ephemeral(
        registry(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new())),
        ServerMode::Global,
    )
    .await;
    store.register(member("zhang@x.com"), "secret1").await.unwrap();
    store.switch_server_mode(ServerMode::Global).await;
    assert!(store.state().is_authenticated());
}

#[tokio::test]
async fn test_poll_likes_toggle_without_duplicates() {
    let china = Arc::new(MemoryBackend::new());
    let mut store = AppStore::ephemeral(registry(Arc::new(MemoryBackend::new()), china.clone()), ServerMode::China).await;
    store.register(member("zhang@x.com"), "secret1").await.unwrap();

    let post = store.create_post("求推荐", "里昂的银行").await.unwrap();
    for expected in [true, false, true] {
        assert_eq!(store.toggle_like(&post.id).await.unwrap(), expected);
    }

    let remote = china.list_posts(50).await.unwrap();
    assert_eq!(remote[0].likes, vec!["zhang@x.com".to_string()]);
    assert_eq!(store.state().posts[0].likes, remote[0].likes);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let backends = || registry(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()));

    {
        let db = Database::open_in(dir.path()).unwrap();
        let mut store = AppStore::open(db, backends(), ServerMode::Global).await;
        store.login_as_guest();
        store.add_task("买机票", TaskCategory::PreDeparture, "2025-08-01").unwrap();
        store.toggle_preference(PreferenceKey::DarkMode);
        store.switch_server_mode(ServerMode::China).await;
        store.login_as_guest();
    }

    let db = Database::open_in(dir.path()).unwrap();
    let store = AppStore::open(db, backends(), ServerMode::Global).await;
    let state = store.state();
    assert_eq!(state.server_mode, ServerMode::China);
    assert!(state.is_guest && state.is_authenticated());
    assert_eq!(state.tasks[0].title, "买机票");
    assert_eq!(state.tasks[0].due_date.as_deref(), Some("2025-08-01"));
    assert!(state.preferences.dark_mode);
    assert!(state.posts.is_empty());
}

#[tokio::test]
async fn test_stale_sign_in_is_downgraded_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let global = Arc::new(MemoryBackend::new());

    {
        let db = Database::open_in(dir.path()).unwrap();
        let mut store = AppStore::open(db, registry(global.clone(), Arc::new(MemoryBackend::new())), ServerMode::Global).await;
        store.register(member("zhang@x.com"), "secret1").await.unwrap();
    }

    // Same backend: the provider still holds the session.
    let db = Database::open_in(dir.path()).unwrap();
    let store = AppStore::open(db, registry(global, Arc::new(MemoryBackend::new())), ServerMode::Global).await;
    assert!(store.state().is_authenticated());
    assert_eq!(store.state().user.email, "zhang@x.com");
    drop(store);

    // A backend that never saw this account has no session to restore.
    let db = Database::open_in(dir.path()).unwrap();
    let store = AppStore::open(
        db,
        registry(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new())),
        ServerMode::Global,
    )
    .await;
    assert!(!store.state().is_authenticated());
    assert_eq!(store.state().user, UserProfile::default());
}

#[tokio::test]
async fn test_failed_login_stays_signed_out_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let global = Arc::new(MemoryBackend::new());

    {
        let db = Database::open_in(dir.path()).unwrap();
        let mut store = AppStore::open(db, registry(global.clone(), Arc::new(MemoryBackend::new())), ServerMode::Global).await;
        store.register(member("zhang@x.com"), "secret1").await.unwrap();
        store.login("zhang@x.com", "not-the-password").await.unwrap_err();
    }

    let db = Database::open_in(dir.path()).unwrap();
    let store = AppStore::open(db, registry(global, Arc::new(MemoryBackend::new())), ServerMode::Global).await;
    assert!(!store.state().is_authenticated());
    assert_eq!(store.state().user, UserProfile::default());
}

#[tokio::test]
async fn test_reset_returns_to_fresh_install() {
    let dir = tempfile::tempdir().unwrap();
    let backends = || registry(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()));

    let db = Database::open_in(dir.path()).unwrap();
    let mut store = AppStore::open(db, backends(), ServerMode::Global).await;
    store.login_as_guest();
    store.add_task("x", TaskCategory::Life, "").unwrap();
    store.reset().await;
    assert!(store.state().tasks.is_empty());
    assert!(!store.state().is_authenticated());
    drop(store);

    let db = Database::open_in(dir.path()).unwrap();
    assert!(db.load_snapshot().unwrap().is_none());
}

#[tokio::test]
async fn test_unconfigured_china_mode_is_surfaced_not_fatal() {
    let config = AppConfig::from_lookup(|key| (key == "QIFA_SERVER_MODE").then(|| "CHINA".to_string()));
    assert_eq!(config.initial_mode, ServerMode::China);

    let mut store = AppStore::ephemeral(config.provider_registry(), config.initial_mode).await;
    assert_eq!(
        store.state().provider_status,
        ProviderStatus::Unavailable("LeanCloud App ID 未配置".into())
    );
    assert!(!store.subscription_active());

    let err = store.login("a@x.com", "secret1").await.unwrap_err();
    assert_eq!(err, AppError::ProviderUnavailable("LeanCloud App ID 未配置".into()));

    store.switch_server_mode(ServerMode::Global).await;
    assert_eq!(store.state().provider_status, ProviderStatus::Ready);
}
