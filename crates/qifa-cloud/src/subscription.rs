use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use qifa_shared::Post;

/// Receives the whole post collection, newest first, on every update.
pub type PostsCallback = Arc<dyn Fn(Vec<Post>) + Send + Sync>;

/// Handle to a live post feed. Dropping it stops delivery.
pub struct Subscription {
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn the feed task. The task delivers through the [`Gate`] it is
    /// handed so that nothing is delivered once the handle is stopped.
    pub(crate) fn spawn<F, Fut>(make: F) -> Self
    where
        F: FnOnce(Gate) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(make(Gate(active.clone())));
        Self {
            active,
            task: Some(task),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop the feed. No callback starts after this returns.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Delivery guard shared between a [`Subscription`] and its feed task.
#[derive(Clone)]
pub(crate) struct Gate(Arc<AtomicBool>);

impl Gate {
    pub(crate) fn deliver(&self, callback: &PostsCallback, posts: Vec<Post>) -> bool {
        if !self.0.load(Ordering::Acquire) {
            return false;
        }
        callback(posts);
        true
    }
}
