//! Plumbing between provider feed callbacks and the store.
//!
//! Provider callbacks run on their own tasks and never touch [`AppState`]
//! directly. They publish a [`FeedEvent`] tagged with the subscription
//! generation into a single-slot watch channel, so a burst of deliveries
//! between two drains collapses into the newest snapshot. The store applies
//! only events from the current generation; a feed torn down by a mode switch
//! can never overwrite the new mode's posts.
//!
//! [`AppState`]: crate::state::AppState

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use qifa_cloud::PostsCallback;
use qifa_shared::Post;

#[derive(Debug, Clone, Default)]
pub struct FeedEvent {
    pub generation: u64,
    pub posts: Vec<Post>,
}

pub struct FeedChannel {
    tx: Arc<watch::Sender<FeedEvent>>,
    rx: watch::Receiver<FeedEvent>,
    generation: Arc<AtomicU64>,
}

impl FeedChannel {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(FeedEvent::default());
        Self {
            tx: Arc::new(tx),
            rx,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate every callback handed out so far.
    pub fn advance(&mut self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// A callback bound to the current generation. Once the channel advances
    /// it stops publishing.
    pub fn callback(&self) -> PostsCallback {
        let tx = Arc::clone(&self.tx);
        let current = Arc::clone(&self.generation);
        let generation = self.generation();
        Arc::new(move |posts| {
            if current.load(Ordering::Acquire) != generation {
                tracing::debug!(stale = generation, "dropping stale feed delivery");
                return;
            }
            tx.send_replace(FeedEvent { generation, posts });
        })
    }

    /// Latest unseen snapshot of the current generation, if any.
    pub fn drain(&mut self) -> Option<Vec<Post>> {
        if !self.rx.has_changed().unwrap_or(false) {
            return None;
        }
        let current = self.generation();
        let event = self.rx.borrow_and_update();
        if event.generation == current {
            Some(event.posts.clone())
        } else {
            tracing::debug!(stale = event.generation, current, "dropping stale feed event");
            None
        }
    }

    /// Wait for the next snapshot of the current generation.
    pub async fn next(&mut self) -> Vec<Post> {
        loop {
            // `self.tx` keeps the channel open, so `changed` only fails if
            // the sender was dropped, which cannot happen while `self` lives.
            if self.rx.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
            let current = self.generation();
            let event = self.rx.borrow_and_update();
            if event.generation == current {
                return event.posts.clone();
            }
        }
    }
}

impl Default for FeedChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str) -> Post {
        qifa_shared::PostDraft {
            author_id: "a".into(),
            author_name: "A".into(),
            author_role: Default::default(),
            title: "t".into(),
            content: "c".into(),
        }
        .into_post(id.into(), 1)
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let mut feed = FeedChannel::new();
        let old = feed.callback();
        feed.advance();
        let current = feed.callback();

        old(vec![]);
        assert!(feed.drain().is_none());

        current(vec![]);
        old(vec![post("stale")]);
        assert_eq!(feed.drain(), Some(vec![]));
    }

    #[test]
    fn test_drain_keeps_only_latest() {
        let mut feed = FeedChannel::new();
        let cb = feed.callback();

        cb(vec![]);
        cb(vec![post("p")]);
        assert_eq!(feed.drain(), Some(vec![post("p")]));
        assert!(feed.drain().is_none());
    }

    #[test]
    fn test_undrained_burst_holds_one_snapshot() {
        let mut feed = FeedChannel::new();
        let cb = feed.callback();

        for i in 0..10_000 {
            cb(vec![post(&format!("p{i}"))]);
        }
        assert_eq!(feed.drain(), Some(vec![post("p9999")]));
        assert!(feed.drain().is_none());
    }

    #[tokio::test]
    async fn test_next_waits_for_current_generation() {
        let mut feed = FeedChannel::new();
        let old = feed.callback();
        feed.advance();
        let current = feed.callback();

        let handle = tokio::spawn(async move {
            tokio::task::yield_now().await;
            old(vec![post("stale")]);
            current(vec![post("fresh")]);
        });
        let posts = feed.next().await;
        handle.await.unwrap();
        assert_eq!(posts, vec![post("fresh")]);
    }
}
