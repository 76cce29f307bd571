//! # qifa-cloud
//!
//! The remote half of the dashboard: one [`Provider`] interface with two
//! implementations that differ only in how the post feed is delivered.
//!
//! - [`RealtimeProvider`] forwards every change pushed by a live document
//!   store.
//! - [`PollingProvider`] fetches once immediately and then on a fixed period.
//!
//! Both are built on a [`RemoteBackend`], the opaque document-store and
//! auth collaborator. [`MemoryBackend`] is an in-process realtime store;
//! [`LeanCloudBackend`] talks to a LeanCloud-compatible REST API.

pub mod backend;
pub mod error;
pub mod leancloud;
pub mod memory;
pub mod polling;
pub mod provider;
pub mod realtime;
pub mod registry;
pub mod subscription;

pub use backend::{RealtimeFeed, RemoteBackend};
pub use error::CloudError;
pub use leancloud::{LeanCloudBackend, LeanCloudConfig};
pub use memory::MemoryBackend;
pub use polling::PollingProvider;
pub use provider::{Delivery, Provider};
pub use realtime::RealtimeProvider;
pub use registry::ProviderRegistry;
pub use subscription::{PostsCallback, Subscription};
