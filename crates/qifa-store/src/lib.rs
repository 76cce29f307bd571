//! # qifa-store
//!
//! Durable local storage for the Qifa dashboard. Only the device-owned slice
//! of the application state is kept here: tasks, chat sessions, preferences,
//! the provider mode and the session flags. Remote collections (posts,
//! reports, feedback) are never written.
//!
//! The record is a single JSON document in a SQLite row, so that layout
//! changes stay backwards compatible through serde defaults.

pub mod database;
pub mod migrations;
pub mod snapshot;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use snapshot::PersistedState;
