//! Mutation API of [`crate::AppStore`], one module per concern.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod community;
pub mod resources;
pub mod settings;
pub mod tasks;

pub use chat::ChatTurn;
