// Domain model and the pure rule engines shared by every Qifa crate.

pub mod advice;
pub mod constants;
pub mod error;
pub mod models;
pub mod moderation;
pub mod schedule;
pub mod seed;
pub mod types;

pub use advice::{recommend, AdviceItem, AdviceKind, AdviceScope, SmartAdvice};
pub use error::ValidationError;
pub use models::*;
pub use moderation::{ContentFilter, Verdict};
pub use schedule::infer_due_date;
pub use types::*;
