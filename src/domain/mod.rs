//! Persisted domain types and their wire DTOs.
//!
//! Domain types derive `sqlx::FromRow` and are never serialized straight to
//! the wire; each has a distinct `serde` DTO with `camelCase` fields.

mod booking;
mod calendar;
mod session;
mod settings;

pub use booking::*;
pub use calendar::*;
pub use session::*;
pub use settings::*;
