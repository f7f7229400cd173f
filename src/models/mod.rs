//! # Data Models
//!
//! Rows of the two persisted tables, `changes` and `stats`, with their SQL
//! operations. Queries are bound at runtime through `sqlx::query_as` so the
//! crate builds without a live database.

pub mod change;
pub mod stats;

pub use change::{Change, NewChange};
pub use stats::StatsRecord;
