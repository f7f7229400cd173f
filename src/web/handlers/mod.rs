//! HTTP request handlers grouped by resource.

pub mod changes;
pub mod health;
pub mod metrics;
pub mod stats;
