//! # Database
//!
//! Postgres pool construction and the embedded schema migrator shared by
//! the stores and the pgmq client.

pub mod connection;
pub mod migrations;

pub use connection::{connect_pool, health_check};
pub use migrations::{run_migrations, MIGRATOR};
