//! # System Constants
//!
//! Core constants that define the operational boundaries of the OpsDesk
//! aggregation pipeline: persisted column bounds, aggregation keys and the
//! rolling-average parameters.

/// Aggregation keys partitioning the stats table
pub mod aggregation {
    /// The single aggregation key currently in use
    pub const GLOBAL_STATS_KEY: &str = "global";

    /// Weight given to the newest lead-time observation in the rolling average
    pub const LEAD_TIME_SMOOTHING_FACTOR: f64 = 0.2;

    pub const SECONDS_PER_MINUTE: f64 = 60.0;
}

/// Column limits of the `changes` table
pub mod change_limits {
    pub const MAX_ID_LENGTH: usize = 64;
    pub const MAX_TITLE_LENGTH: usize = 256;
    pub const MAX_STATUS_LENGTH: usize = 32;

    /// Lifecycle tag applied when the producer does not supply one
    pub const DEFAULT_STATUS: &str = "OPEN";
}

/// Task queue defaults
pub mod queue {
    /// Queue carrying change ids from the API to the aggregation workers
    pub const PROCESS_CHANGE_QUEUE: &str = "process_change";

    pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: i32 = 30;
    pub const DEFAULT_BATCH_SIZE: i32 = 10;
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
}

/// System-wide identifiers
pub mod system {
    pub const SERVICE_NAME: &str = "opsdesk";
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothing_factor_is_a_fraction() {
        assert!(aggregation::LEAD_TIME_SMOOTHING_FACTOR > 0.0);
        assert!(aggregation::LEAD_TIME_SMOOTHING_FACTOR < 1.0);
    }

    #[test]
    fn test_default_status_fits_column() {
        assert!(change_limits::DEFAULT_STATUS.len() <= change_limits::MAX_STATUS_LENGTH);
    }
}
