// Worker constants (No magic values)
use std::time::Duration;

/// Transient failures tolerated per TestJob before it is marked ERROR
pub const DEFAULT_MAX_TEST_RETRIES: u32 = 3;

/// Read/transform/write attempts before a version conflict becomes an error
pub const DEFAULT_MAX_UPDATE_ATTEMPTS: usize = 5;

/// A claimed submission without a testing-service id is considered lost after 5 minutes
pub const DEFAULT_SUBMIT_STALE_AFTER_MS: i64 = 5 * 60 * 1000;

/// Interval of the scheduler tick that re-drives unfinished jobs (10s)
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);

/// Shortest accepted tick interval; `tokio::time::interval` rejects zero
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Sleep duration after a failed tick before the next attempt (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);
