//! Time-related abstractions.
//!
//! `Instant` is Tokio's, so tests can freeze and advance it with
//! `tokio::time::pause`.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{timeout, Duration};
//!
//! # async fn example() {
//! let result = timeout(Duration::from_millis(50), async { 42 }).await;
//! assert_eq!(result.unwrap(), 42);
//! # }
//! ```

pub use tokio::time::{error::Elapsed, interval, sleep, sleep_until, timeout, Instant, Interval};

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch, or 0 if the system clock is before it.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
