//! Request freshness.
//!
//! A request is expired when `timestamp < now - ttl`. A timestamp exactly at
//! the edge of the window is still fresh.

use chrono::Utc;

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Whether `timestamp_ms` is older than `ttl_secs` relative to now.
#[must_use]
pub fn is_expired(timestamp_ms: i64, ttl_secs: u64) -> bool {
    is_expired_at(timestamp_ms, ttl_secs, now_millis())
}

/// Whether `timestamp_ms` is older than `ttl_secs` relative to `now_ms`.
#[must_use]
pub fn is_expired_at(timestamp_ms: i64, ttl_secs: u64, now_ms: i64) -> bool {
    timestamp_ms < window_start(ttl_secs, now_ms)
}

/// The oldest timestamp still accepted at `now_ms`.
#[must_use]
pub fn window_start(ttl_secs: u64, now_ms: i64) -> i64 {
    let ttl_ms = i64::try_from(ttl_secs)
        .unwrap_or(i64::MAX)
        .saturating_mul(1_000);
    now_ms.saturating_sub(ttl_ms)
}
