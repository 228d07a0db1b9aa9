//! Wall-clock and uptime helpers
//!
//! Simulation timestamps are unix milliseconds; every engine operation
//! takes `now` as a parameter so tests control the clock.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Current unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Record the server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Seconds since startup, zero if never initialized
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}
