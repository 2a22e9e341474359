// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so timestamps (`created_at`/`updated_at`, the Batch
//! report's elapsed-time math) are deterministic under test.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time for the kernel. Object-safe so callers can
/// hold `Arc<dyn Clock>` without committing to a concrete clock type.
pub trait Clock: Send + Sync {
    /// Current time as Unix seconds.
    fn unix_seconds(&self) -> i64;

    /// Current time as epoch milliseconds.
    fn epoch_ms(&self) -> u64 {
        (self.unix_seconds().max(0) as u64) * 1000
    }
}

/// Real wall-clock time.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Controllable clock for deterministic tests.
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<AtomicI64>,
    // Guards advance() so concurrent advances from multiple test threads
    // can't race on the read-modify-write.
    advance_lock: Arc<Mutex<()>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::at(0)
    }

    pub fn at(unix_seconds: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(unix_seconds)),
            advance_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn set(&self, unix_seconds: i64) {
        self.now.store(unix_seconds, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        let _guard = self.advance_lock.lock();
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn unix_seconds(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
