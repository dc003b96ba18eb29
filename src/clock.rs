//! Clock port.
//!
//! Wall-clock access is injected rather than called directly, so tests can
//! freeze time and baseline snapshots get a deterministic timestamp.

use chrono::{DateTime, Utc};

/// A source of wall-clock time for the engine.
///
/// Implementations must be `Send + Sync` since an [`crate::engine::Engine`]
/// may be shared across threads.
pub trait Clock: Send + Sync {
    /// Current wall-clock time, used for `BaselineSnapshot.timestamp`.
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall-clock time via [`chrono::Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always returns the same instant.
///
/// Used in tests so that `diagnose(sql)` is deterministic given identical
/// driver/introspector/store responses.
#[derive(Debug, Clone, Copy)]
pub struct FrozenClock(pub DateTime<Utc>);

impl FrozenClock {
    /// Freeze the clock at a fixed, arbitrary instant.
    pub fn at_epoch_plus_days(days: i64) -> Self {
        let base = DateTime::from_timestamp(0, 0).expect("epoch is representable");
        Self(base + chrono::Duration::days(days))
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
