//! Rate limiting for `refresh()`
//!
//! The first request in a window arms one commit at `now + interval`; every
//! request until that commit starts is absorbed. A commit clears the armed
//! flag before it snapshots the raw store, so a request arriving during a
//! commit arms the next one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug)]
pub(crate) struct CommitScheduler {
    interval: Duration,
    scheduled: AtomicBool,
    commits: AtomicU64,
    requests: AtomicU64,
}

impl CommitScheduler {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            scheduled: AtomicBool::new(false),
            commits: AtomicU64::new(0),
            requests: AtomicU64::new(0),
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Register a request. True when the caller must schedule the commit.
    pub(crate) fn request(&self) -> bool {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Scheduling failed; let the next request try again
    pub(crate) fn cancel(&self) {
        self.scheduled.store(false, Ordering::Release);
    }

    pub(crate) fn begin_commit(&self) {
        self.scheduled.store(false, Ordering::Release);
    }

    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Acquire)
    }

    pub(crate) fn commits(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }

    pub(crate) fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}
