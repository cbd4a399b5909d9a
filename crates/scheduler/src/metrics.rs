use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct Counters {
    polls: AtomicU64,
    selected: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    commit_errors: AtomicU64,
}

static COUNTERS: Lazy<Counters> = Lazy::new(Counters::default);

fn increment(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn record_poll(selected: usize) {
    increment(&COUNTERS.polls);
    COUNTERS
        .selected
        .fetch_add(selected as u64, Ordering::Relaxed);
}

pub fn record_succeeded() {
    increment(&COUNTERS.succeeded);
}

pub fn record_failed() {
    increment(&COUNTERS.failed);
}

pub fn record_cancelled() {
    increment(&COUNTERS.cancelled);
}

pub fn record_commit_error() {
    increment(&COUNTERS.commit_errors);
}

/// Process-wide totals since start.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerMetricsSnapshot {
    pub polls: u64,
    pub selected: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub commit_errors: u64,
}

pub fn snapshot() -> SchedulerMetricsSnapshot {
    SchedulerMetricsSnapshot {
        polls: COUNTERS.polls.load(Ordering::Relaxed),
        selected: COUNTERS.selected.load(Ordering::Relaxed),
        succeeded: COUNTERS.succeeded.load(Ordering::Relaxed),
        failed: COUNTERS.failed.load(Ordering::Relaxed),
        cancelled: COUNTERS.cancelled.load(Ordering::Relaxed),
        commit_errors: COUNTERS.commit_errors.load(Ordering::Relaxed),
    }
}
