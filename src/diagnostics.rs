use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters written by the acquisition lane and the I/O workers, read by the
/// control lane for the status record. Never consulted by a decision.
#[derive(Debug, Default)]
pub struct Diagnostics {
    frames_rejected: AtomicU64,
    frames_dropped: AtomicU64,
    source_starved: AtomicU64,
    actuator_failures: AtomicU64,
    audit_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub frames_rejected: u64,
    pub frames_dropped: u64,
    pub source_starved: u64,
    pub actuator_failures: u64,
    pub audit_failures: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_starved(&self) {
        self.source_starved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_actuator_failure(&self) {
        self.actuator_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audit_failure(&self) {
        self.audit_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            source_starved: self.source_starved.load(Ordering::Relaxed),
            actuator_failures: self.actuator_failures.load(Ordering::Relaxed),
            audit_failures: self.audit_failures.load(Ordering::Relaxed),
        }
    }
}
