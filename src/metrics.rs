//! Sync metrics: counts of backend writes and failures.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters owned by one reconciler.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    saves: AtomicUsize,
    deletes: AtomicUsize,
    elements_created: AtomicUsize,
    elements_updated: AtomicUsize,
    elements_deleted: AtomicUsize,
    translations_upserted: AtomicUsize,
    element_failures: AtomicUsize,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_save(&self) {
        self.saves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_created(&self, n: usize) {
        self.elements_created.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_updated(&self, n: usize) {
        self.elements_updated.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_deleted(&self, n: usize) {
        self.elements_deleted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_translations(&self, n: usize) {
        self.translations_upserted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_failures(&self, n: usize) {
        self.element_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        let created = self.elements_created.load(Ordering::Relaxed);
        let updated = self.elements_updated.load(Ordering::Relaxed);
        let deleted = self.elements_deleted.load(Ordering::Relaxed);
        let failures = self.element_failures.load(Ordering::Relaxed);

        let attempted = created + updated + deleted + failures;
        let element_success_rate = if attempted > 0 {
            ((attempted - failures) as f64 / attempted as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            saves: self.saves.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            elements_created: created,
            elements_updated: updated,
            elements_deleted: deleted,
            translations_upserted: self.translations_upserted.load(Ordering::Relaxed),
            element_failures: failures,
            element_success_rate,
        }
    }
}

/// Point-in-time snapshot of `SyncMetrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub saves: usize,
    pub deletes: usize,
    pub elements_created: usize,
    pub elements_updated: usize,
    pub elements_deleted: usize,
    pub translations_upserted: usize,
    pub element_failures: usize,
    /// Percentage of element writes that succeeded
    pub element_success_rate: f64,
}

impl MetricsReport {
    /// One-line summary for logs
    pub fn format_summary(&self) -> String {
        format!(
            "Sync metrics: {} saves, {} deletes | elements {} created, {} updated, {} deleted ({:.1}% ok) | {} translations",
            self.saves,
            self.deletes,
            self.elements_created,
            self.elements_updated,
            self.elements_deleted,
            self.element_success_rate,
            self.translations_upserted
        )
    }
}
