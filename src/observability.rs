use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObservabilitySnapshot {
    pub requests: u64,
    pub validation_rejected: u64,
    pub rate_limited: u64,
    pub cache_hits: u64,
    pub upstream_calls: u64,
    pub upstream_errors: u64,
    pub store_degraded: u64,
}

/// Per-stage counters for the request pipeline. Atomics so the shared
/// gateway never takes a cross-request lock for bookkeeping.
#[derive(Debug, Default)]
pub struct Observability {
    requests: AtomicU64,
    validation_rejected: AtomicU64,
    rate_limited: AtomicU64,
    cache_hits: AtomicU64,
    upstream_calls: AtomicU64,
    upstream_errors: AtomicU64,
    store_degraded: AtomicU64,
}

impl Observability {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_rejected(&self) {
        self.validation_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_call(&self) {
        self.upstream_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_error(&self) {
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_degraded(&self) {
        self.store_degraded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            validation_rejected: self.validation_rejected.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            upstream_calls: self.upstream_calls.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            store_degraded: self.store_degraded.load(Ordering::Relaxed),
        }
    }
}
