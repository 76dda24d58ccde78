//! Per-session request counters for sequence-aware matching.

use crate::model::{NormalizedRequest, RequestSignature};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// Mutable state of one replay session.
///
/// Callers must `register` a live request exactly once before matching it.
pub trait ReplaySessionState: Send + Sync {
    fn register(&self, request: &NormalizedRequest);

    /// Zero-based occurrence index of `request`'s signature in this session,
    /// or -1 if it was never registered.
    fn query(&self, request: &NormalizedRequest) -> i64;
}

/// Counts registrations per (method, URL) signature.
///
/// Counters are atomics behind a single map lock; the write lock is taken
/// only the first time a signature is seen.
#[derive(Default)]
pub struct CountingSessionState {
    counts: RwLock<HashMap<RequestSignature, AtomicI64>>,
}

impl CountingSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct signatures registered so far.
    pub fn distinct_requests(&self) -> usize {
        self.counts.read().len()
    }

    pub fn reset(&self) {
        self.counts.write().clear();
    }
}

impl ReplaySessionState for CountingSessionState {
    fn register(&self, request: &NormalizedRequest) {
        let signature = request.signature();
        {
            let counts = self.counts.read();
            if let Some(count) = counts.get(&signature) {
                count.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Another writer may have inserted the key between the two locks.
        self.counts
            .write()
            .entry(signature)
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    fn query(&self, request: &NormalizedRequest) -> i64 {
        let signature = request.signature();
        match self.counts.read().get(&signature) {
            Some(count) => count.load(Ordering::Relaxed) - 1,
            None => {
                debug!(
                    method = %signature.method,
                    url = %signature.url,
                    "request was never registered with the session"
                );
                -1
            }
        }
    }
}

impl fmt::Debug for CountingSessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CountingSessionState")
            .field("distinct_requests", &self.distinct_requests())
            .finish()
    }
}

/// Session state that remembers nothing; every query reports position 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatelessSessionState;

impl ReplaySessionState for StatelessSessionState {
    fn register(&self, _request: &NormalizedRequest) {}

    fn query(&self, _request: &NormalizedRequest) -> i64 {
        0
    }
}
