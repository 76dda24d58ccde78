//! Sequence-aware matcher.
//!
//! Entries sharing a (method, URL) signature are numbered in corpus order.
//! When the session has seen the live signature `n` times before, the entry
//! numbered `n` gets one extra increment, so repeated identical requests
//! replay their recordings in order. Once the recordings are exhausted no
//! entry is boosted and the first one wins again.

use super::basic::BasicEntryMatcher;
use super::{materialize, select_top, EntryMatcher, RatedEntry, ReplaySessionState};
use crate::entry::ParsedEntry;
use crate::heuristic::Heuristic;
use crate::model::{NormalizedRequest, ReplayResponse, RequestSignature};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SequentialEntryMatcher {
    inner: BasicEntryMatcher,
    positions: Vec<i64>,
}

impl SequentialEntryMatcher {
    pub fn new(entries: Vec<ParsedEntry>) -> Self {
        Self::from_matcher(BasicEntryMatcher::new(entries))
    }

    pub fn with_heuristic(entries: Vec<ParsedEntry>, heuristic: Arc<dyn Heuristic>) -> Self {
        Self::from_matcher(BasicEntryMatcher::with_heuristic(entries, heuristic))
    }

    fn from_matcher(inner: BasicEntryMatcher) -> Self {
        let positions = sequence_positions(inner.entries());
        let repeated = positions.iter().filter(|p| **p > 0).count();
        info!(
            entries = positions.len(),
            repeated, "built sequence-aware entry matcher"
        );
        Self { inner, positions }
    }

    pub fn with_threshold(mut self, threshold: i64) -> Self {
        self.inner = self.inner.with_threshold(threshold);
        self
    }

    pub fn entries(&self) -> &[ParsedEntry] {
        self.inner.entries()
    }

    /// Zero-based position of each entry among entries with the same signature.
    pub fn positions(&self) -> &[i64] {
        &self.positions
    }
}

fn sequence_positions(entries: &[ParsedEntry]) -> Vec<i64> {
    let mut seen: HashMap<RequestSignature, i64> = HashMap::new();
    entries
        .iter()
        .map(|entry| {
            let count = seen.entry(entry.request.signature()).or_insert(0);
            let position = *count;
            *count += 1;
            position
        })
        .collect()
}

impl EntryMatcher for SequentialEntryMatcher {
    fn find_top_entry(
        &self,
        request: &NormalizedRequest,
        state: &dyn ReplaySessionState,
    ) -> Option<ReplayResponse> {
        let occurrence = state.query(request);
        let boost = self.inner.heuristic().increment();
        let rated = self.inner.rate_all(request).map(|rated| {
            if rated.rating > 0 && self.positions[rated.index] == occurrence {
                RatedEntry {
                    rating: rated.rating + boost,
                    ..rated
                }
            } else {
                rated
            }
        });
        match select_top(rated, self.inner.threshold()) {
            Some(winner) => materialize(winner, request),
            None => {
                debug!(
                    method = %request.method,
                    url = %request.url,
                    occurrence,
                    "no recorded entry matched"
                );
                None
            }
        }
    }
}
