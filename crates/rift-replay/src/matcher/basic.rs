//! Stateless matcher: highest rating wins, corpus order breaks ties.

use super::{materialize, select_top, EntryMatcher, RatedEntry, ReplaySessionState, DEFAULT_THRESHOLD};
use crate::entry::ParsedEntry;
use crate::heuristic::{BasicHeuristic, Heuristic};
use crate::model::{NormalizedRequest, ReplayResponse};
use std::sync::Arc;
use tracing::{debug, info};

pub struct BasicEntryMatcher {
    entries: Vec<ParsedEntry>,
    heuristic: Arc<dyn Heuristic>,
    threshold: i64,
}

impl BasicEntryMatcher {
    pub fn new(entries: Vec<ParsedEntry>) -> Self {
        Self::with_heuristic(entries, Arc::new(BasicHeuristic::default()))
    }

    pub fn with_heuristic(entries: Vec<ParsedEntry>, heuristic: Arc<dyn Heuristic>) -> Self {
        info!(entries = entries.len(), "built stateless entry matcher");
        Self {
            entries,
            heuristic,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: i64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn entries(&self) -> &[ParsedEntry] {
        &self.entries
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn heuristic(&self) -> &dyn Heuristic {
        self.heuristic.as_ref()
    }

    /// Rate every entry, in corpus order.
    pub fn rate_all<'a>(&'a self, request: &'a NormalizedRequest) -> impl Iterator<Item = RatedEntry<'a>> + 'a {
        self.entries
            .iter()
            .enumerate()
            .map(move |(index, entry)| RatedEntry {
                index,
                entry,
                rating: self.heuristic.rate(&entry.request, request),
            })
    }
}

impl EntryMatcher for BasicEntryMatcher {
    fn find_top_entry(
        &self,
        request: &NormalizedRequest,
        _state: &dyn ReplaySessionState,
    ) -> Option<ReplayResponse> {
        match select_top(self.rate_all(request), self.threshold) {
            Some(winner) => materialize(winner, request),
            None => {
                debug!(method = %request.method, url = %request.url, "no recorded entry matched");
                None
            }
        }
    }
}
