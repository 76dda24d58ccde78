//! Ranking of corpus entries against a live request.

mod basic;
mod sequential;
mod session;

pub use basic::BasicEntryMatcher;
pub use sequential::SequentialEntryMatcher;
pub use session::{CountingSessionState, ReplaySessionState, StatelessSessionState};

use crate::entry::ParsedEntry;
use crate::model::{NormalizedRequest, ReplayResponse};
use tracing::{debug, warn};

/// Default exclusive lower bound a rating must exceed to be eligible.
pub const DEFAULT_THRESHOLD: i64 = 0;

/// Selects the recorded entry that best answers a live request.
///
/// `None` means "respond not-found".
pub trait EntryMatcher: Send + Sync {
    fn find_top_entry(
        &self,
        request: &NormalizedRequest,
        state: &dyn ReplaySessionState,
    ) -> Option<ReplayResponse>;
}

/// A corpus entry together with its rating for one live request.
#[derive(Debug, Clone, Copy)]
pub struct RatedEntry<'a> {
    /// Position in corpus order.
    pub index: usize,
    pub entry: &'a ParsedEntry,
    pub rating: i64,
}

/// Stable maximum: the first entry reaching the highest rating above
/// `threshold` wins.
pub fn select_top<'a, I>(rated: I, threshold: i64) -> Option<RatedEntry<'a>>
where
    I: IntoIterator<Item = RatedEntry<'a>>,
{
    let mut best: Option<RatedEntry<'a>> = None;
    for candidate in rated {
        if candidate.rating <= threshold {
            continue;
        }
        match best {
            Some(current) if current.rating >= candidate.rating => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Build the winner's response; a failure is logged and reported as no match.
pub(crate) fn materialize(winner: RatedEntry<'_>, request: &NormalizedRequest) -> Option<ReplayResponse> {
    debug!(
        index = winner.index,
        rating = winner.rating,
        url = %request.url,
        "selected recorded entry"
    );
    match winner.entry.create_response(request) {
        Ok(response) => Some(response),
        Err(e) => {
            warn!(
                index = winner.index,
                url = %request.url,
                error = %e,
                "failed to materialize response for matched entry"
            );
            None
        }
    }
}
