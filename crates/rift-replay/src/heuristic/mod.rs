//! Similarity scoring between a recorded request and a live request.
//!
//! A rating of zero means "not a candidate"; anything above the matcher's
//! threshold is eligible, and the highest rating wins.

mod sameness;

pub use sameness::{headers_sameness, params_sameness, same_values};

use crate::codec::{parse_content_encodings, CodecRegistry};
use crate::model::{parse_query_params, MediaType, NormalizedRequest};
use crate::multipart;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default full score step.
pub const DEFAULT_INCREMENT: i64 = 100;

/// Scores how closely a recorded request resembles a live one.
pub trait Heuristic: Send + Sync {
    fn rate(&self, entry_request: &NormalizedRequest, request: &NormalizedRequest) -> i64;

    /// One full score step.
    fn increment(&self) -> i64;
}

#[derive(Debug, thiserror::Error)]
#[error("heuristic increment must be a positive even number, got {0}")]
pub struct InvalidIncrement(pub i64);

/// Additive scorer over method, host, path, query, headers and body.
#[derive(Debug, Clone)]
pub struct BasicHeuristic {
    increment: i64,
    registry: Arc<CodecRegistry>,
}

impl Default for BasicHeuristic {
    fn default() -> Self {
        Self {
            increment: DEFAULT_INCREMENT,
            registry: Arc::new(CodecRegistry::default()),
        }
    }
}

impl BasicHeuristic {
    /// `increment` must be positive and even so that half of it is exact.
    pub fn new(increment: i64) -> Result<Self, InvalidIncrement> {
        if increment <= 0 || increment % 2 != 0 {
            return Err(InvalidIncrement(increment));
        }
        Ok(Self {
            increment,
            ..Self::default()
        })
    }

    /// Codecs used to undo request `Content-Encoding` before comparing bodies.
    pub fn with_registry(mut self, registry: Arc<CodecRegistry>) -> Self {
        self.registry = registry;
        self
    }

    fn half_increment(&self) -> i64 {
        self.increment / 2
    }

    fn body_sameness(&self, entry_request: &NormalizedRequest, request: &NormalizedRequest) -> i64 {
        let (recorded, live) = match (&entry_request.body, &request.body) {
            (None, None) => return self.half_increment(),
            (Some(_), Some(_)) => match (self.read_body(entry_request), self.read_body(request)) {
                (Some(recorded), Some(live)) => (recorded, live),
                _ => return 0,
            },
            _ => return 0,
        };
        if recorded.is_empty() && live.is_empty() {
            return self.increment;
        }

        let recorded_type = entry_request.content_type().unwrap_or_default();
        let live_type = request.content_type().unwrap_or_default();
        if recorded_type.is_form_urlencoded() && live_type.is_form_urlencoded() {
            let recorded = parse_query_params(&String::from_utf8_lossy(&recorded));
            let live = parse_query_params(&String::from_utf8_lossy(&live));
            return params_sameness(&recorded, &live, self.increment);
        }
        if recorded_type.is_multipart_form_data() && live_type.is_multipart_form_data() {
            return form_data_sameness(&recorded_type, &recorded, &live_type, &live);
        }
        if recorded == live {
            self.increment
        } else {
            0
        }
    }

    /// Open the body and undo any declared `Content-Encoding`.
    ///
    /// An encoding that fails to decode falls back to the raw bytes.
    fn read_body(&self, request: &NormalizedRequest) -> Option<Bytes> {
        let raw = match request.body.as_ref()?.open() {
            Ok(raw) => raw,
            Err(e) => {
                warn!(url = %request.url, error = %e, "failed to read request body for rating");
                return None;
            }
        };
        let encodings = parse_content_encodings(request.header("content-encoding"));
        if encodings.is_empty() {
            return Some(raw);
        }
        match self.registry.decode_chain(&encodings, &raw) {
            Ok(decoded) => Some(Bytes::from(decoded)),
            Err(e) => {
                debug!(url = %request.url, error = %e, "comparing request body undecoded");
                Some(raw)
            }
        }
    }
}

impl Heuristic for BasicHeuristic {
    fn rate(&self, entry_request: &NormalizedRequest, request: &NormalizedRequest) -> i64 {
        if entry_request.method != request.method
            || entry_request.url.host != request.url.host
            || entry_request.url.path != request.url.path
        {
            return 0;
        }
        let mut rating = self.increment;
        rating += params_sameness(&entry_request.query, &request.query, self.increment);
        rating += headers_sameness(&entry_request.headers, &request.headers, self.increment);
        if request.method.carries_body() {
            rating += self.body_sameness(entry_request, request);
        }
        rating
    }

    fn increment(&self) -> i64 {
        self.increment
    }
}

/// Multipart bodies are decoded for diagnostics only; they never add to the rating.
fn form_data_sameness(recorded_type: &MediaType, recorded: &[u8], live_type: &MediaType, live: &[u8]) -> i64 {
    match (
        multipart::decode(recorded_type, recorded),
        multipart::decode(live_type, live),
    ) {
        (Ok(recorded), Ok(live)) => {
            debug!(
                recorded_parts = recorded.len(),
                live_parts = live.len(),
                "multipart bodies are not compared"
            );
        }
        (Err(e), _) | (_, Err(e)) => {
            debug!(error = %e, "multipart body did not decode");
        }
    }
    0
}
