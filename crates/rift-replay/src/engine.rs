//! Serving-layer facade: register, match, rewrite.

use crate::codec::{parse_content_encodings, CodecRegistry};
use crate::config::{CompiledRules, ReplayConfig};
use crate::entry::{CapturedEntry, CapturedEntryBridge, EntryParser, ParsedEntry};
use crate::error::ReplayError;
use crate::heuristic::{BasicHeuristic, Heuristic};
use crate::matcher::{
    BasicEntryMatcher, CountingSessionState, EntryMatcher, ReplaySessionState,
    SequentialEntryMatcher, StatelessSessionState,
};
use crate::model::{ByteSource, NormalizedRequest, ReplayResponse, ResponseData};
use bytes::Bytes;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answers live requests from a parsed corpus.
pub struct ReplayEngine {
    matcher: Box<dyn EntryMatcher>,
    sequence_aware: bool,
    rules: CompiledRules,
    registry: Arc<CodecRegistry>,
}

impl ReplayEngine {
    pub fn new(entries: Vec<ParsedEntry>, config: &ReplayConfig) -> anyhow::Result<Self> {
        Self::with_registry(entries, config, Arc::new(CodecRegistry::default()))
    }

    pub fn with_registry(
        entries: Vec<ParsedEntry>,
        config: &ReplayConfig,
        registry: Arc<CodecRegistry>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let matching = &config.matching;
        let heuristic: Arc<dyn Heuristic> = Arc::new(
            BasicHeuristic::new(matching.increment)?.with_registry(Arc::clone(&registry)),
        );
        let matcher: Box<dyn EntryMatcher> = if matching.sequence_aware {
            Box::new(
                SequentialEntryMatcher::with_heuristic(entries, heuristic)
                    .with_threshold(matching.threshold),
            )
        } else {
            Box::new(
                BasicEntryMatcher::with_heuristic(entries, heuristic)
                    .with_threshold(matching.threshold),
            )
        };
        let rules = config.compile_rules()?;
        info!(
            sequence_aware = matching.sequence_aware,
            increment = matching.increment,
            threshold = matching.threshold,
            "replay engine ready"
        );
        Ok(Self {
            matcher,
            sequence_aware: matching.sequence_aware,
            rules,
            registry,
        })
    }

    /// Parse captured entries and build an engine over them.
    pub fn from_capture(entries: Vec<CapturedEntry>, config: &ReplayConfig) -> anyhow::Result<Self> {
        let registry = Arc::new(CodecRegistry::default());
        let parser = EntryParser::new(CapturedEntryBridge::new(Arc::clone(&registry)));
        let parsed = parser.parse_all(entries);
        Self::with_registry(parsed, config, registry)
    }

    pub fn is_sequence_aware(&self) -> bool {
        self.sequence_aware
    }

    /// Fresh state for one replay session.
    pub fn new_session(&self) -> Arc<dyn ReplaySessionState> {
        if self.sequence_aware {
            Arc::new(CountingSessionState::new())
        } else {
            Arc::new(StatelessSessionState)
        }
    }

    /// Register `request` with `session`, match it and rewrite the winner.
    ///
    /// Must be called once per live request.
    pub fn respond(&self, session: &dyn ReplaySessionState, request: &NormalizedRequest) -> ReplayResponse {
        session.register(request);
        match self.matcher.find_top_entry(request, session) {
            Some(response) => self.rewrite(response, request),
            None => {
                debug!(method = %request.method, url = %request.url, "responding not found");
                ReplayResponse::not_found()
            }
        }
    }

    fn rewrite(&self, response: ReplayResponse, request: &NormalizedRequest) -> ReplayResponse {
        let ReplayResponse { status, data } = response;
        let data = if self.rules.has_header_rules() {
            data.transform()
                .map_headers(|headers| self.rules.rewrite_headers(headers, request))
                .transform()
        } else {
            data
        };
        if !self.rules.has_body_rules() || !data.content_type().is_textual() {
            return ReplayResponse::new(status, data);
        }
        let data = match self.rewrite_body(&data, request) {
            Ok(Some(body)) => {
                let length = body.len().to_string();
                data.transform()
                    .map_body(move |_| ByteSource::from(body))
                    .replace_header("Content-Length", &length)
                    .transform()
            }
            Ok(None) => data,
            Err(e) => {
                warn!(url = %request.url, error = %e, "skipping body replacements");
                data
            }
        };
        ReplayResponse::new(status, data)
    }

    /// New body bytes, or `None` when no rule changed anything.
    fn rewrite_body(&self, data: &ResponseData, request: &NormalizedRequest) -> Result<Option<Bytes>, ReplayError> {
        let declared = data
            .header_values("content-encoding")
            .collect::<Vec<_>>()
            .join(",");
        let encodings = parse_content_encodings(Some(declared.as_str()));
        let raw = data.read_body()?;
        let decoded = self.registry.decode_chain(&encodings, &raw)?;
        let Ok(text) = std::str::from_utf8(&decoded) else {
            debug!(url = %request.url, "textual body is not UTF-8, leaving it as recorded");
            return Ok(None);
        };
        let rewritten = match self.rules.rewrite_body(text, request) {
            Cow::Borrowed(_) => return Ok(None),
            Cow::Owned(rewritten) => rewritten,
        };
        let encoded = self.registry.encode_chain(&encodings, rewritten.as_bytes())?;
        Ok(Some(Bytes::from(encoded)))
    }
}
