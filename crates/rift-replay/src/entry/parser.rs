//! Turns bridged corpus entries into [`ParsedEntry`] records.

use super::bridge::{EncodingPolicy, EntryBridge, IdentityEncodingPolicy};
use crate::error::{ParseError, ReplayError};
use crate::model::{Headers, HttpMethod, NormalizedRequest, ReplayResponse, RequestUrl, ResponseData};
use std::fmt;
use std::io;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, warn};

/// Deferred response materialisation for one entry, given the live request.
pub type ResponseCreator =
    Arc<dyn Fn(&NormalizedRequest) -> Result<ReplayResponse, ReplayError> + Send + Sync>;

/// A corpus entry's normalized request plus a deferred response creator.
///
/// The response is only built when this entry wins a ranking.
#[derive(Clone)]
pub struct ParsedEntry {
    pub request: NormalizedRequest,
    creator: ResponseCreator,
}

impl ParsedEntry {
    pub fn new(request: NormalizedRequest, creator: ResponseCreator) -> Self {
        Self { request, creator }
    }

    /// Build the response for `live`.
    pub fn create_response(&self, live: &NormalizedRequest) -> Result<ReplayResponse, ReplayError> {
        (self.creator)(live)
    }
}

impl fmt::Debug for ParsedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedEntry")
            .field("method", &self.request.method)
            .field("url", &self.request.url.to_string())
            .finish_non_exhaustive()
    }
}

/// Normalizes entries exposed through an [`EntryBridge`].
pub struct EntryParser<E, B> {
    bridge: Arc<B>,
    policy: Arc<dyn EncodingPolicy>,
    _entry: PhantomData<fn(&E)>,
}

impl<E, B> EntryParser<E, B>
where
    E: Send + Sync + 'static,
    B: EntryBridge<E> + 'static,
{
    pub fn new(bridge: B) -> Self {
        Self {
            bridge: Arc::new(bridge),
            policy: Arc::new(IdentityEncodingPolicy),
            _entry: PhantomData,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn EncodingPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn parse_request(&self, entry: &E) -> Result<NormalizedRequest, ParseError> {
        parse_request(self.bridge.as_ref(), entry)
    }

    pub fn parse_response(
        &self,
        live: &NormalizedRequest,
        entry: &E,
    ) -> Result<ReplayResponse, ReplayError> {
        parse_response(self.bridge.as_ref(), self.policy.as_ref(), live, entry)
    }

    /// Parse the request now and defer the response until it is needed.
    pub fn parse_entry(&self, entry: E) -> Result<ParsedEntry, ParseError> {
        let request = self.parse_request(&entry)?;
        let bridge = Arc::clone(&self.bridge);
        let policy = Arc::clone(&self.policy);
        let creator: ResponseCreator = Arc::new(move |live: &NormalizedRequest| {
            parse_response(bridge.as_ref(), policy.as_ref(), live, &entry)
        });
        Ok(ParsedEntry::new(request, creator))
    }

    /// Parse every entry, skipping (and logging) the ones that cannot be normalized.
    pub fn parse_all<I>(&self, entries: I) -> Vec<ParsedEntry>
    where
        I: IntoIterator<Item = E>,
    {
        let mut parsed = Vec::new();
        let mut skipped = 0usize;
        for (index, entry) in entries.into_iter().enumerate() {
            match self.parse_entry(entry) {
                Ok(p) => parsed.push(p),
                Err(e) => {
                    skipped += 1;
                    warn!(index, error = %e, "skipping corpus entry");
                }
            }
        }
        info!(entries = parsed.len(), skipped, "parsed corpus");
        parsed
    }
}

fn parse_request<E, B: EntryBridge<E> + ?Sized>(
    bridge: &B,
    entry: &E,
) -> Result<NormalizedRequest, ParseError> {
    let method: HttpMethod = bridge.request_method(entry)?.parse()?;
    let url = RequestUrl::resolve(method, &bridge.request_url(entry)?)?;
    let headers: Headers = bridge.request_headers(entry).into_iter().collect();
    let mut request = NormalizedRequest::new(method, url);
    request.headers = headers;
    request.body = bridge.request_body(entry)?;
    Ok(request)
}

fn parse_response<E, B: EntryBridge<E> + ?Sized>(
    bridge: &B,
    policy: &dyn EncodingPolicy,
    live: &NormalizedRequest,
    entry: &E,
) -> Result<ReplayResponse, ReplayError> {
    let status = bridge.response_status(entry);
    let data = bridge.response_data(live, entry, policy)?;
    Ok(ReplayResponse::new(status, fix_content_length(data)?))
}

/// Make `Content-Length` agree with the actual body length.
///
/// Returns `data` untouched when it already carries exactly one correct
/// header; otherwise every `Content-Length` header is replaced by one
/// canonical value.
pub fn fix_content_length(data: ResponseData) -> io::Result<ResponseData> {
    let length = match data.body().known_len() {
        Some(len) => len,
        None => data.read_body()?.len(),
    };
    let expected = length.to_string();
    let existing: Vec<&str> = data.header_values("content-length").collect();
    if existing.len() == 1 && existing[0].trim() == expected {
        return Ok(data);
    }
    Ok(data
        .transform()
        .replace_header("Content-Length", &expected)
        .transform())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ByteSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct Fake {
        method: &'static str,
        url: &'static str,
        body: &'static str,
    }

    #[derive(Default)]
    struct FakeBridge {
        materialized: Arc<AtomicUsize>,
    }

    impl EntryBridge<Fake> for FakeBridge {
        fn request_method(&self, entry: &Fake) -> Result<String, ParseError> {
            Ok(entry.method.to_string())
        }

        fn request_url(&self, entry: &Fake) -> Result<String, ParseError> {
            Ok(entry.url.to_string())
        }

        fn request_headers(&self, _entry: &Fake) -> Vec<(String, String)> {
            vec![
                ("Accept".to_string(), "*/*".to_string()),
                ("X-Multi".to_string(), "a".to_string()),
                ("x-multi".to_string(), "b".to_string()),
            ]
        }

        fn request_body(&self, _entry: &Fake) -> Result<Option<ByteSource>, ParseError> {
            Ok(None)
        }

        fn response_status(&self, _entry: &Fake) -> u16 {
            200
        }

        fn response_data(
            &self,
            _request: &NormalizedRequest,
            entry: &Fake,
            policy: &dyn EncodingPolicy,
        ) -> Result<ResponseData, ReplayError> {
            self.materialized.fetch_add(1, Ordering::SeqCst);
            policy.transform_unencoded(ResponseData::new(
                vec![
                    ("Content-Length".to_string(), "999".to_string()),
                    ("content-length".to_string(), "1".to_string()),
                ],
                None,
                ByteSource::from(entry.body),
            ))
        }
    }

    fn fake(method: &'static str, url: &'static str) -> Fake {
        Fake {
            method,
            url,
            body: "body!",
        }
    }

    #[test]
    fn test_parse_request_normalizes_headers_and_query() {
        let parser = EntryParser::new(FakeBridge::default());
        let request = parser
            .parse_request(&fake("get", "http://h.test/p?b=2&a=1&a=3"))
            .unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url.path, "/p");
        assert_eq!(request.query.keys(), vec!["b", "a"]);
        assert_eq!(request.headers.get_all("x-multi").count(), 2);
        assert_eq!(request.header("accept"), Some("*/*"));
    }

    #[test]
    fn test_parse_request_rejects_unknown_method() {
        let parser = EntryParser::new(FakeBridge::default());
        let err = parser.parse_request(&fake("BREW", "http://h.test/")).unwrap_err();
        assert!(matches!(err, ParseError::Method(_)));
    }

    #[test]
    fn test_response_is_deferred_until_created() {
        let bridge = FakeBridge::default();
        let counter = Arc::clone(&bridge.materialized);
        let parser = EntryParser::new(bridge);
        let entry = parser.parse_entry(fake("GET", "http://h.test/")).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let response = entry.create_response(&entry.request.clone()).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(response.status, 200);
        let lengths: Vec<_> = response.data.header_values("content-length").collect();
        assert_eq!(lengths, vec!["5"]);
    }

    #[test]
    fn test_parse_all_skips_bad_entries() {
        let parser = EntryParser::new(FakeBridge::default());
        let parsed = parser.parse_all(vec![
            fake("GET", "http://h.test/1"),
            fake("GET", "not a url"),
            fake("POST", "http://h.test/2"),
        ]);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].request.method, HttpMethod::Post);
    }

    #[test]
    fn test_fix_content_length_no_churn_when_correct() {
        let data = ResponseData::new(
            vec![
                ("X-First".to_string(), "1".to_string()),
                ("Content-Length".to_string(), "3".to_string()),
                ("X-Last".to_string(), "2".to_string()),
            ],
            None,
            ByteSource::from("abc"),
        );
        let fixed = fix_content_length(data).unwrap();
        let names: Vec<_> = fixed.headers().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["X-First", "Content-Length", "X-Last"]);
    }

    #[test]
    fn test_fix_content_length_after_body_change() {
        let data = ResponseData::new(
            vec![("Content-Length".to_string(), "3".to_string())],
            None,
            ByteSource::from("abc"),
        );
        let changed = data
            .transform()
            .map_body(|_| ByteSource::from("abcdefgh"))
            .transform();
        let fixed = fix_content_length(changed).unwrap();
        assert_eq!(fixed.first_header("content-length"), Some("8"));
        assert_eq!(fixed.header_values("content-length").count(), 1);
    }

    #[test]
    fn test_fix_content_length_adds_missing_header() {
        let data = ResponseData::new(Vec::new(), None, ByteSource::deferred(|| Ok("xy".into())));
        let fixed = fix_content_length(data).unwrap();
        assert_eq!(fixed.first_header("Content-Length"), Some("2"));
    }
}
