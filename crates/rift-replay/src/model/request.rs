//! Normalized request model.

use super::body::ByteSource;
use super::media_type::MediaType;
use super::method::HttpMethod;
use super::multimap::Multimap;
use crate::error::ParseError;
use std::fmt;

/// Query parameters. `None` distinguishes a bare `k` from `k=`.
pub type QueryParams = Multimap<Option<String>>;

/// Request headers with lower-cased names.
pub type Headers = Multimap<String>;

/// Absolute request URL. The scheme is absent for CONNECT-style `host:port` targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestUrl {
    pub scheme: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "ftp" => Some(21),
        "https" => Some(443),
        _ => None,
    }
}

impl RequestUrl {
    /// Parse an absolute URL.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let url = url::Url::parse(raw).map_err(|e| ParseError::url(raw, e))?;
        let host = url
            .host_str()
            .ok_or_else(|| ParseError::url(raw, "missing host"))?;
        Ok(RequestUrl {
            scheme: Some(url.scheme().to_string()),
            host: host.to_string(),
            port: url.port(),
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
        })
    }

    /// Resolve a request target, treating CONNECT targets specially.
    ///
    /// A CONNECT target without a `/` is an authority (`host:port`) and keeps
    /// no scheme. Otherwise the URL is parsed normally and, for CONNECT, the
    /// scheme's default port is filled in when absent.
    pub fn resolve(method: HttpMethod, raw: &str) -> Result<Self, ParseError> {
        if method != HttpMethod::Connect {
            return RequestUrl::parse(raw);
        }
        if !raw.contains('/') {
            let (host, port) = match raw.rsplit_once(':') {
                Some((host, port)) => {
                    let port = port
                        .parse::<u16>()
                        .map_err(|e| ParseError::url(raw, e))?;
                    (host, Some(port))
                }
                None => (raw, None),
            };
            if host.is_empty() {
                return Err(ParseError::url(raw, "missing host"));
            }
            return Ok(RequestUrl {
                scheme: None,
                host: host.to_ascii_lowercase(),
                port,
                path: String::new(),
                query: None,
            });
        }
        let mut url = RequestUrl::parse(raw)?;
        if url.port.is_none() {
            url.port = url.scheme.as_deref().and_then(default_port);
        }
        Ok(url)
    }

    pub fn query_params(&self) -> QueryParams {
        self.query
            .as_deref()
            .map(parse_query_params)
            .unwrap_or_default()
    }
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}://")?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

fn decode_component(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    match urlencoding::decode(&plus_decoded) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => plus_decoded,
    }
}

/// Parse an `application/x-www-form-urlencoded` string into an ordered multimap.
///
/// Parameters with an empty name are dropped; repeated names keep every value.
pub fn parse_query_params(query: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for segment in query.split('&').filter(|s| !s.is_empty()) {
        let (name, value) = match segment.split_once('=') {
            Some((name, value)) => (decode_component(name), Some(decode_component(value))),
            None => (decode_component(segment), None),
        };
        if name.is_empty() {
            continue;
        }
        params.insert(name, value);
    }
    params
}

/// Key identifying "the same request" for sequence tracking.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RequestSignature {
    pub method: HttpMethod,
    pub url: String,
}

/// Immutable normalized view of an HTTP request.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub method: HttpMethod,
    pub url: RequestUrl,
    pub query: QueryParams,
    pub headers: Headers,
    pub body: Option<ByteSource>,
}

impl NormalizedRequest {
    pub fn new(method: HttpMethod, url: RequestUrl) -> Self {
        let query = url.query_params();
        Self {
            method,
            url,
            query,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Parse `raw` (resolving CONNECT targets) and build a request with no headers.
    pub fn parse(method: HttpMethod, raw: &str) -> Result<Self, ParseError> {
        Ok(NormalizedRequest::new(method, RequestUrl::resolve(method, raw)?))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<ByteSource>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.first(name).map(String::as_str)
    }

    /// Declared content type, if any.
    pub fn content_type(&self) -> Option<MediaType> {
        self.header("content-type").and_then(MediaType::parse)
    }

    pub fn signature(&self) -> RequestSignature {
        RequestSignature {
            method: self.method,
            url: self.url.to_string(),
        }
    }
}
