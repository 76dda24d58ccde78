//! Abstract response description produced by the replay core.

use super::body::{ByteSource, TypedContent};
use super::media_type::MediaType;
use bytes::Bytes;
use std::io;

/// Headers, resolved content type and body of a response.
///
/// The content type is never absent; `application/octet-stream` is used when
/// none was supplied. Values are never mutated in place: use
/// [`ResponseData::transform`] to derive a modified copy.
#[derive(Debug, Clone)]
pub struct ResponseData {
    headers: Vec<(String, String)>,
    content_type: MediaType,
    body: ByteSource,
}

impl ResponseData {
    pub fn new(
        headers: Vec<(String, String)>,
        content_type: Option<MediaType>,
        body: ByteSource,
    ) -> Self {
        Self {
            headers,
            content_type: content_type.unwrap_or_default(),
            body,
        }
    }

    /// Build response data from typed content, writing a matching `Content-Type` header.
    pub fn from_content(content: TypedContent) -> Self {
        let headers = vec![("Content-Type".to_string(), content.media_type.to_string())];
        Self::new(
            headers,
            Some(content.media_type),
            ByteSource::from(content.data),
        )
    }

    /// Header pairs in output order with their original case.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// All values of the named header (case-insensitive).
    pub fn header_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let name = name.to_string();
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(&name))
            .map(|(_, v)| v.as_str())
    }

    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> &MediaType {
        &self.content_type
    }

    pub fn body(&self) -> &ByteSource {
        &self.body
    }

    pub fn read_body(&self) -> io::Result<Bytes> {
        self.body.open()
    }
}

/// A complete response: status plus response data.
#[derive(Debug, Clone)]
pub struct ReplayResponse {
    pub status: u16,
    pub data: ResponseData,
}

impl ReplayResponse {
    pub fn new(status: u16, data: ResponseData) -> Self {
        Self { status, data }
    }

    /// The response written when no corpus entry matches.
    pub fn not_found() -> Self {
        let body = Bytes::from_static(b"404 Not Found");
        let data = ResponseData::new(
            vec![
                (
                    "Content-Type".to_string(),
                    MediaType::plain_text().to_string(),
                ),
                ("Content-Length".to_string(), body.len().to_string()),
            ],
            Some(MediaType::plain_text()),
            ByteSource::from(body),
        );
        Self { status: 404, data }
    }
}
