//! Reference adapter for a HAR-like JSON capture format.
//!
//! ```json
//! [
//!   {
//!     "request": { "method": "GET", "url": "https://example.com/", "headers": [] },
//!     "response": {
//!       "status": 200,
//!       "headers": [{ "name": "Content-Type", "value": "text/html" }],
//!       "content": { "mimeType": "text/html", "text": "<html></html>" }
//!     }
//!   }
//! ]
//! ```
//!
//! Response bodies are stored exactly as recorded, so they may still carry
//! their `Content-Encoding`.

use super::bridge::{negotiate_encoding, EncodingPolicy, EntryBridge};
use crate::codec::CodecRegistry;
use crate::error::{ParseError, ReplayError};
use crate::model::{ByteSource, MediaType, NormalizedRequest, ResponseData};
use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

impl NameValue {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Body text, optionally base64-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: String,
    /// `base64` when `text` holds base64 data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl CapturedContent {
    pub fn text(mime_type: &str, text: &str) -> Self {
        Self {
            mime_type: Some(mime_type.to_string()),
            text: text.to_string(),
            encoding: None,
        }
    }

    pub fn binary(mime_type: &str, data: &[u8]) -> Self {
        Self {
            mime_type: Some(mime_type.to_string()),
            text: STANDARD.encode(data),
            encoding: Some("base64".to_string()),
        }
    }

    pub fn bytes(&self) -> Result<Bytes, ParseError> {
        match self.encoding.as_deref() {
            Some(enc) if enc.eq_ignore_ascii_case("base64") => STANDARD
                .decode(self.text.trim())
                .map(Bytes::from)
                .map_err(|e| ParseError::Bridge(format!("invalid base64 content: {e}"))),
            Some(other) => Err(ParseError::Bridge(format!(
                "unsupported content text encoding: {other}"
            ))),
            None => Ok(Bytes::from(self.text.clone().into_bytes())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<NameValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<CapturedContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<NameValue>,
    #[serde(default)]
    pub content: CapturedContent,
}

/// One recorded request/response pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedEntry {
    pub request: CapturedRequest,
    pub response: CapturedResponse,
}

impl CapturedEntry {
    /// A `GET` entry answered with a `200` text body.
    pub fn get(url: &str, mime_type: &str, text: &str) -> Self {
        CapturedEntry {
            request: CapturedRequest {
                method: "GET".to_string(),
                url: url.to_string(),
                headers: Vec::new(),
                post_data: None,
            },
            response: CapturedResponse {
                status: 200,
                headers: vec![NameValue::new("Content-Type", mime_type)],
                content: CapturedContent::text(mime_type, text),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CaptureFile {
    Entries(Vec<CapturedEntry>),
    Wrapped { entries: Vec<CapturedEntry> },
}

/// Load a capture file: either a JSON array of entries or `{ "entries": [...] }`.
pub fn load_capture<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<CapturedEntry>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read capture {}", path.display()))?;
    let file: CaptureFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse capture {}", path.display()))?;
    Ok(match file {
        CaptureFile::Entries(entries) | CaptureFile::Wrapped { entries } => entries,
    })
}

/// [`EntryBridge`] over [`CapturedEntry`].
#[derive(Debug, Clone, Default)]
pub struct CapturedEntryBridge {
    registry: Arc<CodecRegistry>,
}

impl CapturedEntryBridge {
    pub fn new(registry: Arc<CodecRegistry>) -> Self {
        Self { registry }
    }
}

impl EntryBridge<CapturedEntry> for CapturedEntryBridge {
    fn request_method(&self, entry: &CapturedEntry) -> Result<String, ParseError> {
        Ok(entry.request.method.clone())
    }

    fn request_url(&self, entry: &CapturedEntry) -> Result<String, ParseError> {
        Ok(entry.request.url.clone())
    }

    fn request_headers(&self, entry: &CapturedEntry) -> Vec<(String, String)> {
        entry
            .request
            .headers
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect()
    }

    fn request_body(&self, entry: &CapturedEntry) -> Result<Option<ByteSource>, ParseError> {
        entry
            .request
            .post_data
            .as_ref()
            .map(|content| content.bytes().map(ByteSource::from))
            .transpose()
    }

    fn response_status(&self, entry: &CapturedEntry) -> u16 {
        entry.response.status
    }

    fn response_data(
        &self,
        request: &NormalizedRequest,
        entry: &CapturedEntry,
        policy: &dyn EncodingPolicy,
    ) -> Result<ResponseData, ReplayError> {
        let response = &entry.response;
        let headers: Vec<(String, String)> = response
            .headers
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();
        let declared = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str());
        let content_type = response
            .content
            .mime_type
            .as_deref()
            .or(declared)
            .and_then(MediaType::parse);
        let body = response.content.bytes()?;
        let recorded = ResponseData::new(headers, content_type, ByteSource::from(body));
        negotiate_encoding(request, recorded, &self.registry, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryParser, IdentityEncodingPolicy};
    use crate::model::HttpMethod;
    use std::io::Write;

    #[test]
    fn test_content_bytes() {
        assert_eq!(&CapturedContent::text("text/plain", "hi").bytes().unwrap()[..], b"hi");
        let binary = CapturedContent::binary("image/png", &[0, 159, 146, 150]);
        assert_eq!(&binary.bytes().unwrap()[..], &[0, 159, 146, 150]);
        let bad = CapturedContent {
            encoding: Some("base64".to_string()),
            text: "***".to_string(),
            ..Default::default()
        };
        assert!(bad.bytes().is_err());
    }

    #[test]
    fn test_load_capture_both_shapes() {
        let entry = CapturedEntry::get("http://a.test/", "text/plain", "x");
        let array = serde_json::to_string(&vec![entry.clone()]).unwrap();
        let wrapped = serde_json::json!({ "entries": [entry.clone()] }).to_string();

        for contents in [array, wrapped] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(contents.as_bytes()).unwrap();
            let loaded = load_capture(file.path()).unwrap();
            assert_eq!(loaded, vec![entry.clone()]);
        }
    }

    #[test]
    fn test_load_capture_reports_path() {
        let err = load_capture("/nonexistent/capture.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/capture.json"));
    }

    #[test]
    fn test_bridge_round_trip_through_parser() {
        let mut entry = CapturedEntry::get("https://a.test/page?x=1", "text/html", "<p>hi</p>");
        entry.request.headers.push(NameValue::new("User-Agent", "test"));
        let parser = EntryParser::new(CapturedEntryBridge::default());
        let parsed = parser.parse_entry(entry).unwrap();
        assert_eq!(parsed.request.method, HttpMethod::Get);
        assert_eq!(parsed.request.header("user-agent"), Some("test"));

        let response = parsed.create_response(&parsed.request).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.data.content_type().essence(), "text/html");
        assert_eq!(response.data.first_header("content-length"), Some("9"));
    }

    #[test]
    fn test_response_data_decodes_for_non_accepting_client() {
        let registry = Arc::new(CodecRegistry::default());
        let gz = registry.get("gzip").unwrap().compress(b"compressed!").unwrap();
        let mut entry = CapturedEntry::get("http://a.test/", "text/plain", "");
        entry.response.headers.push(NameValue::new("Content-Encoding", "gzip"));
        entry.response.content = CapturedContent::binary("text/plain", &gz);

        let bridge = CapturedEntryBridge::new(registry);
        let live = NormalizedRequest::parse(HttpMethod::Get, "http://a.test/").unwrap();
        let data = bridge
            .response_data(&live, &entry, &IdentityEncodingPolicy)
            .unwrap();
        assert_eq!(&data.read_body().unwrap()[..], b"compressed!");
        assert!(data.first_header("content-encoding").is_none());
    }
}
