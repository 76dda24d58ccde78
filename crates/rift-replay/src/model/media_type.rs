//! Minimal media-type (MIME) value used for typed content.

use std::fmt;

/// Parsed `type/subtype; name=value` media type.
///
/// The essence is lower-cased; parameter names are lower-cased and values
/// are unquoted but otherwise preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    kind: String,
    subtype: String,
    params: Vec<(String, String)>,
}

pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

impl MediaType {
    pub fn new(kind: &str, subtype: &str) -> Self {
        Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// The identity `application/octet-stream` type substituted whenever a
    /// content type is missing or unparseable.
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    pub fn plain_text() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Parse a header value. Returns `None` if there is no `type/subtype` pair.
    pub fn parse(value: &str) -> Option<Self> {
        let mut segments = value.split(';');
        let essence = segments.next()?.trim();
        let (kind, subtype) = essence.split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }
        let mut media_type = MediaType::new(kind, subtype);
        for segment in segments {
            if let Some((name, value)) = segment.split_once('=') {
                let name = name.trim().to_ascii_lowercase();
                if name.is_empty() {
                    continue;
                }
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                media_type.params.push((name, value.to_string()));
            }
        }
        Some(media_type)
    }

    /// Parse, falling back to `application/octet-stream`.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(MediaType::parse).unwrap_or_else(MediaType::octet_stream)
    }

    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        self.params.retain(|(n, _)| *n != name);
        self.params.push((name, value.to_string()));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// `type/subtype` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    pub fn is_form_urlencoded(&self) -> bool {
        self.essence() == FORM_URLENCODED
    }

    pub fn is_multipart_form_data(&self) -> bool {
        self.essence() == MULTIPART_FORM_DATA
    }

    /// Whether the content is human-readable text (eligible for body rewriting).
    pub fn is_textual(&self) -> bool {
        if self.kind == "text" {
            return true;
        }
        if self.kind != "application" {
            return false;
        }
        matches!(
            self.subtype.as_str(),
            "json" | "javascript" | "ecmascript" | "x-javascript" | "xml" | "xhtml+xml"
        ) || self.subtype.ends_with("+json")
            || self.subtype.ends_with("+xml")
    }
}

impl Default for MediaType {
    fn default() -> Self {
        MediaType::octet_stream()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (name, value) in &self.params {
            let needs_quotes = value.is_empty()
                || value
                    .chars()
                    .any(|c| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c));
            if needs_quotes {
                write!(f, "; {name}=\"{value}\"")?;
            } else {
                write!(f, "; {name}={value}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_parameters() {
        let mt = MediaType::parse("Multipart/Form-Data; boundary=\"abc def\"; charset=UTF-8").unwrap();
        assert_eq!(mt.essence(), "multipart/form-data");
        assert_eq!(mt.parameter("BOUNDARY"), Some("abc def"));
        assert_eq!(mt.charset(), Some("UTF-8"));
        assert!(mt.is_multipart_form_data());
    }

    #[test]
    fn test_parse_rejects_missing_subtype() {
        assert!(MediaType::parse("text").is_none());
        assert!(MediaType::parse("/plain").is_none());
        assert_eq!(MediaType::parse_or_default(Some("garbage")), MediaType::octet_stream());
        assert_eq!(MediaType::parse_or_default(None), MediaType::octet_stream());
    }

    #[test]
    fn test_display_round_trips_quoting() {
        let mt = MediaType::new("multipart", "form-data").with_parameter("boundary", "a b");
        assert_eq!(mt.to_string(), "multipart/form-data; boundary=\"a b\"");
        assert_eq!(MediaType::plain_text().to_string(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_textual_types() {
        assert!(MediaType::parse("text/html").unwrap().is_textual());
        assert!(MediaType::parse("application/json").unwrap().is_textual());
        assert!(MediaType::parse("application/ld+json").unwrap().is_textual());
        assert!(!MediaType::parse("image/png").unwrap().is_textual());
        assert!(!MediaType::octet_stream().is_textual());
    }

    #[test]
    fn test_form_urlencoded() {
        let mt = MediaType::parse("application/x-www-form-urlencoded; charset=UTF-8").unwrap();
        assert!(mt.is_form_urlencoded());
    }
}
