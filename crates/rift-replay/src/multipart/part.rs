//! Form-data parts and their header block.

use crate::model::{Headers, MediaType, TypedContent};
use once_cell::sync::Lazy;
use regex::Regex;

static CONTENT_DISPOSITION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^content-disposition:\s*(.*?)\s*$").expect("valid regex"));
static CONTENT_TYPE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^content-type:\s*(.*?)\s*$").expect("valid regex"));
static HEADER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:\s]+)\s*:\s*(.*?)\s*$").expect("valid regex"));

/// Parsed `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    pub disposition_type: String,
    pub name: Option<String>,
    pub filename: Option<String>,
}

impl ContentDisposition {
    pub fn parse(value: &str) -> Self {
        let mut segments = split_unquoted(value, ';').into_iter();
        let disposition_type = segments
            .next()
            .map(|s| s.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let mut disposition = ContentDisposition {
            disposition_type,
            name: None,
            filename: None,
        };
        for segment in segments {
            let Some((key, raw)) = segment.split_once('=') else {
                continue;
            };
            let raw = raw.trim();
            let value = raw
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(raw)
                .to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "name" => disposition.name = Some(value),
                "filename" => disposition.filename = Some(value),
                _ => {}
            }
        }
        disposition
    }
}

/// Split on `separator`, ignoring separators inside double quotes.
fn split_unquoted(value: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c == separator && !quoted => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// One decoded part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDataPart {
    pub headers: Headers,
    pub content_disposition: Option<ContentDisposition>,
    /// Part content; `None` when the part has no content bytes.
    pub file: Option<TypedContent>,
}

/// Header fields recognised while reading a part's header block.
#[derive(Debug, Default)]
pub(crate) struct PartHeaders {
    pub headers: Headers,
    pub content_disposition: Option<ContentDisposition>,
    pub content_type: Option<MediaType>,
}

pub(crate) fn parse_header_block(block: &str) -> PartHeaders {
    let mut parsed = PartHeaders::default();
    for line in block.lines().map(|l| l.trim_end_matches('\r')) {
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = CONTENT_DISPOSITION_LINE.captures(line) {
            parsed.content_disposition = Some(ContentDisposition::parse(&caps[1]));
        } else if let Some(caps) = CONTENT_TYPE_LINE.captures(line) {
            parsed.content_type = MediaType::parse(&caps[1]);
        }
        if let Some(caps) = HEADER_LINE.captures(line) {
            parsed.headers.insert(&caps[1], caps[2].to_string());
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_disposition() {
        let cd = ContentDisposition::parse(r#"form-data; name="upload"; filename="a;b.txt""#);
        assert_eq!(cd.disposition_type, "form-data");
        assert_eq!(cd.name.as_deref(), Some("upload"));
        assert_eq!(cd.filename.as_deref(), Some("a;b.txt"));
    }

    #[test]
    fn test_parse_unquoted_disposition() {
        let cd = ContentDisposition::parse("Form-Data; NAME=field");
        assert_eq!(cd.disposition_type, "form-data");
        assert_eq!(cd.name.as_deref(), Some("field"));
        assert_eq!(cd.filename, None);
    }

    #[test]
    fn test_parse_header_block_case_insensitive() {
        let parsed = parse_header_block(
            "CONTENT-DISPOSITION: form-data; name=\"f\"\r\ncontent-type: image/png\r\nX-Extra: 1\r\n",
        );
        assert_eq!(
            parsed.content_disposition.unwrap().name.as_deref(),
            Some("f")
        );
        assert_eq!(parsed.content_type.unwrap().essence(), "image/png");
        assert_eq!(parsed.headers.first("x-extra").map(String::as_str), Some("1"));
        assert_eq!(parsed.headers.len(), 3);
    }
}
