//! `multipart/form-data` decoder.
//!
//! The body is scanned for every `--boundary` delimiter; each pair of
//! consecutive delimiters frames one part, made of a header block (at most
//! [`MAX_HEADER_SIZE`] bytes, terminated by a blank line) followed by the
//! part content. The CRLF preceding the next delimiter is not part of the
//! content.

mod part;
mod scanner;

pub use part::{ContentDisposition, FormDataPart};

use crate::model::{MediaType, TypedContent};
use bytes::Bytes;
use part::parse_header_block;
use tracing::trace;

/// Maximum size of a single part's header block, in bytes.
pub const MAX_HEADER_SIZE: usize = 1024;

/// A body that cannot be decoded as `multipart/form-data`.
///
/// Surfaced to clients as `400 Bad Request`.
#[derive(Debug, thiserror::Error)]
pub enum MultipartError {
    #[error("bad multipart body: content type has no boundary")]
    MissingBoundary,
    #[error("bad multipart body: part header block exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },
    #[error("bad multipart body: {0}")]
    Malformed(String),
}

impl MultipartError {
    /// HTTP status to report for this failure.
    pub fn status_code(&self) -> u16 {
        400
    }
}

/// Decode `body` according to the boundary declared by `content_type`.
pub fn decode(content_type: &MediaType, body: &[u8]) -> Result<Vec<FormDataPart>, MultipartError> {
    let boundary = content_type
        .parameter("boundary")
        .filter(|b| !b.is_empty())
        .ok_or(MultipartError::MissingBoundary)?;
    let delimiter = format!("--{boundary}");
    let offsets = scanner::find_all(body, delimiter.as_bytes())
        .map_err(|e| MultipartError::Malformed(e.to_string()))?;
    trace!(boundary, delimiters = offsets.len(), "scanned multipart body");

    let mut parts = Vec::with_capacity(offsets.len().saturating_sub(1));
    for pair in offsets.windows(2) {
        let start = pair[0] + delimiter.len();
        parts.push(decode_part(body, start, pair[1])?);
    }
    Ok(parts)
}

fn decode_part(body: &[u8], start: usize, next_delimiter: usize) -> Result<FormDataPart, MultipartError> {
    // Skip the remainder of the delimiter line (transport padding + CRLF)
    let region = &body[start..next_delimiter];
    let line_end = region
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| MultipartError::Malformed("delimiter line is not terminated".to_string()))?;
    let headers_start = start + line_end + 1;
    let region = &body[headers_start..next_delimiter];

    let (header_len, separator_len) = find_header_end(region)?;
    let header_block = String::from_utf8_lossy(&region[..header_len]);
    let headers = parse_header_block(&header_block);

    let content_start = headers_start + header_len + separator_len;
    let mut content_end = next_delimiter;
    if content_end > content_start && body[content_end - 1] == b'\n' {
        content_end -= 1;
    }
    if content_end > content_start && body[content_end - 1] == b'\r' {
        content_end -= 1;
    }
    let content = &body[content_start..content_end.max(content_start)];

    let file = (!content.is_empty()).then(|| {
        let media_type = headers
            .content_type
            .clone()
            .unwrap_or_else(|| MediaType::new("multipart", "form-data"));
        TypedContent::new(media_type, Bytes::copy_from_slice(content))
    });
    Ok(FormDataPart {
        headers: headers.headers,
        content_disposition: headers.content_disposition,
        file,
    })
}

/// Length of the header block and of the blank-line separator that ends it.
fn find_header_end(region: &[u8]) -> Result<(usize, usize), MultipartError> {
    // A part without headers starts directly with the blank line
    if region.starts_with(b"\r\n") {
        return Ok((0, 2));
    }
    if region.starts_with(b"\n") {
        return Ok((0, 1));
    }
    let limit = region.len().min(MAX_HEADER_SIZE + 4);
    let window = &region[..limit];
    let crlf = window.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p + 2, 2));
    let lf = window.windows(2).position(|w| w == b"\n\n").map(|p| (p + 1, 1));
    let found = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match found {
        Some((len, _)) if len > MAX_HEADER_SIZE => Err(MultipartError::HeaderTooLarge {
            limit: MAX_HEADER_SIZE,
        }),
        Some(end) => Ok(end),
        None if region.len() > MAX_HEADER_SIZE => Err(MultipartError::HeaderTooLarge {
            limit: MAX_HEADER_SIZE,
        }),
        None => Err(MultipartError::Malformed(
            "part header block is not terminated".to_string(),
        )),
    }
}
