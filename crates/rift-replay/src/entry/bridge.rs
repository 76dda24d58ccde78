//! The narrow interface a corpus-format adapter implements.

use crate::codec::{can_serve_original_encoding, parse_content_encodings, CodecRegistry};
use crate::error::{ParseError, ReplayError};
use crate::model::{ByteSource, NormalizedRequest, ResponseData};
use tracing::debug;

/// Decides how an unencoded (identity) response body is finally encoded.
pub trait EncodingPolicy: Send + Sync {
    fn transform_unencoded(&self, data: ResponseData) -> Result<ResponseData, ReplayError>;
}

/// Serve unencoded bodies as identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityEncodingPolicy;

impl EncodingPolicy for IdentityEncodingPolicy {
    fn transform_unencoded(&self, data: ResponseData) -> Result<ResponseData, ReplayError> {
        Ok(data)
    }
}

/// Read access to one corpus entry of type `E`.
///
/// The core never parses an on-disk capture format itself; adapters expose
/// their entries through this trait and the [`EntryParser`](super::EntryParser)
/// normalizes them.
pub trait EntryBridge<E>: Send + Sync {
    fn request_method(&self, entry: &E) -> Result<String, ParseError>;

    fn request_url(&self, entry: &E) -> Result<String, ParseError>;

    fn request_headers(&self, entry: &E) -> Vec<(String, String)>;

    fn request_body(&self, entry: &E) -> Result<Option<ByteSource>, ParseError>;

    fn response_status(&self, entry: &E) -> u16;

    /// Response data for `entry` as served to `request`.
    fn response_data(
        &self,
        request: &NormalizedRequest,
        entry: &E,
        policy: &dyn EncodingPolicy,
    ) -> Result<ResponseData, ReplayError>;
}

/// Serve `recorded` with its original content encoding when the client
/// accepts it; otherwise decode it to identity, drop `Content-Encoding`, and
/// let `policy` choose the final encoding.
pub fn negotiate_encoding(
    request: &NormalizedRequest,
    recorded: ResponseData,
    registry: &CodecRegistry,
    policy: &dyn EncodingPolicy,
) -> Result<ResponseData, ReplayError> {
    let declared = recorded
        .header_values("content-encoding")
        .collect::<Vec<_>>()
        .join(",");
    let encodings = parse_content_encodings(Some(declared.as_str()));
    let accept = request.header("accept-encoding");
    if !encodings.is_empty() && can_serve_original_encoding(&encodings, accept) {
        return Ok(recorded);
    }
    if encodings.is_empty() {
        return policy.transform_unencoded(recorded);
    }

    debug!(
        ?encodings,
        accept_encoding = accept.unwrap_or(""),
        "client cannot accept recorded encoding, decoding to identity"
    );
    let decoded = registry.decode_chain(&encodings, &recorded.read_body()?)?;
    let unencoded = recorded
        .transform()
        .filter_headers(|name, _| !name.eq_ignore_ascii_case("content-encoding"))
        .map_body(move |_| ByteSource::from(decoded))
        .transform();
    policy.transform_unencoded(unencoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HttpMethod, MediaType};

    fn gzipped_response(registry: &CodecRegistry) -> ResponseData {
        let body = registry.get("gzip").unwrap().compress(b"hello gzip").unwrap();
        ResponseData::new(
            vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("Content-Encoding".to_string(), "gzip".to_string()),
            ],
            MediaType::parse("text/plain"),
            ByteSource::from(body),
        )
    }

    #[test]
    fn test_original_encoding_served_when_accepted() {
        let registry = CodecRegistry::default();
        let request = NormalizedRequest::parse(HttpMethod::Get, "http://a.test/")
            .unwrap()
            .with_header("Accept-Encoding", "gzip, deflate");
        let data =
            negotiate_encoding(&request, gzipped_response(&registry), &registry, &IdentityEncodingPolicy)
                .unwrap();
        assert_eq!(data.first_header("content-encoding"), Some("gzip"));
        assert_ne!(&data.read_body().unwrap()[..], b"hello gzip");
    }

    #[test]
    fn test_decoded_when_not_accepted() {
        let registry = CodecRegistry::default();
        let request = NormalizedRequest::parse(HttpMethod::Get, "http://a.test/").unwrap();
        let data =
            negotiate_encoding(&request, gzipped_response(&registry), &registry, &IdentityEncodingPolicy)
                .unwrap();
        assert_eq!(data.first_header("content-encoding"), None);
        assert_eq!(&data.read_body().unwrap()[..], b"hello gzip");
    }

    struct TaggingPolicy;

    impl EncodingPolicy for TaggingPolicy {
        fn transform_unencoded(&self, data: ResponseData) -> Result<ResponseData, ReplayError> {
            Ok(data.transform().replace_header("X-Policy", "applied").transform())
        }
    }

    #[test]
    fn test_policy_sees_only_unencoded_data() {
        let registry = CodecRegistry::default();
        let accepting = NormalizedRequest::parse(HttpMethod::Get, "http://a.test/")
            .unwrap()
            .with_header("accept-encoding", "gzip");
        let served =
            negotiate_encoding(&accepting, gzipped_response(&registry), &registry, &TaggingPolicy)
                .unwrap();
        assert_eq!(served.first_header("x-policy"), None);

        let plain = ResponseData::new(Vec::new(), None, ByteSource::from("plain"));
        let served = negotiate_encoding(&accepting, plain, &registry, &TaggingPolicy).unwrap();
        assert_eq!(served.first_header("x-policy"), Some("applied"));
    }

    #[test]
    fn test_corrupt_recorded_body_is_an_error() {
        let registry = CodecRegistry::default();
        let request = NormalizedRequest::parse(HttpMethod::Get, "http://a.test/").unwrap();
        let recorded = ResponseData::new(
            vec![("Content-Encoding".to_string(), "gzip".to_string())],
            None,
            ByteSource::from("not gzip"),
        );
        let result = negotiate_encoding(&request, recorded, &registry, &IdentityEncodingPolicy);
        assert!(matches!(result, Err(ReplayError::Codec(_))));
    }
}
