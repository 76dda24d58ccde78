//! Request/response value model.
//!
//! - `method` - enumerated HTTP verbs
//! - `multimap` - ordered multimap for query parameters and headers
//! - `media_type` - parsed content types
//! - `body` - byte sources and typed content
//! - `request` - normalized request and URL
//! - `response` - response data and complete responses

mod body;
mod media_type;
mod method;
mod multimap;
mod request;
mod response;

pub use body::{ByteSource, TypedContent};
pub use media_type::{MediaType, APPLICATION_OCTET_STREAM, FORM_URLENCODED, MULTIPART_FORM_DATA};
pub use method::{HttpMethod, UnsupportedMethod};
pub use multimap::Multimap;
pub use request::{
    parse_query_params, Headers, NormalizedRequest, QueryParams, RequestSignature, RequestUrl,
};
pub use response::{ReplayResponse, ResponseData};
