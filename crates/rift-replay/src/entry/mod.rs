//! Corpus entry bridge and parser.
//!
//! - `bridge` - the adapter contract and encoding negotiation helper
//! - `parser` - normalization into [`ParsedEntry`] records
//! - `capture` - reference adapter for a HAR-like JSON format

mod bridge;
mod capture;
mod parser;

pub use bridge::{negotiate_encoding, EncodingPolicy, EntryBridge, IdentityEncodingPolicy};
pub use capture::{
    load_capture, CapturedContent, CapturedEntry, CapturedEntryBridge, CapturedRequest,
    CapturedResponse, NameValue,
};
pub use parser::{fix_content_length, EntryParser, ParsedEntry, ResponseCreator};
