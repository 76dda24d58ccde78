//! Content-encoding codecs and Accept-Encoding negotiation.
//!
//! Codecs are looked up by encoding name through a [`CodecRegistry`]. Each
//! codec is stateless per call, so a registry can be shared freely between
//! request handlers.
//!
//! # Module Structure
//!
//! - `flate` - gzip and deflate (zlib) via `flate2`
//! - `br` - brotli
//! - `lzw` - legacy Unix `compress` (best-effort)
//! - `negotiation` - Accept-Encoding parsing and servability checks

mod br;
mod flate;
mod lzw;
mod negotiation;

pub use br::BrotliCodec;
pub use flate::{DeflateCodec, GzipCodec};
pub use lzw::CompressCodec;
pub use negotiation::{can_serve_original_encoding, parse_accept_encoding, AcceptEncoding};

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

/// Codec failures. Compression and decompression errors carry the encoding name.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unsupported content encoding: {0}")]
    UnknownEncoding(String),
    #[error("{encoding} compression failed: {source}")]
    Compress {
        encoding: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{encoding} decompression failed: {source}")]
    Decompress {
        encoding: &'static str,
        #[source]
        source: io::Error,
    },
}

impl CodecError {
    pub(crate) fn compress(encoding: &'static str, source: io::Error) -> Self {
        CodecError::Compress { encoding, source }
    }

    pub(crate) fn decompress(encoding: &'static str, source: io::Error) -> Self {
        CodecError::Decompress { encoding, source }
    }
}

/// A content-encoding codec.
pub trait ContentCodec: Send + Sync {
    /// Canonical encoding name, e.g. `gzip`.
    fn name(&self) -> &'static str;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// The no-op `identity` codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityCodec;

impl ContentCodec for IdentityCodec {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }
}

/// Name-indexed set of codecs. Names are matched case-insensitively.
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn ContentCodec>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("identity", Arc::new(IdentityCodec));
        let gzip: Arc<dyn ContentCodec> = Arc::new(GzipCodec::default());
        registry.register("gzip", Arc::clone(&gzip));
        registry.register("x-gzip", gzip);
        registry.register("deflate", Arc::new(DeflateCodec::default()));
        registry.register("br", Arc::new(BrotliCodec::default()));
        let compress: Arc<dyn ContentCodec> = Arc::new(CompressCodec::default());
        registry.register("compress", Arc::clone(&compress));
        registry.register("x-compress", compress);
        registry
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.codecs.keys().collect();
        names.sort();
        f.debug_struct("CodecRegistry").field("codecs", &names).finish()
    }
}

impl CodecRegistry {
    /// A registry with no codecs, not even identity.
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, codec: Arc<dyn ContentCodec>) {
        self.codecs.insert(name.trim().to_ascii_lowercase(), codec);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ContentCodec>, CodecError> {
        self.codecs
            .get(&name.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| CodecError::UnknownEncoding(name.to_string()))
    }

    /// Undo `encodings` (listed in the order they were applied).
    pub fn decode_chain(&self, encodings: &[String], data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut current = data.to_vec();
        for encoding in encodings.iter().rev() {
            current = self.get(encoding)?.decompress(&current)?;
        }
        Ok(current)
    }

    /// Apply `encodings` in order.
    pub fn encode_chain(&self, encodings: &[String], data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut current = data.to_vec();
        for encoding in encodings {
            current = self.get(encoding)?.compress(&current)?;
        }
        Ok(current)
    }
}

/// Split a `Content-Encoding` header into its non-trivial encodings.
///
/// `identity` and empty tokens are dropped; names are lower-cased.
pub fn parse_content_encodings(header: Option<&str>) -> Vec<String> {
    header
        .map(|value| {
            value
                .split(',')
                .map(|token| token.trim().to_ascii_lowercase())
                .filter(|token| !token.is_empty() && token != "identity")
                .collect()
        })
        .unwrap_or_default()
}
