//! gzip and deflate codecs backed by `flate2`.

use super::{CodecError, ContentCodec};
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use std::io::{Read, Write};

/// Default compression level for gzip and deflate (range: 0-9)
pub const DEFAULT_FLATE_LEVEL: u32 = 6;

#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: u32,
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self::new(DEFAULT_FLATE_LEVEL)
    }
}

impl GzipCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.clamp(0, 9),
        }
    }
}

impl ContentCodec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| CodecError::compress("gzip", e))?;
        encoder.finish().map_err(|e| CodecError::compress("gzip", e))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut output = Vec::new();
        GzDecoder::new(data)
            .read_to_end(&mut output)
            .map_err(|e| CodecError::decompress("gzip", e))?;
        Ok(output)
    }
}

/// HTTP `deflate`: zlib-wrapped on output, zlib or raw deflate accepted on input.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    level: u32,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self::new(DEFAULT_FLATE_LEVEL)
    }
}

impl DeflateCodec {
    pub fn new(level: u32) -> Self {
        Self {
            level: level.clamp(0, 9),
        }
    }
}

impl ContentCodec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| CodecError::compress("deflate", e))?;
        encoder
            .finish()
            .map_err(|e| CodecError::compress("deflate", e))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut output = Vec::new();
        if ZlibDecoder::new(data).read_to_end(&mut output).is_ok() {
            return Ok(output);
        }
        // Some servers send raw deflate streams without the zlib wrapper
        output.clear();
        DeflateDecoder::new(data)
            .read_to_end(&mut output)
            .map_err(|e| CodecError::decompress("deflate", e))?;
        Ok(output)
    }
}
