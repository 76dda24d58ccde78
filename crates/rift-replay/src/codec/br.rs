//! Brotli codec.

use super::{CodecError, ContentCodec};
use std::io::{Read, Write};

const BUFFER_SIZE: usize = 4096;
const LG_WINDOW: u32 = 22;

#[derive(Debug, Clone, Copy)]
pub struct BrotliCodec {
    quality: u32,
}

impl Default for BrotliCodec {
    fn default() -> Self {
        Self::new(9)
    }
}

impl BrotliCodec {
    /// Quality in the range 0-11.
    pub fn new(quality: u32) -> Self {
        Self {
            quality: quality.min(11),
        }
    }
}

impl ContentCodec for BrotliCodec {
    fn name(&self) -> &'static str {
        "br"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut output = Vec::new();
        {
            let mut writer =
                ::brotli::CompressorWriter::new(&mut output, BUFFER_SIZE, self.quality, LG_WINDOW);
            writer
                .write_all(data)
                .map_err(|e| CodecError::compress("br", e))?;
            writer.flush().map_err(|e| CodecError::compress("br", e))?;
            // dropping the writer finishes the stream
        }
        Ok(output)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut output = Vec::new();
        ::brotli::Decompressor::new(data, BUFFER_SIZE)
            .read_to_end(&mut output)
            .map_err(|e| CodecError::decompress("br", e))?;
        Ok(output)
    }
}
