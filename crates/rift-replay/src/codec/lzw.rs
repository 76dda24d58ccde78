//! Legacy Unix `compress` (`.Z`) codec.
//!
//! LZW with 9 to `max_bits` bit codes in block mode. Codes are packed
//! least-significant-bit first in groups of eight; whenever the code width
//! changes (or a CLEAR code is seen) the rest of the current group is
//! skipped, matching the historic `compress` output layout.
//!
//! This is a best-effort implementation: the encoder never emits CLEAR, so
//! it stops growing the dictionary once full instead of adapting to the
//! compression ratio like the original tool.

use super::{CodecError, ContentCodec};
use std::collections::HashMap;
use std::io;

const MAGIC: [u8; 2] = [0x1f, 0x9d];
const BLOCK_MODE: u8 = 0x80;
const BITS_MASK: u8 = 0x1f;
const INIT_BITS: u32 = 9;
const MIN_MAX_BITS: u32 = 9;
const MAX_MAX_BITS: u32 = 16;
const CLEAR: u32 = 256;
const FIRST: u32 = 257;
const GROUP: u32 = 8;

fn invalid(msg: &str) -> CodecError {
    CodecError::decompress(
        "compress",
        io::Error::new(io::ErrorKind::InvalidData, msg.to_string()),
    )
}

#[derive(Debug, Clone, Copy)]
pub struct CompressCodec {
    max_bits: u32,
}

impl Default for CompressCodec {
    fn default() -> Self {
        Self::new(MAX_MAX_BITS)
    }
}

impl CompressCodec {
    pub fn new(max_bits: u32) -> Self {
        Self {
            max_bits: max_bits.clamp(MIN_MAX_BITS, MAX_MAX_BITS),
        }
    }
}

struct BitWriter {
    out: Vec<u8>,
    acc: u64,
    pending: u32,
    group_pos: u32,
}

impl BitWriter {
    fn write(&mut self, code: u32, n_bits: u32) {
        self.acc |= u64::from(code) << self.pending;
        self.pending += n_bits;
        while self.pending >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.pending -= 8;
        }
        self.group_pos = (self.group_pos + 1) % GROUP;
    }

    fn pad_group(&mut self, n_bits: u32) {
        while self.group_pos != 0 {
            self.write(0, n_bits);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.pending > 0 {
            self.out.push(self.acc as u8);
        }
        self.out
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
    group_pos: u32,
}

impl BitReader<'_> {
    fn read(&mut self, n_bits: u32) -> Option<u32> {
        let n = n_bits as usize;
        if self.bit_pos + n > self.data.len() * 8 {
            return None;
        }
        let mut code = 0u32;
        for i in 0..n {
            let bit = self.bit_pos + i;
            if self.data[bit / 8] & (1 << (bit % 8)) != 0 {
                code |= 1 << i;
            }
        }
        self.bit_pos += n;
        self.group_pos = (self.group_pos + 1) % GROUP;
        Some(code)
    }

    fn skip_group(&mut self, n_bits: u32) {
        let remaining = (GROUP - self.group_pos) % GROUP;
        self.bit_pos += (remaining * n_bits) as usize;
        self.group_pos = 0;
    }
}

impl ContentCodec for CompressCodec {
    fn name(&self) -> &'static str {
        "compress"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut writer = BitWriter {
            out: vec![MAGIC[0], MAGIC[1], BLOCK_MODE | self.max_bits as u8],
            acc: 0,
            pending: 0,
            group_pos: 0,
        };
        let Some((&first, rest)) = data.split_first() else {
            return Ok(writer.finish());
        };

        let max_entries = 1u32 << self.max_bits;
        let mut dictionary: HashMap<(u32, u8), u32> = HashMap::new();
        let mut n_bits = INIT_BITS;
        let mut max_code = (1u32 << n_bits) - 1;
        let mut free_ent = FIRST;
        let mut ent = u32::from(first);

        let mut emit = |writer: &mut BitWriter, code: u32, free_ent: u32| {
            writer.write(code, n_bits);
            if free_ent > max_code && n_bits < self.max_bits {
                writer.pad_group(n_bits);
                n_bits += 1;
                max_code = (1u32 << n_bits) - 1;
            }
        };

        for &byte in rest {
            if let Some(&code) = dictionary.get(&(ent, byte)) {
                ent = code;
                continue;
            }
            emit(&mut writer, ent, free_ent);
            if free_ent < max_entries {
                dictionary.insert((ent, byte), free_ent);
                free_ent += 1;
            }
            ent = u32::from(byte);
        }
        emit(&mut writer, ent, free_ent);
        Ok(writer.finish())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() < 3 || data[..2] != MAGIC {
            return Err(invalid("missing compress magic header"));
        }
        let flags = data[2];
        let max_bits = u32::from(flags & BITS_MASK);
        if !(MIN_MAX_BITS..=MAX_MAX_BITS).contains(&max_bits) {
            return Err(invalid("unsupported maximum code width"));
        }
        let block_mode = flags & BLOCK_MODE != 0;
        let first_free = if block_mode { FIRST } else { CLEAR };
        let max_entries = 1u32 << max_bits;

        let mut prefix = vec![0u32; max_entries as usize];
        let mut suffix = vec![0u8; max_entries as usize];
        for (i, s) in suffix.iter_mut().enumerate().take(256) {
            *s = i as u8;
        }

        let mut reader = BitReader {
            data: &data[3..],
            bit_pos: 0,
            group_pos: 0,
        };
        let mut output = Vec::new();
        let mut n_bits = INIT_BITS;
        let mut max_code = (1u32 << n_bits) - 1;
        let mut free_ent = first_free;
        let mut previous: Option<u32> = None;
        let mut stack = Vec::new();

        while let Some(code) = reader.read(n_bits) {
            if block_mode && code == CLEAR {
                reader.skip_group(n_bits);
                n_bits = INIT_BITS;
                max_code = (1u32 << n_bits) - 1;
                free_ent = first_free;
                previous = None;
                continue;
            }

            stack.clear();
            let mut current = if code < free_ent {
                code
            } else if code == free_ent {
                // KwKwK: the code being defined right now
                let prev = previous.ok_or_else(|| invalid("invalid first code"))?;
                stack.push(0); // patched once the first byte is known
                prev
            } else {
                return Err(invalid("code out of range"));
            };
            if previous.is_none() && current >= 256 {
                return Err(invalid("invalid first code"));
            }
            while current >= 256 {
                stack.push(suffix[current as usize]);
                current = prefix[current as usize];
            }
            let first_byte = current as u8;
            stack.push(first_byte);
            if code == free_ent {
                stack[0] = first_byte;
            }
            output.extend(stack.iter().rev());

            if let Some(prev) = previous {
                if free_ent < max_entries {
                    prefix[free_ent as usize] = prev;
                    suffix[free_ent as usize] = first_byte;
                    free_ent += 1;
                }
            }
            previous = Some(code);

            if free_ent > max_code && n_bits < max_bits {
                reader.skip_group(n_bits);
                n_bits += 1;
                max_code = (1u32 << n_bits) - 1;
            }
        }
        Ok(output)
    }
}
