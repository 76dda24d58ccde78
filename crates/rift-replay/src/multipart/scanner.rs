//! Sliding-window boundary search.

use aho_corasick::AhoCorasick;

/// Bytes examined per window, in addition to the boundary length.
pub const WINDOW_SIZE: usize = 4096;

/// Offsets of every occurrence of `needle` in `data`.
///
/// The buffer is scanned in windows of `WINDOW_SIZE + needle.len()` bytes
/// that overlap by the needle length, so a delimiter straddling two windows
/// is still found exactly once.
pub fn find_all(data: &[u8], needle: &[u8]) -> Result<Vec<usize>, aho_corasick::BuildError> {
    let finder = AhoCorasick::new([needle])?;
    let mut offsets = Vec::new();
    let mut start = 0;
    while start < data.len() {
        let end = (start + WINDOW_SIZE + needle.len()).min(data.len());
        for m in finder.find_iter(&data[start..end]) {
            // Matches starting past the window proper belong to the next window
            if m.start() < WINDOW_SIZE {
                offsets.push(start + m.start());
            }
        }
        start += WINDOW_SIZE;
    }
    Ok(offsets)
}
