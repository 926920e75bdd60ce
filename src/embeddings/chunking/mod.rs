
use crate::{DocqaError, Result};

/// Overlapping fixed-size windows over a text.
///
/// Offsets are measured in characters, not bytes, so multi-byte text never
/// splits inside a code point. The iterator is lazy and deterministic:
/// identical `(text, size, overlap)` always yields the identical sequence.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    /// Byte offset of the next window start.
    start: usize,
    size: usize,
    step: usize,
}

/// Split `text` into windows of `size` characters, each window starting
/// `size - overlap` characters after the previous one. The final window may
/// be shorter than `size`; it is never dropped. Iteration ends with the
/// window that reaches the end of the text, so no window is a strict suffix
/// of its predecessor.
///
/// Returns a validation error when `size` is zero or `overlap >= size` (the
/// window would never advance), before any iteration happens.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Chunks<'_>> {
    if size == 0 {
        return Err(DocqaError::Validation(
            "chunk size must be greater than 0".to_string(),
        ));
    }

    if overlap >= size {
        return Err(DocqaError::Validation(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, size
        )));
    }

    Ok(Chunks {
        text,
        start: 0,
        size,
        step: size - overlap,
    })
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.start >= self.text.len() {
            return None;
        }

        let rest = &self.text[self.start..];
        let end = char_offset(rest, self.size).map_or(self.text.len(), |i| self.start + i);
        let item = &self.text[self.start..end];

        self.start = if end == self.text.len() {
            // This window covered the tail; a further window would only
            // repeat a suffix of it.
            self.text.len()
        } else {
            char_offset(rest, self.step).map_or(self.text.len(), |i| self.start + i)
        };

        Some(item)
    }
}

/// Byte offset of the `n`-th character of `text`, or `None` when the text
/// holds fewer than `n` characters.
fn char_offset(text: &str, n: usize) -> Option<usize> {
    text.char_indices().nth(n).map(|(i, _)| i)
}
