//! Byte/character offset translation for source text.
//!
//! The collector reports byte offsets into the raw file, while render surfaces
//! address text by character. Text is decoded the same way
//! `String::from_utf8_lossy` decodes it: each valid UTF-8 sequence is one
//! character and each maximal invalid sequence is one U+FFFD. Character
//! offsets computed here therefore always index into the displayed text.
use std::iter;
use std::ops::Range;

/// A decoded character: byte position, encoded width, value.
type Unit = (usize, usize, char);

/// Decode the first character of `window` (at most four bytes).
fn decode_one(window: &[u8]) -> (char, usize) {
    let (valid, invalid_len) = match std::str::from_utf8(window) {
        Ok(s) => (s, 0),
        Err(e) => (
            std::str::from_utf8(&window[..e.valid_up_to()]).unwrap_or_default(),
            e.error_len().unwrap_or(window.len() - e.valid_up_to()),
        ),
    };
    match valid.chars().next() {
        Some(ch) => (ch, ch.len_utf8()),
        None => (char::REPLACEMENT_CHARACTER, invalid_len.max(1)),
    }
}

struct Decoder<'a> {
    blob: &'a [u8],
    pos: usize,
}

impl Iterator for Decoder<'_> {
    type Item = Unit;

    fn next(&mut self) -> Option<Unit> {
        let rest = &self.blob[self.pos..];
        if rest.is_empty() {
            return None;
        }
        let (ch, width) = decode_one(&rest[..rest.len().min(4)]);
        let unit = (self.pos, width, ch);
        self.pos += width;
        Some(unit)
    }
}

fn decode(blob: &[u8]) -> Decoder<'_> {
    Decoder { blob, pos: 0 }
}

/// Number of displayed characters in `blob`.
#[must_use]
pub fn char_count(blob: &[u8]) -> usize {
    decode(blob).count()
}

/// Translate a byte offset into a character offset.
///
/// Returns `None` when the offset falls inside an encoded character or past
/// the end of the blob. `blob.len()` maps to the total character count.
#[must_use]
pub fn byte_to_char_offset(blob: &[u8], byte_offset: usize) -> Option<usize> {
    char_offsets(blob, &[byte_offset]).pop().flatten()
}

/// Translate many byte offsets at once with a single pass over `blob`.
///
/// The result is parallel to `byte_offsets`, which may be in any order.
#[must_use]
pub fn char_offsets(blob: &[u8], byte_offsets: &[usize]) -> Vec<Option<usize>> {
    let mut order: Vec<usize> = (0..byte_offsets.len()).collect();
    order.sort_by_key(|&i| byte_offsets[i]);

    let mut out = vec![None; byte_offsets.len()];
    let mut queries = order.into_iter().peekable();
    let mut chars = 0;

    for (pos, _, _) in decode(blob) {
        while let Some(&i) = queries.peek() {
            let wanted = byte_offsets[i];
            if wanted > pos {
                break;
            }
            if wanted == pos {
                out[i] = Some(chars);
            }
            queries.next();
        }
        if queries.peek().is_none() {
            return out;
        }
        chars += 1;
    }

    for i in queries {
        if byte_offsets[i] == blob.len() {
            out[i] = Some(chars);
        }
    }
    out
}

/// Translate a character offset back into a byte offset.
#[must_use]
pub fn char_to_byte_offset(blob: &[u8], char_offset: usize) -> Option<usize> {
    decode(blob)
        .map(|(pos, _, _)| pos)
        .chain(iter::once(blob.len()))
        .nth(char_offset)
}

/// Split the highlight for `slice`, which starts at character `start_char` of
/// the displayed text, into sub-ranges that leave out line indentation.
///
/// After each newline the whitespace that follows is skipped; the next
/// non-whitespace character opens a new sub-range. Empty sub-ranges are
/// dropped.
#[must_use]
pub fn highlight_nicely(slice: &[u8], start_char: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut flush = |range: Range<usize>| {
        if !range.is_empty() {
            ranges.push(range);
        }
    };

    let mut skipping = false;
    let mut begin = start_char;
    let mut c = start_char;
    for (_, _, ch) in decode(slice) {
        if !skipping {
            if ch == '\n' {
                flush(begin..c);
                skipping = true;
            }
        } else if !ch.is_whitespace() {
            begin = c;
            skipping = false;
        }
        c += 1;
    }
    if !skipping {
        flush(begin..c);
    }
    ranges
}
