//! Split point selection inside a page.

use unicode_segmentation::UnicodeSegmentation;

/// Character-indexed view of one page.
pub(super) struct PageText<'a> {
    text: &'a str,
    /// Byte offset of every char, plus the total length.
    offsets: Vec<usize>,
    whitespace_before: Vec<bool>,
    sentence_start: Vec<bool>,
}

impl<'a> PageText<'a> {
    pub(super) fn new(text: &'a str) -> Self {
        let mut offsets = Vec::with_capacity(text.len() + 1);
        let mut whitespace_before = vec![false];
        for (byte, ch) in text.char_indices() {
            offsets.push(byte);
            whitespace_before.push(ch.is_whitespace());
        }
        offsets.push(text.len());

        let chars = offsets.len() - 1;
        let mut sentence_start = vec![false; chars + 1];
        let mut position = 0;
        for sentence in text.split_sentence_bounds() {
            sentence_start[position] = true;
            position += sentence.chars().count();
        }
        sentence_start[0] = false;

        Self {
            text,
            offsets,
            whitespace_before,
            sentence_start,
        }
    }

    /// Number of chars on the page.
    pub(super) fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Text between two char positions.
    pub(super) fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    /// Picks the end of a chunk within `lo..=hi`.
    ///
    /// The latest sentence start wins, then the latest position following whitespace,
    /// otherwise `hi`.
    pub(super) fn split_point(&self, lo: usize, hi: usize) -> usize {
        let window = lo..=hi;
        window
            .clone()
            .rev()
            .find(|&pos| self.sentence_start[pos])
            .or_else(|| window.rev().find(|&pos| self.whitespace_before[pos]))
            .unwrap_or(hi)
    }
}
