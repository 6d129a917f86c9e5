//! Recursive text splitter.
//!
//! Splits a document into overlapping chunks of at most `chunk_size`
//! characters. Text is first cut at the coarsest boundary that occurs in it
//! (paragraph, line, sentence, word), recursing into any piece that is still
//! too long, and falling back to fixed-size character windows. The pieces are
//! then greedily merged back into chunks; consecutive chunks share at most
//! `chunk_overlap` characters.
//!
//! Every chunk is a slice of the input. Chunks cover the input without gaps,
//! so stitching them back together (dropping the overlap) yields the original
//! text exactly.

use std::collections::VecDeque;
use std::ops::Range;

/// Invalid splitter parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SplitterError {
    #[error("chunk_size must be greater than 0")]
    ZeroChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

impl Default for TextSplitter {
    /// 1000-character chunks with 200 characters of overlap.
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Boundary levels, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARIES: [Boundary; 4] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
];

/// Splits text into overlapping, size-bounded chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, SplitterError> {
        if chunk_size == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(SplitterError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Chunks of `text`, in document order.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            ranges: self.chunk_ranges(text).into_iter(),
        }
    }

    /// Chunks of `text` paired with their byte offset into `text`.
    pub fn chunk_indices<'a>(&self, text: &'a str) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        self.chunk_ranges(text)
            .into_iter()
            .map(move |r| (r.start, &text[r]))
    }

    fn chunk_ranges(&self, text: &str) -> Vec<Range<usize>> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.split_into(text, 0..text.len(), 0, &mut pieces);
        self.merge(text, pieces)
    }

    /// Recursively cut `range` into pieces of at most `chunk_size` chars.
    fn split_into(&self, text: &str, range: Range<usize>, level: usize, out: &mut Vec<Range<usize>>) {
        let slice = &text[range.clone()];
        if slice.chars().count() <= self.chunk_size {
            out.push(range);
            return;
        }

        for (offset, boundary) in BOUNDARIES.iter().enumerate().skip(level) {
            let parts = split_at(slice, *boundary);
            if parts.len() > 1 {
                for part in parts {
                    let abs = range.start + part.start..range.start + part.end;
                    self.split_into(text, abs, offset + 1, out);
                }
                return;
            }
        }

        // No boundary left: fixed-size character windows.
        let mut start = range.start;
        let mut count = 0;
        for (i, _) in slice.char_indices() {
            if count == self.chunk_size {
                out.push(start..range.start + i);
                start = range.start + i;
                count = 0;
            }
            count += 1;
        }
        out.push(start..range.end);
    }

    /// Greedily merge adjacent pieces into chunks, carrying up to
    /// `chunk_overlap` chars of trailing pieces into the next chunk.
    fn merge(&self, text: &str, pieces: Vec<Range<usize>>) -> Vec<Range<usize>> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = text[piece.clone()].chars().count();

            if total + len > self.chunk_size {
                if let (Some(front), Some(back)) = (window.front(), window.back()) {
                    chunks.push(front.0.start..back.0.end);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        if let (Some(front), Some(back)) = (window.front(), window.back()) {
            chunks.push(front.0.start..back.0.end);
        }
        chunks
    }
}

/// Byte ranges of `text` cut after each occurrence of `boundary`.
fn split_at(text: &str, boundary: Boundary) -> Vec<Range<usize>> {
    let mut cuts = Vec::new();
    match boundary {
        Boundary::Paragraph => {
            let mut from = 0;
            while let Some(pos) = text[from..].find("\n\n") {
                let end = from + pos + 2;
                cuts.push(end);
                from = end;
            }
        }
        Boundary::Line => {
            cuts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        }
        Boundary::Sentence => {
            let mut chars = text.char_indices().peekable();
            while let Some((_, c)) = chars.next() {
                if matches!(c, '.' | '!' | '?') {
                    if let Some(&(i, next)) = chars.peek() {
                        if next.is_whitespace() {
                            cuts.push(i + next.len_utf8());
                        }
                    }
                }
            }
        }
        Boundary::Word => {
            cuts.extend(
                text.char_indices()
                    .filter(|(_, c)| c.is_whitespace())
                    .map(|(i, c)| i + c.len_utf8()),
            );
        }
    }

    let mut ranges = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        if cut > start && cut <= text.len() {
            ranges.push(start..cut);
            start = cut;
        }
    }
    if start < text.len() {
        ranges.push(start..text.len());
    }
    ranges
}

/// Iterator over the chunks of one text. Consumed once.
#[derive(Debug)]
pub struct Chunks<'a> {
    text: &'a str,
    ranges: std::vec::IntoIter<Range<usize>>,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.ranges.next().map(|r| &self.text[r])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ranges.size_hint()
    }
}

impl ExactSizeIterator for Chunks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stitch chunks back together using their offsets.
    fn reassemble(text: &str, splitter: &TextSplitter) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for (offset, chunk) in splitter.chunk_indices(text) {
            assert!(offset <= covered, "gap before offset {offset}");
            let end = offset + chunk.len();
            if end > covered {
                out.push_str(&text[covered..end]);
                covered = end;
            }
        }
        out
    }

    #[test]
    fn rejects_bad_parameters() {
        assert_eq!(TextSplitter::new(0, 0), Err(SplitterError::ZeroChunkSize));
        assert!(matches!(
            TextSplitter::new(100, 100),
            Err(SplitterError::OverlapTooLarge { .. })
        ));
        assert!(TextSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn empty_text_yields_nothing() {
        let s = TextSplitter::new(10, 2).unwrap();
        assert_eq!(s.chunks("").count(), 0);
    }

    #[test]
    fn short_text_is_one_chunk() {
        let s = TextSplitter::new(1000, 200).unwrap();
        let chunks: Vec<_> = s.chunks("Returns are accepted within 30 days.").collect();
        assert_eq!(chunks, vec!["Returns are accepted within 30 days."]);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let s = TextSplitter::new(30, 0).unwrap();
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks: Vec<_> = s.chunks(text).collect();
        assert_eq!(chunks, vec!["First paragraph here.\n\n", "Second paragraph here."]);
    }

    #[test]
    fn falls_back_to_sentences_and_words() {
        let s = TextSplitter::new(20, 0).unwrap();
        let text = "One two three. Four five six. Seven eight nine ten eleven";
        for chunk in s.chunks(text) {
            assert!(chunk.chars().count() <= 20, "chunk too long: {chunk:?}");
        }
        assert_eq!(reassemble(text, &s), text);
        assert!(s.chunks(text).next().unwrap().starts_with("One two three. "));
    }

    #[test]
    fn unbroken_text_uses_character_windows() {
        let s = TextSplitter::new(4, 1).unwrap();
        let text = "abcdefghij";
        let chunks: Vec<_> = s.chunks(text).collect();
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(reassemble(text, &s), text);
    }

    #[test]
    fn multibyte_text_is_counted_in_chars() {
        let s = TextSplitter::new(5, 0).unwrap();
        let text = "привет мир как дела";
        for chunk in s.chunks(text) {
            assert!(chunk.chars().count() <= 5);
        }
        assert_eq!(reassemble(text, &s), text);
    }

    #[test]
    fn consecutive_chunks_overlap_within_limit() {
        let s = TextSplitter::new(50, 15).unwrap();
        let text = (0..40).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let indexed: Vec<_> = s.chunk_indices(&text).collect();
        assert!(indexed.len() > 2);

        let mut saw_overlap = false;
        for pair in indexed.windows(2) {
            let (a_off, a) = pair[0];
            let (b_off, _) = pair[1];
            let a_end = a_off + a.len();
            assert!(b_off <= a_end);
            let shared = text[b_off..a_end].chars().count();
            assert!(shared <= 15);
            saw_overlap |= shared > 0;
        }
        assert!(saw_overlap);
    }

    #[test]
    fn default_settings_cover_long_document() {
        let s = TextSplitter::new(1000, 200).unwrap();
        let paragraph = "The store ships orders within two business days. \
                         Customers may return unused items for a full refund.\n";
        let text = paragraph.repeat(60);
        let chunks: Vec<_> = s.chunks(&text).collect();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
        assert_eq!(reassemble(&text, &s), text);
    }
}
