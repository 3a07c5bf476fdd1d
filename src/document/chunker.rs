//! Recursive character splitter.
//!
//! Text is cut at the coarsest separator present (paragraph, line,
//! sentence end, word, then single characters). Pieces that still exceed the chunk size are
//! re-split with the next finer separator; smaller pieces are packed into
//! windows of at most `chunk_size` characters that overlap their
//! predecessor by up to `chunk_overlap` characters.
//!
//! Chunks are byte ranges into the source text and no whitespace is
//! trimmed, so the chunks always tile the input without gaps.

use super::{Chunk, Document, SourceSpan};
use crate::error::{RagError, Result};
use log::debug;
use std::collections::VecDeque;
use std::ops::Range;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Separator {
    Literal(String),
    /// Whitespace directly after `.`, `!` or `?`.
    SentenceEnd,
    Char,
}

impl Separator {
    fn found_in(&self, text: &str) -> bool {
        match self {
            Separator::Literal(sep) => text.contains(sep.as_str()),
            Separator::SentenceEnd => !sentence_ends(text).is_empty(),
            Separator::Char => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<Separator>,
}

#[derive(Debug, Clone)]
struct Piece {
    range: Range<usize>,
    len: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: vec![
                Separator::Literal("\n\n".to_string()),
                Separator::Literal("\n".to_string()),
                Separator::SentenceEnd,
                Separator::Literal(" ".to_string()),
                Separator::Char,
            ],
        }
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        })
    }

    /// Replaces the separator ladder with literal separators. Per-character
    /// splitting is always kept last so oversized pieces can still be cut.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut separators: Vec<Separator> = separators
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .map(Separator::Literal)
            .collect();
        separators.push(Separator::Char);
        self.separators = separators;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Returns the byte ranges of each chunk of `text`, in order.
    pub fn split_text(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        if !text.is_empty() {
            self.split_range(text, 0..text.len(), &self.separators, &mut spans);
        }
        spans
    }

    /// Splits every document, copying its metadata onto each chunk.
    /// Whitespace-only chunks are dropped.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            for span in self.split_text(&document.text) {
                let text = &document.text[span.clone()];
                if text.trim().is_empty() {
                    continue;
                }
                chunks.push(Chunk {
                    text: text.to_string(),
                    metadata: document.metadata.clone(),
                    span: SourceSpan {
                        start: span.start,
                        end: span.end,
                    },
                });
            }
        }
        debug!("Split {} document(s) into {} chunk(s)", documents.len(), chunks.len());
        chunks
    }

    fn split_range(
        &self,
        text: &str,
        range: Range<usize>,
        separators: &[Separator],
        out: &mut Vec<Range<usize>>,
    ) {
        let slice = &text[range.clone()];
        let position = separators
            .iter()
            .position(|sep| sep.found_in(slice))
            .unwrap_or(separators.len().saturating_sub(1));
        let finer = separators.get(position + 1..).unwrap_or(&[]);
        let cut = match separators.get(position) {
            Some(separator) => pieces(text, range, separator),
            None => pieces(text, range, &Separator::Char),
        };

        let mut pending: Vec<Piece> = Vec::new();
        for range in cut {
            let len = text[range.clone()].chars().count();
            if len < self.chunk_size {
                pending.push(Piece { range, len });
                continue;
            }

            if !pending.is_empty() {
                self.merge(&pending, out);
                pending.clear();
            }
            if finer.is_empty() {
                out.push(range);
            } else {
                self.split_range(text, range, finer, out);
            }
        }

        if !pending.is_empty() {
            self.merge(&pending, out);
        }
    }

    /// Packs contiguous pieces into overlapping windows.
    fn merge(&self, pieces: &[Piece], out: &mut Vec<Range<usize>>) {
        let mut window: VecDeque<&Piece> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            if total + piece.len > self.chunk_size && !window.is_empty() {
                out.push(window_span(&window));
                while total > self.chunk_overlap
                    || (total + piece.len > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(front) => total -= front.len,
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += piece.len;
        }

        if !window.is_empty() {
            out.push(window_span(&window));
        }
    }
}

fn window_span(window: &VecDeque<&Piece>) -> Range<usize> {
    let start = window.front().map(|p| p.range.start).unwrap_or(0);
    let end = window.back().map(|p| p.range.end).unwrap_or(start);
    start..end
}

/// Byte offsets of whitespace that directly follows `.`, `!` or `?`.
fn sentence_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut previous = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() && matches!(previous, Some('.' | '!' | '?')) {
            ends.push(i);
        }
        previous = Some(c);
    }
    ends
}

/// Cuts `range` before every occurrence of `separator`, so each separator
/// stays attached to the start of the piece that follows it. Sentence
/// punctuation stays with its sentence; the whitespace after it starts the
/// next piece.
fn pieces(text: &str, range: Range<usize>, separator: &Separator) -> Vec<Range<usize>> {
    let base = range.start;
    let slice = &text[range];

    let cuts: Vec<usize> = match separator {
        Separator::Char => {
            return slice
                .char_indices()
                .map(|(i, c)| base + i..base + i + c.len_utf8())
                .collect();
        }
        Separator::Literal(sep) => slice.match_indices(sep.as_str()).map(|(i, _)| i).collect(),
        Separator::SentenceEnd => sentence_ends(slice),
    };

    let mut out = Vec::new();
    let mut start = 0;
    for cut in cuts {
        if cut > start {
            out.push(base + start..base + cut);
            start = cut;
        }
    }
    if start < slice.len() {
        out.push(base + start..base + slice.len());
    }
    out
}
