//! Document chunking.
//!
//! [`TextSplitter`] cuts text into bounded, overlapping chunks by trying a
//! priority list of separators (paragraph, line, sentence, word, character).
//! [`DocumentChunker`] loads a document, splits it into sections and chunks
//! every section independently, attaching [`ChunkMetadata`].
//!
//! All sizes are counted in characters, not bytes.
//!
//! # Example
//!
//! ```rust,ignore
//! use medic_rag::TextSplitter;
//!
//! let splitter = TextSplitter::new(500, 100)?;
//! for chunk in splitter.chunk_text(&long_text) {
//!     println!("{chunk}");
//! }
//! ```

use std::collections::VecDeque;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::document::{Chunk, ChunkMetadata, DocumentFormat, Section, SectionKind, fields};
use crate::error::{RagError, Result};
use crate::sections::{detect_format, extract_sections, normalize_whitespace};

/// Separators tried in order: paragraph, line, sentence, word, then characters.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Splits text into chunks of at most `chunk_size` characters.
///
/// The first separator that occurs in the text is used to cut it into
/// pieces, which are merged greedily. When a chunk is closed, the next one is
/// seeded with its last `chunk_overlap` characters. Pieces that are too large
/// on their own are split again with the remaining separators; the empty
/// separator falls back to fixed-width windows.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter with the [`DEFAULT_SEPARATORS`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    /// Replace the separator priority list.
    ///
    /// The empty separator is appended when missing so that splitting always
    /// terminates in fixed-width windows.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        if self.separators.last().is_none_or(|s| !s.is_empty()) {
            self.separators.retain(|s| !s.is_empty());
            self.separators.push(String::new());
        }
        self
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap carried between consecutive chunks, in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Lazily split `text` into chunks.
    ///
    /// Text no longer than `chunk_size` is returned unchanged as a single
    /// chunk. Otherwise every chunk is trimmed and empty chunks are dropped.
    pub fn chunk_text<'a>(&'a self, text: &'a str) -> Chunks<'a> {
        let mut chunks = Chunks {
            splitter: self,
            stack: Vec::new(),
            current: String::new(),
            current_len: 0,
            last: None,
            ready: VecDeque::new(),
        };

        if text.trim().is_empty() {
            return chunks;
        }
        if char_len(text) <= self.chunk_size {
            chunks.ready.push_back(text.to_string());
            return chunks;
        }
        chunks.descend(text, 0);
        chunks
    }

    /// Fixed-width windows of `chunk_size` advancing by `chunk_size - chunk_overlap`.
    fn windows(&self, text: &str) -> Vec<String> {
        let bounds: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let total = bounds.len() - 1;
        let step = self.chunk_size - self.chunk_overlap;

        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(total);
            windows.push(text[bounds[start]..bounds[end]].to_string());
            if end == total {
                break;
            }
            start += step;
        }
        windows
    }
}

/// One level of the explicit work stack: the pieces of a span split on `separator`.
struct Frame<'a> {
    pieces: std::str::Split<'a, &'a str>,
    separator: &'a str,
    next_level: usize,
}

/// Lazy chunk sequence returned by [`TextSplitter::chunk_text`].
///
/// Finite and single-pass. Oversized pieces push a new frame instead of
/// recursing, so deeply nested input cannot exhaust the call stack.
pub struct Chunks<'a> {
    splitter: &'a TextSplitter,
    stack: Vec<Frame<'a>>,
    current: String,
    current_len: usize,
    /// Last emitted chunk; the next chunk starts with its tail.
    last: Option<String>,
    ready: VecDeque<String>,
}

impl<'a> Chunks<'a> {
    /// Start splitting `span` with the first separator at or after `level` that occurs in it.
    fn descend(&mut self, span: &'a str, level: usize) {
        let splitter: &'a TextSplitter = self.splitter;
        let separator = splitter.separators[level.min(splitter.separators.len() - 1)..]
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || span.contains(sep.as_str()));

        match separator {
            Some((offset, sep)) if !sep.is_empty() => {
                let index = level.min(splitter.separators.len() - 1) + offset;
                self.stack.push(Frame {
                    pieces: span.split(sep.as_str()),
                    separator: sep.as_str(),
                    next_level: index + 1,
                });
            }
            _ => {
                self.close();
                let overlap = splitter.chunk_overlap;
                let seeded = match self.last.take() {
                    Some(previous) if overlap > 0 => {
                        format!("{}{span}", tail_chars(&previous, overlap))
                    }
                    _ => span.to_string(),
                };
                for window in splitter.windows(&seeded) {
                    self.emit(&window);
                }
            }
        }
    }

    /// Merge one piece into the running chunk.
    fn accept(&mut self, piece: &'a str, separator: &'a str, next_level: usize) {
        if piece.trim().is_empty() {
            return;
        }
        let size = self.splitter.chunk_size;
        let piece_len = char_len(piece);

        if piece_len > size {
            self.close();
            self.descend(piece, next_level);
            return;
        }

        let separator_len = char_len(separator);
        if !self.current.is_empty() {
            if self.current_len + separator_len + piece_len <= size {
                self.current.push_str(separator);
                self.current.push_str(piece);
                self.current_len += separator_len + piece_len;
                return;
            }
            self.close();
        }

        // Shrink the overlap when the seed would not leave room for the piece.
        let room = size.saturating_sub(separator_len + piece_len);
        let take = self.splitter.chunk_overlap.min(room);
        match self.last.take() {
            Some(previous) if take > 0 => {
                let seed = tail_chars(&previous, take);
                self.current_len = char_len(seed) + separator_len + piece_len;
                self.current.push_str(seed);
                self.current.push_str(separator);
            }
            _ => self.current_len = piece_len,
        }
        self.current.push_str(piece);
    }

    /// Close the running chunk.
    fn close(&mut self) {
        let text = std::mem::take(&mut self.current);
        self.current_len = 0;
        self.emit(&text);
    }

    fn emit(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        self.ready.push_back(trimmed.to_string());
        self.last = Some(trimmed.to_string());
    }
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                return Some(chunk);
            }

            let step = self
                .stack
                .last_mut()
                .map(|frame| frame.pieces.next().map(|p| (p, frame.separator, frame.next_level)));

            match step {
                Some(Some((piece, separator, next_level))) => {
                    self.accept(piece, separator, next_level)
                }
                // Frame exhausted; its pending chunk carries over to the parent.
                Some(None) => {
                    self.stack.pop();
                }
                None if self.current.is_empty() => return None,
                None => {
                    self.close();
                }
            }
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The last `n` characters of `text`.
fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((index, _)) => &text[index..],
        None => text,
    }
}

/// Result of chunking one document.
#[derive(Debug, Clone, Default)]
pub struct ProcessedDocument {
    /// Layout the document was parsed as.
    pub format: Option<DocumentFormat>,
    /// Number of sections extracted.
    pub sections: usize,
    /// Sections skipped because they could not be chunked.
    pub failed_sections: usize,
    /// Chunks in document order.
    pub chunks: Vec<Chunk>,
}

/// Turns documents into [`Chunk`]s with section metadata.
#[derive(Debug, Clone)]
pub struct DocumentChunker {
    splitter: TextSplitter,
}

impl DocumentChunker {
    /// Create a chunker around a validated splitter.
    pub fn new(splitter: TextSplitter) -> Self {
        Self { splitter }
    }

    /// Create a chunker from the pipeline configuration.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Ok(Self::new(TextSplitter::new(config.chunk_size, config.chunk_overlap)?))
    }

    /// The underlying splitter.
    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Load a document from disk and chunk it.
    ///
    /// `format` is detected from the content when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentError`] if the file cannot be read.
    pub async fn process_document(
        &self,
        path: &Path,
        chunk_by_section: bool,
        format: Option<DocumentFormat>,
    ) -> Result<ProcessedDocument> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to load document");
            RagError::DocumentError { path: path.to_path_buf(), message: e.to_string() }
        })?;
        info!(path = %path.display(), characters = raw.chars().count(), "loaded document");

        Ok(self.chunk_content(&path.display().to_string(), &raw, chunk_by_section, format))
    }

    /// Chunk already-loaded document content. `source` is recorded in every chunk.
    pub fn chunk_content(
        &self,
        source: &str,
        raw: &str,
        chunk_by_section: bool,
        format: Option<DocumentFormat>,
    ) -> ProcessedDocument {
        let content = normalize_whitespace(raw);
        if content.is_empty() {
            debug!(source, "document is empty");
            return ProcessedDocument::default();
        }

        if !chunk_by_section {
            let chunks = self.chunk_whole(source, &content);
            info!(source, chunks = chunks.len(), "chunked document without sections");
            return ProcessedDocument { format: None, sections: 1, failed_sections: 0, chunks };
        }

        let format = format.unwrap_or_else(|| detect_format(&content));
        let sections = extract_sections(&content, format);
        info!(source, %format, sections = sections.len(), "extracted sections");

        let mut processed = ProcessedDocument {
            format: Some(format),
            sections: sections.len(),
            failed_sections: 0,
            chunks: Vec::new(),
        };

        for section in &sections {
            if section.content.trim().is_empty() {
                debug!(source, section = %section.title, "skipping empty section");
                continue;
            }
            match self.chunk_section(source, section) {
                Ok(chunks) => {
                    debug!(
                        source,
                        section = %section.title,
                        chunks = chunks.len(),
                        "chunked section"
                    );
                    processed.chunks.extend(chunks);
                }
                Err(e) => {
                    warn!(source, section = %section.title, error = %e, "failed to chunk section");
                    processed.failed_sections += 1;
                }
            }
        }

        info!(source, chunks = processed.chunks.len(), "chunked document");
        processed
    }

    /// Chunk one section, numbering chunks from 0 within it.
    pub fn chunk_section(&self, source: &str, section: &Section) -> Result<Vec<Chunk>> {
        let texts: Vec<String> = self.splitter.chunk_text(&section.content).collect();
        if texts.is_empty() {
            return Err(RagError::ChunkingError(format!(
                "section '{}' has content but produced no chunks",
                section.title
            )));
        }

        let total = texts.len();
        let template = section_metadata(source, section);
        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| Chunk {
                text,
                metadata: ChunkMetadata {
                    chunk_index,
                    total_chunks: total,
                    ..template.clone()
                },
            })
            .collect())
    }

    fn chunk_whole(&self, source: &str, content: &str) -> Vec<Chunk> {
        let title = Path::new(source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string());
        let texts: Vec<String> = self.splitter.chunk_text(content).collect();
        let total = texts.len();

        texts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| {
                let mut metadata = ChunkMetadata {
                    source: source.to_string(),
                    section_title: title.clone(),
                    chunk_index,
                    total_chunks: total,
                    ..ChunkMetadata::default()
                };
                metadata
                    .extra
                    .insert(fields::CONTENT_TYPE.to_string(), Value::String("document".into()));
                Chunk { text, metadata }
            })
            .collect()
    }
}

/// Metadata shared by every chunk of `section`; index fields are filled in per chunk.
fn section_metadata(source: &str, section: &Section) -> ChunkMetadata {
    let mut metadata = ChunkMetadata {
        source: source.to_string(),
        section_title: section.title.clone(),
        ..ChunkMetadata::default()
    };

    match &section.kind {
        SectionKind::Heading { level, header_path } => {
            metadata.section_level = Some(*level);
            if !header_path.is_empty() {
                metadata
                    .extra
                    .insert(fields::HEADER_PATH.to_string(), Value::String(header_path.clone()));
            }
            metadata.extra.insert(
                fields::CONTENT_TYPE.to_string(),
                Value::String("markdown_section".into()),
            );
        }
        SectionKind::ManualEntry { id, ordinal, category, subsections } => {
            metadata.extra.insert(fields::RT_ID.to_string(), Value::String(id.clone()));
            metadata.extra.insert(fields::NUMERO_RT.to_string(), Value::from(*ordinal));
            if let Some(category) = category {
                metadata
                    .extra
                    .insert(fields::CATEGORY.to_string(), Value::String(category.clone()));
            }
            if !subsections.is_empty() {
                let labels = subsections.keys().cloned().map(Value::String).collect();
                metadata.extra.insert(fields::SUBSECTIONS.to_string(), Value::Array(labels));
            }
            metadata
                .extra
                .insert(fields::CONTENT_TYPE.to_string(), Value::String("rt_entry".into()));
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_overlap(previous: &str, next: &str, limit: usize) -> usize {
        (1..=limit)
            .rev()
            .find(|&k| {
                let prefix: String = next.chars().take(k).collect();
                char_len(&prefix) == k && previous.ends_with(&prefix)
            })
            .unwrap_or(0)
    }

    fn words_text(target_len: usize) -> String {
        let words = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel"];
        let mut text = String::new();
        let mut i = 0;
        while char_len(&text) < target_len {
            text.push_str(words[i % words.len()]);
            text.push(' ');
            i += 1;
        }
        let truncated: String = text.chars().take(target_len).collect();
        truncated.trim_end().to_string()
    }

    #[test]
    fn rejects_invalid_sizes() {
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(100, 100).is_err());
        assert!(TextSplitter::new(100, 150).is_err());
        assert!(TextSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn short_text_is_returned_unchanged() {
        let splitter = TextSplitter::new(100, 20).unwrap();
        let text = "  Appelez le 15.  ";
        let chunks: Vec<_> = splitter.chunk_text(text).collect();
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        let splitter = TextSplitter::new(100, 20).unwrap();
        assert_eq!(splitter.chunk_text("").count(), 0);
        assert_eq!(splitter.chunk_text("   \n\n ").count(), 0);
    }

    #[test]
    fn consecutive_chunks_overlap_on_word_text() {
        let splitter = TextSplitter::new(500, 100).unwrap();
        let text = words_text(1200);
        assert!((1190..=1200).contains(&char_len(&text)));
        assert!(!text.contains('\n') && !text.contains(". "));

        let chunks: Vec<_> = splitter.chunk_text(&text).collect();
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 500, "chunk too long: {}", char_len(chunk));
        }
        for pair in chunks.windows(2) {
            let overlap = shared_overlap(&pair[0], &pair[1], 100);
            assert!(overlap > 0 && overlap <= 100, "missing overlap between chunks");
        }
    }

    #[test]
    fn token_longer_than_chunk_size_falls_back_to_windows() {
        // Only the character-level split applies: no separator occurs at all.
        let splitter = TextSplitter::new(500, 100).unwrap();
        let text = "a".repeat(1200);
        let chunks: Vec<_> = splitter.chunk_text(&text).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![500, 500, 400]);
    }

    #[test]
    fn paragraphs_are_preferred_over_words() {
        let splitter = TextSplitter::new(60, 10).unwrap();
        let text = "First paragraph about bleeding control.\n\n\
                    Second paragraph about burns and cooling.\n\n\
                    Third paragraph about choking.";
        let chunks: Vec<_> = splitter.chunk_text(text).collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("First paragraph"));
        assert!(chunks[1].ends_with("burns and cooling."));
        assert!(chunks[2].ends_with("about choking."));
    }

    #[test]
    fn oversized_paragraph_is_split_further() {
        let splitter = TextSplitter::new(80, 10).unwrap();
        let long_paragraph = words_text(300);
        let text = format!("Short intro.\n\n{long_paragraph}\n\nShort outro.");
        let chunks: Vec<_> = splitter.chunk_text(&text).collect();
        assert!(chunks.len() >= 4);
        assert!(chunks.iter().all(|c| char_len(c) <= 80));
        assert_eq!(chunks[0], "Short intro.");
        assert!(chunks.last().unwrap().ends_with("Short outro."));
    }

    #[test]
    fn chunk_after_short_paragraph_keeps_overlap() {
        let splitter = TextSplitter::new(80, 20).unwrap();
        let text = format!("Keep the victim warm and talk calmly.\n\n{}", words_text(330));
        let chunks: Vec<_> = splitter.chunk_text(&text).collect();

        assert_eq!(chunks[0], "Keep the victim warm and talk calmly.");
        assert!(chunks[1].starts_with("arm and talk calmly."), "got {:?}", chunks[1]);
        for pair in chunks.windows(2) {
            assert!(shared_overlap(&pair[0], &pair[1], 20) > 0, "no overlap: {pair:?}");
            assert!(char_len(&pair[1]) <= 80);
        }
    }

    #[test]
    fn windows_after_short_paragraph_keep_overlap() {
        let splitter = TextSplitter::new(80, 20).unwrap();
        let text = format!("Appelez le 15.\n\n{}", "x".repeat(200));
        let chunks: Vec<_> = splitter.chunk_text(&text).collect();

        assert_eq!(chunks[0], "Appelez le 15.");
        assert!(chunks[1].starts_with("Appelez le 15.x"));
        for pair in chunks.windows(2) {
            assert!(shared_overlap(&pair[0], &pair[1], 20) > 0, "no overlap: {pair:?}");
        }
        assert!(chunks.iter().all(|c| char_len(c) <= 80));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        let text = "éééééééééééééééééééé";
        let chunks: Vec<_> = splitter.chunk_text(text).collect();
        assert!(chunks.iter().all(|c| char_len(c) <= 10));
        assert_eq!(chunks[0].chars().count(), 10);
    }

    #[test]
    fn custom_separators_always_end_with_character_fallback() {
        let splitter = TextSplitter::new(5, 1).unwrap().with_separators(["|"]);
        let chunks: Vec<_> = splitter.chunk_text("abcdefghij|kl").collect();
        assert!(chunks.iter().all(|c| char_len(c) <= 5));
        assert!(chunks.iter().any(|c| c.contains("kl")));
    }

    #[test]
    fn tail_chars_respects_boundaries() {
        assert_eq!(tail_chars("héllo", 3), "llo");
        assert_eq!(tail_chars("héllo", 4), "éllo");
        assert_eq!(tail_chars("ab", 5), "ab");
        assert_eq!(tail_chars("ab", 0), "");
    }

    #[test]
    fn sections_get_indexed_metadata() {
        let chunker = DocumentChunker::new(TextSplitter::new(40, 5).unwrap());
        let content = "# Brûlures\n\n\
                       Refroidir la brûlure à l'eau tempérée pendant vingt minutes.\n\n\
                       # Vide\n\n# Saignement\n\nComprimer.";
        let processed = chunker.chunk_content("manuel.md", content, true, None);

        assert_eq!(processed.format, Some(DocumentFormat::Markdown));
        assert_eq!(processed.sections, 3);
        let burns: Vec<_> =
            processed.chunks.iter().filter(|c| c.metadata.section_title == "Brûlures").collect();
        assert!(burns.len() >= 2);
        for (i, chunk) in burns.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
            assert_eq!(chunk.metadata.total_chunks, burns.len());
            assert_eq!(chunk.metadata.section_level, Some(1));
            assert_eq!(chunk.metadata.source, "manuel.md");
        }
        assert!(processed.chunks.iter().all(|c| c.metadata.section_title != "Vide"));
    }

    #[test]
    fn manual_entries_carry_record_fields() {
        let chunker = DocumentChunker::new(TextSplitter::new(200, 20).unwrap());
        let separator = "=".repeat(80);
        let content = format!(
            "{separator}\nRT-07: Hémorragie externe\nCATEGORIE: Urgences vitales\n\
             SIGNES: Le sang coule abondamment.\nACTIONS: Comprimer la plaie.\n{separator}\n"
        );
        let processed = chunker.chunk_content("data.txt", &content, true, None);

        assert_eq!(processed.format, Some(DocumentFormat::RtManual));
        assert_eq!(processed.chunks.len(), 1);
        let metadata = &processed.chunks[0].metadata;
        assert_eq!(metadata.section_title, "Hémorragie externe");
        assert_eq!(metadata.extra_str(fields::RT_ID), Some("RT-07"));
        assert_eq!(metadata.get_extra(fields::NUMERO_RT), Some(&Value::from(7)));
        assert_eq!(metadata.extra_str(fields::CATEGORY), Some("Urgences vitales"));
        assert_eq!(metadata.extra_str(fields::CONTENT_TYPE), Some("rt_entry"));
        assert_eq!(metadata.section_level, None);
    }

    #[test]
    fn whole_document_mode_uses_file_stem() {
        let chunker = DocumentChunker::new(TextSplitter::new(1000, 100).unwrap());
        let processed =
            chunker.chunk_content("docs/premiers_secours.md", "# A\nfoo\n# B\nbar", false, None);
        assert_eq!(processed.chunks.len(), 1);
        assert_eq!(processed.chunks[0].metadata.section_title, "premiers_secours");
        assert_eq!(processed.chunks[0].metadata.total_chunks, 1);
    }

    #[test]
    fn empty_document_has_no_chunks() {
        let chunker = DocumentChunker::new(TextSplitter::new(100, 10).unwrap());
        let processed = chunker.chunk_content("empty.md", "  \n\n  ", true, None);
        assert!(processed.chunks.is_empty());
        assert_eq!(processed.sections, 0);
    }

    #[tokio::test]
    async fn missing_file_is_a_document_error() {
        let chunker = DocumentChunker::new(TextSplitter::new(100, 10).unwrap());
        let err = chunker
            .process_document(Path::new("/nonexistent/manual.md"), true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DocumentError { .. }));
    }
}
