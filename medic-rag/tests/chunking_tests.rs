//! Property tests for text splitting and section chunking.

use medic_rag::{DocumentChunker, DocumentFormat, TextSplitter, extract_sections};
use proptest::prelude::*;

/// Text made of short lowercase words separated by spaces, newlines and blank lines.
fn arb_text() -> impl Strategy<Value = String> {
    let separator = prop_oneof![6 => Just(" "), 2 => Just("\n"), 1 => Just("\n\n")];
    proptest::collection::vec(("[a-z]{1,12}", separator), 1..300)
        .prop_map(|parts| parts.into_iter().map(|(word, sep)| format!("{word}{sep}")).collect())
}

/// `(chunk_size, chunk_overlap)` with words always fitting in a chunk.
fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (20usize..300).prop_flat_map(|size| (Just(size), 0..size))
}

/// **Size bound**: no chunk exceeds `chunk_size` when every word fits.
mod prop_size_bound {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_never_exceed_chunk_size(text in arb_text(), (size, overlap) in arb_sizes()) {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            for chunk in splitter.chunk_text(&text) {
                prop_assert!(chunk.chars().count() <= size, "{} > {size}: {chunk:?}", chunk.len());
                prop_assert!(!chunk.trim().is_empty());
            }
        }

        #[test]
        fn every_word_survives(text in arb_text(), (size, overlap) in arb_sizes()) {
            let splitter = TextSplitter::new(size, overlap).unwrap();
            let chunks: Vec<String> = splitter.chunk_text(&text).collect();
            for word in text.split_whitespace() {
                prop_assert!(
                    chunks.iter().any(|c| c.split_whitespace().any(|w| w == word)),
                    "word {word:?} lost"
                );
            }
        }

        #[test]
        fn short_text_is_returned_unchanged(text in "[a-z ]{1,50}[a-z]") {
            let splitter = TextSplitter::new(60, 10).unwrap();
            let chunks: Vec<String> = splitter.chunk_text(&text).collect();
            prop_assert_eq!(chunks, vec![text]);
        }
    }
}

/// **Round-trip metadata**: chunk indexes count up from 0 within each section.
mod prop_section_metadata {
    use super::*;

    fn arb_markdown() -> impl Strategy<Value = String> {
        proptest::collection::vec(("[A-Z][a-z]{2,8}", arb_text()), 1..6).prop_map(|sections| {
            sections
                .into_iter()
                .enumerate()
                .map(|(i, (title, body))| format!("## {title} {i}\n\n{body}\n\n"))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn indexes_are_dense_per_section(doc in arb_markdown(), (size, overlap) in arb_sizes()) {
            let chunker = DocumentChunker::new(TextSplitter::new(size, overlap).unwrap());
            let processed = chunker.chunk_content("doc.md", &doc, true, None);

            let mut titles: Vec<&str> =
                processed.chunks.iter().map(|c| c.metadata.section_title.as_str()).collect();
            titles.dedup();
            for title in titles {
                let group: Vec<_> =
                    processed.chunks.iter().filter(|c| c.metadata.section_title == title).collect();
                for (expected, chunk) in group.iter().enumerate() {
                    prop_assert_eq!(chunk.metadata.chunk_index, expected);
                    prop_assert_eq!(chunk.metadata.total_chunks, group.len());
                }
            }
        }
    }
}

#[test]
fn overlap_is_shared_between_neighbours() {
    let words = ["pressure", "bandage", "wound", "elevate", "calm", "monitor", "breathing"];
    let mut text = String::new();
    let mut i = 0;
    while text.chars().count() < 1200 {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(words[i % words.len()]);
        i += 1;
    }

    let splitter = TextSplitter::new(500, 100).unwrap();
    let chunks: Vec<String> = splitter.chunk_text(&text).collect();
    assert!(chunks.len() >= 3);
    for pair in chunks.windows(2) {
        let shared = (1..=100)
            .rev()
            .find(|&k| {
                let prefix: String = pair[1].chars().take(k).collect();
                pair[0].ends_with(&prefix)
            })
            .unwrap_or(0);
        assert!(shared > 0, "no overlap between {:?} and {:?}", pair[0], pair[1]);
    }
}

#[test]
fn token_longer_than_chunk_size_is_cut_into_windows() {
    let token = "x".repeat(1400);
    let splitter = TextSplitter::new(500, 100).unwrap();
    let lengths: Vec<usize> = splitter.chunk_text(&token).map(|c| c.chars().count()).collect();
    assert_eq!(lengths, vec![500, 500, 500, 200]);
}

#[test]
fn documented_two_section_example() {
    let sections = extract_sections("# A\n\nfoo\n\n## B\n\nbar", DocumentFormat::Markdown);
    let parsed: Vec<(&str, &str)> =
        sections.iter().map(|s| (s.title.as_str(), s.content.as_str())).collect();
    assert_eq!(parsed, vec![("A", "foo"), ("B", "bar")]);
}
