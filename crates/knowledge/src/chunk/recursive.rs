//! Recursive separator-based text splitting.
//!
//! The text is cut on the highest-priority separator it contains. Pieces
//! that still exceed the chunk size are cut again with the remaining
//! separators; the rest are merged back into overlapping chunks.

use super::merging::{char_len, merge_splits};

/// Splits text on a prioritized list of separators.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
            separators,
        }
    }

    /// Split `text` into ordered chunks. Empty input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // First separator present in the text wins; "" always matches.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }

            if !good.is_empty() {
                chunks.extend(merge_splits(&good, self.chunk_size, self.chunk_overlap));
                good.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !good.is_empty() {
            chunks.extend(merge_splits(&good, self.chunk_size, self.chunk_overlap));
        }

        chunks
    }
}

/// Cut `text` before every occurrence of `separator`.
///
/// Each separator stays attached to the start of the piece that follows
/// it. An empty separator cuts between characters. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_separators;

    fn splitter(size: usize, overlap: usize) -> RecursiveSplitter {
        RecursiveSplitter::new(size, overlap, default_separators())
    }

    /// Length of the longest prefix of `next` that `prev` ends with.
    fn shared_boundary(prev: &str, next: &str) -> usize {
        (1..=next.len().min(prev.len()))
            .rev()
            .filter(|k| next.is_char_boundary(*k))
            .find(|k| prev.ends_with(&next[..*k]))
            .unwrap_or(0)
    }

    #[test]
    fn test_split_keeping_separator() {
        assert_eq!(
            split_keeping_separator("a.b.c", "."),
            vec!["a", ".b", ".c"]
        );
        assert_eq!(split_keeping_separator(".a", "."), vec![".a"]);
        assert_eq!(split_keeping_separator("ab", ""), vec!["a", "b"]);
        assert_eq!(split_keeping_separator("olá", ""), vec!["o", "l", "á"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(splitter(100, 20).split("").is_empty());
        assert!(splitter(100, 20).split("   \n\n ").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = splitter(100, 20).split("Alpha Beta Gamma");
        assert_eq!(chunks, vec!["Alpha Beta Gamma"]);
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = splitter(40, 0).split(&text);
        assert_eq!(chunks, vec!["a".repeat(30), "b".repeat(30)]);
    }

    #[test]
    fn test_falls_back_to_characters() {
        let text = "x".repeat(25);
        let chunks = splitter(10, 0).split(&text);
        assert_eq!(chunks, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = (0..200)
            .map(|i| format!("w{:03}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let size = 100;
        let overlap = 20;
        let chunks = splitter(size, overlap).split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= size, "chunk too long: {}", chunk.len());
        }
        for pair in chunks.windows(2) {
            let shared = shared_boundary(&pair[0], &pair[1]);
            assert!(shared > 0, "no overlap between {:?} and {:?}", pair[0], pair[1]);
            assert!(shared <= overlap);
        }
    }

    #[test]
    fn test_overlap_drops_pieces_longer_than_overlap() {
        // Overlap is built from whole pieces. A carried-over piece longer
        // than the overlap is dropped, so adjacent chunks share nothing.
        let text = (1..=4)
            .map(|n| format!("Sentence {} talks about alpha beta gamma delta epsilon", n))
            .collect::<Vec<_>>()
            .join(". ")
            + ".";
        let chunks = splitter(100, 20).split(&text);

        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert_eq!(chunk.matches("Sentence").count(), 1, "{:?}", chunk);
        }
        for pair in chunks.windows(2) {
            assert_eq!(shared_boundary(&pair[0], &pair[1]), 0);
        }
    }

    #[test]
    fn test_sentences_with_custom_size() {
        let text = "Alpha Beta Gamma Delta. Epsilon Zeta Eta Theta. Iota Kappa Lambda Mu. \
                    Nu Xi Omicron Pi. Rho Sigma Tau Upsilon. Phi Chi Psi Omega.";
        let chunks = splitter(40, 10).split(text);

        assert!(chunks.len() > 1);
        assert!(chunks[0].starts_with("Alpha"));
        assert!(chunks.last().unwrap().ends_with("Omega."));
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40);
        }
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Acentuação: ã, õ, ç, á, é. 🚀 🎯 💡 ✨ 🔥. ".repeat(20);
        let chunks = splitter(50, 10).split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
    }
}
