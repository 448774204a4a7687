//! Merging of small splits into overlapping chunks.

use std::collections::VecDeque;

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Greedily pack `splits` into chunks of at most `chunk_size` characters.
///
/// When a chunk is emitted, pieces are dropped from its front until at most
/// `chunk_overlap` characters remain; those carry over as the start of the
/// next chunk. Splits already carry their separators, so pieces are joined
/// with nothing between them. Emitted chunks are trimmed and never empty.
pub(crate) fn merge_splits(
    splits: &[&str],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    let mut docs = Vec::new();
    let mut current: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0usize;

    for split in splits {
        let len = char_len(split);

        if total + len > chunk_size && !current.is_empty() {
            if total > chunk_size {
                tracing::warn!(
                    "Created a chunk of size {}, which is longer than the specified {}",
                    total,
                    chunk_size
                );
            }
            if let Some(doc) = join(&current) {
                docs.push(doc);
            }

            while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                match current.pop_front() {
                    Some((_, popped)) => total -= popped,
                    None => break,
                }
            }
        }

        current.push_back((split, len));
        total += len;
    }

    if let Some(doc) = join(&current) {
        docs.push(doc);
    }

    docs
}

fn join(pieces: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = pieces.iter().map(|(s, _)| *s).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packs_up_to_size() {
        let splits = ["aaaa", " bbbb", " cccc", " dddd"];
        let docs = merge_splits(&splits, 10, 0);
        assert_eq!(docs, vec!["aaaa bbbb", "cccc dddd"]);
    }

    #[test]
    fn test_overlap_carries_tail() {
        let splits = ["aaaa", " bbbb", " cccc", " dddd"];
        let docs = merge_splits(&splits, 10, 5);
        assert_eq!(docs, vec!["aaaa bbbb", "bbbb cccc", "cccc dddd"]);
    }

    #[test]
    fn test_blank_pieces_produce_nothing() {
        let splits = ["  ", "\n"];
        assert!(merge_splits(&splits, 10, 2).is_empty());
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // Each piece is 3 chars but 6 bytes
        let splits = ["ééé", "ààà"];
        let docs = merge_splits(&splits, 6, 0);
        assert_eq!(docs, vec!["éééààà"]);
    }
}
