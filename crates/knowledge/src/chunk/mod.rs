//! Text chunking.
//!
//! Documents are split with a recursive character splitter: the text is cut
//! on the most natural separator it contains (paragraph, line, sentence
//! punctuation, word, character) and the pieces are merged back into
//! chunks of bounded size that overlap their predecessor.

mod merging;
mod pipeline;
mod recursive;

pub use pipeline::Chunker;
pub use recursive::RecursiveSplitter;
