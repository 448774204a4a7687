//! Line framing for streamed HTTP bodies.
//!
//! Providers stream either newline-delimited JSON (Ollama) or server-sent
//! events (OpenAI-compatible APIs). Network chunks do not respect line
//! boundaries, so bytes are buffered until a full line is available.

use futures::{Stream, StreamExt};
use ragchat_core::{AppError, AppResult};
use std::collections::VecDeque;

/// Accumulates raw bytes and splits them into complete lines.
///
/// Works on bytes rather than `str` so a UTF-8 sequence split across two
/// network chunks is decoded only once it is whole.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every non-blank line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1])
                .trim_end_matches('\r')
                .to_string();
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Flush a trailing line that had no terminating newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

/// Extract the payload of an SSE `data:` line.
pub fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

struct LineState<S> {
    inner: S,
    buffer: LineBuffer,
    ready: VecDeque<String>,
    exhausted: bool,
}

/// Turn a byte stream into a stream of complete text lines.
///
/// A transport error is yielded once and ends the stream.
pub fn lines<S, B, E>(inner: S) -> impl Stream<Item = AppResult<String>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    let state = LineState {
        inner,
        buffer: LineBuffer::new(),
        ready: VecDeque::new(),
        exhausted: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.ready.pop_front() {
                return Some((Ok(line), st));
            }
            if st.exhausted {
                return None;
            }
            match st.inner.next().await {
                Some(Ok(bytes)) => {
                    let completed = st.buffer.push(bytes.as_ref());
                    st.ready.extend(completed);
                }
                Some(Err(e)) => {
                    st.exhausted = true;
                    return Some((Err(AppError::Provider(format!("Stream error: {}", e))), st));
                }
                None => {
                    st.exhausted = true;
                    if let Some(rest) = st.buffer.finish() {
                        st.ready.push_back(rest);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_split_across_chunks() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"{\"a\":").is_empty());
        let lines = buffer.push(b"1}\n{\"b\":2}\n{\"c\"");
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}"]);
        assert_eq!(buffer.finish(), Some("{\"c\"".to_string()));
    }

    #[test]
    fn test_split_utf8_sequence() {
        let mut buffer = LineBuffer::new();
        let text = "olá\n".as_bytes();
        // "á" is two bytes; cut between them
        assert!(buffer.push(&text[..3]).is_empty());
        assert_eq!(buffer.push(&text[3..]), vec!["olá"]);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"data: x\r\n\r\ndata: y\n");
        assert_eq!(lines, vec!["data: x", "data: y"]);
    }

    #[test]
    fn test_sse_data() {
        assert_eq!(sse_data("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_data("data:[DONE]"), Some("[DONE]"));
        assert_eq!(sse_data(": keep-alive"), None);
    }

    #[tokio::test]
    async fn test_lines_stream() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"one\ntw".to_vec()),
            Ok(b"o\nthree".to_vec()),
        ];
        let collected: Vec<String> = lines(futures::stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(collected, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_lines_stream_error_ends_stream() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"one\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"never\n".to_vec()),
        ];
        let collected: Vec<AppResult<String>> =
            lines(futures::stream::iter(chunks)).collect().await;
        assert_eq!(collected.len(), 2);
        assert!(collected[1].is_err());
    }
}
