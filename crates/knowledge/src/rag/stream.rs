//! Receiving end of a streamed answer.

use crate::rag::types::StreamEvent;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Frames of one streamed answer, in generation order.
///
/// Dropping the stream abandons the request: the worker stops and the
/// conversation history is left untouched.
#[derive(Debug)]
pub struct ResponseStream {
    rx: mpsc::Receiver<StreamEvent>,
}

impl ResponseStream {
    pub(crate) fn new(rx: mpsc::Receiver<StreamEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next frame.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Drain the stream into the concatenated text and the first error.
    pub async fn collect_text(mut self) -> (String, Option<String>) {
        let mut text = String::new();
        let mut error = None;
        while let Some(event) = self.rx.recv().await {
            match event {
                StreamEvent::Delta { content } => text.push_str(&content),
                StreamEvent::Error { message } => {
                    error.get_or_insert(message);
                }
                StreamEvent::Done => break,
            }
        }
        (text, error)
    }
}

impl Stream for ResponseStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_yields_in_order() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(StreamEvent::delta("a")).await.unwrap();
        tx.send(StreamEvent::delta("b")).await.unwrap();
        tx.send(StreamEvent::Done).await.unwrap();
        drop(tx);

        let events: Vec<_> = ResponseStream::new(rx).collect().await;
        assert_eq!(
            events,
            vec![StreamEvent::delta("a"), StreamEvent::delta("b"), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn test_collect_text_reports_error() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(StreamEvent::delta("partial")).await.unwrap();
        tx.send(StreamEvent::error("boom")).await.unwrap();
        tx.send(StreamEvent::Done).await.unwrap();

        let (text, error) = ResponseStream::new(rx).collect_text().await;
        assert_eq!(text, "partial");
        assert_eq!(error.as_deref(), Some("boom"));
    }
}
