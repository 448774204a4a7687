//! Ingestion progress events.
//!
//! The pipeline reports each phase through an optional callback so the CLI
//! can print incremental feedback while a corpus is indexed.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Ingestion phases, in the order the pipeline runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestPhase {
    Discover,
    Parse,
    Chunk,
    Embed,
    Index,
    Persist,
}

impl IngestPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestPhase::Discover => "discover",
            IngestPhase::Parse => "parse",
            IngestPhase::Chunk => "chunk",
            IngestPhase::Embed => "embed",
            IngestPhase::Index => "index",
            IngestPhase::Persist => "persist",
        }
    }
}

impl fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of work within a phase.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub phase: IngestPhase,

    /// Units done so far (files, chunks)
    pub current: u64,

    pub total: Option<u64>,

    /// 0.0 to 100.0, when `total` is known
    pub percentage: Option<f64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(
        phase: IngestPhase,
        current: u64,
        total: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        let percentage = total.map(|t| match t {
            0 => 0.0,
            t => current as f64 / t as f64 * 100.0,
        });

        Self {
            phase,
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    /// One line for a terminal, e.g. `[embed] 64/120 (53%) - model=trigram-v1`.
    pub fn format_simple(&self) -> String {
        let counts = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };
        let pct = self
            .percentage
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, counts, pct, self.message)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Cheap to clone; clones share the callback and the start time.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    started: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            started: Instant::now(),
        }
    }

    /// A reporter that drops every event.
    pub fn noop() -> Self {
        Self {
            callback: None,
            started: Instant::now(),
        }
    }

    pub fn emit(&self, mut event: ProgressEvent) {
        let Some(callback) = &self.callback else {
            return;
        };

        let elapsed = self.started.elapsed().as_secs_f64();
        event.elapsed_secs = Some(elapsed);

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            elapsed_secs = elapsed,
            "{}",
            event.message
        );
        callback(event);
    }

    pub fn discover(&self, current: u64, total: Option<u64>, dir: &str) {
        self.emit(ProgressEvent::new(
            IngestPhase::Discover,
            current,
            total,
            format!("found {} eligible files in {}", current, dir),
        ));
    }

    pub fn parse(&self, current: u64, total: Option<u64>, file: &str) {
        self.emit(ProgressEvent::new(
            IngestPhase::Parse,
            current,
            total,
            format!("reading {}", file),
        ));
    }

    pub fn chunk(&self, current: u64, total: Option<u64>, chunks_created: u32) {
        self.emit(ProgressEvent::new(
            IngestPhase::Chunk,
            current,
            total,
            format!("{} chunks created", chunks_created),
        ));
    }

    pub fn embed(&self, current: u64, total: Option<u64>, model: &str) {
        self.emit(ProgressEvent::new(
            IngestPhase::Embed,
            current,
            total,
            format!("model={}", model),
        ));
    }

    pub fn index(&self, current: u64, total: Option<u64>) {
        self.emit(ProgressEvent::new(
            IngestPhase::Index,
            current,
            total,
            "adding vectors to index",
        ));
    }

    pub fn persist(&self, chunks: u64, path: &str) {
        self.emit(ProgressEvent::new(
            IngestPhase::Persist,
            chunks,
            Some(chunks),
            format!("saving index to {}", path),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn capturing() -> (ProgressReporter, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let reporter = ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
            sink.lock().unwrap().push(event);
        }));
        (reporter, events)
    }

    #[test]
    fn test_format_simple() {
        let event = ProgressEvent::new(IngestPhase::Embed, 5, Some(10), "model=trigram-v1");
        assert_eq!(event.format_simple(), "[embed] 5/10 (50%) - model=trigram-v1");

        let open_ended = ProgressEvent::new(IngestPhase::Parse, 3, None, "reading a.md");
        assert_eq!(open_ended.format_simple(), "[parse] 3 - reading a.md");
    }

    #[test]
    fn test_zero_total_is_zero_percent() {
        let event = ProgressEvent::new(IngestPhase::Discover, 0, Some(0), "empty");
        assert_eq!(event.percentage, Some(0.0));
    }

    #[test]
    fn test_emit_stamps_elapsed() {
        let (reporter, events) = capturing();
        reporter.discover(3, Some(3), "data");

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].phase, IngestPhase::Discover);
        assert!(captured[0].elapsed_secs.is_some());
    }

    #[test]
    fn test_persist_event_is_complete() {
        let (reporter, events) = capturing();
        reporter.persist(12, "index/index.sqlite");

        let captured = events.lock().unwrap();
        assert_eq!(captured[0].phase, IngestPhase::Persist);
        assert_eq!(captured[0].percentage, Some(100.0));
        assert!(captured[0].message.contains("index.sqlite"));
    }

    #[test]
    fn test_phase_serializes_lowercase() {
        let event = ProgressEvent::new(IngestPhase::Index, 1, Some(2), "x");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["phase"], "index");
    }

    #[test]
    fn test_noop_reporter() {
        let reporter = ProgressReporter::noop();
        reporter.discover(1, None, "data");
    }
}
