use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Kind of recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No header grammar matched the line
    UnmatchedHeader,
    /// Continuation lines before the first header of a file
    OrphanedLines,
    /// Oddity noticed while extracting details, e.g. a duplicate key
    Extraction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub file: String,
    pub line: u64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticCounts {
    pub warnings: u64,
    pub unmatched_headers: u64,
}

/// Collects recoverable warnings from every file task.
///
/// Cloning yields another handle onto the same collection. Only the first
/// `retain_limit` diagnostics are kept in full; all of them are counted.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug)]
struct Inner {
    retained: Vec<Diagnostic>,
    retain_limit: usize,
    counts: DiagnosticCounts,
}

const DEFAULT_RETAIN_LIMIT: usize = 1000;

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_retain_limit(DEFAULT_RETAIN_LIMIT)
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retain_limit(retain_limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                retained: Vec::new(),
                retain_limit,
                counts: DiagnosticCounts::default(),
            })),
        }
    }

    pub fn report(&self, kind: DiagnosticKind, file: &str, line: u64, message: impl Into<String>) {
        let message = message.into();
        warn!(file = %file, line = line, kind = ?kind, "{}", message);

        let mut inner = self.inner.lock();
        inner.counts.warnings += 1;
        if kind == DiagnosticKind::UnmatchedHeader {
            inner.counts.unmatched_headers += 1;
        }
        if inner.retained.len() < inner.retain_limit {
            inner.retained.push(Diagnostic {
                kind,
                file: file.to_string(),
                line,
                message,
            });
        }
    }

    pub fn counts(&self) -> DiagnosticCounts {
        self.inner.lock().counts
    }

    pub fn retained(&self) -> Vec<Diagnostic> {
        self.inner.lock().retained.clone()
    }
}
