//! Line buffer service
//!
//! Holds captured output lines between flushes. The buffer is the one piece
//! of shared mutable state in a run; every access goes through its lock.

use std::sync::{Arc, Mutex, MutexGuard};

/// Service for buffering captured lines
pub trait LineBuffer: Send + Sync {
    /// Appends a line
    fn push(&self, line: String);

    /// Removes and returns all buffered lines, oldest first
    fn drain(&self) -> Vec<String>;

    /// Whether nothing is buffered
    fn is_empty(&self) -> bool;
}

/// In-memory implementation of LineBuffer
///
/// Uses Arc<Mutex<Vec<String>>> for thread-safe access across tasks.
#[derive(Clone, Default)]
pub struct InMemoryLineBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl InMemoryLineBuffer {
    /// Creates a new in-memory line buffer
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LineBuffer for InMemoryLineBuffer {
    fn push(&self, line: String) {
        self.lock().push(line);
    }

    fn drain(&self) -> Vec<String> {
        self.lock().drain(..).collect()
    }

    fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Renders buffered lines as chunk content
///
/// Leading and trailing whitespace-only lines are dropped and the rest is
/// joined with `\n`. Returns `None` when nothing is left.
pub fn render_chunk(lines: &[String]) -> Option<String> {
    let blank = |line: &String| line.trim().is_empty();

    let start = lines.iter().position(|l| !blank(l))?;
    let end = lines.iter().rposition(|l| !blank(l))?;

    Some(lines[start..=end].join("\n"))
}
