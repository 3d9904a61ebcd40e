//! Destination for the client's log text.
//!
//! Log text arrives either through `log-restart`/`log-update` blocks or from a
//! separate line-oriented reader; both end up in a `LogSink`.

use parking_lot::Mutex;
use std::collections::VecDeque;

pub trait LogSink: Send + Sync {
    /// Append raw text. Lines may be split across calls.
    fn append(&self, text: &str);

    /// Everything received so far is superseded.
    fn restart(&self);
}

pub const DEFAULT_MAX_LINES: usize = 10_000;

/// Bounded in-memory log that keeps the newest lines.
#[derive(Debug)]
pub struct LogBuffer {
    max_lines: usize,
    inner: Mutex<LogLines>,
}

#[derive(Debug, Default)]
struct LogLines {
    lines: VecDeque<String>,
    /// Text after the last newline.
    partial: String,
    /// Complete lines seen since the last restart, including evicted ones.
    total: u64,
    restarts: u64,
}

/// Consistent view of a `LogBuffer`, taken under one lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSnapshot {
    pub restarts: u64,
    /// Complete lines since the last restart, including evicted ones.
    pub total_lines: u64,
    /// Retained lines, oldest first.
    pub lines: Vec<String>,
}

impl LogSnapshot {
    /// Lines completed after the first `seen` lines of this restart epoch
    /// that are still retained.
    pub fn after(&self, seen: u64) -> &[String] {
        let fresh = self.total_lines.saturating_sub(seen);
        let fresh = usize::try_from(fresh).unwrap_or(usize::MAX).min(self.lines.len());
        &self.lines[self.lines.len() - fresh..]
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl LogBuffer {
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines: max_lines.max(1),
            inner: Mutex::new(LogLines::default()),
        }
    }

    /// Complete lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.inner.lock().lines.iter().cloned().collect()
    }

    /// The newest `n` complete lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let inner = self.inner.lock();
        let skip = inner.lines.len().saturating_sub(n);
        inner.lines.iter().skip(skip).cloned().collect()
    }

    pub fn partial(&self) -> String {
        self.inner.lock().partial.clone()
    }

    pub fn total_lines(&self) -> u64 {
        self.inner.lock().total
    }

    pub fn snapshot(&self) -> LogSnapshot {
        let inner = self.inner.lock();
        LogSnapshot {
            restarts: inner.restarts,
            total_lines: inner.total,
            lines: inner.lines.iter().cloned().collect(),
        }
    }

    pub fn restarts(&self) -> u64 {
        self.inner.lock().restarts
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock();
        inner.lines.is_empty() && inner.partial.is_empty()
    }
}

impl LogSink for LogBuffer {
    fn append(&self, text: &str) {
        let mut inner = self.inner.lock();
        inner.partial.push_str(text);

        while let Some(pos) = inner.partial.find('\n') {
            let rest = inner.partial.split_off(pos + 1);
            let mut line = std::mem::replace(&mut inner.partial, rest);
            line.truncate(line.trim_end_matches(['\r', '\n']).len());
            inner.lines.push_back(line);
            inner.total += 1;
        }

        while inner.lines.len() > self.max_lines {
            inner.lines.pop_front();
        }
    }

    fn restart(&self) {
        let mut inner = self.inner.lock();
        inner.lines.clear();
        inner.partial.clear();
        inner.total = 0;
        inner.restarts += 1;
    }
}
