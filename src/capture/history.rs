//! Append-only request history and running stats.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::capture::record::CapturedRequest;

/// Aggregate snapshot: process start time plus the capture counter.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub uptime: DateTime<Utc>,
    pub echoes: u64,
}

struct HistoryInner {
    started: DateTime<Utc>,
    echoes: u64,
    records: Vec<Arc<CapturedRequest>>,
}

/// Mutex-guarded ledger of every captured request.
///
/// Indices are assigned by append order starting at 0 and never reused. The
/// counter increments under the same lock as the append, so a concurrent
/// index lookup sees either the fully appended record or nothing. Unbounded
/// by design.
pub struct History {
    inner: Mutex<HistoryInner>,
}

impl History {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HistoryInner {
                started: Utc::now(),
                echoes: 0,
                records: Vec::new(),
            }),
        }
    }

    /// Append a finished record, returning its index.
    pub fn append(&self, record: Arc<CapturedRequest>) -> usize {
        let mut inner = self.inner.lock().expect("history lock poisoned");
        inner.records.push(record);
        inner.echoes += 1;
        inner.records.len() - 1
    }

    /// Fetch the record at `index`, if one has been appended there.
    pub fn at(&self, index: usize) -> Option<Arc<CapturedRequest>> {
        let inner = self.inner.lock().expect("history lock poisoned");
        inner.records.get(index).cloned()
    }

    /// Aggregate counters.
    pub fn snapshot(&self) -> Stats {
        let inner = self.inner.lock().expect("history lock poisoned");
        Stats {
            uptime: inner.started,
            echoes: inner.echoes,
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
