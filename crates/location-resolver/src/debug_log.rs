//! Bounded log of the steps taken by one resolution attempt

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::constants::DEBUG_LOG_CAPACITY;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugLogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Ring buffer keeping only the most recent entries
#[derive(Debug)]
pub struct DebugLog {
    entries: Mutex<VecDeque<DebugLogEntry>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::with_capacity(DEBUG_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest once full
    pub fn record(&self, message: impl Into<String>, data: Option<serde_json::Value>) {
        let entry = DebugLogEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            message: message.into(),
            data,
        };

        match &entry.data {
            Some(data) => debug!(id = entry.id, data = %data, "{}", entry.message),
            None => debug!(id = entry.id, "{}", entry.message),
        }

        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Snapshot, oldest first
    pub fn entries(&self) -> Vec<DebugLogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<DebugLogEntry>> {
        // A panic while holding the lock cannot leave the deque inconsistent
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new()
    }
}
