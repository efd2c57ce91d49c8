//! Append-only exchange log and the live-view notification channel.

use std::sync::{Mutex, MutexGuard, PoisonError};

use relay_common::ExchangeEntry;
use tokio::sync::mpsc;

/// Mutex-guarded, append-only, index-addressable sequence of exchange
/// entries.
///
/// The lock is shared with the live interception path, which may append new
/// entries while a restore is running. Index and request number are both
/// assigned inside the lock, so `append` is atomic with numbering and an
/// appended entry is visible to every reader once the call returns. No
/// mutation beyond append exists.
#[derive(Debug, Default)]
pub struct ExchangeLog {
    inner: Mutex<LogInner>,
}

#[derive(Debug)]
struct LogInner {
    entries: Vec<ExchangeEntry>,
    next_number: u64,
}

impl Default for LogInner {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_number: 1,
        }
    }
}

impl ExchangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry, assigning its request number. Returns the index it
    /// was inserted at (the length before the append).
    pub fn append(&self, mut entry: ExchangeEntry) -> usize {
        let mut inner = self.lock();
        entry.number = inner.next_number;
        inner.next_number += 1;
        inner.entries.push(entry);
        inner.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Clone of the entry at `index`, if present.
    pub fn get(&self, index: usize) -> Option<ExchangeEntry> {
        self.lock().entries.get(index).cloned()
    }

    /// Clone of the most recently appended entry.
    pub fn last(&self) -> Option<ExchangeEntry> {
        self.lock().entries.last().cloned()
    }

    /// Consistent copy of the whole log, taken under the lock. Export walks
    /// this snapshot so concurrent captures cannot tear a file.
    pub fn snapshot(&self) -> Vec<ExchangeEntry> {
        self.lock().entries.clone()
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        // An append either fully happened or did not, so entries behind a
        // poisoned lock are still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Notification delivered to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// A log append happened at this index.
    Inserted { index: usize },
}

/// Schedules ordered insert notifications onto the single consuming context.
///
/// The channel is unbounded so notifying never blocks the restoring thread;
/// delivery order matches send order for each sender.
#[derive(Debug, Clone)]
pub struct ViewSync {
    tx: mpsc::UnboundedSender<ViewEvent>,
}

impl ViewSync {
    /// Create the synchronizer and the receiver the presentation layer owns.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ViewEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Announce an insert. A dropped receiver means the view is gone, which
    /// is not an error for the restore path.
    pub fn notify_insert(&self, index: usize) {
        let _ = self.tx.send(ViewEvent::Inserted { index });
    }
}
