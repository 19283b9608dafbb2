//! [`LabelCache`] – the last accepted object label.
//!
//! The labeler writes from a runtime thread while the frame loop reads on the
//! caller's thread.  Both sides go through one short critical section.  Every
//! labeling request takes a [`Ticket`]; a completion is accepted only if no
//! newer ticket has been issued since, so a slow result can never overwrite a
//! fresher one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use wayguard_types::Label;

/// Identifies one labeling request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone)]
struct Entry {
    label: Label,
    accepted_at: Duration,
}

#[derive(Debug, Default)]
struct Inner {
    latest: u64,
    entry: Option<Entry>,
}

/// Shared, cloneable handle to the cached label.
#[derive(Debug, Clone, Default)]
pub struct LabelCache {
    inner: Arc<Mutex<Inner>>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded data is always left consistent, so a poisoned lock is
        // still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a request.  All earlier tickets become stale.
    pub fn issue(&self) -> Ticket {
        let mut inner = self.lock();
        inner.latest += 1;
        Ticket(inner.latest)
    }

    /// Store `label` if `ticket` is still the newest request.  Returns whether
    /// the label was accepted.
    pub fn accept(&self, ticket: Ticket, label: Label, now: Duration) -> bool {
        let mut inner = self.lock();
        if ticket.0 != inner.latest {
            return false;
        }
        inner.entry = Some(Entry {
            label,
            accepted_at: now,
        });
        true
    }

    /// Current label, if any.
    pub fn snapshot(&self) -> Option<Label> {
        self.lock().entry.as_ref().map(|e| e.label.clone())
    }

    /// Drop the label once it is older than `ttl`.  Returns whether it was
    /// dropped.
    pub fn expire(&self, now: Duration, ttl: Duration) -> bool {
        let mut inner = self.lock();
        let stale = inner
            .entry
            .as_ref()
            .is_some_and(|e| now.saturating_sub(e.accepted_at) > ttl);
        if stale {
            inner.entry = None;
        }
        stale
    }

    /// Drop the label and discard every in-flight request.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        inner.latest += 1;
        inner.entry = None;
    }
}
