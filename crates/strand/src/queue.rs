//! Evaluation queue: the deferred half of change propagation.
//!
//! Change notification only schedules work. The owning scheduler drains the
//! queue later, one batch at a time, so a cascade of changes becomes a
//! worklist instead of a deep call stack.

use indexmap::IndexMap;
use log::trace;

use crate::child::Uid;
use crate::downstream::DownstreamId;

/// The entity change that caused a downstream to be scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub name: String,
    pub uid: Uid,
}

impl Change {
    pub fn new(name: impl Into<String>, uid: Uid) -> Self {
        Self {
            name: name.into(),
            uid,
        }
    }
}

/// A scheduled downstream together with the change that first woke it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub downstream: DownstreamId,
    /// `None` when scheduled directly rather than by a change.
    pub cause: Option<Change>,
}

/// Scheduling side of a re-evaluation queue.
pub trait EvalQueue {
    /// Schedule a downstream. Queuing an already queued downstream has no
    /// effect; returns whether it was newly added.
    fn push(&mut self, downstream: DownstreamId, cause: Option<Change>) -> bool;

    /// Cancel a pending entry. Returns whether it was queued.
    fn dequeue(&mut self, downstream: DownstreamId) -> bool;

    fn is_queued(&self, downstream: DownstreamId) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Insertion-ordered, deduplicating queue.
#[derive(Debug, Default)]
pub struct DirtyQueue {
    entries: IndexMap<DownstreamId, Option<Change>>,
}

impl DirtyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything queued so far. Entries pushed while the batch is being
    /// processed land in the next batch.
    pub fn take_batch(&mut self) -> Vec<QueueEntry> {
        self.entries
            .drain(..)
            .map(|(downstream, cause)| QueueEntry { downstream, cause })
            .collect()
    }

    /// Queued downstreams in scheduling order.
    pub fn pending(&self) -> impl Iterator<Item = DownstreamId> + '_ {
        self.entries.keys().copied()
    }
}

impl EvalQueue for DirtyQueue {
    fn push(&mut self, downstream: DownstreamId, cause: Option<Change>) -> bool {
        if self.entries.contains_key(&downstream) {
            return false;
        }
        trace!("queue: {downstream} scheduled by {cause:?}");
        self.entries.insert(downstream, cause);
        true
    }

    fn dequeue(&mut self, downstream: DownstreamId) -> bool {
        self.entries.shift_remove(&downstream).is_some()
    }

    fn is_queued(&self, downstream: DownstreamId) -> bool {
        self.entries.contains_key(&downstream)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
