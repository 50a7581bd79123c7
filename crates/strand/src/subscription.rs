//! Subscriptions for successful reads.
//!
//! The lookup ledger only remembers failed lookups. A formula that did
//! resolve a datum subscribes to that datum's address here instead, and is
//! woken when the datum's value changes or the datum goes away.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::child::Uid;
use crate::downstream::DownstreamId;
use crate::queue::{Change, EvalQueue};

/// Address of a datum within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatumAddr {
    pub node: Uid,
    pub datum: Uid,
}

impl DatumAddr {
    pub fn new(node: Uid, datum: Uid) -> Self {
        Self { node, datum }
    }
}

/// datum address -> downstreams that read it
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    subscribers: FxHashMap<DatumAddr, SmallVec<[DownstreamId; 4]>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, addr: DatumAddr, downstream: DownstreamId) {
        let subs = self.subscribers.entry(addr).or_default();
        if !subs.contains(&downstream) {
            subs.push(downstream);
        }
    }

    pub fn unsubscribe(&mut self, addr: DatumAddr, downstream: DownstreamId) {
        if let Some(subs) = self.subscribers.get_mut(&addr) {
            subs.retain(|d| *d != downstream);
            if subs.is_empty() {
                self.subscribers.remove(&addr);
            }
        }
    }

    /// Queue and forget every subscriber of `addr`.
    pub fn wake(&mut self, addr: DatumAddr, change: &Change, queue: &mut impl EvalQueue) -> usize {
        let Some(subs) = self.subscribers.remove(&addr) else {
            return 0;
        };
        for downstream in &subs {
            queue.push(*downstream, Some(change.clone()));
        }
        subs.len()
    }

    pub fn subscribers(&self, addr: DatumAddr) -> &[DownstreamId] {
        self.subscribers.get(&addr).map(|s| s.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
