//! Lookup ledger: which downstreams failed to resolve which names.
//!
//! Only failed lookups are recorded. An entry lives until the name changes
//! (see [`RootCore::changed`](crate::root::RootCore::changed)) or the
//! downstream is removed.

use log::trace;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::downstream::DownstreamId;

/// Downstreams waiting on a single name.
pub type Waiters = SmallVec<[DownstreamId; 2]>;

/// Multi-valued map from name to blocked downstreams.
#[derive(Debug)]
pub struct LookupLedger {
    lookups: FxHashMap<String, Waiters>,
    dedup: bool,
}

impl LookupLedger {
    /// Ledger that stores each (name, downstream) pair at most once.
    pub fn new() -> Self {
        Self::with_dedup(true)
    }

    /// With `dedup` off, repeated registrations are stored and each one is
    /// notified on change.
    pub fn with_dedup(dedup: bool) -> Self {
        Self {
            lookups: FxHashMap::default(),
            dedup,
        }
    }

    pub fn dedup(&self) -> bool {
        self.dedup
    }

    /// Record that `downstream` failed to resolve `name`.
    pub fn save_lookup(&mut self, name: &str, downstream: DownstreamId) {
        let waiters = match self.lookups.get_mut(name) {
            Some(waiters) => waiters,
            None => self.lookups.entry(name.to_string()).or_default(),
        };
        if self.dedup && waiters.contains(&downstream) {
            return;
        }
        trace!("ledger: {downstream} waits on {name:?}");
        waiters.push(downstream);
    }

    /// Remove and return every entry for `name`.
    pub fn take(&mut self, name: &str) -> Waiters {
        self.lookups.remove(name).unwrap_or_default()
    }

    /// Remove every entry for `downstream`. Returns how many were dropped.
    pub fn remove_downstream(&mut self, downstream: DownstreamId) -> usize {
        let mut removed = 0;
        self.lookups.retain(|_, waiters| {
            let before = waiters.len();
            waiters.retain(|d| *d != downstream);
            removed += before - waiters.len();
            !waiters.is_empty()
        });
        removed
    }

    /// Remove and return every entry in the ledger.
    pub fn drain(&mut self) -> Vec<(String, Waiters)> {
        self.lookups.drain().collect()
    }

    /// Downstreams currently waiting on `name`.
    pub fn waiters(&self, name: &str) -> &[DownstreamId] {
        self.lookups.get(name).map(|w| w.as_slice()).unwrap_or(&[])
    }

    pub fn is_waiting(&self, name: &str, downstream: DownstreamId) -> bool {
        self.waiters(name).contains(&downstream)
    }

    /// Names with at least one waiter.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lookups.keys().map(String::as_str)
    }

    /// Total number of stored entries.
    pub fn len(&self) -> usize {
        self.lookups.values().map(|w| w.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }
}

impl Default for LookupLedger {
    fn default() -> Self {
        Self::new()
    }
}
