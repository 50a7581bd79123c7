//! Attribute-bearing roots.
//!
//! [`Root`] is the public contract every container kind implements.
//! [`RootCore`] is the shared bookkeeping each concrete root owns: the lookup
//! ledger plus the install/uninstall/changed operations over its child lists.

use log::debug;

use crate::child::{Child, ChildList, Uid};
use crate::downstream::DownstreamId;
use crate::error::AttrError;
use crate::flags::AttrFlags;
use crate::ledger::LookupLedger;
use crate::name::{is_name_valid, uid_key};
use crate::queue::{Change, EvalQueue};
use crate::value::ValueRef;

/// Summary of one [`Root::flush_queue`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Number of batches drained.
    pub rounds: usize,
    /// Number of downstream evaluations run.
    pub evaluated: usize,
}

/// A container whose attributes can be read and written by name.
pub trait Root {
    /// Resolve `name`. A failed lookup returns `Ok(None)` and records
    /// `caller` so it is re-queued when `name` changes.
    fn get_attribute(
        &mut self,
        name: &str,
        caller: Option<DownstreamId>,
        flags: AttrFlags,
    ) -> Result<Option<ValueRef>, AttrError>;

    /// Store a value under `name`, notifying waiters before returning.
    fn set_attribute(
        &mut self,
        name: &str,
        value: ValueRef,
        flags: AttrFlags,
    ) -> Result<(), AttrError>;

    /// Schedule a downstream for re-evaluation.
    fn queue(&mut self, downstream: DownstreamId);

    /// Re-evaluate everything scheduled.
    fn flush_queue(&mut self) -> Result<FlushReport, AttrError>;
}

/// Ledger and child-list bookkeeping shared by concrete roots.
#[derive(Debug, Default)]
pub struct RootCore {
    ledger: LookupLedger,
}

impl RootCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dedup(dedup: bool) -> Self {
        Self {
            ledger: LookupLedger::with_dedup(dedup),
        }
    }

    pub fn ledger(&self) -> &LookupLedger {
        &self.ledger
    }

    /// Record that `caller` failed to resolve `name`.
    pub fn save_lookup(&mut self, name: &str, caller: DownstreamId) {
        self.ledger.save_lookup(name, caller);
    }

    /// Queue every downstream waiting on `name` (or on the `__<uid>` key of
    /// the changed entity), then clear those entries.
    ///
    /// Entries are removed before anything is queued, so a downstream that
    /// registers again for `name` waits for the next change.
    pub fn changed(&mut self, name: &str, uid: Uid, queue: &mut impl EvalQueue) -> usize {
        let mut woken = self.ledger.take(name);
        for downstream in self.ledger.take(&uid_key(uid)) {
            if !woken.contains(&downstream) {
                woken.push(downstream);
            }
        }
        for downstream in &woken {
            queue.push(*downstream, Some(Change::new(name, uid)));
        }
        if !woken.is_empty() {
            debug!("changed {name:?} (uid {uid}): woke {} downstreams", woken.len());
        }
        woken.len()
    }

    /// Forget every failed lookup of `downstream`.
    pub fn remove_downstream(&mut self, downstream: DownstreamId) -> usize {
        self.ledger.remove_downstream(downstream)
    }

    /// Queue every waiter regardless of name. Used when the root itself goes
    /// away so blocked downstreams can re-resolve elsewhere.
    pub fn wake_all(&mut self, queue: &mut impl EvalQueue) -> usize {
        let mut woken = 0;
        for (_, waiters) in self.ledger.drain() {
            for downstream in waiters {
                queue.push(downstream, None);
                woken += 1;
            }
        }
        woken
    }

    /// Resolve `key` in `list`, recording `caller` on failure.
    pub fn resolve<'a, T: Child>(
        &mut self,
        key: &str,
        list: &'a ChildList<T>,
        caller: Option<DownstreamId>,
        flags: AttrFlags,
    ) -> Option<&'a T> {
        let found = list.get(key);
        if found.is_none() {
            if let Some(caller) = caller.filter(|_| !flags.contains(AttrFlags::NO_LOOKUP)) {
                self.save_lookup(key, caller);
            }
        }
        found
    }

    /// Check that `name` may be used for a new child of `list`.
    pub fn check_name<T: Child>(name: &str, list: &ChildList<T>) -> Result<(), AttrError> {
        if !is_name_valid(name) {
            return Err(AttrError::InvalidName(name.to_string()));
        }
        if list.contains_name(name) {
            return Err(AttrError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Validate the child's name, install it and announce it.
    pub fn install_child<T: Child>(
        &mut self,
        child: T,
        list: &mut ChildList<T>,
        queue: &mut impl EvalQueue,
    ) -> Result<Uid, AttrError> {
        Self::check_name(child.name(), list)?;
        let name = child.name().to_string();
        let uid = list.install(child);
        debug!("installed {name:?} as uid {uid}");
        self.changed(&name, uid, queue);
        Ok(uid)
    }

    /// Remove a child and announce its disappearance.
    pub fn uninstall_child<T: Child>(
        &mut self,
        uid: Uid,
        list: &mut ChildList<T>,
        queue: &mut impl EvalQueue,
    ) -> Option<T> {
        let child = list.remove(uid)?;
        debug!("uninstalled {:?} (uid {uid})", child.name());
        self.changed(child.name(), uid, queue);
        Some(child)
    }

    /// Announce that the child `uid` was renamed from `old` to `new`.
    pub fn renamed(&mut self, old: &str, new: &str, uid: Uid, queue: &mut impl EvalQueue) {
        self.changed(old, uid, queue);
        self.changed(new, uid, queue);
    }
}
