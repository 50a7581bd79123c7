//! Concrete scene: a root of nodes, each node a root of datums.
//!
//! Datums hold either a literal value or a formula. Formulas are the
//! downstreams of this scene: they read other datums by reference, hand the
//! values to a host function and store the result in their owning datum.
//!
//! References are `"x"` (datum `x` of the formula's own node) or `"n.x"`
//! (datum `x` of node `n`). Either segment may be an `__<uid>` key.

use std::fmt;

use log::{debug, warn};
use serde::Serialize;
use smallvec::SmallVec;

use crate::child::{Child, ChildList, Uid};
use crate::config::SceneConfig;
use crate::downstream::{DownstreamId, Registry};
use crate::error::AttrError;
use crate::flags::AttrFlags;
use crate::host::HostFn;
use crate::name::{is_name_valid, is_uid_key, next_free_name};
use crate::queue::{Change, DirtyQueue, EvalQueue};
use crate::root::{FlushReport, Root, RootCore};
use crate::subscription::{DatumAddr, SubscriptionTable};
use crate::value::{Value, ValueRef};

/// Evaluation state of a datum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DatumState {
    Ready { value: ValueRef },
    /// Waiting on an input that does not resolve yet. `missing` is `None`
    /// before the first evaluation.
    Pending { missing: Option<String> },
    Failed { error: String },
}

impl DatumState {
    /// Whether replacing `self` with `other` is a change worth announcing.
    fn same_as(&self, other: &DatumState) -> bool {
        match (self, other) {
            (DatumState::Ready { value: a }, DatumState::Ready { value: b }) => a.same_as(b),
            _ => self == other,
        }
    }
}

/// Where a datum's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatumSource {
    Literal,
    Formula(DownstreamId),
}

#[derive(Debug)]
pub struct Datum {
    name: String,
    uid: Uid,
    source: DatumSource,
    state: DatumState,
}

impl Datum {
    fn new(name: &str, source: DatumSource, state: DatumState) -> Self {
        Self {
            name: name.to_string(),
            uid: 0,
            source,
            state,
        }
    }

    pub fn source(&self) -> DatumSource {
        self.source
    }

    pub fn state(&self) -> &DatumState {
        &self.state
    }

    pub fn value(&self) -> Option<&ValueRef> {
        match &self.state {
            DatumState::Ready { value } => Some(value),
            _ => None,
        }
    }
}

impl Child for Datum {
    fn name(&self) -> &str {
        &self.name
    }

    fn uid(&self) -> Uid {
        self.uid
    }

    fn set_uid(&mut self, uid: Uid) {
        self.uid = uid;
    }
}

/// A scene node: a named, typed container of datums with its own ledger.
#[derive(Debug)]
pub struct Node {
    name: String,
    uid: Uid,
    kind: String,
    core: RootCore,
    datums: ChildList<Datum>,
}

impl Node {
    fn new(name: &str, kind: &str, dedup: bool) -> Self {
        Self {
            name: name.to_string(),
            uid: 0,
            kind: kind.to_string(),
            core: RootCore::with_dedup(dedup),
            datums: ChildList::new(),
        }
    }

    /// Opaque type tag supplied by the host (`"cube"`, `"point3d"`, ...).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn datum(&self, key: &str) -> Option<&Datum> {
        self.datums.get(key)
    }

    pub fn datums(&self) -> impl Iterator<Item = &Datum> {
        self.datums.iter()
    }

    pub fn core(&self) -> &RootCore {
        &self.core
    }
}

impl Child for Node {
    fn name(&self) -> &str {
        &self.name
    }

    fn uid(&self) -> Uid {
        self.uid
    }

    fn set_uid(&mut self, uid: Uid) {
        self.uid = uid;
    }
}

/// A datum reference as written in a formula or attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Local(String),
    Qualified { node: String, datum: String },
}

impl Reference {
    pub fn parse(path: &str) -> Result<Self, AttrError> {
        let segment = |s: &str| {
            if is_name_valid(s) || is_uid_key(s) {
                Ok(s.to_string())
            } else {
                Err(AttrError::InvalidName(path.to_string()))
            }
        };
        match path.split_once('.') {
            None => Ok(Reference::Local(segment(path)?)),
            Some((node, datum)) => Ok(Reference::Qualified {
                node: segment(node)?,
                datum: segment(datum)?,
            }),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Local(datum) => f.write_str(datum),
            Reference::Qualified { node, datum } => write!(f, "{node}.{datum}"),
        }
    }
}

struct Formula {
    owner: DatumAddr,
    inputs: Vec<Reference>,
    func: HostFn,
    /// Datums this formula read on its last evaluation.
    reads: SmallVec<[DatumAddr; 4]>,
}

enum Lookup {
    Found(DatumAddr, ValueRef),
    Absent,
    Failed(DatumAddr, AttrError),
}

/// Read a datum of `node`, recording `caller` in the node's ledger when the
/// datum is missing or not computed yet.
fn read_datum(
    node: &mut Node,
    key: &str,
    caller: Option<DownstreamId>,
    flags: AttrFlags,
) -> Lookup {
    let Some(datum) = node.core.resolve(key, &node.datums, caller, flags) else {
        return Lookup::Absent;
    };
    let addr = DatumAddr::new(node.uid, datum.uid);
    match &datum.state {
        DatumState::Ready { value } => Lookup::Found(addr, value.clone()),
        DatumState::Pending { .. } => {
            if let Some(caller) = caller.filter(|_| !flags.contains(AttrFlags::NO_LOOKUP)) {
                node.core.save_lookup(key, caller);
            }
            Lookup::Absent
        }
        DatumState::Failed { error } => Lookup::Failed(
            addr,
            AttrError::HostValue {
                name: datum.name.clone(),
                message: error.clone(),
            },
        ),
    }
}

/// Top-level root of a scene.
pub struct Scene {
    config: SceneConfig,
    core: RootCore,
    nodes: ChildList<Node>,
    formulas: Registry<Formula>,
    queue: DirtyQueue,
    subscriptions: SubscriptionTable,
}

impl Scene {
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            core: RootCore::with_dedup(config.dedup_lookups),
            config,
            nodes: ChildList::new(),
            formulas: Registry::new(),
            queue: DirtyQueue::new(),
            subscriptions: SubscriptionTable::new(),
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn core(&self) -> &RootCore {
        &self.core
    }

    pub fn node(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Downstreams waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_queued(&self, formula: DownstreamId) -> bool {
        self.queue.is_queued(formula)
    }

    pub fn formula_count(&self) -> usize {
        self.formulas.len()
    }

    pub fn add_node(&mut self, name: &str, kind: &str) -> Result<Uid, AttrError> {
        let node = Node::new(name, kind, self.config.dedup_lookups);
        self.core.install_child(node, &mut self.nodes, &mut self.queue)
    }

    /// Add a node named `prefix` plus the lowest free number (`c0`, `c1`, ...).
    pub fn add_node_with_prefix(&mut self, prefix: &str, kind: &str) -> Result<Uid, AttrError> {
        let name = next_free_name(prefix, |n| self.nodes.contains_name(n));
        self.add_node(&name, kind)
    }

    fn node_uid(&self, key: &str) -> Result<Uid, AttrError> {
        self.nodes
            .get(key)
            .map(Child::uid)
            .ok_or_else(|| AttrError::Missing(key.to_string()))
    }

    /// Remove a node with all its datums.
    pub fn remove_node(&mut self, key: &str) -> Result<Node, AttrError> {
        let uid = self.node_uid(key)?;
        let datums: Vec<(Uid, String, DatumSource)> = self
            .nodes
            .get_by_uid(uid)
            .map(|node| {
                node.datums
                    .iter()
                    .map(|d| (d.uid, d.name.clone(), d.source))
                    .collect()
            })
            .unwrap_or_default();

        for (datum, name, source) in datums {
            if let DatumSource::Formula(id) = source {
                self.drop_formula(id);
            }
            let change = Change::new(name, datum);
            self.subscriptions
                .wake(DatumAddr::new(uid, datum), &change, &mut self.queue);
        }
        if let Some(node) = self.nodes.get_by_uid_mut(uid) {
            node.core.wake_all(&mut self.queue);
        }

        self.core
            .uninstall_child(uid, &mut self.nodes, &mut self.queue)
            .ok_or_else(|| AttrError::Missing(key.to_string()))
    }

    pub fn rename_node(&mut self, key: &str, new_name: &str) -> Result<(), AttrError> {
        let uid = self.node_uid(key)?;
        if self.nodes.get_by_uid(uid).is_some_and(|n| n.name == new_name) {
            return Ok(());
        }
        RootCore::check_name(new_name, &self.nodes)?;

        let Some(node) = self.nodes.get_by_uid_mut(uid) else {
            return Err(AttrError::Missing(key.to_string()));
        };
        let old = std::mem::replace(&mut node.name, new_name.to_string());
        let datums: Vec<(Uid, String)> = node
            .datums
            .iter()
            .map(|d| (d.uid, d.name.clone()))
            .collect();
        debug!("renamed node {old:?} to {new_name:?}");

        self.core.renamed(&old, new_name, uid, &mut self.queue);
        for (datum, name) in datums {
            let change = Change::new(name, datum);
            self.subscriptions
                .wake(DatumAddr::new(uid, datum), &change, &mut self.queue);
        }
        Ok(())
    }

    /// Assign a literal value, creating the datum if needed.
    pub fn set_literal(&mut self, node: &str, datum: &str, value: Value) -> Result<Uid, AttrError> {
        self.store_literal(node, datum, value.into_ref(), AttrFlags::empty())
    }

    fn store_literal(
        &mut self,
        node_key: &str,
        datum_key: &str,
        value: ValueRef,
        flags: AttrFlags,
    ) -> Result<Uid, AttrError> {
        let node_uid = self.node_uid(node_key)?;
        let existing = self
            .nodes
            .get_by_uid(node_uid)
            .and_then(|n| n.datums.get(datum_key))
            .map(|d| (d.uid, d.source));

        match existing {
            Some((uid, source)) => {
                if let DatumSource::Formula(id) = source {
                    self.drop_formula(id);
                }
                let state = DatumState::Ready { value };
                let addr = DatumAddr::new(node_uid, uid);
                self.replace_state(addr, state, Some(DatumSource::Literal), true);
                Ok(uid)
            }
            None if flags.contains(AttrFlags::NO_CREATE) || is_uid_key(datum_key) => {
                Err(AttrError::Missing(format!("{node_key}.{datum_key}")))
            }
            None => {
                let state = DatumState::Ready { value };
                let datum = Datum::new(datum_key, DatumSource::Literal, state);
                self.install_datum(node_uid, datum)
            }
        }
    }

    fn install_datum(&mut self, node_uid: Uid, datum: Datum) -> Result<Uid, AttrError> {
        let Some(node) = self.nodes.get_by_uid_mut(node_uid) else {
            return Err(AttrError::Missing(datum.name));
        };
        node.core
            .install_child(datum, &mut node.datums, &mut self.queue)
    }

    /// Make a datum computed by `func` over `inputs`, creating it if needed.
    /// The formula is queued; its value appears after the next flush.
    pub fn set_formula(
        &mut self,
        node_key: &str,
        datum_key: &str,
        inputs: &[&str],
        func: HostFn,
    ) -> Result<DownstreamId, AttrError> {
        let inputs = inputs
            .iter()
            .map(|input| Reference::parse(input))
            .collect::<Result<Vec<_>, _>>()?;
        let node_uid = self.node_uid(node_key)?;
        let existing = self
            .nodes
            .get_by_uid(node_uid)
            .and_then(|n| n.datums.get(datum_key))
            .map(|d| (d.uid, d.source));

        let datum_uid = match existing {
            Some((uid, source)) => {
                if let DatumSource::Formula(id) = source {
                    self.drop_formula(id);
                }
                uid
            }
            None if is_uid_key(datum_key) => {
                return Err(AttrError::Missing(format!("{node_key}.{datum_key}")));
            }
            None => {
                let state = DatumState::Pending { missing: None };
                let datum = Datum::new(datum_key, DatumSource::Literal, state);
                self.install_datum(node_uid, datum)?
            }
        };

        let owner = DatumAddr::new(node_uid, datum_uid);
        let id = self.formulas.insert(Formula {
            owner,
            inputs,
            func,
            reads: SmallVec::new(),
        });
        if let Some(datum) = self.datum_mut(owner) {
            datum.source = DatumSource::Formula(id);
        }
        self.queue.push(id, None);
        Ok(id)
    }

    pub fn remove_datum(&mut self, node_key: &str, datum_key: &str) -> Result<Datum, AttrError> {
        let node_uid = self.node_uid(node_key)?;
        let missing = || AttrError::Missing(format!("{node_key}.{datum_key}"));
        let (uid, name, source) = self
            .nodes
            .get_by_uid(node_uid)
            .and_then(|n| n.datums.get(datum_key))
            .map(|d| (d.uid, d.name.clone(), d.source))
            .ok_or_else(missing)?;

        if let DatumSource::Formula(id) = source {
            self.drop_formula(id);
        }
        let change = Change::new(name, uid);
        self.subscriptions
            .wake(DatumAddr::new(node_uid, uid), &change, &mut self.queue);

        let node = self.nodes.get_by_uid_mut(node_uid).ok_or_else(missing)?;
        node.core
            .uninstall_child(uid, &mut node.datums, &mut self.queue)
            .ok_or_else(missing)
    }

    pub fn rename_datum(
        &mut self,
        node_key: &str,
        datum_key: &str,
        new_name: &str,
    ) -> Result<(), AttrError> {
        let node_uid = self.node_uid(node_key)?;
        let missing = || AttrError::Missing(format!("{node_key}.{datum_key}"));
        let Some(node) = self.nodes.get_by_uid_mut(node_uid) else {
            return Err(missing());
        };
        let uid = node.datums.get(datum_key).map(Child::uid).ok_or_else(missing)?;
        if node.datums.get_by_uid(uid).is_some_and(|d| d.name == new_name) {
            return Ok(());
        }
        RootCore::check_name(new_name, &node.datums)?;

        let Some(datum) = node.datums.get_by_uid_mut(uid) else {
            return Err(missing());
        };
        let old = std::mem::replace(&mut datum.name, new_name.to_string());
        node.core.renamed(&old, new_name, uid, &mut self.queue);
        let change = Change::new(new_name, uid);
        self.subscriptions
            .wake(DatumAddr::new(node_uid, uid), &change, &mut self.queue);
        Ok(())
    }

    /// Current value at `path`, without registering a lookup.
    pub fn value(&mut self, path: &str) -> Result<Option<ValueRef>, AttrError> {
        self.get_attribute(path, None, AttrFlags::empty())
    }

    /// State of the datum at a `node.datum` path.
    pub fn datum_state(&self, path: &str) -> Option<&DatumState> {
        let (node, datum) = path.split_once('.')?;
        Some(self.nodes.get(node)?.datums.get(datum)?.state())
    }

    fn datum_mut(&mut self, addr: DatumAddr) -> Option<&mut Datum> {
        self.nodes
            .get_by_uid_mut(addr.node)?
            .datums
            .get_by_uid_mut(addr.datum)
    }

    /// Rounds one flush may run before it reports a cycle.
    pub fn round_limit(&self) -> usize {
        self.config.max_flush_rounds.max(self.formulas.len() + 1)
    }

    /// Remove a formula and every reference to it.
    fn drop_formula(&mut self, id: DownstreamId) {
        let Some(formula) = self.formulas.remove(id) else {
            return;
        };
        for addr in formula.reads {
            self.subscriptions.unsubscribe(addr, id);
        }
        self.core.remove_downstream(id);
        for node in self.nodes.iter_mut() {
            node.core.remove_downstream(id);
        }
        self.queue.dequeue(id);
        debug!("dropped formula {id}");
    }

    fn lookup(
        &mut self,
        reference: &Reference,
        home: Uid,
        caller: Option<DownstreamId>,
        flags: AttrFlags,
    ) -> Lookup {
        let node_uid = match reference {
            Reference::Local(_) => home,
            Reference::Qualified { node, .. } => {
                match self.core.resolve(node, &self.nodes, caller, flags) {
                    Some(node) => node.uid,
                    None => return Lookup::Absent,
                }
            }
        };
        let datum = match reference {
            Reference::Local(datum) | Reference::Qualified { datum, .. } => datum,
        };
        match self.nodes.get_by_uid_mut(node_uid) {
            Some(node) => read_datum(node, datum, caller, flags),
            None => Lookup::Absent,
        }
    }

    /// Re-run one formula. Returns `false` for a stale handle.
    fn evaluate(&mut self, id: DownstreamId) -> bool {
        let Some(formula) = self.formulas.get_mut(id) else {
            return false;
        };
        let owner = formula.owner;
        let inputs = formula.inputs.clone();
        let func = formula.func.clone();
        for addr in std::mem::take(&mut formula.reads) {
            self.subscriptions.unsubscribe(addr, id);
        }

        let mut args = Vec::with_capacity(inputs.len());
        let mut reads = SmallVec::<[DatumAddr; 4]>::new();
        let mut blocked = None;
        for input in &inputs {
            match self.lookup(input, owner.node, Some(id), AttrFlags::empty()) {
                Lookup::Found(addr, value) => {
                    reads.push(addr);
                    args.push(value);
                }
                Lookup::Absent => {
                    blocked = Some(DatumState::Pending {
                        missing: Some(input.to_string()),
                    });
                    break;
                }
                Lookup::Failed(addr, err) => {
                    reads.push(addr);
                    blocked = Some(DatumState::Failed { error: err.to_string() });
                    break;
                }
            }
        }

        for addr in &reads {
            self.subscriptions.subscribe(*addr, id);
        }
        if let Some(formula) = self.formulas.get_mut(id) {
            formula.reads = reads;
        }

        let state = blocked.unwrap_or_else(|| match func(args.as_slice()) {
            Ok(value) => DatumState::Ready { value: value.into_ref() },
            Err(err) => {
                warn!("formula {id} failed: {err}");
                DatumState::Failed { error: err.message }
            }
        });
        let notify_unchanged = self.config.notify_unchanged;
        self.replace_state(owner, state, None, notify_unchanged);
        true
    }

    /// Store a datum's new state and notify if it changed (or `force`).
    fn replace_state(
        &mut self,
        addr: DatumAddr,
        state: DatumState,
        source: Option<DatumSource>,
        force: bool,
    ) {
        let Some(node) = self.nodes.get_by_uid_mut(addr.node) else {
            return;
        };
        let Some(datum) = node.datums.get_by_uid_mut(addr.datum) else {
            return;
        };
        if let Some(source) = source {
            datum.source = source;
        }
        if datum.state.same_as(&state) && !force {
            return;
        }
        datum.state = state;
        let change = Change::new(datum.name.clone(), datum.uid);

        node.core.changed(&change.name, change.uid, &mut self.queue);
        self.subscriptions.wake(addr, &change, &mut self.queue);
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Root for Scene {
    /// `"n"` yields a node handle; `"n.x"` yields the value of datum `x`.
    fn get_attribute(
        &mut self,
        name: &str,
        caller: Option<DownstreamId>,
        flags: AttrFlags,
    ) -> Result<Option<ValueRef>, AttrError> {
        match Reference::parse(name)? {
            Reference::Local(key) => Ok(self
                .core
                .resolve(&key, &self.nodes, caller, flags)
                .map(|node| Value::Node { node: node.uid }.into_ref())),
            reference => match self.lookup(&reference, 0, caller, flags) {
                Lookup::Found(_, value) => Ok(Some(value)),
                Lookup::Absent => Ok(None),
                Lookup::Failed(_, err) => Err(err),
            },
        }
    }

    fn set_attribute(
        &mut self,
        name: &str,
        value: ValueRef,
        flags: AttrFlags,
    ) -> Result<(), AttrError> {
        match Reference::parse(name)? {
            Reference::Local(_) => Err(AttrError::ReadOnly(name.to_string())),
            Reference::Qualified { node, datum } => {
                self.store_literal(&node, &datum, value, flags).map(|_| ())
            }
        }
    }

    fn queue(&mut self, downstream: DownstreamId) {
        self.queue.push(downstream, None);
    }

    /// Each round past the first is driven by a formula whose state changed in
    /// the previous round, so an acyclic cascade settles within one round per
    /// formula. Only a cycle can reach the limit.
    fn flush_queue(&mut self) -> Result<FlushReport, AttrError> {
        let mut report = FlushReport::default();
        let limit = self.round_limit();
        while !self.queue.is_empty() {
            if report.rounds >= limit {
                let pending = self.queue.len();
                warn!(
                    "flush stopped after {} rounds with {pending} downstreams queued",
                    report.rounds
                );
                return Err(AttrError::Unsettled { pending });
            }
            report.rounds += 1;
            let batch = self.queue.take_batch();
            debug!("flush round {}: {} downstreams", report.rounds, batch.len());
            for entry in batch {
                if self.evaluate(entry.downstream) {
                    report.evaluated += 1;
                }
            }
        }
        Ok(report)
    }
}

/// Serializable view of a scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    /// Downstreams still queued.
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub uid: Uid,
    pub kind: String,
    pub datums: Vec<DatumSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatumSnapshot {
    pub name: String,
    pub uid: Uid,
    pub formula: bool,
    #[serde(flatten)]
    pub state: DatumState,
}

impl Scene {
    pub fn snapshot(&self) -> SceneSnapshot {
        let nodes = self
            .nodes
            .iter()
            .map(|node| NodeSnapshot {
                name: node.name.clone(),
                uid: node.uid,
                kind: node.kind.clone(),
                datums: node
                    .datums
                    .iter()
                    .map(|datum| DatumSnapshot {
                        name: datum.name.clone(),
                        uid: datum.uid,
                        formula: matches!(datum.source, DatumSource::Formula(_)),
                        state: datum.state.clone(),
                    })
                    .collect(),
            })
            .collect();
        SceneSnapshot {
            nodes,
            pending: self.queue.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::builtin;

    fn ready(v: impl Into<Value>) -> DatumState {
        DatumState::Ready { value: v.into().into_ref() }
    }

    #[test]
    fn reference_parse() {
        assert_eq!(Reference::parse("x").unwrap(), Reference::Local("x".into()));
        assert_eq!(
            Reference::parse("c0.__2").unwrap(),
            Reference::Qualified { node: "c0".into(), datum: "__2".into() }
        );
        for bad in ["", "a.", ".x", "a.b.c", "if", "a.for", "1.x"] {
            assert!(Reference::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn auto_named_nodes_fill_gaps() {
        let mut scene = Scene::new();
        scene.add_node_with_prefix("c", "cube").unwrap();
        scene.add_node_with_prefix("c", "cube").unwrap();
        scene.add_node_with_prefix("c", "cube").unwrap();
        scene.remove_node("c1").unwrap();

        let uid = scene.add_node_with_prefix("c", "cylinder").unwrap();
        assert_eq!(uid, 1);
        assert_eq!(scene.node("c1").map(Node::kind), Some("cylinder"));
    }

    #[test]
    fn formula_over_local_and_qualified_inputs() {
        let mut scene = Scene::new();
        scene.add_node("a", "point3d").unwrap();
        scene.add_node("b", "point3d").unwrap();
        scene.set_literal("a", "x", Value::Float(1.0)).unwrap();
        scene.set_literal("b", "x", Value::Float(2.0)).unwrap();
        scene
            .set_formula("b", "y", &["x", "a.x"], builtin("sum").unwrap())
            .unwrap();

        scene.flush_queue().unwrap();
        assert_eq!(scene.datum_state("b.y"), Some(&ready(3.0)));

        scene.set_literal("a", "x", Value::Float(10.0)).unwrap();
        scene.flush_queue().unwrap();
        assert_eq!(scene.datum_state("b.y"), Some(&ready(12.0)));
    }

    #[test]
    fn missing_input_blocks_until_created() {
        let mut scene = Scene::new();
        scene.add_node("a", "point3d").unwrap();
        let f = scene
            .set_formula("a", "y", &["x"], builtin("copy").unwrap())
            .unwrap();
        scene.flush_queue().unwrap();

        assert_eq!(
            scene.datum_state("a.y"),
            Some(&DatumState::Pending { missing: Some("x".into()) })
        );
        assert!(scene.node("a").unwrap().core().ledger().is_waiting("x", f));

        scene.set_literal("a", "x", Value::Int(5)).unwrap();
        assert!(scene.is_queued(f));
        scene.flush_queue().unwrap();
        assert_eq!(scene.datum_state("a.y"), Some(&ready(5i64)));
        assert!(scene.node("a").unwrap().core().ledger().is_empty());
    }

    #[test]
    fn missing_node_registers_in_scene_ledger() {
        let mut scene = Scene::new();
        scene.add_node("a", "point3d").unwrap();
        let f = scene
            .set_formula("a", "y", &["b.x"], builtin("copy").unwrap())
            .unwrap();
        scene.flush_queue().unwrap();
        assert!(scene.core().ledger().is_waiting("b", f));

        scene.add_node("b", "point3d").unwrap();
        scene.flush_queue().unwrap();
        // Node exists now but the datum does not
        assert!(scene.core().ledger().is_empty());
        assert!(scene.node("b").unwrap().core().ledger().is_waiting("x", f));

        scene.set_literal("b", "x", Value::Int(7)).unwrap();
        scene.flush_queue().unwrap();
        assert_eq!(scene.datum_state("a.y"), Some(&ready(7i64)));
    }

    #[test]
    fn host_error_fails_datum_and_propagates() {
        let mut scene = Scene::new();
        scene.add_node("a", "point3d").unwrap();
        scene.set_literal("a", "x", Value::text("oops")).unwrap();
        scene
            .set_formula("a", "y", &["x"], builtin("neg").unwrap())
            .unwrap();
        scene
            .set_formula("a", "z", &["y"], builtin("copy").unwrap())
            .unwrap();
        scene.flush_queue().unwrap();

        assert!(matches!(scene.datum_state("a.y"), Some(DatumState::Failed { .. })));
        assert!(matches!(scene.datum_state("a.z"), Some(DatumState::Failed { .. })));
        assert!(matches!(scene.value("a.y"), Err(AttrError::HostValue { .. })));
        // Errors are not failed lookups
        assert!(scene.node("a").unwrap().core().ledger().is_empty());

        scene.set_literal("a", "x", Value::Int(2)).unwrap();
        scene.flush_queue().unwrap();
        assert_eq!(scene.datum_state("a.z"), Some(&ready(-2.0)));
    }

    #[test]
    fn removing_datum_wakes_readers() {
        let mut scene = Scene::new();
        scene.add_node("a", "point3d").unwrap();
        scene.set_literal("a", "x", Value::Int(1)).unwrap();
        let f = scene
            .set_formula("a", "y", &["x"], builtin("copy").unwrap())
            .unwrap();
        scene.flush_queue().unwrap();

        scene.remove_datum("a", "x").unwrap();
        assert!(scene.is_queued(f));
        scene.flush_queue().unwrap();
        assert_eq!(
            scene.datum_state("a.y"),
            Some(&DatumState::Pending { missing: Some("x".into()) })
        );
    }

    #[test]
    fn removing_formula_datum_cancels_pending_evaluation() {
        let mut scene = Scene::new();
        scene.add_node("a", "point3d").unwrap();
        let f = scene
            .set_formula("a", "y", &["x"], builtin("copy").unwrap())
            .unwrap();
        assert!(scene.is_queued(f));

        scene.remove_datum("a", "y").unwrap();
        assert!(!scene.is_queued(f));
        assert_eq!(scene.formula_count(), 0);
        let report = scene.flush_queue().unwrap();
        assert_eq!(report.evaluated, 0);
    }

    #[test]
    fn literal_replaces_formula() {
        let mut scene = Scene::new();
        scene.add_node("a", "point3d").unwrap();
        scene
            .set_formula("a", "y", &["x"], builtin("copy").unwrap())
            .unwrap();
        scene.flush_queue().unwrap();

        scene.set_literal("a", "y", Value::Int(3)).unwrap();
        assert_eq!(scene.formula_count(), 0);
        assert_eq!(scene.node("a").unwrap().datum("y").unwrap().source(), DatumSource::Literal);
        assert!(scene.node("a").unwrap().core().ledger().is_empty());

        scene.set_literal("a", "x", Value::Int(9)).unwrap();
        scene.flush_queue().unwrap();
        assert_eq!(scene.datum_state("a.y"), Some(&ready(3i64)));
    }

    #[test]
    fn rename_node_rebinds_references() {
        let mut scene = Scene::new();
        scene.add_node("a", "point3d").unwrap();
        scene.add_node("b", "point3d").unwrap();
        scene.set_literal("a", "x", Value::Int(1)).unwrap();
        scene
            .set_formula("b", "y", &["a.x"], builtin("copy").unwrap())
            .unwrap();
        scene.flush_queue().unwrap();

        scene.rename_node("a", "p").unwrap();
        scene.flush_queue().unwrap();
        assert_eq!(
            scene.datum_state("b.y"),
            Some(&DatumState::Pending { missing: Some("a.x".into()) })
        );

        scene.rename_node("p", "a").unwrap();
        scene.flush_queue().unwrap();
        assert_eq!(scene.datum_state("b.y"), Some(&ready(1i64)));
    }

    #[test]
    fn rename_rejects_taken_and_invalid_names() {
        let mut scene = Scene::new();
        scene.add_node("a", "cube").unwrap();
        scene.add_node("b", "cube").unwrap();
        scene.set_literal("a", "x", Value::Int(1)).unwrap();
        scene.set_literal("a", "y", Value::Int(2)).unwrap();

        assert_eq!(scene.rename_node("a", "b"), Err(AttrError::DuplicateName("b".into())));
        assert_eq!(scene.rename_node("a", "class"), Err(AttrError::InvalidName("class".into())));
        assert_eq!(scene.rename_datum("a", "x", "y"), Err(AttrError::DuplicateName("y".into())));
        assert!(scene.rename_node("a", "a").is_ok());
        scene.rename_datum("a", "x", "x2").unwrap();
        assert!(scene.node("a").unwrap().datum("x2").is_some());
    }

    #[test]
    fn get_attribute_on_nodes_and_uid_paths() {
        let mut scene = Scene::new();
        scene.add_node("a", "cube").unwrap();
        scene.add_node("b", "cube").unwrap();
        scene.set_literal("b", "r", Value::Float(0.5)).unwrap();

        assert_eq!(scene.value("b").unwrap(), Some(Value::Node { node: 1 }.into_ref()));
        assert_eq!(scene.value("__1.__0").unwrap(), Some(Value::Float(0.5).into_ref()));
        assert_eq!(scene.value("b.missing").unwrap(), None);
        assert!(matches!(scene.value("b.if"), Err(AttrError::InvalidName(_))));
    }

    #[test]
    fn set_attribute_rules() {
        let mut scene = Scene::new();
        scene.add_node("a", "cube").unwrap();
        let v = Value::Int(1).into_ref();

        assert_eq!(
            scene.set_attribute("a", v.clone(), AttrFlags::empty()),
            Err(AttrError::ReadOnly("a".into()))
        );
        assert_eq!(
            scene.set_attribute("a.x", v.clone(), AttrFlags::NO_CREATE),
            Err(AttrError::Missing("a.x".into()))
        );
        assert_eq!(
            scene.set_attribute("zz.x", v.clone(), AttrFlags::empty()),
            Err(AttrError::Missing("zz".into()))
        );
        scene.set_attribute("a.x", v.clone(), AttrFlags::empty()).unwrap();
        scene.set_attribute("a.__0", Value::Int(2).into_ref(), AttrFlags::empty()).unwrap();
        assert_eq!(scene.value("a.x").unwrap(), Some(Value::Int(2).into_ref()));
    }

    #[test]
    fn set_literal_always_notifies() {
        let mut scene = Scene::new();
        scene.add_node("a", "cube").unwrap();
        scene.set_literal("a", "x", Value::Int(1)).unwrap();
        let f = scene
            .set_formula("a", "y", &["x"], builtin("copy").unwrap())
            .unwrap();
        scene.flush_queue().unwrap();

        scene.set_literal("a", "x", Value::Int(1)).unwrap();
        assert!(scene.is_queued(f));
    }

    #[test]
    fn snapshot_lists_states() {
        let mut scene = Scene::new();
        scene.add_node("a", "cube").unwrap();
        scene.set_literal("a", "x", Value::Int(1)).unwrap();
        scene
            .set_formula("a", "y", &["x"], builtin("neg").unwrap())
            .unwrap();
        let snapshot = scene.snapshot();
        assert_eq!(snapshot.pending, 1);

        scene.flush_queue().unwrap();
        let snapshot = scene.snapshot();
        assert_eq!(snapshot.pending, 0);
        assert_eq!(snapshot.nodes.len(), 1);
        let datums = &snapshot.nodes[0].datums;
        assert_eq!(datums[1].name, "y");
        assert!(datums[1].formula);
        assert_eq!(datums[1].state, ready(-1.0));
    }
}
