//! Mutation observers.
//!
//! Records are queued synchronously by the mutating operation. Delivery happens from a single
//! "notify mutation observers" microtask, which hands each observer its batch in creation order.

use std::mem::ManuallyDrop;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::error::{DomError, Result};
use crate::node::Node;
use crate::runtime::{try_with_runtime, with_runtime, Microtask, Runtime};
use crate::tree::NodeId;

new_key_type! {
    pub struct ObserverId;
}

type MutationCallback = Box<dyn FnMut(Vec<MutationRecord>, &MutationObserver)>;

/// The options for [`MutationObserver::observe`].
///
/// ```rust, ignore
/// let init = MutationObserverInit::new()
///     .child_list()
///     .subtree()
///     .attribute_filter(["data-target"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: Option<bool>,
    pub attribute_filter: Option<Vec<String>>,
    pub attribute_old_value: Option<bool>,
    pub subtree: bool,
}

impl MutationObserverInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_list(mut self) -> Self {
        self.child_list = true;
        self
    }

    pub fn subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    pub fn attributes(mut self) -> Self {
        self.attributes = Some(true);
        self
    }

    pub fn attribute_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn attribute_old_value(mut self) -> Self {
        self.attribute_old_value = Some(true);
        self
    }

    /// Combine two sets of options, keeping everything either of them observes.
    pub fn merge(mut self, other: &MutationObserverInit) -> Self {
        self.child_list |= other.child_list;
        self.subtree |= other.subtree;
        self.attributes = match (self.attributes, other.attributes) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(false) || b.unwrap_or(false)),
        };
        self.attribute_old_value = match (self.attribute_old_value, other.attribute_old_value) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(false) || b.unwrap_or(false)),
        };
        self.attribute_filter = match (self.attribute_filter.take(), &other.attribute_filter) {
            (Some(mut a), Some(b)) => {
                for name in b {
                    if !a.contains(name) {
                        a.push(name.clone());
                    }
                }
                Some(a)
            }
            (a, b) => a.or_else(|| b.clone()),
        };
        self
    }

    /// Check the options the way [`MutationObserver::observe`] would, without observing anything.
    pub fn validate(&self) -> Result<()> {
        self.normalize().map(|_| ())
    }

    fn normalize(&self) -> Result<ObserveOptions> {
        let mut attributes = self.attributes;
        if attributes.is_none() && (self.attribute_old_value.is_some() || self.attribute_filter.is_some()) {
            attributes = Some(true);
        }
        let attributes = attributes.unwrap_or(false);
        if !self.child_list && !attributes {
            return Err(DomError::InvalidObserverOptions(
                "at least one of child_list or attributes must be observed",
            ));
        }
        if self.attribute_old_value == Some(true) && !attributes {
            return Err(DomError::InvalidObserverOptions(
                "attribute_old_value requires attributes",
            ));
        }
        if self.attribute_filter.is_some() && !attributes {
            return Err(DomError::InvalidObserverOptions(
                "attribute_filter requires attributes",
            ));
        }
        Ok(ObserveOptions {
            child_list: self.child_list,
            attributes,
            attribute_filter: self
                .attribute_filter
                .as_ref()
                .map(|names| names.iter().map(|n| n.to_ascii_lowercase()).collect()),
            attribute_old_value: self.attribute_old_value.unwrap_or(false),
            subtree: self.subtree,
        })
    }
}

#[derive(Debug, Clone)]
struct ObserveOptions {
    child_list: bool,
    attributes: bool,
    attribute_filter: Option<Vec<String>>,
    attribute_old_value: bool,
    subtree: bool,
}

/// A single change delivered to a mutation observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    Attributes {
        target: Node,
        attribute_name: String,
        /// Only present when the observer asked for old values.
        old_value: Option<String>,
    },
    ChildList {
        target: Node,
        added_nodes: Vec<Node>,
        removed_nodes: Vec<Node>,
        previous_sibling: Option<Node>,
        next_sibling: Option<Node>,
    },
}

impl MutationRecord {
    pub fn target(&self) -> Node {
        match self {
            MutationRecord::Attributes { target, .. } | MutationRecord::ChildList { target, .. } => {
                *target
            }
        }
    }
}

/// What changed, before it is fanned out to the interested observers.
pub(crate) enum RecordData {
    Attributes {
        name: String,
        old_value: Option<String>,
    },
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    },
}

struct ObserverEntry {
    /// Taken out while the callback runs.
    callback: Option<MutationCallback>,
    records: Vec<MutationRecord>,
    targets: Vec<(NodeId, ObserveOptions)>,
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: SlotMap<ObserverId, ObserverEntry>,
    /// Creation order.
    order: Vec<ObserverId>,
    notify_queued: bool,
}

/// Watches a set of nodes and receives batches of [`MutationRecord`]s from the microtask
/// checkpoint.
///
/// Dropping the observer disconnects it and discards its pending records.
pub struct MutationObserver {
    id: ObserverId,
}

impl std::fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationObserver").field("id", &self.id).finish()
    }
}

impl MutationObserver {
    pub fn new(callback: impl FnMut(Vec<MutationRecord>, &MutationObserver) + 'static) -> Self {
        let id = with_runtime(|rt| {
            let mut registry = rt.observers.borrow_mut();
            let id = registry.observers.insert(ObserverEntry {
                callback: Some(Box::new(callback)),
                records: Vec::new(),
                targets: Vec::new(),
            });
            registry.order.push(id);
            id
        });
        Self { id }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Start observing `target`. Observing the same node again replaces its options.
    pub fn observe(&self, target: impl Into<Node>, init: MutationObserverInit) -> Result<()> {
        let target = target.into().node_id();
        let options = init.normalize()?;
        with_runtime(|rt| {
            let mut registry = rt.observers.borrow_mut();
            let Some(entry) = registry.observers.get_mut(self.id) else {
                return;
            };
            match entry.targets.iter_mut().find(|(node, _)| *node == target) {
                Some((_, existing)) => *existing = options,
                None => entry.targets.push((target, options)),
            }
        });
        Ok(())
    }

    /// Remove and return the records queued for this observer.
    pub fn take_records(&self) -> Vec<MutationRecord> {
        with_runtime(|rt| {
            rt.observers
                .borrow_mut()
                .observers
                .get_mut(self.id)
                .map(|entry| std::mem::take(&mut entry.records))
                .unwrap_or_default()
        })
    }

    /// Stop observing every node and drop the pending records. The observer can be reused.
    pub fn disconnect(&self) {
        with_runtime(|rt| {
            if let Some(entry) = rt.observers.borrow_mut().observers.get_mut(self.id) {
                entry.targets.clear();
                entry.records.clear();
            }
        });
    }
}

impl Drop for MutationObserver {
    fn drop(&mut self) {
        try_with_runtime(|rt| {
            if let Ok(mut registry) = rt.observers.try_borrow_mut() {
                registry.observers.remove(self.id);
                registry.order.retain(|id| *id != self.id);
            }
        });
    }
}

/// Queue a record for every observer interested in a change to `target`.
pub(crate) fn queue_record(rt: &Runtime, target: NodeId, data: RecordData) {
    let tree = rt.tree.borrow();
    let mut registry = rt.observers.borrow_mut();

    // Observer -> old value to report. One record per observer, however many of its
    // registrations match.
    let mut interested: FxHashMap<ObserverId, Option<String>> = FxHashMap::default();
    for node in tree.inclusive_ancestors(target) {
        for id in &registry.order {
            let Some(entry) = registry.observers.get(*id) else {
                continue;
            };
            for (observed, options) in &entry.targets {
                if *observed != node || (node != target && !options.subtree) {
                    continue;
                }
                match &data {
                    RecordData::Attributes { name, old_value } => {
                        if !options.attributes {
                            continue;
                        }
                        if let Some(filter) = &options.attribute_filter {
                            if !filter.iter().any(|n| n == name) {
                                continue;
                            }
                        }
                        let slot = interested.entry(*id).or_insert(None);
                        if options.attribute_old_value {
                            *slot = old_value.clone();
                        }
                    }
                    RecordData::ChildList { .. } => {
                        if options.child_list {
                            interested.entry(*id).or_insert(None);
                        }
                    }
                }
            }
        }
    }
    if interested.is_empty() {
        return;
    }

    let target = Node::from_id(target);
    let ids: Vec<ObserverId> = registry.order.clone();
    for id in ids {
        let Some(old_value) = interested.remove(&id) else {
            continue;
        };
        let record = match &data {
            RecordData::Attributes { name, .. } => MutationRecord::Attributes {
                target,
                attribute_name: name.clone(),
                old_value,
            },
            RecordData::ChildList {
                added,
                removed,
                previous_sibling,
                next_sibling,
            } => MutationRecord::ChildList {
                target,
                added_nodes: added.iter().copied().map(Node::from_id).collect(),
                removed_nodes: removed.iter().copied().map(Node::from_id).collect(),
                previous_sibling: previous_sibling.map(Node::from_id),
                next_sibling: next_sibling.map(Node::from_id),
            },
        };
        if let Some(entry) = registry.observers.get_mut(id) {
            entry.records.push(record);
        }
    }

    if !registry.notify_queued {
        registry.notify_queued = true;
        rt.queue_microtask(Microtask::NotifyMutationObservers);
    }
}

/// The body of the "notify mutation observers" microtask.
pub(crate) fn notify_observers() {
    let order = with_runtime(|rt| {
        let mut registry = rt.observers.borrow_mut();
        registry.notify_queued = false;
        registry.order.clone()
    });

    for id in order {
        let taken = with_runtime(|rt| {
            let mut registry = rt.observers.borrow_mut();
            let entry = registry.observers.get_mut(id)?;
            if entry.records.is_empty() {
                return None;
            }
            let records = std::mem::take(&mut entry.records);
            Some((records, entry.callback.take()?))
        });
        let Some((records, mut callback)) = taken else {
            continue;
        };

        tracing::trace!("delivering {} mutation record(s) to {:?}", records.len(), id);
        let observer = ManuallyDrop::new(MutationObserver { id });
        let mut guard = RestoreCallback {
            id,
            callback: Some(callback),
        };
        if let Some(callback) = guard.callback.as_mut() {
            callback(records, &observer);
        }
    }
}

/// Hands a callback back to its observer once it returns or unwinds.
///
/// On unwind, the observers later in the batch keep their records, so delivery is queued again
/// for the next checkpoint.
struct RestoreCallback {
    id: ObserverId,
    callback: Option<MutationCallback>,
}

impl Drop for RestoreCallback {
    fn drop(&mut self) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        try_with_runtime(|rt| {
            let Ok(mut registry) = rt.observers.try_borrow_mut() else {
                return;
            };
            if let Some(entry) = registry.observers.get_mut(self.id) {
                if entry.callback.is_none() {
                    entry.callback = Some(callback);
                }
            }
            if std::thread::panicking()
                && !registry.notify_queued
                && registry.observers.values().any(|entry| !entry.records.is_empty())
            {
                registry.notify_queued = true;
                rt.queue_microtask(Microtask::NotifyMutationObservers);
            }
        });
    }
}
