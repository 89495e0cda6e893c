//! Controller registry
//!
//! Controllers are named behavioral objects produced during a component's
//! setup phase and associated with exactly one tree node. The association is
//! non-owning: it is keyed by the node's stable [`NodeKey`] and holds only a
//! [`WeakNode`], so it is queryable only while the node is reachable from the
//! live tree. Dead entries are pruned opportunistically on insert.
//!
//! Associations for the same controller name coming from different subtrees
//! are union-merged, never overwritten: merging preserves both nodes' entries.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::host::{Node, NodeKey, WeakNode};

/// Slot name under which a component's own controller is registered
pub const SELF_SLOT: &str = "self";

/// A named behavioral object attached to one tree node
pub trait Controller: 'static {
    /// Registry name of the controller
    fn name(&self) -> &'static str;

    /// Downcast support for retrieving the concrete controller type
    fn as_any(&self) -> &dyn Any;
}

/// Slot -> controller handles resolved for one node.
///
/// A node usually carries its own controller under [`SELF_SLOT`]; exported
/// controllers appear under the name chosen at export time.
#[derive(Clone, Default)]
pub struct ControllerSlots {
    slots: AHashMap<String, Rc<dyn Controller>>,
}

impl ControllerSlots {
    /// Resolve the controller stored under `slot`
    pub fn get(&self, slot: &str) -> Option<Rc<dyn Controller>> {
        self.slots.get(slot).cloned()
    }

    /// Resolve the node's own controller ([`SELF_SLOT`])
    pub fn own(&self) -> Option<Rc<dyn Controller>> {
        self.get(SELF_SLOT)
    }

    /// All slot/controller pairs
    pub fn entries(&self) -> Vec<(String, Rc<dyn Controller>)> {
        self.slots
            .iter()
            .map(|(slot, controller)| (slot.clone(), controller.clone()))
            .collect()
    }

    /// Number of filled slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is filled
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

struct MapEntry {
    node: WeakNode,
    slots: AHashMap<String, Rc<dyn Controller>>,
}

/// Non-owning node -> controller association for one controller name.
///
/// Cloning shares the underlying storage: maps merged into several controller
/// sets stay in sync, mirroring how render results share registry state.
#[derive(Clone, Default)]
pub struct ControllerMap {
    entries: Rc<RefCell<AHashMap<NodeKey, MapEntry>>>,
}

impl ControllerMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `controller` with `node` under `slot`, merging with any
    /// slots already recorded for that node
    pub fn insert(&self, node: &Node, slot: impl Into<String>, controller: Rc<dyn Controller>) {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|_, entry| entry.node.upgrade().is_some());
        entries
            .entry(node.key())
            .or_insert_with(|| MapEntry {
                node: node.downgrade(),
                slots: AHashMap::new(),
            })
            .slots
            .insert(slot.into(), controller);
    }

    /// Resolve the slots recorded for `node`, if the node is still alive
    pub fn get(&self, node: &Node) -> Option<ControllerSlots> {
        let entries = self.entries.borrow();
        let entry = entries.get(&node.key())?;
        entry.node.upgrade()?;
        Some(ControllerSlots {
            slots: entry.slots.clone(),
        })
    }

    /// Resolve one slot for `node`
    pub fn get_slot(&self, node: &Node, slot: &str) -> Option<Rc<dyn Controller>> {
        self.get(node).and_then(|slots| slots.get(slot))
    }

    /// Number of entries whose node is still alive
    pub fn live_len(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|entry| entry.node.upgrade().is_some())
            .count()
    }
}

impl std::fmt::Debug for ControllerMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ControllerMap(live: {})", self.live_len())
    }
}

/// Controller-name -> [`ControllerMap`] collection carried by a render result.
///
/// The name table itself is shared storage: cloning a set yields a handle to
/// the same registry, so registrations made through any clone (including
/// names not seen before the clone) are visible through all of them. Render
/// results cloned across listener boundaries therefore observe controllers
/// folded in after the clone.
#[derive(Clone, Default)]
pub struct ControllerSet {
    maps: Rc<RefCell<AHashMap<String, ControllerMap>>>,
}

impl ControllerSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// The map registered under `name`, if any (shares storage with the set)
    pub fn get(&self, name: &str) -> Option<ControllerMap> {
        self.maps.borrow().get(name).cloned()
    }

    /// The map registered under `name`, created empty if absent
    pub fn map_for(&self, name: &str) -> ControllerMap {
        self.maps
            .borrow_mut()
            .entry(name.to_owned())
            .or_default()
            .clone()
    }

    /// Register `controller` for `node` under `name`/`slot`, union-merged
    /// with existing entries for that name
    pub fn register(
        &self,
        name: &str,
        node: &Node,
        slot: impl Into<String>,
        controller: Rc<dyn Controller>,
    ) {
        self.map_for(name).insert(node, slot, controller);
    }

    /// Fold `other`'s associations for `node` into this set, name by name.
    ///
    /// Union semantics: entries already present for other nodes are kept.
    pub fn merge_from(&self, other: &ControllerSet, node: &Node) {
        // collect first so merging a set into itself cannot hold two borrows
        let sources: Vec<(String, ControllerSlots)> = other
            .maps
            .borrow()
            .iter()
            .filter_map(|(name, map)| map.get(node).map(|slots| (name.clone(), slots)))
            .collect();
        for (name, slots) in sources {
            let target = self.map_for(&name);
            for (slot, controller) in slots.entries() {
                target.insert(node, slot, controller);
            }
        }
    }

    /// Re-key every association recorded for `old` onto `new`.
    ///
    /// Used by structural transforms so controller reachability survives a
    /// node replacement.
    pub fn re_key(&self, old: &Node, new: &Node) {
        let maps: Vec<ControllerMap> = self.maps.borrow().values().cloned().collect();
        for map in maps {
            let Some(slots) = map.get(old) else { continue };
            for (slot, controller) in slots.entries() {
                map.insert(new, slot, controller);
            }
        }
    }

    /// Registered controller names
    pub fn names(&self) -> Vec<String> {
        self.maps.borrow().keys().cloned().collect()
    }

    /// Whether no controller name is registered
    pub fn is_empty(&self) -> bool {
        self.maps.borrow().is_empty()
    }
}

impl std::fmt::Debug for ControllerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerSet")
            .field("names", &self.names())
            .finish()
    }
}
