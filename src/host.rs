//! Host element tree
//!
//! An in-memory element tree standing in for whatever host the toolkit renders
//! into. The composition engine only ever touches it through the capabilities
//! defined here: creation via a factory carried in the context, child
//! attachment, id assignment, an optional shadow boundary, and synchronous
//! named-event dispatch (consumed by the event bus).
//!
//! `Node` is a cheap `Rc` handle; `WeakNode` is its non-owning counterpart.
//! Holding a `WeakNode` (or a controller association keyed by one) never keeps
//! an element alive past the tree's own lifetime.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use uuid::Uuid;

use crate::error::{FactorySnafu, Result};

/// Stable identity of a node, independent of its position in the tree.
///
/// Used to key non-owning controller associations: the key stays valid for
/// lookup bookkeeping, but resolution also requires the node to still be
/// alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeKey(Uuid);

/// Identifier of an attached event listener, used to detach it again
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerId(u64);

struct ListenerEntry {
    event: String,
    id: ListenerId,
    callback: Rc<dyn Fn(&Rc<dyn Any>)>,
}

struct ElementData {
    key: NodeKey,
    tag: String,
    id: RefCell<Option<String>>,
    children: RefCell<Vec<Node>>,
    shadow: RefCell<Option<ShadowRoot>>,
    listeners: RefCell<Vec<ListenerEntry>>,
    next_listener: Cell<u64>,
}

/// Owning handle to a mutable element in the host tree
#[derive(Clone)]
pub struct Node {
    data: Rc<ElementData>,
}

impl Node {
    /// Create a detached element with the given tag
    pub fn create(tag: impl Into<String>) -> Self {
        Self {
            data: Rc::new(ElementData {
                key: NodeKey(Uuid::new_v4()),
                tag: tag.into(),
                id: RefCell::new(None),
                children: RefCell::new(Vec::new()),
                shadow: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    /// Stable identity of this node
    pub fn key(&self) -> NodeKey {
        self.data.key
    }

    /// Element tag name
    pub fn tag(&self) -> &str {
        &self.data.tag
    }

    /// Element id attribute, if assigned
    pub fn id(&self) -> Option<String> {
        self.data.id.borrow().clone()
    }

    /// Assign the element id attribute
    pub fn set_id(&self, id: impl Into<String>) {
        *self.data.id.borrow_mut() = Some(id.into());
    }

    /// Append a child to this element's own child list
    pub fn append(&self, child: &Node) {
        self.data.children.borrow_mut().push(child.clone());
    }

    /// Snapshot of this element's own children
    pub fn children(&self) -> Vec<Node> {
        self.data.children.borrow().clone()
    }

    /// Remove all children from this element's own child list
    pub fn clear_children(&self) {
        self.data.children.borrow_mut().clear();
    }

    /// Shadow boundary of this element, if one was attached
    pub fn shadow(&self) -> Option<ShadowRoot> {
        self.data.shadow.borrow().clone()
    }

    /// Attach a shadow boundary, returning the existing one if already present
    pub fn attach_shadow(&self) -> ShadowRoot {
        let mut slot = self.data.shadow.borrow_mut();
        if let Some(shadow) = slot.as_ref() {
            return shadow.clone();
        }
        let shadow = ShadowRoot::new();
        *slot = Some(shadow.clone());
        shadow
    }

    /// Find a descendant by element id, searching this node's own children.
    ///
    /// Does not pierce shadow boundaries of descendants.
    pub fn find_by_id(&self, id: &str) -> Option<Node> {
        find_in(&self.children(), id)
    }

    /// Attach a named-event listener; returns an id usable to detach it
    pub fn add_listener(
        &self,
        event: impl Into<String>,
        callback: impl Fn(&Rc<dyn Any>) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.data.next_listener.get());
        self.data.next_listener.set(id.0 + 1);
        self.data.listeners.borrow_mut().push(ListenerEntry {
            event: event.into(),
            id,
            callback: Rc::new(callback),
        });
        id
    }

    /// Detach a listener; detaching an already-detached listener is a no-op
    pub fn remove_listener(&self, event: &str, id: ListenerId) {
        self.data
            .listeners
            .borrow_mut()
            .retain(|entry| !(entry.event == event && entry.id == id));
    }

    /// Synchronously dispatch a named event to this node's listeners.
    ///
    /// Iterates a snapshot: listeners attached during dispatch are not reached
    /// by the same dispatch.
    pub fn dispatch(&self, event: &str, payload: Rc<dyn Any>) {
        let callbacks: Vec<Rc<dyn Fn(&Rc<dyn Any>)>> = self
            .data
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.event == event)
            .map(|entry| entry.callback.clone())
            .collect();
        for callback in callbacks {
            callback(&payload);
        }
    }

    /// Non-owning handle to this node
    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            data: Rc::downgrade(&self.data),
        }
    }

    /// Whether two handles refer to the same element
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("tag", &self.data.tag)
            .field("id", &*self.data.id.borrow())
            .field("children", &self.data.children.borrow().len())
            .finish()
    }
}

/// Non-owning handle to a node
#[derive(Clone)]
pub struct WeakNode {
    data: Weak<ElementData>,
}

impl WeakNode {
    /// Upgrade to an owning handle while the node is still alive
    pub fn upgrade(&self) -> Option<Node> {
        self.data.upgrade().map(|data| Node { data })
    }
}

impl std::fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(node) => write!(f, "WeakNode({})", node.tag()),
            None => write!(f, "WeakNode(dead)"),
        }
    }
}

struct ShadowData {
    children: RefCell<Vec<Node>>,
    sheets: RefCell<Vec<String>>,
}

/// Nested boundary owned by a node, constraining where children are attached
/// and where styling is scoped
#[derive(Clone)]
pub struct ShadowRoot {
    data: Rc<ShadowData>,
}

impl ShadowRoot {
    fn new() -> Self {
        Self {
            data: Rc::new(ShadowData {
                children: RefCell::new(Vec::new()),
                sheets: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Append a child inside the boundary
    pub fn append(&self, child: &Node) {
        self.data.children.borrow_mut().push(child.clone());
    }

    /// Snapshot of the boundary's children
    pub fn children(&self) -> Vec<Node> {
        self.data.children.borrow().clone()
    }

    /// Install a stylesheet into the boundary
    pub fn adopt(&self, sheet: impl Into<String>) {
        self.data.sheets.borrow_mut().push(sheet.into());
    }

    /// Stylesheets installed into the boundary, in installation order
    pub fn sheets(&self) -> Vec<String> {
        self.data.sheets.borrow().clone()
    }

    /// Find a descendant by element id within the boundary
    pub fn find_by_id(&self, id: &str) -> Option<Node> {
        find_in(&self.children(), id)
    }

    /// Whether two handles refer to the same boundary
    pub fn ptr_eq(&self, other: &ShadowRoot) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl std::fmt::Debug for ShadowRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowRoot")
            .field("children", &self.data.children.borrow().len())
            .field("sheets", &self.data.sheets.borrow().len())
            .finish()
    }
}

fn find_in(children: &[Node], id: &str) -> Option<Node> {
    for child in children {
        if child.id().as_deref() == Some(id) {
            return Some(child.clone());
        }
        if let Some(found) = find_in(&child.children(), id) {
            return Some(found);
        }
    }
    None
}

/// Host element factory, the engine's only means of creating leaf nodes
pub type Factory = Rc<dyn Fn(&str) -> Result<Node>>;

/// Standard factory creating detached in-memory elements
pub fn document_factory() -> Factory {
    Rc::new(|tag| {
        snafu::ensure!(
            !tag.trim().is_empty(),
            FactorySnafu {
                tag: tag.to_owned(),
                message: "tag must not be empty".to_owned(),
            }
        );
        Ok(Node::create(tag))
    })
}
