//! Event bus
//!
//! A typed, multi-channel, last-value-replaying publish/subscribe mechanism
//! scoped to a set of weakly-held subscriber nodes. Nodes are never kept
//! alive by a subscription: the observer list holds [`WeakNode`]s and is
//! pruned of dead entries on every `register` and `notify` call.
//!
//! Replay semantics: each channel caches only its most recent payload
//! (last-write-wins, no queueing). A late subscriber immediately and
//! synchronously receives the cached payload, or the supplied fallback when
//! the channel has never been notified.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;

use crate::host::{ListenerId, Node, WeakNode};

/// Typed event channel: a name plus its payload type
pub trait EventKind: 'static {
    /// Channel name used on the node dispatch mechanism
    const NAME: &'static str;
    /// Payload carried on the channel
    type Payload: Clone + 'static;
}

#[derive(Default)]
struct BusInner {
    observers: RefCell<Vec<WeakNode>>,
    last: RefCell<AHashMap<&'static str, Rc<dyn Any>>>,
}

/// Typed publish/subscribe bus with weakly-held subscribers.
///
/// Cheap to clone; clones share the same observer list and replay cache.
/// Explicitly constructed, typically once per application instance.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl EventBus {
    /// Create a new bus with empty observer list and replay cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `node` as an observer and return a handle for subscribing it
    /// to individual channels
    pub fn register(&self, node: &Node) -> Subscriber {
        self.prune();
        self.inner.observers.borrow_mut().push(node.downgrade());
        Subscriber {
            bus: self.clone(),
            node: node.downgrade(),
        }
    }

    /// Publish a payload: overwrite the channel's last value, then
    /// synchronously dispatch to every currently-live observer.
    ///
    /// Iterates a snapshot of the observer list, so observers registered
    /// during dispatch are not reached by the same dispatch.
    pub fn notify<E: EventKind>(&self, payload: E::Payload) {
        let shared: Rc<dyn Any> = Rc::new(payload);
        self.inner.last.borrow_mut().insert(E::NAME, shared.clone());
        tracing::debug!(channel = E::NAME, "notifying observers");

        let snapshot: Vec<WeakNode> = self.inner.observers.borrow().clone();
        for observer in snapshot {
            if let Some(node) = observer.upgrade() {
                node.dispatch(E::NAME, shared.clone());
            }
        }
        self.prune();
    }

    /// Number of observers currently recorded (dead entries included until
    /// the next prune)
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    fn prune(&self) {
        self.inner
            .observers
            .borrow_mut()
            .retain(|observer| observer.upgrade().is_some());
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observer_count())
            .field("channels", &self.inner.last.borrow().len())
            .finish()
    }
}

/// Per-node subscription handle returned by [`EventBus::register`]
pub struct Subscriber {
    bus: EventBus,
    node: WeakNode,
}

impl Subscriber {
    /// Attach `listener` to the node for channel `E`.
    ///
    /// If the channel has a cached last payload it is delivered synchronously
    /// before this call returns; otherwise `fallback` is delivered if
    /// supplied. Returns a handle to detach the listener again.
    pub fn on<E: EventKind>(
        &self,
        listener: impl Fn(E::Payload) + 'static,
        fallback: Option<E::Payload>,
    ) -> EventSubscription {
        let Some(node) = self.node.upgrade() else {
            return EventSubscription::detached();
        };

        let id = node.add_listener(E::NAME, move |payload| {
            if let Some(payload) = payload.downcast_ref::<E::Payload>() {
                listener(payload.clone());
            }
        });

        let replay = self.bus.inner.last.borrow().get(E::NAME).cloned();
        if let Some(payload) = replay {
            node.dispatch(E::NAME, payload);
        } else if let Some(payload) = fallback {
            node.dispatch(E::NAME, Rc::new(payload));
        }

        EventSubscription {
            node: self.node.clone(),
            event: E::NAME,
            id: Some(id),
            active: Cell::new(true),
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subscriber({:?})", self.node)
    }
}

/// Handle detaching one listener from one node
pub struct EventSubscription {
    node: WeakNode,
    event: &'static str,
    id: Option<ListenerId>,
    active: Cell<bool>,
}

impl EventSubscription {
    fn detached() -> Self {
        Self {
            node: Node::create("detached").downgrade(),
            event: "",
            id: None,
            active: Cell::new(false),
        }
    }

    /// Detach the listener. Detaching an already-detached listener (or one
    /// whose node is gone) is a harmless no-op.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let (Some(node), Some(id)) = (self.node.upgrade(), self.id) {
            node.remove_listener(self.event, id);
        }
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("event", &self.event)
            .field("active", &self.active.get())
            .finish()
    }
}
