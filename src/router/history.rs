//! Session history
//!
//! Bridges the navigation channel to a host history abstraction: ordinary
//! navigations push an entry, back/forward pops re-emit a navigation flagged
//! to suppress the push. The toolkit ships an in-memory implementation;
//! embedders with a real host history implement [`History`] themselves.

use std::cell::RefCell;
use std::rc::Rc;

use crate::eventbus::{EventBus, EventSubscription, Subscriber};
use crate::router::{Browse, NavigationRequest};

/// Host session-history abstraction
pub trait History {
    /// Path of the entry currently on top
    fn current_path(&self) -> String;
    /// Push a new entry on top
    fn push(&self, path: &str);
    /// Register a handler invoked with the newly-current path after a pop
    fn on_pop(&self, handler: Box<dyn Fn(String)>);
}

/// In-memory history stack
#[derive(Clone, Default)]
pub struct MemoryHistory {
    inner: Rc<MemoryHistoryInner>,
}

#[derive(Default)]
struct MemoryHistoryInner {
    stack: RefCell<Vec<String>>,
    pop_handlers: RefCell<Vec<Box<dyn Fn(String)>>>,
}

impl MemoryHistory {
    /// An empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the top entry and notify pop handlers with the path beneath it.
    ///
    /// Popping the last (or an empty) stack is a no-op, mirroring a host
    /// history that never goes past its first entry.
    pub fn back(&self) {
        let popped = {
            let mut stack = self.inner.stack.borrow_mut();
            if stack.len() < 2 {
                return;
            }
            stack.pop()
        };
        if popped.is_some() {
            let current = self.current_path();
            tracing::debug!(path = %current, "history pop");
            for handler in self.inner.pop_handlers.borrow().iter() {
                handler(current.clone());
            }
        }
    }

    /// Snapshot of the stack, oldest first
    pub fn entries(&self) -> Vec<String> {
        self.inner.stack.borrow().clone()
    }
}

impl History for MemoryHistory {
    fn current_path(&self) -> String {
        self.inner.stack.borrow().last().cloned().unwrap_or_default()
    }

    fn push(&self, path: &str) {
        self.inner.stack.borrow_mut().push(path.to_owned());
    }

    fn on_pop(&self, handler: Box<dyn Fn(String)>) {
        self.inner.pop_handlers.borrow_mut().push(handler);
    }
}

impl std::fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHistory")
            .field("stack", &*self.inner.stack.borrow())
            .finish()
    }
}

/// Wire a history into the navigation channel.
///
/// Every navigation not flagged with `prevent_history_update` pushes its path,
/// unless the path already equals the current entry (replaying the active
/// route must not grow the stack). A history pop re-emits the popped-to path
/// on the channel with the flag set, so routers re-render without a second
/// push.
///
/// The subscriber's node anchors the listener; dropping the node (or calling
/// `unsubscribe` on the returned handle) disconnects the history.
pub fn install_history_routing(
    bus: &EventBus,
    subscriber: &Subscriber,
    history: impl History + Clone + 'static,
) -> EventSubscription {
    let pop_bus = bus.clone();
    history.on_pop(Box::new(move |path| {
        pop_bus.notify::<Browse>(NavigationRequest {
            url: path,
            prevent_history_update: true,
        });
    }));

    subscriber.on::<Browse>(
        move |request| {
            if request.prevent_history_update {
                return;
            }
            if history.current_path() == request.url {
                return;
            }
            history.push(&request.url);
        },
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Node;

    fn wired() -> (EventBus, Node, MemoryHistory) {
        let bus = EventBus::new();
        let anchor = Node::create("div");
        let history = MemoryHistory::new();
        let subscriber = bus.register(&anchor);
        install_history_routing(&bus, &subscriber, history.clone());
        (bus, anchor, history)
    }

    #[test]
    fn test_navigation_pushes_entry() {
        let (bus, _anchor, history) = wired();

        bus.notify::<Browse>(NavigationRequest::to("/a"));
        bus.notify::<Browse>(NavigationRequest::to("/b"));

        assert_eq!(history.entries(), ["/a", "/b"]);
        assert_eq!(history.current_path(), "/b");
    }

    #[test]
    fn test_prevent_flag_skips_push() {
        let (bus, _anchor, history) = wired();

        bus.notify::<Browse>(NavigationRequest::to("/a"));
        bus.notify::<Browse>(NavigationRequest {
            url: "/b".to_owned(),
            prevent_history_update: true,
        });

        assert_eq!(history.entries(), ["/a"]);
    }

    #[test]
    fn test_repeated_navigation_to_current_path_pushes_once() {
        let (bus, _anchor, history) = wired();

        bus.notify::<Browse>(NavigationRequest::to("/a"));
        bus.notify::<Browse>(NavigationRequest::to("/a"));

        assert_eq!(history.entries(), ["/a"]);
    }

    #[test]
    fn test_back_reemits_with_prevent_flag() {
        let (bus, _anchor, history) = wired();
        let probe = Node::create("div");
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.register(&probe).on::<Browse>(
            move |request| sink.borrow_mut().push(request),
            None,
        );

        bus.notify::<Browse>(NavigationRequest::to("/a"));
        bus.notify::<Browse>(NavigationRequest::to("/b"));
        seen.borrow_mut().clear();

        history.back();

        assert_eq!(history.entries(), ["/a"]);
        assert_eq!(
            seen.borrow().as_slice(),
            [NavigationRequest {
                url: "/a".to_owned(),
                prevent_history_update: true,
            }]
        );
    }

    #[test]
    fn test_back_on_single_entry_is_noop() {
        let (bus, _anchor, history) = wired();

        bus.notify::<Browse>(NavigationRequest::to("/only"));
        history.back();

        assert_eq!(history.entries(), ["/only"]);
    }
}
