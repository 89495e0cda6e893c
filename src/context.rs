//! Context environment
//!
//! The immutable, typed environment threaded through a component tree. A
//! context grows only by explicit injection: `with` produces a new merged
//! environment for the subtree below the injection point and never mutates
//! the original, so sibling subtrees composed outside the injection cannot
//! observe the value.
//!
//! Keys are zero-sized marker types implementing [`ContextKey`]. A component
//! declares the keys it needs with the no-op [`Component::require`] marker
//! and resolves them at build time with [`Context::expect`]; a missing key is
//! reported as [`Error::MissingContext`] naming the key.
//!
//! [`Component::require`]: crate::component::Component::require
//! [`Error::MissingContext`]: crate::error::Error

use std::any::{Any, TypeId};
use std::rc::Rc;

use ahash::AHashMap;
use snafu::OptionExt;

use crate::error::{MissingContextSnafu, Result};
use crate::eventbus::EventBus;
use crate::host::Factory;

/// Typed key into a [`Context`]
pub trait ContextKey: 'static {
    /// Value type stored under this key
    type Value: 'static;
    /// Human-readable key name, used in missing-key errors
    const NAME: &'static str;
}

/// Immutable environment threaded through a component tree
#[derive(Clone, Default)]
pub struct Context {
    entries: Rc<AHashMap<TypeId, Rc<dyn Any>>>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a new context with `value` injected under key `K`.
    ///
    /// The receiver is left untouched; only the returned context (and the
    /// subtree it is passed to) can observe the value.
    pub fn with<K: ContextKey>(&self, value: K::Value) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(TypeId::of::<K>(), Rc::new(value) as Rc<dyn Any>);
        Self {
            entries: Rc::new(entries),
        }
    }

    /// Look up the value injected under key `K`, if any
    pub fn get<K: ContextKey>(&self) -> Option<Rc<K::Value>> {
        self.entries
            .get(&TypeId::of::<K>())
            .cloned()
            .and_then(|value| value.downcast::<K::Value>().ok())
    }

    /// Look up a required key, failing with a named missing-key error
    pub fn expect<K: ContextKey>(&self) -> Result<Rc<K::Value>> {
        self.get::<K>().context(MissingContextSnafu { key: K::NAME })
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries.len())
            .finish()
    }
}

// ==================== Standard keys ====================

/// Host element factory key (`mk_element`)
pub struct ElementFactory;

impl ContextKey for ElementFactory {
    type Value = Factory;
    const NAME: &'static str = "mk_element";
}

/// Event bus key
pub struct Bus;

impl ContextKey for Bus {
    type Value = EventBus;
    const NAME: &'static str = "event_bus";
}

/// Remaining (not yet matched) path seen by a router
pub struct Url;

impl ContextKey for Url {
    type Value = String;
    const NAME: &'static str = "url";
}

/// Path segment matched by the nearest ancestor router
pub struct MatchedUrl;

impl ContextKey for MatchedUrl {
    type Value = String;
    const NAME: &'static str = "matched_url";
}

/// Full path prefix consumed by all ancestor routers
pub struct MatchedUrlFull;

impl ContextKey for MatchedUrlFull {
    type Value = String;
    const NAME: &'static str = "matched_url_full";
}
