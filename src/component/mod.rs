//! Component engine
//!
//! A component is a function from a context environment to an asynchronous
//! tree-construction result: it builds a subtree of host elements, optionally
//! produces controllers, and hands both upward as an [`App`].
//!
//! Composition is expressed by chaining the combinators on [`Component`]
//! (`provide`, `map`, `run`, `add_child`, ...); construction only happens when
//! [`Component::build`] is awaited. Components are pure with respect to the
//! composition algebra but mutate the host tree as a side effect when built.

mod combinators;
mod effects;

pub use effects::{SetChildren, set_children};

use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use crate::context::{Context, ElementFactory};
use crate::controller::{Controller, ControllerMap, ControllerSet, ControllerSlots};
use crate::error::Result;
use crate::host::{Node, ShadowRoot};

/// Future produced by building a component
pub type BuildFuture = LocalBoxFuture<'static, Result<App>>;

/// Result type of a setup closure passed to [`Component::run`]
pub type RunResult = Result<Option<Rc<dyn Controller>>>;

/// Wrap a concrete controller for returning from a setup closure
pub fn controller(controller: impl Controller) -> Option<Rc<dyn Controller>> {
    Some(Rc::new(controller))
}

/// The result of constructing a component
#[derive(Clone, Debug)]
pub struct App {
    /// Root element produced by this render
    pub node: Node,
    /// Optional nested boundary constraining child attachment and styling
    pub shadow: Option<ShadowRoot>,
    /// Controllers exported upward, keyed by name then node
    pub controllers: ControllerSet,
    /// Controllers of descendants not (yet) exported upward
    pub internal_controllers: ControllerSet,
}

impl App {
    /// An app around a bare node with empty controller sets
    pub fn leaf(node: Node) -> Self {
        Self {
            node,
            shadow: None,
            controllers: ControllerSet::new(),
            internal_controllers: ControllerSet::new(),
        }
    }

    /// Attach a child under this app's boundary (shadow if present, else the
    /// node itself)
    pub fn attach(&self, child: &Node) {
        match &self.shadow {
            Some(shadow) => shadow.append(child),
            None => self.node.append(child),
        }
    }

    /// Find a descendant node by element id within the current boundary
    pub fn find_by_id(&self, id: &str) -> Option<Node> {
        match &self.shadow {
            Some(shadow) => shadow.find_by_id(id),
            None => self.node.find_by_id(id),
        }
    }
}

/// Lookup utilities handed to setup closures
#[derive(Clone, Debug)]
pub struct AppUtil {
    node: Node,
    shadow: Option<ShadowRoot>,
}

impl AppUtil {
    /// Build the utilities for a render result
    pub fn for_app(app: &App) -> Self {
        Self {
            node: app.node.clone(),
            shadow: app.shadow.clone(),
        }
    }

    /// Look up a descendant node by element id within the current boundary.
    ///
    /// A miss is an absent result, never an error.
    pub fn get_node(&self, id: &str) -> Option<Node> {
        match &self.shadow {
            Some(shadow) => shadow.find_by_id(id),
            None => self.node.find_by_id(id),
        }
    }

    /// Resolve the controller slots associated with the node found by
    /// [`get_node`](Self::get_node) in the given mapping.
    ///
    /// Absent node or association yields `None`.
    pub fn get_controller(&self, map: &ControllerMap, id: &str) -> Option<ControllerSlots> {
        self.get_node(id).and_then(|node| map.get(&node))
    }
}

/// A function from a context to an asynchronous tree-construction result
#[derive(Clone)]
pub struct Component {
    build: Rc<dyn Fn(Context) -> BuildFuture>,
}

impl Component {
    /// Create a component from its build function
    pub fn new(build: impl Fn(Context) -> BuildFuture + 'static) -> Self {
        Self {
            build: Rc::new(build),
        }
    }

    /// Build the component against `context`
    pub fn build(&self, context: Context) -> BuildFuture {
        (self.build)(context)
    }

    /// Component that always resolves to the given app
    pub fn from_app(app: App) -> Self {
        Self::new(move |_| {
            let app = app.clone();
            async move { Ok(app) }.boxed_local()
        })
    }

    /// Component that always resolves to a leaf app around the given node
    pub fn from_node(node: Node) -> Self {
        Self::from_app(App::leaf(node))
    }

    /// Leaf component creating an element via the context's factory
    pub fn of_element(tag: impl Into<String>) -> Self {
        Self::of_element_with(tag, |_, _| Ok(()))
    }

    /// Leaf component creating an element and applying a synchronous
    /// modifier to it.
    ///
    /// Fails only if the factory (or the modifier) fails; the failure is
    /// propagated, not caught.
    pub fn of_element_with(
        tag: impl Into<String>,
        modify: impl Fn(&Node, &Context) -> Result<()> + 'static,
    ) -> Self {
        let tag = tag.into();
        let modify = Rc::new(modify);
        Self::new(move |context| {
            let tag = tag.clone();
            let modify = modify.clone();
            async move {
                let factory = context.expect::<ElementFactory>()?;
                let node = factory(&tag)?;
                modify(&node, &context)?;
                Ok(App::leaf(node))
            }
            .boxed_local()
        })
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Component")
    }
}

/// Build `component` and install its root node as the sole child of `target`
pub async fn mount(target: &Node, component: &Component, context: Context) -> Result<App> {
    let app = component.build(context).await?;
    target.clear_children();
    target.append(&app.node);
    Ok(app)
}
