//! Component combinators
//!
//! The composition algebra on [`Component`]: context declaration and
//! injection, structural transforms, setup effects, child attachment, and
//! controller export. Method chaining replaces the left-to-right function
//! chaining of loosely-typed hosts.

use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::try_join;

use crate::component::{App, AppUtil, Component, RunResult};
use crate::context::{Context, ContextKey, ElementFactory};
use crate::controller::{ControllerMap, ControllerSet, SELF_SLOT};
use crate::error::Result;
use crate::style::StyleSheet;

impl Component {
    /// Declare that this component requires context key `K`.
    ///
    /// A no-op at runtime; the requirement is enforced when the component
    /// resolves the key during build. Kept as an explicit marker so a
    /// component's context contract is readable at its composition site.
    pub fn require<K: ContextKey>(self) -> Self {
        self
    }

    /// Inject a concrete value for context key `K` into the environment seen
    /// by this component and everything below it.
    ///
    /// Siblings composed outside this call do not observe the value.
    pub fn provide<K: ContextKey>(self, value: K::Value) -> Self
    where
        K::Value: Clone,
    {
        Self::new(move |context| self.build(context.with::<K>(value.clone())))
    }

    /// Transform the just-built app.
    ///
    /// Every controller association keyed by the pre-transform node is
    /// re-keyed onto the post-transform node, so structural transforms never
    /// drop controller reachability. The identity transform leaves the app
    /// unchanged, and `map(f).map(g)` is equivalent to mapping the
    /// composition of `f` and `g`.
    pub fn map(self, transform: impl Fn(App, &Context) -> Result<App> + 'static) -> Self {
        let transform = Rc::new(transform);
        Self::new(move |context| {
            let inner = self.clone();
            let transform = transform.clone();
            async move {
                let app = inner.build(context.clone()).await?;
                let old_node = app.node.clone();
                let controllers = app.controllers.clone();
                let mapped = transform(app, &context)?;
                if !old_node.ptr_eq(&mapped.node) {
                    controllers.re_key(&old_node, &mapped.node);
                }
                Ok(mapped)
            }
            .boxed_local()
        })
    }

    /// Run a setup effect after the component resolves.
    ///
    /// `setup` receives the render result, lookup utilities scoped to its
    /// boundary, and the context. If it returns a controller, the engine
    /// registers a node -> controller association under the controller's
    /// name, keyed by the current node, union-merged with any pre-existing
    /// entries for that name.
    pub fn run<F, Fut>(self, setup: F) -> Self
    where
        F: Fn(App, AppUtil, Context) -> Fut + 'static,
        Fut: Future<Output = RunResult> + 'static,
    {
        let setup = Rc::new(setup);
        Self::new(move |context| {
            let inner = self.clone();
            let setup = setup.clone();
            async move {
                let app = inner.build(context.clone()).await?;
                let util = AppUtil::for_app(&app);
                if let Some(controller) = setup(app.clone(), util, context).await? {
                    app.controllers
                        .register(controller.name(), &app.node, SELF_SLOT, controller);
                }
                Ok(app)
            }
            .boxed_local()
        })
    }

    /// Attach a child component under this component's boundary.
    ///
    /// Parent and child subtrees are constructed concurrently; attachment
    /// happens only after both complete. The child node receives `id` if
    /// supplied, and the child's exported controllers fold into the parent's
    /// internal controllers (they stay invisible to the parent's own
    /// ancestors until explicitly exported).
    pub fn add_child(self, child: Component, id: Option<&str>) -> Self {
        let id: Option<String> = id.map(str::to_owned);
        Self::new(move |context| {
            let parent = self.clone();
            let child = child.clone();
            let id = id.clone();
            async move {
                let (parent_app, child_app) =
                    try_join(parent.build(context.clone()), child.build(context)).await?;
                if let Some(id) = &id {
                    child_app.node.set_id(id);
                }
                parent_app.attach(&child_app.node);
                parent_app
                    .internal_controllers
                    .merge_from(&child_app.controllers, &child_app.node);
                Ok(parent_app)
            }
            .boxed_local()
        })
    }

    /// Republish a descendant's controller under this component's own node.
    ///
    /// The selector picks `(node id, controller mapping, export name)` out of
    /// the internal controllers. The resolved controller is registered under
    /// its original name, keyed by the current node, with its behavior
    /// exposed under the export name (rename-on-export). If the selector, the
    /// node, or the controller is absent, nothing is republished and later
    /// lookups yield an absent result; callers must handle absence.
    pub fn export_controller(
        self,
        selector: impl Fn(&ControllerSet) -> Option<(String, ControllerMap, String)> + 'static,
    ) -> Self {
        let selector = Rc::new(selector);
        Self::new(move |context| {
            let inner = self.clone();
            let selector = selector.clone();
            async move {
                let app = inner.build(context).await?;
                if let Some((node_id, map, export_name)) = selector(&app.internal_controllers) {
                    let util = AppUtil::for_app(&app);
                    let resolved = util
                        .get_controller(&map, &node_id)
                        .and_then(|slots| slots.get(SELF_SLOT));
                    if let Some(controller) = resolved {
                        app.controllers.register(
                            controller.name(),
                            &app.node,
                            export_name,
                            controller,
                        );
                    }
                }
                Ok(app)
            }
            .boxed_local()
        })
    }

    /// Wrap the built node in a generic container element
    pub fn wrap_div(self) -> Self {
        self.map(|app, context| {
            let factory = context.expect::<ElementFactory>()?;
            let container = factory("div")?;
            container.append(&app.node);
            Ok(App {
                node: container,
                ..app
            })
        })
    }

    /// Attach a scoped stylesheet to this component's boundary.
    ///
    /// Lazily creates the shadow boundary if absent, installs the rendered
    /// sheet (re-applied on every build), and relocates the node's existing
    /// children into the boundary.
    pub fn css(self, styles: impl Into<StyleSheet>) -> Self {
        let styles = styles.into();
        self.map(move |app, _| {
            let shadow = match app.shadow.clone() {
                Some(shadow) => shadow,
                None => app.node.attach_shadow(),
            };
            shadow.adopt(styles.to_css_text());
            for child in app.node.children() {
                shadow.append(&child);
            }
            app.node.clear_children();
            Ok(App {
                shadow: Some(shadow),
                ..app
            })
        })
    }
}
