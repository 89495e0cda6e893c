//! Imperative child replacement
//!
//! `set_children` is not a combinator: it mutates an already-built app in
//! place, replacing or extending its children. The router uses it for
//! navigation-driven re-renders.

use futures::future::try_join_all;

use crate::component::{App, Component};
use crate::context::Context;
use crate::error::Result;

/// How `set_children` treats children already present
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SetChildren {
    /// Remove all existing children before attaching the new list
    #[default]
    Replace,
    /// Keep existing children and append the new list
    Append,
}

/// Replace or extend an app's children with freshly built components.
///
/// With [`SetChildren::Replace`] the node's existing children are removed
/// synchronously, before any new child is constructed. All new children are
/// built concurrently against `context`; once every one has completed they
/// are attached in declaration order under the app's boundary, each assigned
/// `id`, and their exported controllers fold into the app's internal
/// controllers. The fold writes through the given `app` (controller sets are
/// shared storage), so callers that discard the returned app still resolve
/// the new controllers. A failing child fails the whole call; children
/// already attached by an earlier call are not rolled back.
pub async fn set_children(
    app: &App,
    context: &Context,
    mode: SetChildren,
    children: Vec<Component>,
    id: &str,
) -> Result<App> {
    if mode == SetChildren::Replace {
        app.node.clear_children();
    }

    let built = try_join_all(
        children
            .iter()
            .map(|child| child.build(context.clone())),
    )
    .await?;

    let result = app.clone();
    for child in built {
        child.node.set_id(id);
        result.attach(&child.node);
        result
            .internal_controllers
            .merge_from(&child.controllers, &child.node);
    }
    Ok(result)
}
