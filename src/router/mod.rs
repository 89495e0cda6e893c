//! Router
//!
//! Prefix-based nested route matching built entirely on the component engine
//! and the event bus. A router renders the first route whose pattern accepts
//! the current path, injects the consumed/remaining path into the matched
//! component's context, and re-renders its single managed child whenever a
//! navigation event changes the matched segment.
//!
//! Routers nest: a matched component can itself be a router; it sees only the
//! path remainder and accumulates the already-consumed prefix through the
//! `MatchedUrl`/`MatchedUrlFull` context keys.

pub mod history;

use std::cell::RefCell;
use std::rc::Rc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::component::{Component, RunResult, SetChildren, controller, set_children};
use crate::context::{Bus, Context, MatchedUrl, MatchedUrlFull, Url};
use crate::controller::Controller;
use crate::error::{NoRouteSnafu, Result};
use crate::eventbus::{EventKind, EventSubscription};
use crate::{component::App, runtime};

/// Navigation channel: external callers notify it to trigger routing
pub struct Browse;

impl EventKind for Browse {
    const NAME: &'static str = "BROWSE_TO";
    type Payload = NavigationRequest;
}

/// Wire-level navigation payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    /// Absolute target path
    pub url: String,
    /// Suppress the history push, set when navigation originated from a
    /// back/forward event
    #[serde(default, rename = "preventHistoryUpdate")]
    pub prevent_history_update: bool,
}

impl NavigationRequest {
    /// Ordinary navigation to `url`
    pub fn to(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prevent_history_update: false,
        }
    }
}

/// A pattern paired with the component rendered on match
#[derive(Clone, Debug)]
pub struct Route {
    pattern: Regex,
    component: Component,
}

impl Route {
    /// Create a route. Patterns are tested against the path from its start;
    /// anchor them accordingly (e.g. `^/users`).
    pub fn new(pattern: Regex, component: Component) -> Self {
        Self { pattern, component }
    }
}

/// Find the first route accepting `path`, in declaration order.
///
/// An empty path is normalized to `/`. A pattern match is accepted only when
/// it starts at the beginning of the path and the remainder is empty or
/// begins with `/`, so `^/route` must not accept `/routeExtra`. On acceptance
/// the matched component is derived by injecting the remainder as `Url`, the
/// matched text as `MatchedUrl`, and `already_matched` plus the matched text
/// as `MatchedUrlFull`.
///
/// Fails with [`Error::NoRoute`] when no route accepts; this layer renders no
/// fallback.
///
/// [`Error::NoRoute`]: crate::error::Error
pub fn find_matching_route(
    path: &str,
    routes: &[Route],
    already_matched: &str,
) -> Result<(String, Component)> {
    let path = if path.is_empty() { "/" } else { path };

    for route in routes {
        let Some(found) = route.pattern.find(path) else {
            continue;
        };
        if found.start() != 0 {
            continue;
        }
        let matched = found.as_str();
        let remainder = &path[found.end()..];
        if !remainder.is_empty() && !remainder.starts_with('/') {
            // aligned on a segment substring only, e.g. /route vs /routeExtra
            continue;
        }
        let remainder = if remainder.is_empty() { "/" } else { remainder };

        let component = route
            .component
            .clone()
            .require::<Url>()
            .require::<MatchedUrl>()
            .require::<MatchedUrlFull>()
            .provide::<Url>(remainder.to_owned())
            .provide::<MatchedUrlFull>(format!("{already_matched}{matched}"))
            .provide::<MatchedUrl>(matched.to_owned());

        return Ok((matched.to_owned(), component));
    }

    NoRouteSnafu {
        path: path.to_owned(),
    }
    .fail()
}

/// Controller exposed by a router, giving ancestors access to its navigation
/// subscription (e.g. to unregister or export it)
pub struct RouterController {
    /// Handle for the router's navigation-channel listener
    pub subscription: EventSubscription,
}

impl Controller for RouterController {
    fn name(&self) -> &'static str {
        "Router"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A router component over an ordered route list.
///
/// On construction it registers on the bus's [`Browse`] channel, seeding the
/// replay fallback with its own current absolute path so a freshly mounted
/// router resolves its active route without an external trigger. On each
/// navigation payload it strips its own already-matched prefix, matches, and,
/// if the matched segment changed, replaces its managed child (id `route`).
/// Re-renders are scheduled with [`runtime::spawn_local`];
/// overlapping navigations are not queued, the later replace simply clears
/// whatever children exist at that time.
pub fn router(routes: Vec<Route>) -> Component {
    let routes = Rc::new(routes);
    Component::of_element("div")
        .require::<Bus>()
        .require::<Url>()
        .require::<MatchedUrl>()
        .require::<MatchedUrlFull>()
        .run(move |app, _, context| {
            let routes = routes.clone();
            async move {
                let bus = context.expect::<Bus>()?;
                let url = context.expect::<Url>()?;
                let matched_url = context.expect::<MatchedUrl>()?;
                let matched_url_full = context.expect::<MatchedUrlFull>()?;

                let prev_matched = Rc::new(RefCell::new(String::new()));
                let subscriber = bus.register(&app.node);

                // the listener is stored on the node itself, so it must not
                // capture a strong handle back to it (Rc cycle, the node
                // would never drop and never leave the observer list)
                let weak_node = app.node.downgrade();
                let shadow = app.shadow.clone();
                let controllers = app.controllers.clone();
                let internal_controllers = app.internal_controllers.clone();
                let listener_context = context.clone();
                let subscription = subscriber.on::<Browse>(
                    move |request| {
                        let Some(node) = weak_node.upgrade() else {
                            return;
                        };
                        let app = App {
                            node,
                            shadow: shadow.clone(),
                            controllers: controllers.clone(),
                            internal_controllers: internal_controllers.clone(),
                        };
                        handle_navigation(
                            &app,
                            &listener_context,
                            &routes,
                            &prev_matched,
                            &matched_url,
                            &request.url,
                        );
                    },
                    Some(NavigationRequest::to(format!("{matched_url_full}{url}"))),
                );

                RunResult::Ok(controller(RouterController { subscription }))
            }
        })
}

fn handle_navigation(
    app: &App,
    context: &Context,
    routes: &[Route],
    prev_matched: &Rc<RefCell<String>>,
    matched_url: &str,
    target: &str,
) {
    // strip this router's own already-consumed prefix
    let local = target.get(matched_url.len()..).unwrap_or("");

    match find_matching_route(local, routes, matched_url) {
        Ok((matched, component)) => {
            if *prev_matched.borrow() == matched {
                return;
            }
            *prev_matched.borrow_mut() = matched.clone();
            tracing::debug!(segment = %matched, "navigating");

            let app = app.clone();
            let context = context.clone();
            runtime::spawn_local(async move {
                if let Err(error) =
                    set_children(&app, &context, SetChildren::Replace, vec![component], "route")
                        .await
                {
                    tracing::error!(%error, "route render failed");
                }
            });
        }
        Err(error) => {
            // synchronous dispatch cannot propagate; fail loudly and keep
            // the current child
            tracing::error!(%error, url = target, "no route matched");
        }
    }
}

/// The first router in a chain: seeds the matched-prefix context keys to
/// empty so absolute paths resolve correctly
pub fn top_level_router(routes: Vec<Route>) -> Component {
    router(routes)
        .provide::<MatchedUrl>(String::new())
        .provide::<MatchedUrlFull>(String::new())
}

/// A component that immediately navigates to `url` during its setup phase
pub fn redirect(url: impl Into<String>) -> Component {
    let url = url.into();
    Component::of_element("div")
        .require::<Bus>()
        .run(move |_, _, context| {
            let url = url.clone();
            async move {
                let bus = context.expect::<Bus>()?;
                bus.notify::<Browse>(NavigationRequest::to(url));
                RunResult::Ok(None)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ElementFactory;
    use crate::error::Error;
    use crate::eventbus::EventBus;
    use crate::host::{Node, document_factory};
    use std::cell::Cell;

    fn test_regex(pattern: &str) -> Regex {
        Regex::new(pattern).expect("invalid test pattern")
    }

    // opt-in log capture, driven by RUST_LOG
    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn router_context(url: &str) -> (Context, EventBus) {
        init_logging();
        let bus = EventBus::new();
        let context = Context::new()
            .with::<ElementFactory>(document_factory())
            .with::<Bus>(bus.clone())
            .with::<MatchedUrl>(String::new())
            .with::<MatchedUrlFull>(String::new())
            .with::<Url>(url.to_owned());
        (context, bus)
    }

    /// Let fire-and-forget re-renders scheduled on the local set run
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn counted_element(tag: &'static str, renders: &Rc<Cell<usize>>) -> Component {
        let renders = renders.clone();
        Component::of_element_with(tag, move |_, _| {
            renders.set(renders.get() + 1);
            Ok(())
        })
    }

    // ==================== matching ====================

    #[test]
    fn test_match_rejects_segment_substring() {
        let routes = vec![Route::new(test_regex("^/routeA"), Component::of_element("strong"))];

        let error = find_matching_route("/routeAExtra", &routes, "")
            .expect_err("substring alignment must not match");
        assert!(matches!(error, Error::NoRoute { .. }));
    }

    #[test]
    fn test_match_accepts_sub_segment_with_remainder() {
        let routes = vec![Route::new(test_regex("^/routeA"), Component::of_element("strong"))];

        let (matched, _) =
            find_matching_route("/routeA/sub", &routes, "").expect("sub-segment must match");
        assert_eq!(matched, "/routeA");
    }

    #[test]
    fn test_match_normalizes_empty_path() {
        let routes = vec![Route::new(test_regex("^/"), Component::of_element("strong"))];

        let (matched, _) = find_matching_route("", &routes, "").expect("empty path must match /");
        assert_eq!(matched, "/");
    }

    #[test]
    fn test_match_respects_declaration_order() {
        let routes = vec![
            Route::new(test_regex("^/a"), Component::of_element("first")),
            Route::new(test_regex("^/a"), Component::of_element("second")),
        ];

        runtime::block_on(async {
            let (context, _bus) = router_context("/a");
            let (_, component) = find_matching_route("/a", &routes, "").expect("match failed");
            let app = component.build(context).await.expect("build failed");
            assert_eq!(app.node.tag(), "first");
        });
    }

    #[test]
    fn test_matched_component_sees_injected_path_context() {
        let routes = vec![Route::new(
            test_regex("^/outer"),
            Component::of_element("div").run(|_, _, context| async move {
                assert_eq!(context.expect::<Url>()?.as_str(), "/rest");
                assert_eq!(context.expect::<MatchedUrl>()?.as_str(), "/outer");
                assert_eq!(context.expect::<MatchedUrlFull>()?.as_str(), "/pre/outer");
                RunResult::Ok(None)
            }),
        )];

        runtime::block_on(async {
            let (context, _bus) = router_context("/outer/rest");
            let (_, component) =
                find_matching_route("/outer/rest", &routes, "/pre").expect("match failed");
            component.build(context).await.expect("build failed");
        });
    }

    // ==================== rendering ====================

    #[test]
    fn test_correct_route_is_rendered() {
        let routes = vec![
            Route::new(test_regex("^/routeA"), Component::of_element("strong")),
            Route::new(test_regex("^/routeB"), Component::of_element("em")),
        ];

        runtime::block_on(async {
            let (context, _bus) = router_context("/routeA");
            let app = router(routes.clone())
                .build(context)
                .await
                .expect("router build failed");
            settle().await;

            let children = app.node.children();
            assert_eq!(children.len(), 1);
            assert_eq!(children[0].tag(), "strong");
            assert_eq!(children[0].id().as_deref(), Some("route"));
        });

        runtime::block_on(async {
            let (context, _bus) = router_context("/routeB");
            let app = router(routes)
                .build(context)
                .await
                .expect("router build failed");
            settle().await;

            assert_eq!(app.node.children()[0].tag(), "em");
        });
    }

    #[test]
    fn test_navigation_switches_rendered_route() {
        let routes = vec![
            Route::new(test_regex("^/a"), Component::of_element("strong")),
            Route::new(test_regex("^/b"), Component::of_element("em")),
        ];

        runtime::block_on(async {
            let (context, bus) = router_context("/a");
            let app = top_level_router(routes)
                .build(context)
                .await
                .expect("router build failed");
            settle().await;
            assert_eq!(app.node.children()[0].tag(), "strong");

            bus.notify::<Browse>(NavigationRequest::to("/b"));
            settle().await;
            assert_eq!(app.node.children().len(), 1);
            assert_eq!(app.node.children()[0].tag(), "em");
        });
    }

    #[test]
    fn test_same_segment_navigation_renders_once() {
        let renders = Rc::new(Cell::new(0));
        let other_renders = Rc::new(Cell::new(0));
        let routes = vec![
            Route::new(test_regex("^/a"), counted_element("strong", &renders)),
            Route::new(test_regex("^/b"), counted_element("em", &other_renders)),
        ];

        runtime::block_on(async {
            let (context, bus) = router_context("/a");
            let _app = top_level_router(routes)
                .build(context)
                .await
                .expect("router build failed");
            settle().await;
            assert_eq!(renders.get(), 1);

            // same segment: suppressed
            bus.notify::<Browse>(NavigationRequest::to("/a"));
            settle().await;
            assert_eq!(renders.get(), 1);

            // same segment, deeper remainder: still suppressed
            bus.notify::<Browse>(NavigationRequest::to("/a/deeper"));
            settle().await;
            assert_eq!(renders.get(), 1);

            // away and back: re-rendered
            bus.notify::<Browse>(NavigationRequest::to("/b"));
            settle().await;
            bus.notify::<Browse>(NavigationRequest::to("/a"));
            settle().await;
            assert_eq!(other_renders.get(), 1);
            assert_eq!(renders.get(), 2);
        });
    }

    #[test]
    fn test_nested_routers_consume_prefixes() {
        let inner_routes = vec![Route::new(
            test_regex("^/inner"),
            Component::of_element("strong"),
        )];
        let routes = vec![Route::new(test_regex("^/outer"), router(inner_routes))];

        runtime::block_on(async {
            let (context, _bus) = router_context("/outer/inner");
            let app = top_level_router(routes)
                .build(context)
                .await
                .expect("router build failed");
            settle().await;

            let outer_child = &app.node.children()[0];
            assert_eq!(outer_child.tag(), "div");
            let inner_child = &outer_child.children()[0];
            assert_eq!(inner_child.tag(), "strong");
            assert_eq!(inner_child.id().as_deref(), Some("route"));
        });
    }

    #[test]
    fn test_router_controller_unsubscribes_navigation() {
        let renders = Rc::new(Cell::new(0));
        let other_renders = Rc::new(Cell::new(0));
        let routes = vec![
            Route::new(test_regex("^/a"), counted_element("strong", &renders)),
            Route::new(test_regex("^/b"), counted_element("em", &other_renders)),
        ];

        runtime::block_on(async {
            let (context, bus) = router_context("/a");
            let app = top_level_router(routes)
                .build(context)
                .await
                .expect("router build failed");
            settle().await;

            let map = app.controllers.get("Router").expect("missing controller");
            let slots = map.get(&app.node).expect("not keyed by router node");
            let handle = slots.own().expect("missing self slot");
            handle
                .as_any()
                .downcast_ref::<RouterController>()
                .expect("wrong controller type")
                .subscription
                .unsubscribe();

            bus.notify::<Browse>(NavigationRequest::to("/b"));
            settle().await;
            assert_eq!(other_renders.get(), 0);
        });
    }

    #[test]
    fn test_dropped_router_stops_handling_navigation() {
        let renders = Rc::new(Cell::new(0));
        let other_renders = Rc::new(Cell::new(0));
        let routes = vec![
            Route::new(test_regex("^/a"), counted_element("strong", &renders)),
            Route::new(test_regex("^/b"), counted_element("em", &other_renders)),
        ];

        runtime::block_on(async {
            let (context, bus) = router_context("/a");
            let app = top_level_router(routes)
                .build(context)
                .await
                .expect("router build failed");
            settle().await;
            assert_eq!(renders.get(), 1);

            drop(app);

            bus.notify::<Browse>(NavigationRequest::to("/b"));
            settle().await;
            assert_eq!(other_renders.get(), 0);
            // the dead node was pruned by the notify
            assert_eq!(bus.observer_count(), 0);
        });
    }

    struct Page {
        calls: Rc<Cell<usize>>,
    }

    impl Page {
        fn poke(&self) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    impl Controller for Page {
        fn name(&self) -> &'static str {
            "Page"
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_route_controller_resolvable_after_navigation() {
        let calls = Rc::new(Cell::new(0));
        let page_calls = calls.clone();
        let page = Component::of_element("em").run(move |_, _, _| {
            let calls = page_calls.clone();
            async move { RunResult::Ok(controller(Page { calls })) }
        });
        let routes = vec![
            Route::new(test_regex("^/a"), Component::of_element("strong")),
            Route::new(test_regex("^/b"), page),
        ];

        runtime::block_on(async {
            let (context, bus) = router_context("/a");
            let app = top_level_router(routes)
                .build(context)
                .await
                .expect("router build failed");
            settle().await;

            bus.notify::<Browse>(NavigationRequest::to("/b"));
            settle().await;

            // the render result the caller kept resolves the controller the
            // navigation fold produced
            let map = app
                .internal_controllers
                .get("Page")
                .expect("controller not folded after navigation");
            let child = app.node.find_by_id("route").expect("route child missing");
            map.get(&child)
                .and_then(|slots| slots.own())
                .expect("controller not resolvable")
                .as_any()
                .downcast_ref::<Page>()
                .expect("wrong controller type")
                .poke();
            assert_eq!(calls.get(), 1);
        });
    }

    #[test]
    fn test_redirect_notifies_navigation_channel() {
        runtime::block_on(async {
            let bus = EventBus::new();
            let probe = Node::create("div");
            let seen = Rc::new(RefCell::new(Vec::new()));
            let sink = seen.clone();
            bus.register(&probe).on::<Browse>(
                move |request| sink.borrow_mut().push(request.url),
                None,
            );

            let context = Context::new()
                .with::<ElementFactory>(document_factory())
                .with::<Bus>(bus.clone());
            redirect("/target")
                .build(context)
                .await
                .expect("redirect build failed");

            assert_eq!(seen.borrow().as_slice(), ["/target"]);
        });
    }

    // ==================== wire contract ====================

    #[test]
    fn test_navigation_request_wire_format() {
        let request = NavigationRequest {
            url: "/a".to_owned(),
            prevent_history_update: true,
        };
        let value = serde_json::to_value(&request).expect("serialize failed");
        assert_eq!(
            value,
            serde_json::json!({ "url": "/a", "preventHistoryUpdate": true })
        );

        let parsed: NavigationRequest =
            serde_json::from_str(r#"{"url":"/b"}"#).expect("deserialize failed");
        assert_eq!(parsed, NavigationRequest::to("/b"));
    }
}
