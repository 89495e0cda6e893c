//! weft - a functional UI composition toolkit
//!
//! Components are async functions from a typed context environment to a host
//! element subtree plus the controllers governing it. Composition is a pure
//! combinator algebra; construction happens only when a component is built
//! against a concrete context. On top of the engine sit a typed last-value
//! event bus and a nested prefix router.
//!
//! ## Quick tour
//!
//! ```no_run
//! use weft::component::{Component, mount};
//! use weft::context::{Bus, Context, ElementFactory};
//! use weft::eventbus::EventBus;
//! use weft::host::{Node, document_factory};
//! use weft::router::{Route, top_level_router};
//! use weft::{Result, runtime};
//!
//! fn main() -> Result<()> {
//!     runtime::block_on(async {
//!         let routes = vec![
//!             Route::new(
//!                 regex::Regex::new("^/hello").expect("valid pattern"),
//!                 Component::of_element("p"),
//!             ),
//!         ];
//!         let context = Context::new()
//!             .with::<ElementFactory>(document_factory())
//!             .with::<Bus>(EventBus::new())
//!             .with::<weft::context::Url>("/hello".to_owned());
//!         let target = Node::create("body");
//!         mount(&target, &top_level_router(routes), context).await?;
//!         Ok(())
//!     })
//! }
//! ```

pub mod component;
pub mod context;
pub mod controller;
pub mod error;
pub mod eventbus;
pub mod host;
pub mod router;
pub mod runtime;
pub mod style;

pub use component::{App, Component, mount};
pub use context::Context;
pub use error::{Error, Result};
pub use eventbus::EventBus;
