//! Async runtime bridge
//!
//! The composition algebra is single-threaded and cooperative: component
//! futures are `!Send` and are resolved on one logical thread. This module
//! bridges them onto a shared current-thread tokio runtime.
//!
//! ## Pattern
//!
//! ```text
//! host application
//!       │
//!       ▼
//! runtime::block_on(async { mount(...).await })
//!       │
//!       ▼
//! LocalSet drives the render tree plus any fire-and-forget
//! re-renders scheduled with runtime::spawn_local
//! ```

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Runtime};
use tokio::task::LocalSet;

/// Global current-thread tokio runtime instance
static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        Builder::new_current_thread()
            .build()
            .expect("failed to build tokio runtime")
    })
}

/// Drive a composition future to completion on the current thread.
///
/// Runs inside a fresh `LocalSet`, so tasks scheduled with [`spawn_local`]
/// during the future's execution (navigation-triggered re-renders) are polled
/// whenever the main future yields.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let local = LocalSet::new();
    local.block_on(runtime(), future)
}

/// Schedule a fire-and-forget local task.
///
/// Must be called from within [`block_on`]; used for re-renders initiated
/// from synchronous event listeners, where the construction future cannot be
/// awaited in place.
pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    tokio::task::spawn_local(future);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_block_on_returns_value() {
        let value = block_on(async { 41 + 1 });
        assert_eq!(value, 42);
    }

    #[test]
    fn test_spawn_local_runs_when_main_future_yields() {
        let flag = Rc::new(Cell::new(false));
        let flag_task = flag.clone();

        block_on(async move {
            spawn_local(async move {
                flag_task.set(true);
            });
            tokio::task::yield_now().await;
        });

        assert!(flag.get());
    }
}
