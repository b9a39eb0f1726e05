//! Per-request context.
//!
//! A pipeline may carry a [`ContextFactory`]. The factory is not called when
//! the pipeline is built, nor when a request arrives: it runs the first time
//! a context-aware stage is reached, at most once per request. Every provider
//! stage of that request then sees the same `Arc<C>`.
//!
//! ```text
//! request ──▶ latch (fresh per request, empty)
//!               │
//!   provider #1 ├─▶ factory(req, res) ──▶ Arc<C>   ← runs once
//!   provider #2 ├─▶ cached Arc<C>
//!   provider #3 └─▶ cached Arc<C>
//! ```
//!
//! The latch lives on the stack of one invocation. Two overlapping requests
//! never share a latch or a context.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::request::Request;
use crate::response::Response;

/// Creates the per-request context value.
///
/// Receives the response sink as well so it can set headers or status ahead
/// of the stages that consume the context.
pub type ContextFactory<C> = Arc<dyn Fn(&Request, &mut Response) -> C + Send + Sync>;

/// Wraps a closure as a [`ContextFactory`].
pub fn context_factory<C, F>(factory: F) -> ContextFactory<C>
where
    F: Fn(&Request, &mut Response) -> C + Send + Sync + 'static,
{
    Arc::new(factory)
}

/// Run-once guard for one request's context.
pub(crate) struct ContextLatch<C> {
    factory: Option<ContextFactory<C>>,
    cell: OnceLock<Option<Arc<C>>>,
}

impl<C> ContextLatch<C> {
    pub(crate) fn new(factory: Option<ContextFactory<C>>) -> Self {
        Self { factory, cell: OnceLock::new() }
    }

    /// Returns the request's context, realising it on first use.
    ///
    /// `None` when no factory was supplied.
    pub(crate) fn realize(&self, req: &Request, res: &mut Response) -> Option<Arc<C>> {
        self.cell
            .get_or_init(|| {
                let factory = self.factory.as_ref()?;
                debug!(path = req.path(), "realizing request context");
                Some(Arc::new(factory(req, res)))
            })
            .clone()
    }

    #[cfg(test)]
    pub(crate) fn is_realized(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn factory_runs_once_per_latch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let factory = context_factory(move |_req: &Request, _res: &mut Response| {
            counted.fetch_add(1, Ordering::SeqCst)
        });

        let req = Request::builder().build();
        let mut res = Response::new();
        let latch = ContextLatch::new(Some(factory));
        assert!(!latch.is_realized());

        let first = latch.realize(&req, &mut res).unwrap();
        let second = latch.realize(&req, &mut res).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(latch.is_realized());
    }

    #[test]
    fn missing_factory_yields_none_without_failing() {
        let latch = ContextLatch::<String>::new(None);
        let req = Request::builder().build();
        let mut res = Response::new();
        assert!(latch.realize(&req, &mut res).is_none());
        assert!(latch.is_realized());
    }

    #[test]
    fn factory_may_prime_the_response() {
        let factory = context_factory(|req: &Request, res: &mut Response| {
            res.set_header("x-context", "ready");
            req.path().to_owned()
        });
        let latch = ContextLatch::new(Some(factory));
        let req = Request::builder().path("/orders").build();
        let mut res = Response::new();

        let ctx = latch.realize(&req, &mut res).unwrap();
        assert_eq!(ctx.as_str(), "/orders");
        assert_eq!(res.header("x-context"), Some("ready"));
    }
}
