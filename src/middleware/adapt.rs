//! Shape adapter: every [`Stage`] becomes a [`Wrapper`].

use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler, noop};
use crate::request::Request;
use crate::response::Response;

use super::context::ContextLatch;
use super::stage::{Stage, Wrapper};

/// Produces the canonical wrapper for `stage`.
///
/// Provider stages are bound to `latch`, so the wrapper returned for one
/// must only be used within the request that owns the latch.
pub(crate) fn adapt<C>(stage: &Stage<C>, latch: &Arc<ContextLatch<C>>) -> Wrapper
where
    C: Send + Sync + 'static,
{
    match stage {
        Stage::Action(action) => {
            let action = Arc::clone(action);
            Wrapper::new(move |next| {
                let action = Arc::clone(&action);
                (move |req: &Request, res: &mut Response| {
                    action.process(req, res);
                    next.process(req, res);
                })
                .boxed()
            })
        }
        Stage::Wrap(wrapper) => wrapper.clone(),
        Stage::Lazy(factory) => {
            let factory = Arc::clone(factory);
            Wrapper::new(move |next| {
                let factory = Arc::clone(&factory);
                (move |req: &Request, res: &mut Response| {
                    if let Some(handler) = factory() {
                        handler.process(req, res);
                    }
                    next.process(req, res);
                })
                .boxed()
            })
        }
        Stage::Next(action) => {
            let action = Arc::clone(action);
            Wrapper::new(move |next| {
                let action = Arc::clone(&action);
                (move |req: &Request, res: &mut Response| action(req, res, &*next)).boxed()
            })
        }
        Stage::Provider(provider) => {
            let provider = Arc::clone(provider);
            let latch = Arc::clone(latch);
            Wrapper::new(move |next| {
                let provider = Arc::clone(&provider);
                let latch = Arc::clone(&latch);
                (move |req: &Request, res: &mut Response| {
                    let ctx = latch.realize(req, res);
                    let handler = provider(ctx).apply(Arc::clone(&next)).unwrap_or_else(noop);
                    handler.process(req, res);
                })
                .boxed()
            })
        }
    }
}

/// Resolves a provider with no context, for use outside a composed pipeline.
pub fn without_context<C, F>(provider: F) -> Wrapper
where
    F: Fn(Option<Arc<C>>) -> Wrapper,
{
    provider(None)
}

/// Applies `wrapper` to `next`, substituting the no-op terminal when the
/// wrapper yields nothing.
pub(crate) fn apply_or_noop(wrapper: &Wrapper, next: BoxedHandler) -> BoxedHandler {
    wrapper.apply(next).unwrap_or_else(noop)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::middleware::context::context_factory;

    fn run(wrapper: &Wrapper, next: BoxedHandler) -> Response {
        let mut res = Response::new();
        apply_or_noop(wrapper, next).process(&Request::builder().build(), &mut res);
        res
    }

    fn latch() -> Arc<ContextLatch<()>> {
        Arc::new(ContextLatch::new(None))
    }

    fn tail(_req: &Request, res: &mut Response) {
        res.write_str("|tail");
    }

    #[test]
    fn action_runs_before_next() {
        let stage = Stage::Action((|_req: &Request, res: &mut Response| res.write_str("head")).boxed());
        let res = run(&adapt(&stage, &latch()), tail.boxed());
        assert_eq!(res.body(), b"head|tail");
    }

    #[test]
    fn wrapper_passes_through_unchanged() {
        let wrapper = Wrapper::new(|next: BoxedHandler| {
            (move |req: &Request, res: &mut Response| {
                res.write_str("<");
                next.process(req, res);
                res.write_str(">");
            })
            .boxed()
        });
        let res = run(&adapt(&Stage::Wrap(wrapper), &latch()), tail.boxed());
        assert_eq!(res.body(), b"<|tail>");
    }

    #[test]
    fn lazy_factory_runs_on_every_invocation() {
        let built = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&built);
        let stage: Stage = Stage::Lazy(Arc::new(move || {
            *counter.lock().unwrap() += 1;
            Some((|_req: &Request, res: &mut Response| res.write_str("lazy")).boxed())
        }));

        let handler = apply_or_noop(&adapt(&stage, &latch()), tail.boxed());
        assert_eq!(*built.lock().unwrap(), 0);

        for _ in 0..3 {
            let mut res = Response::new();
            handler.process(&Request::builder().build(), &mut res);
            assert_eq!(res.body(), b"lazy|tail");
        }
        assert_eq!(*built.lock().unwrap(), 3);
    }

    #[test]
    fn lazy_factory_producing_nothing_still_continues() {
        let stage: Stage = Stage::Lazy(Arc::new(|| None::<BoxedHandler>));
        let res = run(&adapt(&stage, &latch()), tail.boxed());
        assert_eq!(res.body(), b"|tail");
    }

    #[test]
    fn explicit_next_action_owns_continuation() {
        let stage: Stage = Stage::Next(Arc::new(|req: &Request, res: &mut Response, next: &dyn Handler| {
            res.write_str("before");
            next.process(req, res);
            res.write_str("|after");
        }));
        let res = run(&adapt(&stage, &latch()), tail.boxed());
        assert_eq!(res.body(), b"before|tail|after");
    }

    #[test]
    fn provider_receives_realized_context() {
        let latch = Arc::new(ContextLatch::new(Some(context_factory(
            |_req: &Request, _res: &mut Response| "ctx".to_owned(),
        ))));
        let stage = Stage::Provider(Arc::new(|ctx: Option<Arc<String>>| {
            Wrapper::new(move |next: BoxedHandler| {
                let ctx = ctx.clone();
                (move |req: &Request, res: &mut Response| {
                    res.write_str(ctx.as_deref().map_or("none", String::as_str));
                    next.process(req, res);
                })
                .boxed()
            })
        }));
        let res = run(&adapt(&stage, &latch), tail.boxed());
        assert_eq!(res.body(), b"ctx|tail");
    }

    #[test]
    fn provider_yielding_nothing_ends_the_chain() {
        let stage: Stage = Stage::Provider(Arc::new(|_ctx: Option<Arc<()>>| Wrapper::optional(|_next| None)));
        let res = run(&adapt(&stage, &latch()), tail.boxed());
        assert!(res.body().is_empty());
    }

    #[test]
    fn without_context_resolves_with_none() {
        let wrapper = without_context(|ctx: Option<Arc<u8>>| {
            assert!(ctx.is_none());
            Wrapper::new(|next| next)
        });
        let res = run(&wrapper, tail.boxed());
        assert_eq!(res.body(), b"|tail");
    }
}
