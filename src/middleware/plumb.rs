//! Pipeline composer.
//!
//! [`plumb`] takes any mix of stage shapes, flattens nested groups, drops
//! what cannot run, and returns one [`Pipeline`] that is itself a
//! [`Handler`]. Build it once at startup and share it across requests.
//!
//! ```text
//! plumb(factory, [A, absent, [B, C], D])
//!        ↓ flatten + classify                         (once)
//! [A, B, C, D]
//!        ↓ per request: latch = ContextLatch::new(factory)
//! A(B(C(D(noop))))                                    ← right-to-left fold
//!        ↓
//! handler.process(&req, &mut res)
//! ```

use std::sync::Arc;

use tracing::{trace, warn};

use crate::handler::{BoxedHandler, Handler, noop};
use crate::request::Request;
use crate::response::Response;

use super::adapt::{adapt, apply_or_noop};
use super::context::{ContextFactory, ContextLatch};
use super::flatten::flatten;
use super::stage::{Stage, StageInput, Wrapper};

/// Composes `inputs` into one handler.
///
/// Absent entries are skipped. Unsupported entries are logged and skipped;
/// they never prevent the rest of the pipeline from being built. With no
/// runnable stages the pipeline is a no-op.
///
/// ```rust
/// use plumber::{Pipeline, Request, Response, StageInput, plumb, Handler};
///
/// fn one(_req: &Request, res: &mut Response) { res.write_str("1"); }
/// fn two(_req: &Request, res: &mut Response) { res.write_str("2"); }
///
/// let pipeline: Pipeline = plumb(None, [
///     StageInput::action(one),
///     StageInput::Absent,
///     StageInput::action(two),
/// ]);
///
/// let mut res = Response::new();
/// pipeline.process(&Request::builder().build(), &mut res);
/// assert_eq!(res.body(), b"12");
/// ```
pub fn plumb<C>(
    factory: Option<ContextFactory<C>>,
    inputs: impl IntoIterator<Item = StageInput<C>>,
) -> Pipeline<C>
where
    C: Send + Sync + 'static,
{
    let flat = flatten(inputs.into_iter().collect());
    let mut stages = Vec::with_capacity(flat.len());

    for (position, input) in flat.into_iter().enumerate() {
        match input {
            StageInput::Stage(stage) => stages.push(stage),
            StageInput::Unsupported(name) => {
                warn!(position, stage = %name, "skipping stage with unsupported shape");
            }
            // flatten leaves no groups behind
            StageInput::Absent | StageInput::Group(_) => {}
        }
    }

    trace!(
        stages = stages.len(),
        providers = stages.iter().filter(|s| s.is_provider()).count(),
        context = factory.is_some(),
        "pipeline composed"
    );

    Pipeline { stages: stages.into(), factory }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// A composed pipeline. Cheap to clone; clones share the stage list.
///
/// Every call to [`Handler::process`] folds a fresh chain with its own
/// context latch, so concurrent requests never observe each other's context.
pub struct Pipeline<C = ()> {
    stages: Arc<[Stage<C>]>,
    factory: Option<ContextFactory<C>>,
}

impl<C> Pipeline<C>
where
    C: Send + Sync + 'static,
{
    /// Number of runnable stages after flattening.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether any stage consumes the per-request context.
    pub fn needs_context(&self) -> bool {
        self.stages.iter().any(Stage::is_provider)
    }

    /// Runs the pipeline with `terminal` in place of the no-op terminal.
    pub fn process_then(&self, req: &Request, res: &mut Response, terminal: BoxedHandler) {
        self.chain(terminal).process(req, res);
    }

    /// Turns the pipeline into a single wrapper for another pipeline,
    /// possibly one with a different context type.
    ///
    /// The inner chain continues into the outer `next`, so a stage that
    /// short-circuits inside also stops the outer chain. The inner pipeline
    /// keeps its own factory: its providers get a context of their own,
    /// separate from the outer pipeline's.
    pub fn into_wrapper(self) -> Wrapper {
        Wrapper::new(move |next| {
            let pipeline = self.clone();
            (move |req: &Request, res: &mut Response| {
                pipeline.process_then(req, res, Arc::clone(&next));
            })
            .boxed()
        })
    }

    /// The pipeline's stages as a group for an outer pipeline of the same
    /// context type.
    ///
    /// The stages are spliced into the outer list, so their providers share
    /// the outer request's context and the inner factory is not used.
    pub fn into_stage(self) -> StageInput<C> {
        StageInput::Group(self.stages.iter().cloned().map(StageInput::Stage).collect())
    }

    fn chain(&self, terminal: BoxedHandler) -> BoxedHandler {
        let latch = Arc::new(ContextLatch::new(self.factory.clone()));
        self.stages
            .iter()
            .rev()
            .fold(terminal, |next, stage| apply_or_noop(&adapt(stage, &latch), next))
    }
}

impl<C> Handler for Pipeline<C>
where
    C: Send + Sync + 'static,
{
    fn process(&self, req: &Request, res: &mut Response) {
        if self.stages.is_empty() {
            return;
        }
        self.chain(noop()).process(req, res);
    }
}

impl<C> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self { stages: Arc::clone(&self.stages), factory: self.factory.clone() }
    }
}

// ── Plumber ───────────────────────────────────────────────────────────────────

/// Chaining builder over [`plumb`].
///
/// ```rust
/// use plumber::{Handler, Plumber, Request, Response};
///
/// let pipeline = Plumber::new()
///     .action(|_: &Request, res: &mut Response| res.write_str("a"))
///     .lazy(|| |_: &Request, res: &mut Response| res.write_str("b"))
///     .build();
///
/// let mut res = Response::new();
/// pipeline.process(&Request::builder().build(), &mut res);
/// assert_eq!(res.body(), b"ab");
/// ```
pub struct Plumber<C = ()> {
    factory: Option<ContextFactory<C>>,
    inputs: Vec<StageInput<C>>,
}

impl Plumber {
    /// A builder without context support; providers receive `None`.
    pub fn new() -> Self {
        Self { factory: None, inputs: Vec::new() }
    }
}

impl Default for Plumber {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Plumber<C>
where
    C: Send + Sync + 'static,
{
    /// A builder whose providers receive a context built by `factory`.
    pub fn with_context<F>(factory: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> C + Send + Sync + 'static,
    {
        Self { factory: Some(Arc::new(factory)), inputs: Vec::new() }
    }

    pub fn stage(mut self, input: impl Into<StageInput<C>>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn action(self, handler: impl Handler) -> Self {
        self.stage(StageInput::action(handler))
    }

    pub fn wrap<F>(self, wrap: F) -> Self
    where
        F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        self.stage(Wrapper::new(wrap))
    }

    pub fn lazy<F, H>(self, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler,
    {
        self.stage(StageInput::lazy(factory))
    }

    pub fn next<F>(self, action: F) -> Self
    where
        F: Fn(&Request, &mut Response, &dyn Handler) + Send + Sync + 'static,
    {
        self.stage(StageInput::next(action))
    }

    pub fn provider<F>(self, provider: F) -> Self
    where
        F: Fn(Option<Arc<C>>) -> Wrapper + Send + Sync + 'static,
    {
        self.stage(StageInput::provider(provider))
    }

    pub fn group(self, inputs: impl IntoIterator<Item = StageInput<C>>) -> Self {
        self.stage(StageInput::group(inputs))
    }

    pub fn build(self) -> Pipeline<C> {
        plumb(self.factory, self.inputs)
    }
}
