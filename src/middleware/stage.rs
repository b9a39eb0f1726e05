//! Stage shapes and stage inputs.
//!
//! Every value a caller can put into a pipeline is a [`StageInput`]. The
//! recognised call shapes are the variants of [`Stage`]; the adapter turns
//! each of them into a [`Wrapper`].

use std::any::{Any, type_name};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

// ── Wrapper ───────────────────────────────────────────────────────────────────

/// One pipeline stage in canonical form: given the downstream handler,
/// produce the handler that runs in its place.
///
/// A wrapper may decline to produce a handler ([`Wrapper::optional`]); the
/// composer then substitutes the no-op terminal.
#[derive(Clone)]
pub struct Wrapper(Arc<dyn Fn(BoxedHandler) -> Option<BoxedHandler> + Send + Sync>);

impl Wrapper {
    /// A decorator-style middleware.
    ///
    /// ```rust
    /// use plumber::{BoxedHandler, Handler, Request, Response, Wrapper};
    ///
    /// let banner = Wrapper::new(|next: BoxedHandler| {
    ///     (move |req: &Request, res: &mut Response| {
    ///         res.write_str("[");
    ///         next.process(req, res);
    ///         res.write_str("]");
    ///     })
    ///     .boxed()
    /// });
    /// ```
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        Self(Arc::new(move |next| Some(wrap(next))))
    }

    /// A wrapper that may yield no handler at all.
    pub fn optional<F>(wrap: F) -> Self
    where
        F: Fn(BoxedHandler) -> Option<BoxedHandler> + Send + Sync + 'static,
    {
        Self(Arc::new(wrap))
    }

    /// Applies the wrapper to `next`.
    pub fn apply(&self, next: BoxedHandler) -> Option<BoxedHandler> {
        (self.0)(next)
    }
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Wrapper")
    }
}

// ── Stage ─────────────────────────────────────────────────────────────────────

/// Builds a handler on demand.
pub type HandlerFactory = Arc<dyn Fn() -> Option<BoxedHandler> + Send + Sync>;

/// An action that receives the downstream handler and decides whether to call it.
pub type NextFn = Arc<dyn Fn(&Request, &mut Response, &dyn Handler) + Send + Sync>;

/// Resolves to a wrapper once the per-request context is known.
///
/// Receives `None` when the pipeline has no context factory.
pub type ProviderFn<C> = Arc<dyn Fn(Option<Arc<C>>) -> Wrapper + Send + Sync>;

/// The recognised stage shapes.
pub enum Stage<C = ()> {
    /// Runs, then continues to `next`.
    Action(BoxedHandler),
    /// Already canonical.
    Wrap(Wrapper),
    /// Calls the factory on every request, runs the result, then continues.
    Lazy(HandlerFactory),
    /// Owns the decision to continue.
    Next(NextFn),
    /// Needs the per-request context before it can wrap.
    Provider(ProviderFn<C>),
}

impl<C> Stage<C> {
    /// Short shape name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Action(_)   => "action",
            Self::Wrap(_)     => "wrapper",
            Self::Lazy(_)     => "lazy",
            Self::Next(_)     => "next",
            Self::Provider(_) => "provider",
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

// Derived `Clone` would require `C: Clone`; only the `Arc`s are cloned.
impl<C> Clone for Stage<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Action(h)   => Self::Action(Arc::clone(h)),
            Self::Wrap(w)     => Self::Wrap(w.clone()),
            Self::Lazy(f)     => Self::Lazy(Arc::clone(f)),
            Self::Next(f)     => Self::Next(Arc::clone(f)),
            Self::Provider(p) => Self::Provider(Arc::clone(p)),
        }
    }
}

impl<C> fmt::Debug for Stage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage::{}", self.kind())
    }
}

// ── StageInput ────────────────────────────────────────────────────────────────

/// Anything that can be handed to the composer.
pub enum StageInput<C = ()> {
    Stage(Stage<C>),
    /// An ordered group, spliced in place when the pipeline is built.
    Group(Vec<StageInput<C>>),
    /// Explicitly nothing. Skipped.
    Absent,
    /// A value with no recognised shape. Reported and skipped.
    Unsupported(Cow<'static, str>),
}

impl<C: 'static> StageInput<C> {
    /// A plain action: `Fn(&Request, &mut Response)`.
    pub fn action(handler: impl Handler) -> Self {
        Self::Stage(Stage::Action(handler.boxed()))
    }

    /// A pre-built [`Wrapper`].
    pub fn wrap(wrapper: Wrapper) -> Self {
        Self::Stage(Stage::Wrap(wrapper))
    }

    /// A zero-argument handler factory, invoked once per request.
    pub fn lazy<F, H>(factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler,
    {
        Self::Stage(Stage::Lazy(Arc::new(move || Some(factory().boxed()))))
    }

    /// A handler factory that may produce nothing for a given request.
    pub fn lazy_optional<F>(factory: F) -> Self
    where
        F: Fn() -> Option<BoxedHandler> + Send + Sync + 'static,
    {
        Self::Stage(Stage::Lazy(Arc::new(factory)))
    }

    /// An explicit-next action: `Fn(&Request, &mut Response, &dyn Handler)`.
    pub fn next<F>(action: F) -> Self
    where
        F: Fn(&Request, &mut Response, &dyn Handler) + Send + Sync + 'static,
    {
        Self::Stage(Stage::Next(Arc::new(action)))
    }

    /// A context-aware provider: `Fn(Option<Arc<C>>) -> Wrapper`.
    pub fn provider<F>(provider: F) -> Self
    where
        F: Fn(Option<Arc<C>>) -> Wrapper + Send + Sync + 'static,
    {
        Self::Stage(Stage::Provider(Arc::new(provider)))
    }

    pub fn group(inputs: impl IntoIterator<Item = StageInput<C>>) -> Self {
        Self::Group(inputs.into_iter().collect())
    }

    /// Classifies a value whose shape is only known at runtime.
    ///
    /// Already-erased values (`StageInput<C>`, `Stage<C>`, [`Wrapper`],
    /// [`BoxedHandler`], `Option` of any of those) are recognised, and so is
    /// a `Vec<StageInput<C>>`, which becomes a group. Everything else
    /// becomes [`StageInput::Unsupported`] carrying the value's type name.
    pub fn adapt_any<T: Any>(value: T) -> Self {
        let any: Box<dyn Any> = Box::new(value);
        let any = match any.downcast::<StageInput<C>>() {
            Ok(input) => return *input,
            Err(other) => other,
        };
        let any = match any.downcast::<Option<StageInput<C>>>() {
            Ok(input) => return input.unwrap_or(Self::Absent),
            Err(other) => other,
        };
        let any = match any.downcast::<Vec<StageInput<C>>>() {
            Ok(inputs) => return Self::Group(*inputs),
            Err(other) => other,
        };
        let any = match any.downcast::<Stage<C>>() {
            Ok(stage) => return Self::Stage(*stage),
            Err(other) => other,
        };
        let any = match any.downcast::<Option<Stage<C>>>() {
            Ok(stage) => return stage.map_or(Self::Absent, Self::Stage),
            Err(other) => other,
        };
        let any = match any.downcast::<Wrapper>() {
            Ok(wrapper) => return Self::wrap(*wrapper),
            Err(other) => other,
        };
        let any = match any.downcast::<BoxedHandler>() {
            Ok(handler) => return Self::Stage(Stage::Action(*handler)),
            Err(other) => other,
        };
        let any = match any.downcast::<Option<BoxedHandler>>() {
            Ok(handler) => return handler.map_or(Self::Absent, |h| Self::Stage(Stage::Action(h))),
            Err(other) => other,
        };
        match any.downcast::<Option<Wrapper>>() {
            Ok(wrapper) => wrapper.map_or(Self::Absent, Self::wrap),
            Err(_) => Self::Unsupported(Cow::Borrowed(type_name::<T>())),
        }
    }
}

impl<C> Clone for StageInput<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Stage(stage)       => Self::Stage(stage.clone()),
            Self::Group(inputs)      => Self::Group(inputs.clone()),
            Self::Absent             => Self::Absent,
            Self::Unsupported(name)  => Self::Unsupported(name.clone()),
        }
    }
}

impl<C> fmt::Debug for StageInput<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage(stage)      => stage.fmt(f),
            Self::Group(inputs)     => f.debug_list().entries(inputs).finish(),
            Self::Absent            => f.write_str("Absent"),
            Self::Unsupported(name) => write!(f, "Unsupported({name})"),
        }
    }
}

impl<C> From<Stage<C>> for StageInput<C> {
    fn from(stage: Stage<C>) -> Self {
        Self::Stage(stage)
    }
}

impl<C> From<Wrapper> for StageInput<C> {
    fn from(wrapper: Wrapper) -> Self {
        Self::Stage(Stage::Wrap(wrapper))
    }
}

impl<C> From<Vec<StageInput<C>>> for StageInput<C> {
    fn from(inputs: Vec<StageInput<C>>) -> Self {
        Self::Group(inputs)
    }
}

impl<C, T: Into<StageInput<C>>> From<Option<T>> for StageInput<C> {
    fn from(input: Option<T>) -> Self {
        input.map_or(Self::Absent, Into::into)
    }
}
