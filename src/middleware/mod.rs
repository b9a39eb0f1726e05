//! Middleware layer.
//!
//! A pipeline is an ordered list of stages. Each stage does some work
//! before, after, or instead of the stages behind it. Stages come in five
//! shapes, and any mix of them can be handed to [`plumb`]:
//!
//! | Shape | Signature | Continues to `next` |
//! |---|---|---|
//! | action | `Fn(&Request, &mut Response)` | always, afterwards |
//! | wrapper | `Fn(BoxedHandler) -> BoxedHandler` | however it decides |
//! | lazy | `Fn() -> impl Handler` | always, afterwards |
//! | next | `Fn(&Request, &mut Response, &dyn Handler)` | only if it calls `next` |
//! | provider | `Fn(Option<Arc<C>>) -> Wrapper` | per the wrapper it returns |
//!
//! Groups nest to any depth and are spliced in order, so shared stages can
//! be kept in ordinary values and reused:
//!
//! ```rust
//! use plumber::middleware::{self, StageInput, plumb};
//! use plumber::{Pipeline, Request, Response};
//!
//! fn common<C: 'static>() -> StageInput<C> {
//!     StageInput::group([middleware::trace(), middleware::recover()])
//! }
//!
//! fn index(_req: &Request, res: &mut Response) {
//!     res.write_str("index");
//! }
//!
//! let api: Pipeline = plumb(None, [common(), StageInput::action(index)]);
//! ```
//!
//! Built-in stages:
//! - [`trace()`]: per-request event with peer, method, path, status, latency
//! - [`recover()`]: turns a downstream panic into `500`

mod adapt;
mod context;
mod flatten;
mod plumb;
pub(crate) mod recover;
mod stage;
mod trace;

pub use adapt::without_context;
pub use context::{ContextFactory, context_factory};
pub use flatten::flatten;
pub use plumb::{Pipeline, Plumber, plumb};
pub use recover::recover;
pub use stage::{HandlerFactory, NextFn, ProviderFn, Stage, StageInput, Wrapper};
pub use trace::{X_FORWARDED_FOR, X_REAL_IP, trace};
