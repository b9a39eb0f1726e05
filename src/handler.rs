//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A pipeline holds handlers of *different* concrete types in one sequence.
//! Rust collections can only hold one concrete type, so every handler is
//! erased behind a trait object and shared through an `Arc`:
//!
//! ```text
//! fn hello(req: &Request, res: &mut Response) { … }   ← user writes this
//!        ↓ Plumber::new().action(hello)
//! hello.boxed()                                      ← Handler blanket impl
//!        ↓
//! Arc::new(hello)                                    ← heap-allocated, shared
//!        ↓  stored as BoxedHandler = Arc<dyn Handler>
//! handler.process(&req, &mut res)  at request time   ← one vtable dispatch
//! ```
//!
//! The only runtime cost per stage is **one Arc clone** (atomic inc) +
//! **one virtual call**.

use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

/// A unit of work: given a request and a response sink, perform side effects.
///
/// Implemented automatically for every function or closure with the
/// signature:
///
/// ```text
/// Fn(&Request, &mut Response)
/// ```
///
/// There is no return value. Completion is observed only through what the
/// handler wrote to the [`Response`].
pub trait Handler: Send + Sync + 'static {
    fn process(&self, req: &Request, res: &mut Response);

    /// Erases `self` into a [`BoxedHandler`].
    fn boxed(self) -> BoxedHandler
    where
        Self: Sized,
    {
        Arc::new(self)
    }
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

impl<F> Handler for F
where
    F: Fn(&Request, &mut Response) + Send + Sync + 'static,
{
    fn process(&self, req: &Request, res: &mut Response) {
        self(req, res)
    }
}

// ── No-op terminal ────────────────────────────────────────────────────────────

/// The handler that ends every chain: it does nothing.
struct Noop;

impl Handler for Noop {
    fn process(&self, _req: &Request, _res: &mut Response) {}
}

/// Returns the no-op terminal handler.
pub fn noop() -> BoxedHandler {
    Arc::new(Noop)
}
