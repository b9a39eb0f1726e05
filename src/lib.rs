//! # plumber
//!
//! Compose request handlers of different shapes into one ordered pipeline.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! plumber owns one thing: the order in which stages run and the value they
//! share for the length of one request. Routing, protocol parsing, retries
//! and persistence belong to somebody else.
//!
//! - **Any shape**: plain actions, decorator-style wrappers, lazily built
//!   handlers and explicit-next stages live side by side in one list
//! - **Groups**: nested stage lists are flattened in order, so common
//!   stages are plain values you reuse
//! - **Context**: an optional per-request value, built at most once and only
//!   when a stage that needs it is actually reached
//! - **Forgiving**: absent or unsupported stages are skipped, never fatal
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use plumber::middleware::{self, Plumber, Wrapper};
//! use plumber::{BoxedHandler, Handler, Request, Response, Server};
//!
//! #[derive(Default)]
//! struct Visits(AtomicUsize);
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Plumber::with_context(|_req: &Request, _res: &mut Response| Visits::default())
//!         .stage(middleware::trace())
//!         .stage(middleware::recover())
//!         .provider(count)
//!         .action(hello)
//!         .build();
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! fn count(ctx: Option<Arc<Visits>>) -> Wrapper {
//!     Wrapper::new(move |next: BoxedHandler| {
//!         let ctx = ctx.clone();
//!         (move |req: &Request, res: &mut Response| {
//!             if let Some(visits) = &ctx {
//!                 visits.0.fetch_add(1, Ordering::Relaxed);
//!             }
//!             next.process(req, res);
//!         })
//!         .boxed()
//!     })
//! }
//!
//! fn hello(_req: &Request, res: &mut Response) {
//!     res.write_str("hello");
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod server;

pub mod health;
pub mod middleware;

pub use error::Error;
pub use handler::{BoxedHandler, Handler, noop};
pub use middleware::{Pipeline, Plumber, Stage, StageInput, Wrapper, plumb};
pub use request::{Request, RequestBuilder};
pub use response::{ContentType, Response};
pub use server::Server;
