//! Minimal plumber example: shared stage groups, a per-request context and
//! an explicit-next guard in front of a JSON action.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -H 'authorization: Bearer demo' http://localhost:3000/users/42
//!   curl -H 'x-real-ip: 203.0.113.7' http://localhost:3000/healthz

use std::sync::Arc;
use std::time::Instant;

use http::StatusCode;
use plumber::middleware::{self, Plumber, Wrapper};
use plumber::{BoxedHandler, ContentType, Handler, Request, Response, Server, StageInput, health};

/// Per-request state, built only when a stage asks for it.
struct RequestState {
    started: Instant,
    user: Option<String>,
}

fn common<C: 'static>() -> StageInput<C> {
    StageInput::group([middleware::trace(), middleware::recover()])
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Plumber::with_context(|req: &Request, res: &mut Response| {
        res.set_header("x-served-by", "plumber");
        RequestState {
            started: Instant::now(),
            user: req.header("authorization")
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_owned),
        }
    })
    .stage(common())
    .next(|req: &Request, res: &mut Response, next: &dyn Handler| {
        if req.path() == "/healthz" {
            return health::liveness(req, res);
        }
        next.process(req, res);
    })
    .provider(require_user)
    .provider(timing)
    .action(get_user)
    .build();

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// 401 unless the context found a bearer token.
fn require_user(ctx: Option<Arc<RequestState>>) -> Wrapper {
    Wrapper::new(move |next: BoxedHandler| {
        let ctx = ctx.clone();
        (move |req: &Request, res: &mut Response| {
            match ctx.as_ref().and_then(|s| s.user.as_ref()) {
                Some(_) => next.process(req, res),
                None => res.set_status(StatusCode::UNAUTHORIZED),
            }
        })
        .boxed()
    })
}

// Adds a server-timing header once everything downstream has run.
fn timing(ctx: Option<Arc<RequestState>>) -> Wrapper {
    Wrapper::new(move |next: BoxedHandler| {
        let ctx = ctx.clone();
        (move |req: &Request, res: &mut Response| {
            next.process(req, res);
            if let Some(state) = &ctx {
                let micros = state.started.elapsed().as_micros();
                res.set_header("server-timing", &format!("app;dur={}", micros as f64 / 1000.0));
            }
        })
        .boxed()
    })
}

// GET /users/:id, the id is simply the last path segment.
fn get_user(req: &Request, res: &mut Response) {
    let id = req.path().rsplit('/').next().unwrap_or("unknown");
    res.set_content_type(ContentType::Json);
    res.write(format!(r#"{{"id":"{id}","name":"alice"}}"#).as_bytes());
}
