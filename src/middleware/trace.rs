//! Per-request access log.

use std::time::Instant;

use tracing::info;

use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;

use super::stage::StageInput;

/// Client address set by the reverse proxy. Checked first.
pub const X_REAL_IP: &str = "x-real-ip";

/// Proxy hop list; its first entry is used when `X-Real-IP` is missing.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// A stage that emits one `info` event per request once everything
/// downstream has returned: peer, method, path, status and latency.
///
/// Place it first so the latency covers the whole chain.
pub fn trace<C: 'static>() -> StageInput<C> {
    StageInput::next(|req: &Request, res: &mut Response, next: &dyn Handler| {
        let start = Instant::now();
        next.process(req, res);
        let peer = client_addr(req);
        info!(
            peer = peer.as_deref().unwrap_or("-"),
            method = %req.method(),
            path = req.path(),
            status = res.status().as_u16(),
            elapsed = ?start.elapsed(),
            "request"
        );
    })
}

/// The client address as seen through the reverse proxy.
///
/// `X-Real-IP` wins, then the first hop of `X-Forwarded-For`, then the
/// socket peer.
pub(crate) fn client_addr(req: &Request) -> Option<String> {
    if let Some(ip) = req.header(X_REAL_IP).filter(|v| !v.is_empty()) {
        return Some(ip.to_owned());
    }
    if let Some(first) = req.header(X_FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(first.to_owned());
    }
    req.peer().map(|addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{Pipeline, plumb};

    #[test]
    fn real_ip_takes_precedence() {
        let req = Request::builder()
            .header("X-Forwarded-For", "10.0.0.2")
            .header("X-Real-IP", "10.0.0.1")
            .peer("127.0.0.1:9000".parse().unwrap())
            .build();
        assert_eq!(client_addr(&req).as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn first_forwarded_hop_is_used() {
        let req = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.2")
            .build();
        assert_eq!(client_addr(&req).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn socket_peer_is_the_fallback() {
        let req = Request::builder().peer("192.0.2.4:443".parse().unwrap()).build();
        assert_eq!(client_addr(&req).as_deref(), Some("192.0.2.4"));
        assert_eq!(client_addr(&Request::builder().build()), None);
    }

    #[test]
    fn trace_is_transparent_to_the_chain() {
        let pipeline: Pipeline = plumb(None, [
            trace(),
            StageInput::action(|_: &Request, res: &mut Response| res.write_str("body")),
        ]);
        let mut res = Response::new();
        pipeline.process(&Request::builder().build(), &mut res);
        assert_eq!(res.body(), b"body");
    }
}
