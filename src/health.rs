//! Built-in Kubernetes health-check actions.
//!
//! | Probe | Answer |
//! |---|---|
//! | **Liveness** | `ok`: the process can run a pipeline at all |
//! | **Readiness** | `ready`: replace with your own action to gate on dependencies |
//!
//! Both are plain actions, so they drop into a pipeline as its last stage:
//!
//! ```rust
//! use plumber::{Pipeline, StageInput, health, middleware, plumb};
//!
//! let healthz: Pipeline = plumb(None, [middleware::trace(), StageInput::action(health::liveness)]);
//! let readyz: Pipeline = plumb(None, [StageInput::action(health::readiness)]);
//! ```

use crate::{ContentType, Request, Response};

/// Kubernetes liveness probe action. Always writes `ok`.
pub fn liveness(_req: &Request, res: &mut Response) {
    res.set_content_type(ContentType::Text);
    res.write_str("ok");
}

/// Kubernetes readiness probe action (default implementation). Writes `ready`.
pub fn readiness(_req: &Request, res: &mut Response) {
    res.set_content_type(ContentType::Text);
    res.write_str("ready");
}
