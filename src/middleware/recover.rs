//! Panic recovery.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use http::StatusCode;
use tracing::error;

use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;

use super::stage::StageInput;

/// A stage that catches a panic raised anywhere downstream of it.
///
/// The panic is logged at `error` and the response status becomes
/// `500 Internal Server Error`. Whatever was written before the panic stays
/// in the body. Stages upstream of `recover` are not protected.
pub fn recover<C: 'static>() -> StageInput<C> {
    StageInput::next(|req: &Request, res: &mut Response, next: &dyn Handler| {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| next.process(req, res)));
        if let Err(payload) = outcome {
            error!(
                method = %req.method(),
                path = req.path(),
                panic = panic_message(payload.as_ref()),
                "recovered from panic in pipeline"
            );
            res.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
