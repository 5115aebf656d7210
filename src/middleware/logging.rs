//! Request/response logging.
//!
//! Emits `Incoming Request: {method} {path}` before anything downstream runs
//! and `Outgoing Response: {status}` once the response is final. Place it
//! first in the pipeline so it also sees requests that later stages reject.

use tracing::{error, info, warn};

use super::{Flow, RequestHead, Stage};
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

#[derive(Clone, Copy, Debug, Default)]
pub struct RequestLogging;

impl Stage for RequestLogging {
    fn name(&self) -> &'static str { "logging" }

    fn before(&self, req: &mut Request) -> Result<Flow, Error> {
        info!(
            method = %req.method(),
            path = %req.path(),
            "Incoming Request: {} {}",
            req.method(),
            req.path()
        );
        Ok(Flow::Continue)
    }

    fn after(&self, head: &RequestHead, res: &mut Response) {
        let status = res.status_code();
        let code = status.as_u16();
        let latency_ms = head.elapsed().as_secs_f64() * 1000.0;

        if status.is_server_error() {
            error!(status = code, latency_ms, path = %head.path(), "Outgoing Response: {code}");
        } else if status.is_client_error() {
            warn!(status = code, latency_ms, path = %head.path(), "Outgoing Response: {code}");
        } else {
            info!(status = code, latency_ms, path = %head.path(), "Outgoing Response: {code}");
        }
    }
}
