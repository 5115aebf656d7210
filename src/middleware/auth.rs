//! Authorization-header gate.
//!
//! Rejects requests that carry no `Authorization` header with
//! `401 Unauthorized`. This is a presence check: the header's value is never
//! inspected, so any value (even an empty one) lets the request through.
//! Put real credential validation in a stage of its own.

use http::StatusCode;
use tracing::debug;

use super::{Flow, Stage};
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

/// Body of the `401` sent when the header is missing.
pub const MISSING_AUTHORIZATION: &str = "Authorization Header Missing";

pub struct RequireAuthorization {
    header: String,
    exempt: Vec<String>,
}

impl RequireAuthorization {
    pub fn new() -> Self {
        Self { header: "Authorization".to_owned(), exempt: Vec::new() }
    }

    /// Checks for `name` instead of `Authorization`. Matching is case-insensitive.
    pub fn with_header(mut self, name: impl Into<String>) -> Self {
        self.header = name.into();
        self
    }

    /// Lets requests for exactly `path` through without the check
    /// (health checks, typically).
    pub fn exempt(mut self, path: impl Into<String>) -> Self {
        self.exempt.push(path.into());
        self
    }
}

impl Default for RequireAuthorization {
    fn default() -> Self { Self::new() }
}

impl Stage for RequireAuthorization {
    fn name(&self) -> &'static str { "authentication" }

    fn before(&self, req: &mut Request) -> Result<Flow, Error> {
        if req.header(&self.header).is_some() || self.exempt.iter().any(|p| p == req.path()) {
            return Ok(Flow::Continue);
        }

        debug!(header = %self.header, path = %req.path(), "rejecting request without credentials");
        Ok(Flow::Respond(
            Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .text(MISSING_AUTHORIZATION),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;

    fn run(stage: &RequireAuthorization, req: Request) -> Flow {
        let mut req = req;
        stage.before(&mut req).unwrap()
    }

    #[test]
    fn missing_header_is_401_with_fixed_body() {
        let flow = run(&RequireAuthorization::new(), Request::new(Method::Get, "/todos"));

        let Flow::Respond(res) = flow else { panic!("expected a response") };
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.body(), MISSING_AUTHORIZATION.as_bytes());
    }

    #[test]
    fn any_value_passes_including_empty() {
        let stage = RequireAuthorization::new();
        for value in ["token123", "", "garbage"] {
            let req = Request::new(Method::Get, "/todos").with_header("authorization", value);
            assert!(matches!(run(&stage, req), Flow::Continue), "value {value:?}");
        }
    }

    #[test]
    fn exempt_paths_and_custom_header() {
        let stage = RequireAuthorization::new().with_header("X-Api-Key").exempt("/healthz");

        assert!(matches!(run(&stage, Request::new(Method::Get, "/healthz")), Flow::Continue));
        assert!(matches!(
            run(&stage, Request::new(Method::Get, "/todos").with_header("Authorization", "t")),
            Flow::Respond(_)
        ));
        assert!(matches!(
            run(&stage, Request::new(Method::Get, "/todos").with_header("x-api-key", "k")),
            Flow::Continue
        ));
    }
}
