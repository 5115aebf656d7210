//! Middleware pipeline.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s in front of a [`Router`].
//! It is assembled once at startup and never changes afterwards. For each
//! request it walks the list front to back with an explicit index:
//!
//! ```text
//!   before[0] → before[1] → … → before[n-1] → router
//!                  │ Respond / Err
//!                  ▼
//!   after[0]  ← after[1]  ← … ← after[n-1]  ← response
//! ```
//!
//! A stage's `before` hook returns a [`Flow`]: `Continue` hands the request to
//! the next stage, `Respond` answers immediately and nothing further down the
//! list runs. Returning `Err` is a fault: the request is answered with `500`.
//! In every case the `after` hooks run in reverse order for each stage whose
//! `before` ran, including the one that answered, so an outer logging stage
//! always observes the final status.
//!
//! The terminal handler runs on its own task; a panic there becomes a `500`
//! instead of taking the connection down.
//!
//! # Cancellation
//!
//! If the future returned by [`Pipeline::handle`] is dropped before it
//! completes (typically because the client disconnected), the handler task is
//! aborted with it and no `after` hook runs. Such a request therefore has an
//! `Incoming Request` line but no `Outgoing Response` line.

mod auth;
mod culture;
mod logging;

pub use auth::{RequireAuthorization, MISSING_AUTHORIZATION};
pub use culture::QueryCulture;
pub use logging::RequestLogging;

use std::time::{Duration, Instant};

use http::StatusCode;
use tokio::task::JoinHandle;
use tracing::error;

use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// Outcome of a stage's `before` hook.
#[derive(Debug)]
pub enum Flow {
    /// Hand the request to the next stage (or the router).
    Continue,
    /// Answer now; later stages and the router are skipped.
    Respond(Response),
}

/// One link in the pipeline.
///
/// Stages are shared by every in-flight request, so they must not keep
/// per-request state in `self`. Anything a stage needs between `before` and
/// `after` is either on the [`Request`] or in the [`RequestHead`].
pub trait Stage: Send + Sync + 'static {
    /// Short name used in logs and [`Pipeline::stage_names`].
    fn name(&self) -> &'static str;

    /// Runs on the way in, in pipeline order.
    ///
    /// Return [`Flow::Continue`] to pass the request on, possibly after
    /// modifying it, or [`Flow::Respond`] to answer it here and skip every
    /// later stage and the router. An `Err` aborts the request with an empty
    /// `500`. The `after` hook of this stage and of every earlier one still
    /// runs in all three cases.
    fn before(&self, req: &mut Request) -> Result<Flow, Error>;

    /// Runs on the way out, in reverse order, for every stage whose `before`
    /// was called. May rewrite the response.
    fn after(&self, _head: &RequestHead, _res: &mut Response) {}
}

/// What `after` hooks know about the request once it has been consumed.
#[derive(Clone, Debug)]
pub struct RequestHead {
    method: Method,
    path: String,
    received_at: Instant,
}

impl RequestHead {
    fn of(req: &Request) -> Self {
        Self {
            method: req.method(),
            path: req.path().to_owned(),
            received_at: Instant::now(),
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }

    /// Time since the pipeline started on this request.
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }
}

/// Ordered stages plus the terminal router.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    router: Router,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder { stages: Vec::new() }
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs one request through every stage and the router.
    pub async fn handle(&self, mut req: Request) -> Response {
        let head = RequestHead::of(&req);
        let mut entered = 0;

        let mut res = loop {
            let Some(stage) = self.stages.get(entered) else {
                break self.route(req).await;
            };
            entered += 1;

            match stage.before(&mut req) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Respond(res)) => break res,
                Err(e) => {
                    error!(
                        stage = stage.name(),
                        method = %head.method,
                        path = %head.path,
                        "stage failed: {e}"
                    );
                    break Response::status(StatusCode::INTERNAL_SERVER_ERROR);
                }
            }
        };

        for stage in self.stages[..entered].iter().rev() {
            stage.after(&head, &mut res);
        }
        res
    }

    async fn route(&self, mut req: Request) -> Response {
        let Some((handler, params)) = self.router.lookup(req.method(), req.path()) else {
            return Response::status(StatusCode::NOT_FOUND);
        };
        req.set_params(params);

        let method = req.method();
        let path = req.path().to_owned();
        let mut task = AbortOnDrop(tokio::spawn(handler.call(req)));
        match (&mut task.0).await {
            Ok(res) => res,
            Err(e) => {
                let e = Error::from(e);
                error!(method = %method, path = %path, "{e}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Aborts the handler task when the request future is dropped first.
struct AbortOnDrop(JoinHandle<Response>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl From<Router> for Pipeline {
    fn from(router: Router) -> Self {
        Pipeline::builder().build(router)
    }
}

/// Collects stages in execution order. Obtain via [`Pipeline::builder`].
///
/// ```rust
/// use relais::middleware::{Pipeline, QueryCulture, RequestLogging, RequireAuthorization};
/// use relais::Router;
///
/// let pipeline = Pipeline::builder()
///     .stage(RequestLogging)
///     .stage(RequireAuthorization::new())
///     .stage(QueryCulture::new())
///     .build(Router::new());
///
/// assert_eq!(pipeline.stage_names(), ["logging", "authentication", "culture"]);
/// ```
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineBuilder {
    /// Appends a stage. Earlier stages wrap later ones.
    pub fn stage(mut self, stage: impl Stage) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn build(self, router: Router) -> Pipeline {
        Pipeline { stages: self.stages, router }
    }
}
