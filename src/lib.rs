//! # relais
//!
//! A minimal HTTP framework whose request handling is an explicit, ordered
//! middleware pipeline in front of a radix-tree router.
//!
//! - Routing via [`matchit`], one tree per method
//! - Stages with `before` / `after` hooks and an explicit [`Flow`] outcome,
//!   walked by index, inspectable with [`Pipeline::stage_names`]
//! - Request-scoped [`Locale`]: culture never leaks between requests
//! - hyper underneath, HTTP/1.1 and HTTP/2, graceful shutdown on SIGTERM
//!
//! Built-in stages live in [`middleware`]: request logging, an
//! authorization-header gate and query-string culture selection.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use relais::middleware::{QueryCulture, RequestLogging, RequireAuthorization};
//! use relais::{Pipeline, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), relais::Error> {
//!     let app = Pipeline::builder()
//!         .stage(RequestLogging)
//!         .stage(RequireAuthorization::new())
//!         .stage(QueryCulture::new())
//!         .build(Router::new().get("/total", total));
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn total(req: Request) -> Response {
//!     Response::text(req.locale().format_decimal(1234.5, 2))
//! }
//! ```

mod error;
mod handler;
mod locale;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod health;
pub mod middleware;

pub use error::{Error, Result};
pub use handler::Handler;
pub use http::StatusCode;
pub use locale::Locale;
pub use method::{Method, UnknownMethod};
pub use middleware::{Flow, Pipeline, RequestHead, Stage};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
