//! Liveness and readiness check handlers.
//!
//! | Check | Conventional path | Body |
//! |---|---|---|
//! | liveness  | `/healthz` | `ok`    |
//! | readiness | `/readyz`  | `ready` |
//!
//! Health checks usually run without credentials, so exempt their paths from
//! [`RequireAuthorization`](crate::middleware::RequireAuthorization):
//!
//! ```rust
//! use relais::middleware::{Pipeline, RequireAuthorization};
//! use relais::{health, Router};
//!
//! let app = Pipeline::builder()
//!     .stage(RequireAuthorization::new().exempt("/healthz").exempt("/readyz"))
//!     .build(
//!         Router::new()
//!             .get("/healthz", health::liveness)
//!             .get("/readyz", health::readiness),
//!     );
//! ```

use crate::{Request, Response};

/// Always `200 OK` with body `"ok"`: if the process answers HTTP at all, it is alive.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"`. Replace it with your own handler when
/// readiness depends on downstream services.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
