//! Todo API on top of relais.
//!
//! Pipeline order, outermost first:
//!
//! 1. request logging, so every outcome (including 401s) is logged;
//! 2. `Authorization` header gate;
//! 3. `?culture=` selection;
//! 4. routing to the todo handlers.
//!
//! Try:
//!   curl -H 'Authorization: token123' http://localhost:3000/todos
//!   curl -H 'Authorization: token123' 'http://localhost:3000/todos?culture=fr-FR'
//!   curl -i http://localhost:3000/todos                     # 401
//!   curl http://localhost:3000/healthz

mod config;
mod todos;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use relais::middleware::{QueryCulture, RequestLogging, RequireAuthorization};
use relais::{health, Locale, Pipeline, Router, Server};
use tracing_subscriber::EnvFilter;

use crate::config::{Environment, Settings};
use crate::todos::TodoStore;

/// In-memory todo API behind a logging / auth / culture pipeline.
#[derive(Parser, Debug)]
#[command(name = "relais-todo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    /// Environment: dev, prod (overrides ENVIRONMENT)
    #[arg(short, long)]
    env: Option<Environment>,

    /// Culture requests start with, e.g. en-US (overrides DEFAULT_CULTURE)
    #[arg(long)]
    culture: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = Settings::load()?;

    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(env) = args.env {
        settings.environment = env;
    }
    if let Some(culture) = args.culture {
        settings.default_culture = Locale::parse(&culture).context("invalid --culture")?;
    }

    init_tracing(&settings);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %settings.environment,
        addr = %settings.addr(),
        "starting relais-todo"
    );

    Server::bind(&settings.addr())?
        .default_locale(settings.default_culture.clone())
        .serve(app(Arc::new(TodoStore::seeded())))
        .await
        .context("server error")?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Assembles the pipeline. Stage order is fixed here and nowhere else.
fn app(store: Arc<TodoStore>) -> Pipeline {
    let router: Router = todos::routes(store)
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness);

    Pipeline::builder()
        .stage(RequestLogging)
        .stage(RequireAuthorization::new().exempt("/healthz").exempt("/readyz"))
        .stage(QueryCulture::new())
        .build(router)
}

/// `RUST_LOG` wins over the configured level. Development gets readable
/// lines, production gets JSON.
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    match settings.environment {
        Environment::Development => tracing_subscriber::fmt().with_env_filter(filter).init(),
        Environment::Production => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

#[cfg(test)]
mod tests {
    use relais::{Method, Request, StatusCode};

    use super::*;

    #[test]
    fn stages_run_logging_then_auth_then_culture() {
        let app = app(Arc::new(TodoStore::seeded()));
        assert_eq!(app.stage_names(), ["logging", "authentication", "culture"]);
    }

    #[tokio::test]
    async fn health_checks_skip_auth_but_todos_do_not() {
        let app = app(Arc::new(TodoStore::seeded()));

        let res = app.handle(Request::new(Method::Get, "/healthz")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"ok");

        let res = app.handle(Request::new(Method::Get, "/todos")).await;
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bad_culture_is_a_server_error() {
        let app = app(Arc::new(TodoStore::seeded()));
        let req = Request::new(Method::Get, "/todos?culture=not-a-locale")
            .with_header("Authorization", "token123");

        let res = app.handle(req).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
