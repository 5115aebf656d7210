//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown
//!
//! On SIGTERM (or Ctrl-C during local development) the server:
//! 1. stops calling `listener.accept()`, so no new connections are made;
//! 2. lets every in-flight connection task run to completion;
//! 3. returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::locale::Locale;
use crate::middleware::Pipeline;
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    default_locale: Locale,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use relais::Server;
    ///
    /// assert!(Server::bind("0.0.0.0:3000").is_ok());
    /// assert!(Server::bind("localhost").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|source| Error::InvalidAddress {
            addr: addr.to_owned(),
            source,
        })?;
        Ok(Self { addr, default_locale: Locale::invariant() })
    }

    /// Locale every request starts with, before any stage changes it.
    pub fn default_locale(mut self, locale: Locale) -> Self {
        self.default_locale = locale;
        self
    }

    /// Starts accepting connections and running each request through `app`.
    ///
    /// `app` is a [`Pipeline`] or a bare [`Router`](crate::Router).
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, app: impl Into<Pipeline>) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let pipeline = Arc::new(app.into());
        let default_locale = Arc::new(self.default_locale);

        info!(
            addr = %self.addr,
            stages = ?pipeline.stage_names(),
            culture = %default_locale,
            "relais listening"
        );

        // Every connection task lives here so shutdown can wait for them.
        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting
                // immediately, even with connections queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let pipeline = Arc::clone(&pipeline);
                    let default_locale = Arc::clone(&default_locale);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                            let pipeline = Arc::clone(&pipeline);
                            let locale = Locale::clone(&default_locale);
                            async move { dispatch(&pipeline, req, locale).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("relais stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Converts one wire request, runs it through the pipeline and converts the
/// response back. Never fails: conversion problems become `405` / `400`.
async fn dispatch<B>(
    pipeline: &Pipeline,
    req: http::Request<B>,
    locale: Locale,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    let response = match Request::from_http(req, locale).await {
        Ok(req) => pipeline.handle(req).await,
        Err(Error::UnsupportedMethod(m)) => {
            debug!(method = %m.0, "rejecting unsupported method");
            Response::status(StatusCode::METHOD_NOT_ALLOWED)
        }
        Err(e) => {
            debug!("unreadable request: {e}");
            Response::status(StatusCode::BAD_REQUEST)
        }
    };

    Ok(response.into_http())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C
/// is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;
    use crate::middleware::{QueryCulture, RequireAuthorization};
    use crate::Router;

    fn pipeline() -> Pipeline {
        Pipeline::builder()
            .stage(RequireAuthorization::new())
            .stage(QueryCulture::new())
            .build(Router::new().get("/price", |req: Request| async move {
                req.locale().format_decimal(1234.5, 2)
            }))
    }

    async fn send(req: http::Request<Full<Bytes>>, locale: Locale) -> (StatusCode, Bytes) {
        let res = dispatch(&pipeline(), req, locale).await.unwrap();
        let status = res.status();
        (status, res.into_body().collect().await.unwrap().to_bytes())
    }

    fn get(uri: &str) -> http::request::Builder {
        http::Request::builder().method("GET").uri(uri)
    }

    #[tokio::test]
    async fn seeds_default_locale_and_lets_query_override_it() {
        let de = Locale::parse("de-DE").unwrap();
        let req = get("/price").header("authorization", "t").body(Full::default()).unwrap();
        assert_eq!(send(req, de.clone()).await, (StatusCode::OK, Bytes::from("1.234,50")));

        let req = get("/price?culture=en-US").header("authorization", "t").body(Full::default()).unwrap();
        assert_eq!(send(req, de).await, (StatusCode::OK, Bytes::from("1,234.50")));
    }

    #[tokio::test]
    async fn unsupported_method_is_405() {
        let req = http::Request::builder().method("PURGE").uri("/price").body(Full::default()).unwrap();
        let (status, _) = send(req, Locale::invariant()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn bind_rejects_bad_addresses() {
        let err = Server::bind("not an address").err().unwrap();
        assert!(matches!(err, Error::InvalidAddress { ref addr, .. } if addr == "not an address"));
    }
}
