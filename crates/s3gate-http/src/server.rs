//! Connection accept loop and tracing setup for embedding binaries.

use std::future::Future;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::service::S3GateService;

/// Initialize the global tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise `log_level`.
///
/// # Errors
///
/// Fails if `log_level` is not a valid filter directive.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("tracing subscriber already installed")
}

/// Serve HTTP/1 and HTTP/2 connections on `listener` until `shutdown`
/// resolves, then wait for in-flight connections to finish.
///
/// # Errors
///
/// Accept failures are logged and skipped, so this currently always returns
/// `Ok` once drained.
pub async fn serve(
    listener: TcpListener,
    service: S3GateService,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let graceful = GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let conn = http.serve_connection(TokioIo::new(stream), service.clone());
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down, draining connections");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained");
    Ok(())
}
