//! S3 HTTP front end for s3gate.
//!
//! This crate turns HTTP requests into calls on pluggable storage
//! controllers and renders their results as S3 wire responses:
//!
//! - **Routing** ([`router`]): an ordered route table keyed on method, path
//!   shape and required query parameters. Sub-resource routes (`?acl`,
//!   `?uploads`, ...) are registered ahead of the plain object routes.
//! - **Service** ([`service`]): [`S3GateService`] implements hyper's `Service`,
//!   running routing, SigV4 authentication, dispatch and common headers.
//! - **Controllers** ([`controller`]): the four capability traits an embedder
//!   implements, gathered by the [`S3Gate`] builder.
//! - **Bodies** ([`body`]): [`RequestBody`] verifies `Content-MD5`,
//!   `x-amz-content-sha256` and chunk signatures while it is read.
//! - **Server** ([`server`]): the connection accept loop and tracing setup.
//!
//! # Request flow
//!
//! ```text
//! HTTP Request
//!   -> S3GateService (hyper Service)
//!     -> Router (405 / 404 / InvalidBucketName)
//!     -> SigV4 verifier or custom_auth (when an Auth is configured)
//!     -> handler (parse query/body, call controller, render)
//!     -> common headers (x-amz-request-id, x-amz-id-2, Server)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use s3gate_http::{S3Gate, S3GateConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = S3GateConfig::from_env();
//! s3gate_http::server::init_tracing(&config.log_level)?;
//!
//! let listener = tokio::net::TcpListener::bind(&config.listen).await?;
//! let service = S3Gate::new().into_service(config);
//! s3gate_http::server::serve(listener, service, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await
//! # }
//! ```

// S3Error is the client-facing error of every handler. Boxing it in each
// Result would only add indirection on the request path.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod config;
pub mod context;
pub mod controller;
mod handlers;
pub mod response;
pub mod router;
pub mod server;
pub mod service;

pub use body::{BodyError, BodyProbe, RequestBody, S3ResponseBody};
pub use config::S3GateConfig;
pub use context::RequestContext;
pub use controller::{
    BucketController, MultipartController, ObjectController, S3Gate, ServiceController,
    UnimplementedController,
};
pub use router::Router;
pub use service::S3GateService;
