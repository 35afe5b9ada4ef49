//! Shared S3 model types for s3gate.
//!
//! - [`error`]: the S3 error taxonomy ([`S3ErrorCode`], [`S3Error`]) with fixed
//!   HTTP status and message per code.
//! - [`operations`]: the [`S3Operation`] identifiers the router resolves to.
//! - [`types`]: entities that appear in listings and request documents.
//! - [`input`] / [`output`]: the XML documents read from request bodies and
//!   written to response bodies.

pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use error::{S3Error, S3ErrorCode};
pub use operations::S3Operation;
