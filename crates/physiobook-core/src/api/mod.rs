//! REST API client module for the booking platform.
//!
//! This module provides the `ApiClient` for communicating with the
//! backend, plus the middleware pipeline that attaches the bearer token
//! from storage to every request and tears the session down when the
//! server rejects it with 401/403.
//!
//! Every endpoint returns a `{success, message, data}` envelope which is
//! decoded exactly once, at this boundary; callers only ever see
//! `Result<T, ApiError>`.

pub mod client;
pub mod envelope;
pub mod error;
pub mod http;
pub mod middleware;

pub use client::{ApiClient, Identifier};
pub use error::ApiError;
pub use http::HttpClient;
pub use middleware::{BearerAuth, RequestLayer, ResponseLayer, SessionGuard, StaticBearer};
