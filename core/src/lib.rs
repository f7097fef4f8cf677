//! Blocking client for a remote object-data REST API.
//!
//! # Overview
//! Talks to `https://{instance_host}/services/data/v31/` with a caller-supplied
//! bearer token and exposes describe, search, create, get, update/upsert and
//! delete. Requests and responses are untyped `serde_json::Value`s.
//!
//! # Design
//! - `SalesforceClient` is immutable after construction; the only state that
//!   changes between calls is the transport's connection pool and cookie jar.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and a
//!   decode step, with one `Transport::execute` in between, so the I/O
//!   boundary is explicit and the request side can be tested offline.
//! - No retries, no pagination, no token refresh. HTTP status codes are not
//!   interpreted; error bodies come back as ordinary JSON values.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;

pub use client::{parse_json, SalesforceClient};
pub use config::ClientBuilder;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use serde_json::Value;
pub use transport::{Transport, UreqTransport};

/// REST API version baked into the base URL.
pub const API_VERSION: u32 = 31;
