//! REST client for the remote object-data API.
//!
//! # Design
//! `SalesforceClient` holds an immutable base URL and header set plus a
//! `Transport`. Each operation is split into a `build_*` method that produces
//! an `HttpRequest` and a decode step that consumes the `HttpResponse`; the
//! public operations glue the two together around exactly one round trip.
//!
//! Payloads are untyped `serde_json::Value`s. Status codes are never
//! inspected: whatever JSON the server sends back, error bodies included, is
//! returned as a successful result.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::config::ClientBuilder;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};

/// Blocking client for one API instance and one bearer token.
///
/// The header set is built once at construction and only read afterwards, so
/// a client can be shared across threads as long as its transport can.
#[derive(Clone)]
pub struct SalesforceClient<T = UreqTransport> {
    base_url: String,
    headers: Vec<(String, String)>,
    transport: T,
}

impl SalesforceClient<UreqTransport> {
    /// Client for `https://{instance_host}/services/data/v31/` with a fresh
    /// cookie jar.
    pub fn new(instance_host: &str, bearer_token: &str) -> Self {
        ClientBuilder::new(instance_host, bearer_token).build()
    }

    pub fn builder(instance_host: &str, bearer_token: &str) -> ClientBuilder {
        ClientBuilder::new(instance_host, bearer_token)
    }
}

impl<T> SalesforceClient<T> {
    pub(crate) fn from_parts(base_url: String, bearer_token: &str, transport: T) -> Self {
        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), format!("Bearer {bearer_token}")),
        ];
        Self {
            base_url,
            headers,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn build_describe(&self) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{}sobjects", self.base_url), None)
    }

    /// The encoded query is appended as a path segment (`search/q=...`), not
    /// as a `?` query string. Spaces encode as `%20`.
    pub fn build_search(&self, query: &str) -> HttpRequest {
        let url = format!("{}search/q={}", self.base_url, urlencoding::encode(query));
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_create<D>(&self, object_name: &str, data: &D) -> Result<HttpRequest, ApiError>
    where
        D: Serialize + ?Sized,
    {
        let body = serde_json::to_string(data).map_err(ApiError::Encode)?;
        Ok(self.request(
            HttpMethod::Post,
            format!("{}{object_name}", self.base_url),
            Some(body),
        ))
    }

    pub fn build_get(&self, object_name: &str, record_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, self.record_url(object_name, record_id), None)
    }

    /// Shared by `update` and `upsert`.
    pub fn build_update<D>(
        &self,
        object_name: &str,
        record_id: &str,
        data: &D,
    ) -> Result<HttpRequest, ApiError>
    where
        D: Serialize + ?Sized,
    {
        let body = serde_json::to_string(data).map_err(ApiError::Encode)?;
        Ok(self.request(
            HttpMethod::Patch,
            self.record_url(object_name, record_id),
            Some(body),
        ))
    }

    pub fn build_delete(&self, object_name: &str, record_id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, self.record_url(object_name, record_id), None)
    }

    fn record_url(&self, object_name: &str, record_id: &str) -> String {
        format!("{}{object_name}/{record_id}", self.base_url)
    }

    fn request(&self, method: HttpMethod, url: String, body: Option<String>) -> HttpRequest {
        HttpRequest {
            method,
            url,
            headers: self.headers.clone(),
            body,
        }
    }
}

impl<T: Transport> SalesforceClient<T> {
    /// List every object type available on the instance.
    pub fn describe(&self) -> Result<Value, ApiError> {
        self.fetch_json(&self.build_describe())
    }

    pub fn search(&self, query: &str) -> Result<Value, ApiError> {
        self.fetch_json(&self.build_search(query))
    }

    pub fn create<D>(&self, object_name: &str, data: &D) -> Result<Value, ApiError>
    where
        D: Serialize + ?Sized,
    {
        self.fetch_json(&self.build_create(object_name, data)?)
    }

    pub fn get(&self, object_name: &str, record_id: &str) -> Result<Value, ApiError> {
        self.fetch_json(&self.build_get(object_name, record_id))
    }

    /// Alias of [`update`](Self::update); both issue the same PATCH.
    pub fn upsert<D>(&self, object_name: &str, record_id: &str, data: &D) -> Result<Value, ApiError>
    where
        D: Serialize + ?Sized,
    {
        self.update(object_name, record_id, data)
    }

    pub fn update<D>(&self, object_name: &str, record_id: &str, data: &D) -> Result<Value, ApiError>
    where
        D: Serialize + ?Sized,
    {
        self.fetch_json(&self.build_update(object_name, record_id, data)?)
    }

    /// The response is discarded whatever its status or body.
    pub fn delete(&self, object_name: &str, record_id: &str) -> Result<(), ApiError> {
        self.transport
            .execute_discarding(&self.build_delete(object_name, record_id))
    }

    fn fetch_json(&self, request: &HttpRequest) -> Result<Value, ApiError> {
        let response = self.transport.execute(request)?;
        parse_json(response)
    }
}

impl<T> fmt::Debug for SalesforceClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Decode a response body into a generic JSON value without looking at the
/// status code. Anything that is not a JSON document, an empty body or
/// non-UTF-8 bytes included, is a `Decode` error.
pub fn parse_json(response: HttpResponse) -> Result<Value, ApiError> {
    serde_json::from_slice(&response.body).map_err(ApiError::Decode)
}
