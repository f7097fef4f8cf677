//! Executes `HttpRequest` values over the network.
//!
//! # Design
//! `Transport` is the single seam between request building and the wire.
//! `UreqTransport` is the blocking default: one `ureq::Agent` per client, so
//! connections and cookies are pooled per client instance. Status codes are
//! never turned into errors; a 404 comes back as an `HttpResponse` like any
//! other.

use std::time::Duration;

use tracing::debug;
use ureq::http;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs exactly one HTTP round trip per call.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;

    /// Send `request` and drop whatever comes back. Only a failure to send is
    /// an error; status and body are never looked at.
    fn execute_discarding(&self, request: &HttpRequest) -> Result<(), ApiError> {
        self.execute(request).map(|_| ())
    }
}

/// Blocking transport backed by a `ureq::Agent` with its own cookie jar.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::from_config(None)
    }

    /// Bound every call by `timeout`, connect through body read.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::from_config(Some(timeout))
    }

    fn from_config(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn agent(&self) -> &ureq::Agent {
        &self.agent
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a caller-configured agent. The agent should have
/// `http_status_as_error(false)`, otherwise 4xx/5xx surface as transport
/// errors instead of decoded bodies.
impl From<ureq::Agent> for UreqTransport {
    fn from(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<http::Response<ureq::Body>, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let mut builder = http::Request::builder()
            .method(to_http_method(request.method))
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let result = match &request.body {
            Some(body) => {
                let req = builder
                    .body(body.as_bytes())
                    .map_err(|e| ApiError::Transport(ureq::Error::Http(e)))?;
                self.agent.run(req)
            }
            None => {
                let req = builder
                    .body(())
                    .map_err(|e| ApiError::Transport(ureq::Error::Http(e)))?;
                self.agent.run(req)
            }
        };

        result.map_err(|err| {
            debug!(method = request.method.as_str(), url = %request.url, error = %err, "request failed");
            ApiError::Transport(err)
        })
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut response = self.send(request)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // Raw bytes: whether they are text, let alone JSON, is the decoder's call.
        let body = response.body_mut().read_to_vec()?;

        debug!(status, bytes = body.len(), url = %request.url, "received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn execute_discarding(&self, request: &HttpRequest) -> Result<(), ApiError> {
        let mut response = self.send(request)?;
        // Drain so the connection can go back to the pool.
        if let Err(err) = response.body_mut().read_to_vec() {
            debug!(url = %request.url, error = %err, "discarded unreadable response body");
        }
        debug!(status = response.status().as_u16(), url = %request.url, "response discarded");
        Ok(())
    }
}

fn to_http_method(method: HttpMethod) -> http::Method {
    match method {
        HttpMethod::Get => http::Method::GET,
        HttpMethod::Post => http::Method::POST,
        HttpMethod::Patch => http::Method::PATCH,
        HttpMethod::Delete => http::Method::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_map_onto_http_crate() {
        assert_eq!(to_http_method(HttpMethod::Get), http::Method::GET);
        assert_eq!(to_http_method(HttpMethod::Post), http::Method::POST);
        assert_eq!(to_http_method(HttpMethod::Patch), http::Method::PATCH);
        assert_eq!(to_http_method(HttpMethod::Delete), http::Method::DELETE);
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        // Bind then drop so the port is very likely closed.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let transport = UreqTransport::with_timeout(Duration::from_secs(5));
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: format!("http://{addr}/services/data/v31/sobjects"),
            headers: Vec::new(),
            body: None,
        };
        let err = transport.execute(&req).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn invalid_header_value_is_a_transport_error() {
        let transport = UreqTransport::new();
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://127.0.0.1:9/".to_string(),
            headers: vec![("Authorization".to_string(), "Bearer bad\ntoken".to_string())],
            body: None,
        };
        let err = transport.execute(&req).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
