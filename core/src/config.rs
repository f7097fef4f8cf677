//! Construction options for `SalesforceClient`.
//!
//! The defaults reproduce the fixed endpoint layout
//! `https://{instance_host}/services/data/v31/`. The scheme and API version
//! can be overridden, which is mostly useful for pointing the client at a
//! local plain-HTTP mock.

use std::time::Duration;

use crate::client::SalesforceClient;
use crate::transport::{Transport, UreqTransport};
use crate::API_VERSION;

/// Builder for [`SalesforceClient`]. Building never fails and never performs
/// I/O.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    instance_host: String,
    bearer_token: String,
    api_version: u32,
    scheme: String,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    pub fn new(instance_host: &str, bearer_token: &str) -> Self {
        Self {
            instance_host: instance_host.to_string(),
            bearer_token: bearer_token.to_string(),
            api_version: API_VERSION,
            scheme: "https".to_string(),
            timeout: None,
        }
    }

    pub fn api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    /// Global deadline for each call on the default transport. No deadline is
    /// set unless this is called.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> String {
        format!(
            "{}://{}/services/data/v{}/",
            self.scheme, self.instance_host, self.api_version
        )
    }

    pub fn build(self) -> SalesforceClient<UreqTransport> {
        let transport = match self.timeout {
            Some(timeout) => UreqTransport::with_timeout(timeout),
            None => UreqTransport::new(),
        };
        self.build_with(transport)
    }

    /// Build a client on top of a caller-supplied transport. Any configured
    /// timeout is ignored; the transport owns its own deadlines.
    pub fn build_with<T: Transport>(self, transport: T) -> SalesforceClient<T> {
        SalesforceClient::from_parts(self.base_url(), &self.bearer_token, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_uses_https_and_v31() {
        let builder = ClientBuilder::new("na1.example.com", "tok");
        assert_eq!(
            builder.base_url(),
            "https://na1.example.com/services/data/v31/"
        );
    }

    #[test]
    fn overrides_apply_to_base_url() {
        let builder = ClientBuilder::new("127.0.0.1:3000", "tok")
            .scheme("http")
            .api_version(58);
        assert_eq!(builder.base_url(), "http://127.0.0.1:3000/services/data/v58/");
    }

    #[test]
    fn build_keeps_base_url() {
        let client = ClientBuilder::new("na1.example.com", "tok")
            .timeout(Duration::from_secs(10))
            .build();
        assert_eq!(client.base_url(), "https://na1.example.com/services/data/v31/");
    }
}
