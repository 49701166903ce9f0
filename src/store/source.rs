//! Where the store gets its collections from.
//!
//! Two implementations:
//! - `AirtableProxy`: in-process, straight against the remote base
//! - `ProxyClient`: over HTTP against a running proxy's routes

use crate::airtable::{ExternalRecord, RemoteFetchError, RemoteWriteError};
use crate::config::ConfigurationError;
use crate::enrich::EnrichedResponse;
use crate::proxy::AirtableProxy;
use crate::server::routes;
use crate::write::NewLoan;
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Supplies each collection the store holds.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    async fn loans(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError>;
    async fn test_loans(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError>;
    async fn conditions(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError>;
    async fn responses(&self) -> Result<Vec<EnrichedResponse>, RemoteFetchError>;
}

#[async_trait]
impl CollectionSource for AirtableProxy {
    async fn loans(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError> {
        AirtableProxy::loans(self).await
    }

    async fn test_loans(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError> {
        AirtableProxy::test_loans(self).await
    }

    async fn conditions(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError> {
        AirtableProxy::conditions(self).await
    }

    async fn responses(&self) -> Result<Vec<EnrichedResponse>, RemoteFetchError> {
        AirtableProxy::responses(self).await
    }
}

/// HTTP client for a running proxy.
#[derive(Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::Invalid {
            var: "--proxy",
            value: base_url.to_string(),
            reason,
        };
        let mut url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(invalid("not a base url".to_string()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: url,
        })
    }

    /// Absolute url of a route, resolved under the base path.
    pub fn route_url(&self, route: &str) -> Result<Url, ConfigurationError> {
        self.base_url
            .join(route.trim_start_matches('/'))
            .map_err(|e| ConfigurationError::Invalid {
                var: "--proxy",
                value: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, RemoteFetchError> {
        let url = self
            .route_url(route)
            .map_err(|source| RemoteFetchError::Configuration {
                table: route.to_string(),
                source,
            })?;
        debug!(%url, "GET proxy route");

        let transport = |e: reqwest::Error| RemoteFetchError::Transport {
            table: route.to_string(),
            message: e.to_string(),
        };
        let response = self.http.get(url).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(RemoteFetchError::Status {
                table: route.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| RemoteFetchError::Malformed {
            table: route.to_string(),
            message: e.to_string(),
        })
    }

    /// Create a test loan through the proxy's write route.
    pub async fn create_test_loan(&self, input: &NewLoan) -> Result<ExternalRecord, RemoteWriteError> {
        let route = routes::TEST_LOANS;
        let url = self
            .route_url(route)
            .map_err(|source| RemoteWriteError::Configuration {
                table: route.to_string(),
                source,
            })?;

        let transport = |e: reqwest::Error| RemoteWriteError::Transport {
            table: route.to_string(),
            message: e.to_string(),
        };
        let response = self.http.post(url).json(input).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(RemoteWriteError::Status {
                table: route.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| RemoteWriteError::Malformed {
            table: route.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl CollectionSource for ProxyClient {
    async fn loans(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError> {
        self.get_json(routes::LOANS).await
    }

    async fn test_loans(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError> {
        self.get_json(routes::TEST_LOANS).await
    }

    async fn conditions(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError> {
        self.get_json(routes::CONDITIONS).await
    }

    async fn responses(&self) -> Result<Vec<EnrichedResponse>, RemoteFetchError> {
        self.get_json(routes::RESPONSES).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_resolve_under_base_path() {
        let client = ProxyClient::new("http://localhost:3000").unwrap();
        assert_eq!(
            client.route_url(routes::LOANS).unwrap().as_str(),
            "http://localhost:3000/api/airtable/Loan_Pipeline"
        );

        let prefixed = ProxyClient::new("https://example.test/app").unwrap();
        assert_eq!(
            prefixed.route_url(routes::RESPONSES).unwrap().as_str(),
            "https://example.test/app/api/airtable/Response_Submissions"
        );
    }

    #[test]
    fn rejects_non_urls() {
        assert!(ProxyClient::new("localhost 3000").is_err());
    }
}
