//! HTTPS client for the Airtable REST API

use super::types::{CreateRecordsRequest, CreateRecordsResponse, NewRecord};
use super::{ExternalRecord, Fields, ListQuery, PageResponse, RecordSource, RemoteFetchError, RemoteWriteError};
use crate::config::{AirtableConfig, ConfigurationError, API_KEY_VAR, API_URL_VAR, BASE_ID_VAR};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

/// Talks to `{api_url}/v0/{base_id}/{table}` with a bearer key.
#[derive(Clone)]
pub struct AirtableClient {
    http: reqwest::Client,
    api_url: Url,
    base_id: Option<String>,
    api_key: Option<String>,
}

impl AirtableClient {
    /// Build a client. Only a malformed API url is rejected here; missing
    /// credentials are reported per request.
    pub fn new(config: &AirtableConfig) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::Invalid {
            var: API_URL_VAR,
            value: config.api_url.clone(),
            reason,
        };
        let api_url = Url::parse(&config.api_url).map_err(|e| invalid(e.to_string()))?;
        if api_url.cannot_be_a_base() {
            return Err(invalid("not a base url".to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_url,
            base_id: config.base_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Endpoint for `table`. Table names are percent-encoded as path segments.
    pub fn table_url(&self, table: &str) -> Result<Url, ConfigurationError> {
        let base_id = self
            .base_id
            .as_deref()
            .ok_or(ConfigurationError::Missing(BASE_ID_VAR))?;

        let mut url = self.api_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| ConfigurationError::Invalid {
                var: API_URL_VAR,
                value: self.api_url.to_string(),
                reason: "not a base url".to_string(),
            })?;
            segments.pop_if_empty().extend(["v0", base_id, table]);
        }
        Ok(url)
    }

    fn api_key(&self) -> Result<&str, ConfigurationError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigurationError::Missing(API_KEY_VAR))
    }

    fn endpoint(&self, table: &str) -> Result<(Url, &str), ConfigurationError> {
        Ok((self.table_url(table)?, self.api_key()?))
    }
}

#[async_trait]
impl RecordSource for AirtableClient {
    async fn list_page(
        &self,
        table: &str,
        query: &ListQuery,
    ) -> Result<PageResponse, RemoteFetchError> {
        let (url, key) = self
            .endpoint(table)
            .map_err(|source| RemoteFetchError::Configuration {
                table: table.to_string(),
                source,
            })?;

        debug!(table, offset = ?query.offset, filtered = query.filter_by_formula.is_some(), "GET page");

        let response = self
            .http
            .get(url)
            .bearer_auth(key)
            .query(&query.to_pairs())
            .send()
            .await
            .map_err(|e| RemoteFetchError::Transport {
                table: table.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteFetchError::Transport {
                table: table.to_string(),
                message: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(RemoteFetchError::Status {
                table: table.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| RemoteFetchError::Malformed {
            table: table.to_string(),
            message: e.to_string(),
        })
    }

    async fn create_records(
        &self,
        table: &str,
        records: Vec<Fields>,
    ) -> Result<Vec<ExternalRecord>, RemoteWriteError> {
        let (url, key) = self
            .endpoint(table)
            .map_err(|source| RemoteWriteError::Configuration {
                table: table.to_string(),
                source,
            })?;

        let body = CreateRecordsRequest {
            records: records
                .into_iter()
                .map(|fields| NewRecord { fields })
                .collect(),
        };

        debug!(table, count = body.records.len(), "POST records");

        let response = self
            .http
            .post(url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteWriteError::Transport {
                table: table.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteWriteError::Transport {
                table: table.to_string(),
                message: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(RemoteWriteError::Status {
                table: table.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let echoed: CreateRecordsResponse =
            serde_json::from_str(&text).map_err(|e| RemoteWriteError::Malformed {
                table: table.to_string(),
                message: e.to_string(),
            })?;
        Ok(echoed.records)
    }
}
