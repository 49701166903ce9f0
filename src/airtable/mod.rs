//! Airtable access: the remote paginated record store
//!
//! `RecordSource` abstracts over how the remote table API is reached so the
//! fetcher, enricher and write path don't depend on transport.
//! Two implementations:
//! - `AirtableClient`: HTTPS via reqwest (production)
//! - `MockSource`: scripted pages and a request log (testing)

mod client;
mod mock;
mod paginate;
mod types;

pub use client::AirtableClient;
pub use mock::{MockSource, RecordedRequest};
pub use paginate::{fetch_all, fetch_by_ids, record_id_formula, RELATED_PAGE_SIZE};
pub use types::{
    CreateRecordsRequest, CreateRecordsResponse, ExternalRecord, Fields, ListQuery, NewRecord,
    PageResponse,
};

use crate::config::ConfigurationError;
use async_trait::async_trait;
use thiserror::Error;

/// A page request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFetchError {
    #[error("request to {table} failed: {message}")]
    Transport { table: String, message: String },

    #[error("{table} returned HTTP {status}: {body}")]
    Status {
        table: String,
        status: u16,
        body: String,
    },

    #[error("malformed page from {table}: {message}")]
    Malformed { table: String, message: String },

    #[error("cannot fetch {table}: {source}")]
    Configuration {
        table: String,
        #[source]
        source: ConfigurationError,
    },
}

/// A record insert failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteWriteError {
    #[error("insert into {table} failed: {message}")]
    Transport { table: String, message: String },

    #[error("insert into {table} returned HTTP {status}: {body}")]
    Status {
        table: String,
        status: u16,
        body: String,
    },

    #[error("malformed insert response from {table}: {message}")]
    Malformed { table: String, message: String },

    #[error("insert into {table} echoed no records")]
    EmptyEcho { table: String },

    #[error("cannot insert into {table}: {source}")]
    Configuration {
        table: String,
        #[source]
        source: ConfigurationError,
    },
}

/// Access to the remote tables.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch a single page of `table`.
    async fn list_page(
        &self,
        table: &str,
        query: &ListQuery,
    ) -> Result<PageResponse, RemoteFetchError>;

    /// Insert records into `table`, returning them as echoed by the remote.
    ///
    /// Not idempotent: every call creates new rows.
    async fn create_records(
        &self,
        table: &str,
        records: Vec<Fields>,
    ) -> Result<Vec<ExternalRecord>, RemoteWriteError>;
}
