//! dealflow: Airtable proxy and store for a loan pipeline
//!
//! Reads three linked tables from an Airtable base (loans, deal conditions,
//! response submissions) plus a test loan table, joins responses to the
//! conditions they link, and serves the result over HTTP. A client-side
//! store keeps the last snapshot in memory and answers derived queries.
//!
//! # Core Concepts
//!
//! - **RecordSource**: one page of a table at a time, or a record insert
//! - **fetch_all**: follows continuation tokens until a table is exhausted
//! - **enrich_responses**: inlines linked conditions with one filtered fetch
//! - **AggregationStore**: concurrent load, snapshot, derived views
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use dealflow::{AggregationStore, AirtableProxy, MockSource};
//!
//! let proxy = AirtableProxy::new(Arc::new(MockSource::new()));
//! let store = AggregationStore::new(Arc::new(proxy));
//! assert!(!store.is_loading());
//! ```

pub mod airtable;
pub mod config;
pub mod enrich;
pub mod proxy;
pub mod schema;
pub mod server;
pub mod store;
pub mod write;

pub use airtable::{
    fetch_all, fetch_by_ids, AirtableClient, ExternalRecord, Fields, ListQuery, MockSource,
    PageResponse, RecordSource, RemoteFetchError, RemoteWriteError,
};
pub use config::{AirtableConfig, Config, ConfigurationError};
pub use enrich::{enrich_responses, EnrichedResponse, LinkedCondition};
pub use proxy::AirtableProxy;
pub use schema::TableNames;
pub use store::{
    AggregateState, AggregationStore, Collection, CollectionSource, FetchPolicy, ProxyClient,
    Requirement, StoreError,
};
pub use write::{create_loan, NewLoan, CREATE_FAILED_MESSAGE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
