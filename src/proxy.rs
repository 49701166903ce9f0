//! AirtableProxy: server-side reads and writes against the remote base

use crate::airtable::{
    fetch_all, fetch_by_ids, ExternalRecord, ListQuery, RecordSource, RemoteFetchError,
    RemoteWriteError,
};
use crate::enrich::{enrich_responses, EnrichedResponse};
use crate::schema::TableNames;
use crate::write::{create_loan, NewLoan};
use std::sync::Arc;
use tracing::info;

/// Reads whole tables, enriches responses, and creates test loans.
#[derive(Clone)]
pub struct AirtableProxy {
    source: Arc<dyn RecordSource>,
    tables: TableNames,
}

impl AirtableProxy {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            tables: TableNames::default(),
        }
    }

    pub fn with_tables(mut self, tables: TableNames) -> Self {
        self.tables = tables;
        self
    }

    async fn table(&self, table: &str) -> Result<Vec<ExternalRecord>, RemoteFetchError> {
        let records = fetch_all(self.source.as_ref(), table, ListQuery::new()).await?;
        info!(table, records = records.len(), "fetched");
        Ok(records)
    }

    pub async fn loans(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError> {
        self.table(&self.tables.loans).await
    }

    pub async fn test_loans(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError> {
        self.table(&self.tables.test_loans).await
    }

    pub async fn conditions(&self) -> Result<Vec<ExternalRecord>, RemoteFetchError> {
        self.table(&self.tables.conditions).await
    }

    /// All responses, each with its linked conditions inlined.
    pub async fn responses(&self) -> Result<Vec<EnrichedResponse>, RemoteFetchError> {
        let responses = self.table(&self.tables.responses).await?;
        let source = self.source.as_ref();
        let conditions = self.tables.conditions.as_str();

        enrich_responses(&responses, |ids| async move {
            fetch_by_ids(source, conditions, &ids).await
        })
        .await
    }

    /// Insert a loan into the test table.
    pub async fn create_test_loan(&self, input: &NewLoan) -> Result<ExternalRecord, RemoteWriteError> {
        create_loan(self.source.as_ref(), &self.tables.test_loans, input).await
    }
}
