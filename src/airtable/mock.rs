//! Mock record source for testing: serves scripted pages and logs requests.

use super::{ExternalRecord, Fields, ListQuery, PageResponse, RecordSource, RemoteFetchError, RemoteWriteError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// A list request as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub table: String,
    pub query: ListQuery,
}

/// Deterministic stand-in for the remote API.
///
/// Tables are scripted as pages; continuation tokens are `itr{n}` for page
/// `n`. A request carrying `filterByFormula` is answered from every record of
/// the table whose id appears as `RECORD_ID()="<id>"` in the formula, paged
/// by `pageSize` (default 100). Unknown tables answer 404.
#[derive(Default)]
pub struct MockSource {
    tables: HashMap<String, Vec<Vec<ExternalRecord>>>,
    fetch_failures: HashMap<String, RemoteFetchError>,
    write_failures: HashMap<String, RemoteWriteError>,
    requests: Mutex<Vec<RecordedRequest>>,
    writes: Mutex<Vec<(String, Vec<Fields>)>>,
    next_id: AtomicUsize,
}

const TOKEN_PREFIX: &str = "itr";
const DEFAULT_PAGE_SIZE: usize = 100;

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table served as a single page.
    pub fn with_table(self, table: impl Into<String>, records: Vec<ExternalRecord>) -> Self {
        let pages = if records.is_empty() {
            Vec::new()
        } else {
            vec![records]
        };
        self.with_pages(table, pages)
    }

    /// Register a table served as the given pages, in order.
    pub fn with_pages(mut self, table: impl Into<String>, pages: Vec<Vec<ExternalRecord>>) -> Self {
        self.tables.insert(table.into(), pages);
        self
    }

    /// Make every list request against `table` fail.
    pub fn with_fetch_failure(mut self, table: impl Into<String>, error: RemoteFetchError) -> Self {
        self.fetch_failures.insert(table.into(), error);
        self
    }

    /// Make every insert into `table` fail.
    pub fn with_write_failure(mut self, table: impl Into<String>, error: RemoteWriteError) -> Self {
        self.write_failures.insert(table.into(), error);
        self
    }

    /// Every list request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// List requests received for one table.
    pub fn requests_for(&self, table: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.table == table)
            .collect()
    }

    /// Every insert received so far, as `(table, field maps)`.
    pub fn writes(&self) -> Vec<(String, Vec<Fields>)> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn filtered_pages(pages: &[Vec<ExternalRecord>], query: &ListQuery, formula: &str) -> Vec<Vec<ExternalRecord>> {
        let matching: Vec<ExternalRecord> = pages
            .iter()
            .flatten()
            .filter(|r| formula.contains(&format!("RECORD_ID()=\"{}\"", r.id)))
            .cloned()
            .collect();
        let size = query
            .page_size
            .map(|s| s as usize)
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        matching.chunks(size).map(<[ExternalRecord]>::to_vec).collect()
    }
}

#[async_trait]
impl RecordSource for MockSource {
    async fn list_page(
        &self,
        table: &str,
        query: &ListQuery,
    ) -> Result<PageResponse, RemoteFetchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                table: table.to_string(),
                query: query.clone(),
            });

        if let Some(error) = self.fetch_failures.get(table) {
            return Err(error.clone());
        }

        let Some(pages) = self.tables.get(table) else {
            return Err(RemoteFetchError::Status {
                table: table.to_string(),
                status: 404,
                body: r#"{"error":"NOT_FOUND"}"#.to_string(),
            });
        };

        let pages = match &query.filter_by_formula {
            Some(formula) => Self::filtered_pages(pages, query, formula),
            None => pages.clone(),
        };

        let index = match &query.offset {
            None => 0,
            Some(token) => token
                .strip_prefix(TOKEN_PREFIX)
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n < pages.len())
                .ok_or_else(|| RemoteFetchError::Status {
                    table: table.to_string(),
                    status: 422,
                    body: r#"{"error":"LIST_RECORDS_ITERATOR_NOT_AVAILABLE"}"#.to_string(),
                })?,
        };

        Ok(PageResponse {
            records: pages.get(index).cloned().unwrap_or_default(),
            continuation: (index + 1 < pages.len()).then(|| format!("{}{}", TOKEN_PREFIX, index + 1)),
        })
    }

    async fn create_records(
        &self,
        table: &str,
        records: Vec<Fields>,
    ) -> Result<Vec<ExternalRecord>, RemoteWriteError> {
        if let Some(error) = self.write_failures.get(table) {
            return Err(error.clone());
        }

        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((table.to_string(), records.clone()));

        Ok(records
            .into_iter()
            .map(|fields| {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                ExternalRecord::new(format!("recNew{}", n), fields)
            })
            .collect())
    }
}
