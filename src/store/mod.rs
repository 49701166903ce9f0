//! Aggregation store: the in-memory snapshot the UI reads.
//!
//! `AggregationStore::fetch_all` loads every collection concurrently and
//! replaces the snapshot wholesale. Derived views (conditions of a loan,
//! responses of a condition or loan) are recomputed from the snapshot on
//! every call; nothing is cached.

mod policy;
mod source;

pub use policy::{Collection, FetchPolicy, Requirement};
pub use source::{CollectionSource, ProxyClient};

use crate::airtable::{ExternalRecord, RemoteFetchError};
use crate::enrich::EnrichedResponse;
use crate::schema::condition;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("failed to load {collection}: {source}")]
    Fetch {
        collection: Collection,
        #[source]
        source: RemoteFetchError,
    },
}

/// Everything the store holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateState {
    pub loans: Vec<ExternalRecord>,
    pub test_loans: Vec<ExternalRecord>,
    pub conditions: Vec<ExternalRecord>,
    pub responses: Vec<EnrichedResponse>,
    pub loading: bool,
    pub error: Option<String>,
}

impl AggregateState {
    /// Whether `loan_id` is a row of the test loan table.
    pub fn is_test_loan(&self, loan_id: &str) -> bool {
        self.test_loans.iter().any(|l| l.id == loan_id)
    }

    /// Conditions linked to `loan_id`. Test loans never resolve conditions.
    pub fn conditions_by_loan_id(&self, loan_id: &str) -> Vec<&ExternalRecord> {
        if self.is_test_loan(loan_id) {
            return Vec::new();
        }
        self.conditions
            .iter()
            .filter(|c| c.links_to(condition::LOANS, loan_id))
            .collect()
    }

    /// Responses linked to `condition_id`.
    pub fn responses_by_condition_id(&self, condition_id: &str) -> Vec<&EnrichedResponse> {
        self.responses
            .iter()
            .filter(|r| r.links_condition(condition_id))
            .collect()
    }

    /// Responses linked to any condition of `loan_id`.
    pub fn responses_by_loan_id(&self, loan_id: &str) -> Vec<&EnrichedResponse> {
        let condition_ids: HashSet<&str> = self
            .conditions_by_loan_id(loan_id)
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();
        if condition_ids.is_empty() {
            return Vec::new();
        }
        self.responses
            .iter()
            .filter(|r| {
                r.linked_conditions
                    .iter()
                    .any(|c| condition_ids.contains(c.id()))
            })
            .collect()
    }
}

struct Loaded {
    loans: Vec<ExternalRecord>,
    test_loans: Vec<ExternalRecord>,
    conditions: Vec<ExternalRecord>,
    responses: Vec<EnrichedResponse>,
}

/// Clears `loading` when dropped, whichever way the load ends.
struct LoadingGuard<'a> {
    state: &'a RwLock<AggregateState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .loading = false;
    }
}

pub struct AggregationStore {
    source: Arc<dyn CollectionSource>,
    policy: FetchPolicy,
    state: RwLock<AggregateState>,
}

impl AggregationStore {
    pub fn new(source: Arc<dyn CollectionSource>) -> Self {
        Self {
            source,
            policy: FetchPolicy::default(),
            state: RwLock::new(AggregateState::default()),
        }
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn read_state(&self) -> RwLockReadGuard<'_, AggregateState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, AggregateState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reload every collection.
    ///
    /// On success the snapshot is replaced as a whole. On a required
    /// collection's failure the previous collections stay in place and
    /// `error` carries the message. `loading` is false again once this
    /// returns or is dropped.
    pub async fn fetch_all(&self) -> Result<(), StoreError> {
        {
            let mut state = self.write_state();
            state.loading = true;
            state.error = None;
        }
        let _loading = LoadingGuard { state: &self.state };

        let (loans, test_loans, conditions, responses) = tokio::join!(
            self.source.loans(),
            self.source.test_loans(),
            self.source.conditions(),
            self.source.responses()
        );

        let loaded = self.settle(loans, test_loans, conditions, responses);

        let mut state = self.write_state();
        match loaded {
            Ok(loaded) => {
                info!(
                    loans = loaded.loans.len(),
                    test_loans = loaded.test_loans.len(),
                    conditions = loaded.conditions.len(),
                    responses = loaded.responses.len(),
                    "store refreshed"
                );
                state.loans = loaded.loans;
                state.test_loans = loaded.test_loans;
                state.conditions = loaded.conditions;
                state.responses = loaded.responses;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "store refresh failed");
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    // Every collection is settled, so optional failures are logged even when
    // a required one fails. Reports the first required failure in collection
    // order.
    fn settle(
        &self,
        loans: Result<Vec<ExternalRecord>, RemoteFetchError>,
        test_loans: Result<Vec<ExternalRecord>, RemoteFetchError>,
        conditions: Result<Vec<ExternalRecord>, RemoteFetchError>,
        responses: Result<Vec<EnrichedResponse>, RemoteFetchError>,
    ) -> Result<Loaded, StoreError> {
        let loans = self.policy.settle(Collection::Loans, loans);
        let test_loans = self.policy.settle(Collection::TestLoans, test_loans);
        let conditions = self.policy.settle(Collection::Conditions, conditions);
        let responses = self.policy.settle(Collection::Responses, responses);

        Ok(Loaded {
            loans: loans?,
            test_loans: test_loans?,
            conditions: conditions?,
            responses: responses?,
        })
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> AggregateState {
        self.read_state().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read_state().loading
    }

    pub fn error(&self) -> Option<String> {
        self.read_state().error.clone()
    }

    pub fn conditions_by_loan_id(&self, loan_id: &str) -> Vec<ExternalRecord> {
        self.read_state()
            .conditions_by_loan_id(loan_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn responses_by_condition_id(&self, condition_id: &str) -> Vec<EnrichedResponse> {
        self.read_state()
            .responses_by_condition_id(condition_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn responses_by_loan_id(&self, loan_id: &str) -> Vec<EnrichedResponse> {
        self.read_state()
            .responses_by_loan_id(loan_id)
            .into_iter()
            .cloned()
            .collect()
    }
}
