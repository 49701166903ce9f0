//! Per-collection failure policy for aggregate loads

use super::StoreError;
use crate::airtable::RemoteFetchError;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// The collections the store loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Loans,
    TestLoans,
    Conditions,
    Responses,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Loans,
        Collection::TestLoans,
        Collection::Conditions,
        Collection::Responses,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Collection::Loans => "loans",
            Collection::TestLoans => "test loans",
            Collection::Conditions => "conditions",
            Collection::Responses => "responses",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a collection's failure fails the whole load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    /// Failure degrades to an empty collection.
    Optional,
}

/// Requirement per collection. Collections not listed are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    requirements: BTreeMap<Collection, Requirement>,
}

impl Default for FetchPolicy {
    /// Only the test loan table is optional.
    fn default() -> Self {
        Self::all_required().with(Collection::TestLoans, Requirement::Optional)
    }
}

impl FetchPolicy {
    pub fn all_required() -> Self {
        Self {
            requirements: Collection::ALL
                .iter()
                .map(|c| (*c, Requirement::Required))
                .collect(),
        }
    }

    pub fn with(mut self, collection: Collection, requirement: Requirement) -> Self {
        self.requirements.insert(collection, requirement);
        self
    }

    pub fn requirement(&self, collection: Collection) -> Requirement {
        self.requirements
            .get(&collection)
            .copied()
            .unwrap_or(Requirement::Required)
    }

    /// Apply the policy to one collection's fetch result.
    pub fn settle<T>(
        &self,
        collection: Collection,
        result: Result<Vec<T>, RemoteFetchError>,
    ) -> Result<Vec<T>, StoreError> {
        match (result, self.requirement(collection)) {
            (Ok(items), _) => Ok(items),
            (Err(error), Requirement::Optional) => {
                warn!(%collection, %error, "optional collection failed to load, using empty");
                Ok(Vec::new())
            }
            (Err(source), Requirement::Required) => Err(StoreError::Fetch { collection, source }),
        }
    }
}
