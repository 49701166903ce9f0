//! Wire types for the Airtable REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field map of a record (field name → heterogeneous JSON value).
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A row as returned by the remote table.
///
/// Ids are assigned by Airtable and are unique within their table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(rename = "createdTime")]
    pub created_time: DateTime<Utc>,
}

impl ExternalRecord {
    /// Build a record stamped with the current time.
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
            created_time: Utc::now(),
        }
    }

    /// String entries of an array-valued field.
    ///
    /// Absent, null and non-array values read as empty; non-string entries
    /// are skipped.
    pub fn linked_ids(&self, field: &str) -> Vec<&str> {
        match self.fields.get(field) {
            Some(serde_json::Value::Array(items)) => {
                items.iter().filter_map(|v| v.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Whether an array-valued field contains `id`.
    pub fn links_to(&self, field: &str, id: &str) -> bool {
        self.linked_ids(field).contains(&id)
    }
}

/// One page of a list request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub records: Vec<ExternalRecord>,
    /// Continuation token; `None` on the last page.
    #[serde(default, rename = "offset", skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
}

/// Query parameters for a list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// `filterByFormula` predicate
    pub filter_by_formula: Option<String>,
    /// `pageSize` hint
    pub page_size: Option<u32>,
    /// `offset` continuation token from the previous page
    pub offset: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, formula: impl Into<String>) -> Self {
        self.filter_by_formula = Some(formula.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_offset(mut self, offset: impl Into<String>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    /// Query pairs in the order they are sent.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(offset) = &self.offset {
            pairs.push(("offset", offset.clone()));
        }
        if let Some(formula) = &self.filter_by_formula {
            pairs.push(("filterByFormula", formula.clone()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("pageSize", size.to_string()));
        }
        pairs
    }
}

/// Body of a record insert: `{ "records": [ { "fields": {...} } ] }`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRecordsRequest {
    pub records: Vec<NewRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRecord {
    pub fields: Fields,
}

/// Echo of a record insert.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecordsResponse {
    pub records: Vec<ExternalRecord>,
}
