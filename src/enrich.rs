//! Response enrichment: joins responses to the conditions they link.
//!
//! Response rows carry their conditions as an array of record ids. The
//! enricher collects every referenced id across all responses, fetches just
//! those conditions in one filtered request, and inlines each condition's
//! fields in place of its id. A link with no matching condition becomes a
//! `{ id, missing: true }` marker instead of failing the response.

use crate::airtable::{ExternalRecord, Fields, RemoteFetchError};
use crate::schema::{condition, response};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use tracing::debug;

pub const DEFAULT_NAME: &str = "Unnamed";
pub const DEFAULT_REVIEW_STATUS: &str = "Not Reviewed";

/// A condition link on an enriched response.
///
/// On the wire a resolved link is the condition's bare field map and a
/// missing one is `{"id": ..., "missing": true}`. When reading the wire form
/// back, a resolved link takes its id from the condition's `Record ID` field.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkedCondition {
    Resolved { id: String, fields: Fields },
    Missing { id: String },
}

impl LinkedCondition {
    pub fn id(&self) -> &str {
        match self {
            Self::Resolved { id, .. } | Self::Missing { id } => id,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

impl Serialize for LinkedCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Resolved { fields, .. } => fields.serialize(serializer),
            Self::Missing { id } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("id", id)?;
                map.serialize_entry("missing", &true)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for LinkedCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Fields::deserialize(deserializer)?;

        if fields.get("missing") == Some(&Value::Bool(true)) {
            if let Some(id) = fields.get("id").and_then(Value::as_str) {
                return Ok(Self::Missing { id: id.to_string() });
            }
        }

        let id = fields
            .get(condition::RECORD_ID)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(Self::Resolved { id, fields })
    }
}

/// A response row with its linked conditions inlined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResponse {
    pub id: String,
    pub name: String,
    pub sort_order: Number,
    pub review_status: String,
    pub response_text: String,
    pub response_type: String,
    pub deal_stage: Vec<Value>,
    #[serde(rename = "dealConditions")]
    pub linked_conditions: Vec<LinkedCondition>,
}

impl EnrichedResponse {
    /// Whether any linked condition has id `condition_id`.
    pub fn links_condition(&self, condition_id: &str) -> bool {
        self.linked_conditions.iter().any(|c| c.id() == condition_id)
    }
}

/// Union of the condition ids linked from `responses`.
pub fn collect_linked_ids(responses: &[ExternalRecord]) -> BTreeSet<String> {
    responses
        .iter()
        .flat_map(|r| r.linked_ids(response::CONDITIONS))
        .map(str::to_string)
        .collect()
}

/// Enrich `responses` with the conditions returned by `related_fetch`.
///
/// `related_fetch` receives the deduplicated set of linked ids and is only
/// called when that set is non-empty. Its failure fails the enrichment; an
/// individual id it does not return does not.
pub async fn enrich_responses<F, Fut>(
    responses: &[ExternalRecord],
    related_fetch: F,
) -> Result<Vec<EnrichedResponse>, RemoteFetchError>
where
    F: FnOnce(BTreeSet<String>) -> Fut,
    Fut: Future<Output = Result<Vec<ExternalRecord>, RemoteFetchError>>,
{
    let ids = collect_linked_ids(responses);

    let related = if ids.is_empty() {
        Vec::new()
    } else {
        related_fetch(ids).await?
    };

    let index: HashMap<String, Fields> = related.into_iter().map(|r| (r.id, r.fields)).collect();
    debug!(
        responses = responses.len(),
        conditions = index.len(),
        "enriching responses"
    );

    Ok(responses.iter().map(|r| project(r, &index)).collect())
}

/// Build one enriched response from a raw row and the condition index.
pub fn project(record: &ExternalRecord, index: &HashMap<String, Fields>) -> EnrichedResponse {
    let fields = &record.fields;

    let linked_conditions = record
        .linked_ids(response::CONDITIONS)
        .into_iter()
        .map(|id| match index.get(id) {
            Some(fields) => LinkedCondition::Resolved {
                id: id.to_string(),
                fields: fields.clone(),
            },
            None => LinkedCondition::Missing { id: id.to_string() },
        })
        .collect();

    EnrichedResponse {
        id: record.id.clone(),
        name: text_or(fields, response::NAME, DEFAULT_NAME),
        sort_order: match fields.get(response::SORT_ORDER) {
            Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.clone(),
            _ => Number::from(0),
        },
        review_status: text_or(fields, response::REVIEW_STATUS, DEFAULT_REVIEW_STATUS),
        response_text: text_or(fields, response::RESPONSE_TEXT, ""),
        response_type: text_or(fields, response::RESPONSE_TYPE, ""),
        deal_stage: match fields.get(response::DEAL_STAGE) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        linked_conditions,
    }
}

// Empty strings, zero and false fall back to the default too. Other scalars
// keep their JSON text.
fn text_or(fields: &Fields, key: &str, default: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        Some(Value::Bool(true)) => true.to_string(),
        _ => default.to_string(),
    }
}
