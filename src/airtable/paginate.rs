//! Continuation-token pagination over a `RecordSource`

use super::{ExternalRecord, ListQuery, RecordSource, RemoteFetchError};
use std::collections::BTreeSet;
use tracing::debug;

/// Page-size hint sent with id-filtered fetches (the Airtable maximum).
pub const RELATED_PAGE_SIZE: u32 = 100;

/// Fetch every record of `table` matching `query`.
///
/// Pages are requested one after another, each carrying the token returned by
/// the previous one, and concatenated in the order received. The loop ends on
/// the first page without a token; a page with a token but no records keeps
/// it going. Any failed page fails the whole fetch.
pub async fn fetch_all<S>(
    source: &S,
    table: &str,
    query: ListQuery,
) -> Result<Vec<ExternalRecord>, RemoteFetchError>
where
    S: RecordSource + ?Sized,
{
    let mut query = ListQuery {
        offset: None,
        ..query
    };
    let mut records = Vec::new();
    let mut pages = 0usize;

    loop {
        let page = source.list_page(table, &query).await?;
        pages += 1;
        records.extend(page.records);

        match page.continuation {
            Some(token) => query.offset = Some(token),
            None => break,
        }
    }

    debug!(table, pages, records = records.len(), "fetched table");
    Ok(records)
}

/// `OR(RECORD_ID()="a",RECORD_ID()="b",...)` over `ids`, in iteration order.
///
/// The remote caps formula length; very large id sets will be rejected there.
pub fn record_id_formula<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let clauses: Vec<String> = ids
        .into_iter()
        .map(|id| format!("RECORD_ID()=\"{}\"", escape_formula_string(id)))
        .collect();
    format!("OR({})", clauses.join(","))
}

fn escape_formula_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Fetch only the records of `table` whose id is in `ids`.
///
/// Issues a single filtered query with a page-size hint; continuation tokens
/// are still followed when more than one page of matches comes back. An empty
/// id set returns immediately without touching the remote.
pub async fn fetch_by_ids<S>(
    source: &S,
    table: &str,
    ids: &BTreeSet<String>,
) -> Result<Vec<ExternalRecord>, RemoteFetchError>
where
    S: RecordSource + ?Sized,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let formula = record_id_formula(ids.iter().map(String::as_str));
    debug!(table, ids = ids.len(), formula_len = formula.len(), "fetching linked records");

    let query = ListQuery::new()
        .with_filter(formula)
        .with_page_size(RELATED_PAGE_SIZE);
    fetch_all(source, table, query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airtable::{Fields, MockSource};

    fn rec(id: &str) -> ExternalRecord {
        ExternalRecord::new(id, Fields::new())
    }

    fn ids(records: &[ExternalRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn concatenates_pages_in_server_order() {
        let mock = MockSource::new().with_pages(
            "Loans",
            vec![
                vec![rec("r3"), rec("r1")],
                vec![rec("r2")],
                vec![rec("r5"), rec("r4")],
            ],
        );

        let records = fetch_all(&mock, "Loans", ListQuery::new()).await.unwrap();

        assert_eq!(ids(&records), vec!["r3", "r1", "r2", "r5", "r4"]);
        // two tokens handed out → three requests
        let requests = mock.requests_for("Loans");
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].query.offset, None);
        assert_eq!(requests[1].query.offset.as_deref(), Some("itr1"));
        assert_eq!(requests[2].query.offset.as_deref(), Some("itr2"));
    }

    #[tokio::test]
    async fn empty_table_is_one_request() {
        let mock = MockSource::new().with_table("Empty", Vec::new());

        let records = fetch_all(&mock, "Empty", ListQuery::new()).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(mock.requests_for("Empty").len(), 1);
    }

    #[tokio::test]
    async fn empty_page_with_token_keeps_going() {
        let mock = MockSource::new().with_pages("T", vec![vec![], vec![rec("late")]]);

        let records = fetch_all(&mock, "T", ListQuery::new()).await.unwrap();

        assert_eq!(ids(&records), vec!["late"]);
        assert_eq!(mock.requests_for("T").len(), 2);
    }

    #[tokio::test]
    async fn duplicate_ids_across_pages_are_kept() {
        let mock = MockSource::new().with_pages("T", vec![vec![rec("a")], vec![rec("a")]]);
        let records = fetch_all(&mock, "T", ListQuery::new()).await.unwrap();
        assert_eq!(ids(&records), vec!["a", "a"]);
    }

    #[tokio::test]
    async fn page_failure_fails_the_fetch() {
        let mock = MockSource::new().with_fetch_failure(
            "T",
            RemoteFetchError::Transport {
                table: "T".to_string(),
                message: "connection reset".to_string(),
            },
        );

        let err = fetch_all(&mock, "T", ListQuery::new()).await.unwrap_err();
        assert!(matches!(err, RemoteFetchError::Transport { .. }));
    }

    #[tokio::test]
    async fn caller_offset_is_ignored_on_first_request() {
        let mock = MockSource::new().with_table("T", vec![rec("a")]);
        fetch_all(&mock, "T", ListQuery::new().with_offset("itr7"))
            .await
            .unwrap();
        assert_eq!(mock.requests_for("T")[0].query.offset, None);
    }

    #[test]
    fn formula_is_a_disjunction_of_record_ids() {
        assert_eq!(
            record_id_formula(["recA", "recB"]),
            r#"OR(RECORD_ID()="recA",RECORD_ID()="recB")"#
        );
    }

    #[test]
    fn formula_escapes_quotes() {
        assert_eq!(
            record_id_formula([r#"a"b"#]),
            r#"OR(RECORD_ID()="a\"b")"#
        );
    }

    #[tokio::test]
    async fn fetch_by_ids_sends_one_filtered_request() {
        let mock = MockSource::new().with_table("C", vec![rec("c1"), rec("c2"), rec("c3")]);
        let wanted: BTreeSet<String> = ["c3", "c1"].iter().map(|s| s.to_string()).collect();

        let records = fetch_by_ids(&mock, "C", &wanted).await.unwrap();

        assert_eq!(ids(&records), vec!["c1", "c3"]);
        let requests = mock.requests_for("C");
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].query.filter_by_formula.as_deref(),
            Some(r#"OR(RECORD_ID()="c1",RECORD_ID()="c3")"#)
        );
        assert_eq!(requests[0].query.page_size, Some(RELATED_PAGE_SIZE));
    }

    #[tokio::test]
    async fn fetch_by_ids_with_no_ids_skips_the_remote() {
        let mock = MockSource::new();
        let records = fetch_by_ids(&mock, "C", &BTreeSet::new()).await.unwrap();
        assert!(records.is_empty());
        assert!(mock.requests().is_empty());
    }
}
