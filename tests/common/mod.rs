//! Shared fixtures for the integration tests
//!
//! A small loan pipeline served by `MockSource`: two loans, one test loan,
//! three conditions and four responses, with one response linking a
//! condition that no longer exists.

#![allow(dead_code)]

use dealflow::{AirtableProxy, ExternalRecord, MockSource};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn rec(id: &str, fields: Value) -> ExternalRecord {
    ExternalRecord::new(id, fields.as_object().cloned().unwrap_or_default())
}

/// The pipeline, with responses split over two pages.
pub fn pipeline() -> MockSource {
    MockSource::new()
        .with_pages(
            "Loan Pipeline",
            vec![
                vec![rec("recLoan1", json!({"⚡️ Deal Name": "Maple St"}))],
                vec![rec("recLoan2", json!({"⚡️ Deal Name": "Oak Ave"}))],
            ],
        )
        .with_table(
            "Loan Pipeline Test",
            vec![rec("recTest1", json!({"⚡️ Deal Name": "Sandbox"}))],
        )
        .with_table(
            "Deal Conditions",
            vec![
                rec(
                    "recCond1",
                    json!({"Name": "Appraisal", "Record ID": "recCond1", "Loan Pipeline": ["recLoan1"]}),
                ),
                rec(
                    "recCond2",
                    json!({"Name": "Title", "Record ID": "recCond2", "Loan Pipeline": ["recLoan2"]}),
                ),
                rec(
                    "recCond3",
                    json!({"Name": "Sandbox check", "Record ID": "recCond3", "Loan Pipeline": ["recTest1"]}),
                ),
            ],
        )
        .with_pages(
            "Response Submissions",
            vec![
                vec![
                    rec(
                        "recResp1",
                        json!({
                            "Name": "Appraisal report",
                            "Sort Order": 1,
                            "Review Status": "Approved",
                            "Deal Conditions": ["recCond1"],
                        }),
                    ),
                    rec("recResp2", json!({"Deal Conditions": ["recCond2", "recGone"]})),
                ],
                vec![
                    rec("recResp3", json!({"Deal Conditions": ["recCond3"]})),
                    rec("recResp4", json!({"Name": "Unlinked"})),
                ],
            ],
        )
}

pub fn proxy(mock: MockSource) -> (Arc<MockSource>, Arc<AirtableProxy>) {
    let mock = Arc::new(mock);
    let proxy = Arc::new(AirtableProxy::new(mock.clone()));
    (mock, proxy)
}
