//! Proxy routes exercised in-process through the axum router.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use common::{pipeline, proxy};
use dealflow::server::{router, routes, ErrorResponse};
use dealflow::{ExternalRecord, MockSource, RemoteFetchError, RemoteWriteError, CREATE_FAILED_MESSAGE};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get<T: DeserializeOwned>(app: axum::Router, uri: &str) -> (StatusCode, T) {
    let (status, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (_, proxy) = proxy(MockSource::new());
    let (status, body) = send(
        router(proxy),
        Request::get(routes::HEALTH).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn loans_route_returns_every_page() {
    let (mock, proxy) = proxy(pipeline());

    let (status, loans): (_, Vec<ExternalRecord>) = get(router(proxy), routes::LOANS).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = loans.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["recLoan1", "recLoan2"]);
    assert_eq!(mock.requests_for("Loan Pipeline").len(), 2);
}

#[tokio::test]
async fn test_loans_and_conditions_routes_read_their_tables() {
    let (_, proxy) = proxy(pipeline());

    let (_, test_loans): (_, Vec<ExternalRecord>) =
        get(router(proxy.clone()), routes::TEST_LOANS).await;
    let (_, conditions): (_, Vec<ExternalRecord>) =
        get(router(proxy), routes::CONDITIONS).await;

    assert_eq!(test_loans.len(), 1);
    assert_eq!(test_loans[0].id, "recTest1");
    assert_eq!(conditions.len(), 3);
}

#[tokio::test]
async fn responses_route_inlines_conditions() {
    let (mock, proxy) = proxy(pipeline());

    let (status, responses): (_, Value) = get(router(proxy), routes::RESPONSES).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(responses.as_array().unwrap().len(), 4);
    assert_eq!(
        responses[0],
        json!({
            "id": "recResp1",
            "name": "Appraisal report",
            "sortOrder": 1,
            "reviewStatus": "Approved",
            "responseText": "",
            "responseType": "",
            "dealStage": [],
            "dealConditions": [
                {"Name": "Appraisal", "Record ID": "recCond1", "Loan Pipeline": ["recLoan1"]}
            ],
        })
    );
    assert_eq!(responses[1]["dealConditions"][1], json!({"id": "recGone", "missing": true}));
    assert_eq!(responses[3]["name"], "Unlinked");
    assert_eq!(responses[3]["dealConditions"], json!([]));

    // one filtered request for all linked conditions
    assert_eq!(mock.requests_for("Deal Conditions").len(), 1);
}

#[tokio::test]
async fn read_failure_is_a_500_with_the_cause() {
    let (_, proxy) = proxy(pipeline().with_fetch_failure(
        "Deal Conditions",
        RemoteFetchError::Status {
            table: "Deal Conditions".to_string(),
            status: 401,
            body: "AUTHENTICATION_REQUIRED".to_string(),
        },
    ));

    let (status, body): (_, ErrorResponse) = get(router(proxy), routes::CONDITIONS).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.error.contains("401"));
}

#[tokio::test]
async fn create_route_maps_fields_and_echoes_the_record() {
    let (mock, proxy) = proxy(MockSource::new());

    let (status, body) = send(
        router(proxy),
        post_json(
            routes::TEST_LOANS,
            json!({"dealName": "Birch Rd", "loanAmount": 480000, "productType": "Fix & Flip"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let created: ExternalRecord = serde_json::from_slice(&body).unwrap();
    assert_eq!(created.id, "recNew1");
    assert_eq!(created.fields["⚡️ Deal Name"], "Birch Rd");

    let writes = mock.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "Loan Pipeline Test");
    assert_eq!(
        Value::Object(writes[0].1[0].clone()),
        json!({
            "⚡️ Deal Name": "Birch Rd",
            "⚡️ Loan Amount (Max)": 480000,
            "⚡️ Product Type": "Fix & Flip",
        })
    );
}

#[tokio::test]
async fn create_failure_hides_the_cause() {
    let (_, proxy) = proxy(MockSource::new().with_write_failure(
        "Loan Pipeline Test",
        RemoteWriteError::Status {
            table: "Loan Pipeline Test".to_string(),
            status: 422,
            body: "INVALID_MULTIPLE_CHOICE_OPTIONS".to_string(),
        },
    ));

    let (status, body) = send(
        router(proxy),
        post_json(
            routes::TEST_LOANS,
            json!({"dealName": "x", "loanAmount": 1, "productType": "y"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, CREATE_FAILED_MESSAGE);
}

#[tokio::test]
async fn incomplete_create_body_gets_the_fixed_message() {
    let (mock, proxy) = proxy(MockSource::new());

    let (status, body) = send(
        router(proxy),
        post_json(routes::TEST_LOANS, json!({"dealName": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, CREATE_FAILED_MESSAGE);
    assert!(mock.writes().is_empty());
}

#[tokio::test]
async fn string_loan_amount_gets_the_fixed_message() {
    let (mock, proxy) = proxy(MockSource::new());

    let (status, body) = send(
        router(proxy),
        post_json(
            routes::TEST_LOANS,
            json!({"dealName": "x", "loanAmount": "250000", "productType": "DSCR"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, CREATE_FAILED_MESSAGE);
    assert!(mock.writes().is_empty());
}

#[tokio::test]
async fn create_body_without_json_content_type_gets_the_fixed_message() {
    let (_, proxy) = proxy(MockSource::new());
    let request = Request::post(routes::TEST_LOANS)
        .body(Body::from("dealName=x&loanAmount=1"))
        .unwrap();

    let (status, body) = send(router(proxy), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, CREATE_FAILED_MESSAGE);
}
