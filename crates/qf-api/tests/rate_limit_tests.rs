use crate::common::{self, TestClient, jwt};
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_auth_endpoints_rate_limited() {
    let (app, _) = common::test_app();
    let client = TestClient::new(app).from_ip("203.0.113.10");

    let body = json!({
        "username": "x",
        "email": "invalid",
        "password": "short",
        "role": "student"
    });

    let mut statuses = Vec::new();
    for _ in 0..15 {
        statuses.push(client.post_json("/v1/users/register", &body).await.status);
    }

    assert_eq!(
        statuses[0],
        StatusCode::BAD_REQUEST,
        "First request should reach validation"
    );
    assert!(
        statuses.contains(&StatusCode::TOO_MANY_REQUESTS),
        "Burst beyond the bucket should be limited. Got statuses: {statuses:?}"
    );
}

#[tokio::test]
async fn test_rate_limit_buckets_are_per_client() {
    let (app, _) = common::test_app();
    let body = json!({"email": "", "password": ""});

    let first = TestClient::new(app.clone()).from_ip("203.0.113.20");
    for _ in 0..15 {
        first.post_json("/v1/users/login", &body).await;
    }
    first
        .post_json("/v1/users/login", &body)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    let second = TestClient::new(app).from_ip("203.0.113.21");
    second
        .post_json("/v1/users/login", &body)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_join_section_uses_sensitive_limit() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app).from_ip("203.0.113.30");
    // Teachers are refused by the handler, but each try still spends a token
    let token = jwt::teacher_token(&state);
    let body = json!({"join_code": "ABCD2345"});

    let mut statuses = Vec::new();
    for _ in 0..5 {
        let response = client
            .send_with_bearer("POST", "/v1/sections/join", &token, Some(body.clone()))
            .await;
        statuses.push(response.status);
    }

    assert_eq!(&statuses[..3], &[StatusCode::FORBIDDEN; 3], "{statuses:?}");
    assert_eq!(statuses[4], StatusCode::TOO_MANY_REQUESTS, "{statuses:?}");
}

#[tokio::test]
async fn test_limited_response_carries_headers() {
    let (app, _) = common::test_app();
    let client = TestClient::new(app).from_ip("203.0.113.40");
    let body = json!({"email": "", "password": ""});

    let mut limited = None;
    for _ in 0..20 {
        let response = client.post_json("/v1/users/login", &body).await;
        if response.status == StatusCode::TOO_MANY_REQUESTS {
            limited = Some(response);
            break;
        }
    }

    let limited = limited.expect("Requests beyond the burst should be limited");
    assert!(
        limited.headers.contains_key("x-ratelimit-after")
            || limited.headers.contains_key("retry-after"),
        "429 should say when to retry: {:?}",
        limited.headers
    );
}
