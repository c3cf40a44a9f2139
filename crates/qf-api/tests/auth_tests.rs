use crate::common::{self, TestClient};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use qf_api::auth::jwt::Claims;
use qf_db::models::UserRole;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_me_requires_authentication() {
    let (app, _) = common::test_app();
    let client = TestClient::new(app);

    let response = client.get("/v1/auth/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_message(), "Not authenticated");
}

#[tokio::test]
async fn test_garbage_bearer_token_is_rejected() {
    let (app, _) = common::test_app();
    let client = TestClient::new(app);

    let response = client
        .send_with_bearer("GET", "/v1/auth/me", "not.a.jwt", None)
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_message(), "Invalid or expired token");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let (app, _) = common::test_app();
    let client = TestClient::new(app);

    let token = qf_api::auth::jwt::generate_jwt_token(
        Uuid::new_v4(),
        "someone@example.com",
        UserRole::Teacher,
        "a_completely_different_secret_of_32_bytes",
        24,
    )
    .expect("Token should be generated");

    let response = client.send_with_bearer("GET", "/v1/quizzes", &token, None).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app);

    let issued = Utc::now() - Duration::hours(3);
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        email: "late@example.com".to_string(),
        role: UserRole::Student,
        exp: (issued + Duration::hours(1)).timestamp() as usize,
        iat: issued.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.jwt_secret.as_bytes()),
    )
    .expect("Token should encode");

    let response = client.send_with_bearer("GET", "/v1/attempts", &token, None).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let (app, _) = common::test_app();
    let client = TestClient::new(app);

    let cases = [
        (
            json!({"username": "ms_rivera", "email": "not-an-email", "password": "correct horse 42", "role": "teacher"}),
            "email",
        ),
        (
            json!({"username": "ms_rivera", "email": "rivera@example.com", "password": "short", "role": "teacher"}),
            "Password",
        ),
        (
            json!({"username": "ms_rivera", "email": "rivera@example.com", "password": "correct horse 42", "role": "admin"}),
            "Role",
        ),
        (
            json!({"username": "no spaces allowed", "email": "rivera@example.com", "password": "correct horse 42", "role": "student"}),
            "Username",
        ),
    ];

    for (body, expected) in cases {
        let response = client.post_json("/v1/users/register", &body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let message = response.error_message();
        assert!(
            message.to_lowercase().contains(&expected.to_lowercase()),
            "Expected message about {expected}, got: {message}"
        );
    }
}

#[tokio::test]
async fn test_login_requires_email_and_password() {
    let (app, _) = common::test_app();
    let client = TestClient::new(app);

    let response = client
        .post_json("/v1/users/login", &json!({"email": "  ", "password": ""}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.error_message(), "Email and password are required");
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let (app, _) = common::test_app();
    let client = TestClient::new(app);

    let response = client.post_json("/v1/users/login", &json!({"email": 42})).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(!response.error_message().is_empty());
}
