use crate::common::{self, TestClient, jwt};
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_quiz_without_questions_is_rejected() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app);
    let token = jwt::teacher_token(&state);

    let response = client
        .send_with_bearer(
            "POST",
            "/v1/quizzes",
            &token,
            Some(json!({"title": "Empty", "questions": []})),
        )
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.error_message().contains("questions"));
}

#[tokio::test]
async fn test_invalid_question_is_reported_by_position() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app);
    let token = jwt::teacher_token(&state);

    let body = json!({
        "title": "Geography",
        "questions": [
            {"prompt": "Capital of Peru?", "type": "short_answer", "accepted": ["Lima"]},
            {"prompt": "Largest ocean?", "type": "multiple_choice", "options": ["Pacific", "Atlantic"], "correct": 7}
        ]
    });
    let response = client
        .send_with_bearer("POST", "/v1/quizzes", &token, Some(body))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(
        response.error_message().starts_with("Question 2"),
        "{}",
        response.error_message()
    );
}

#[tokio::test]
async fn test_quiz_time_limit_bounds() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app);
    let token = jwt::teacher_token(&state);

    let body = json!({
        "title": "Timed",
        "time_limit_minutes": 601,
        "questions": [{"prompt": "Ready?", "type": "true_false", "correct": true}]
    });
    let response = client
        .send_with_bearer("POST", "/v1/quizzes", &token, Some(body))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rating_out_of_range() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app);
    let token = jwt::student_token(&state);
    let uri = format!("/v1/quizzes/{}/rating", Uuid::new_v4());

    for rating in [0, 6, -1] {
        let response = client
            .send_with_bearer("POST", &uri, &token, Some(json!({ "rating": rating })))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.error_message(), "Rating must be between 1 and 5");
    }
}

#[tokio::test]
async fn test_publish_needs_sections() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app);
    let token = jwt::teacher_token(&state);

    let response = client
        .send_with_bearer(
            "POST",
            &format!("/v1/quizzes/{}/publish", Uuid::new_v4()),
            &token,
            Some(json!({"section_ids": []})),
        )
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_flashcard_set_validation() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app);
    let token = jwt::teacher_token(&state);

    let no_cards = json!({"title": "Spanish verbs", "cards": []});
    let response = client
        .send_with_bearer("POST", "/v1/flashcard-sets", &token, Some(no_cards))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let blank_title = json!({"title": "  ", "cards": [{"term": "ser", "definition": "to be"}]});
    let response = client
        .send_with_bearer("POST", "/v1/flashcard-sets", &token, Some(blank_title))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.error_message(), "Title is required");
}

#[tokio::test]
async fn test_generate_quiz_question_count() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app);
    let token = jwt::teacher_token(&state);

    let response = client
        .send_with_bearer(
            "POST",
            &format!("/v1/flashcard-sets/{}/generate-quiz", Uuid::new_v4()),
            &token,
            Some(json!({"question_count": 0})),
        )
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_public_listing_page_bounds() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app);
    let token = jwt::student_token(&state);

    for uri in ["/v1/quizzes/public?page=0", "/v1/flashcard-sets/public?page=501"] {
        let response = client.send_with_bearer("GET", uri, &token, None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_section_name_required() {
    let (app, state) = common::test_app();
    let client = TestClient::new(app);
    let token = jwt::teacher_token(&state);

    let response = client
        .send_with_bearer("POST", "/v1/sections", &token, Some(json!({"name": ""})))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.error_message(), "Name is required");
}
