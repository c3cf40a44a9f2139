use axum::Router;

use crate::{attempt, auth, connection, flashcard, quiz, section, state::ApiState, user};

/// V1 API routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .merge(auth::routes())
        .merge(user::routes())
        .merge(section::routes())
        .merge(connection::routes())
        .merge(flashcard::routes())
        .merge(quiz::routes())
        .merge(attempt::routes())
}
