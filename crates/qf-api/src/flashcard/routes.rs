use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use qf_db::{
    models::{FlashcardSet, FlashcardSetSummary, Quiz, QuizDraft, Visibility},
    repositories::{
        flashcard as flashcard_repo, quiz as quiz_repo, section as section_repo,
    },
};
use qf_grading::{SourceCard, generate_questions};
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{FlashcardSetDetail, FlashcardSetInput, GenerateQuizRequest, MAX_TITLE_LEN};
use crate::{
    ApiState,
    auth::{AuthUser, RequireTeacher},
    cache::keys,
    error::ApiError,
    extract::JsonBody,
    middleware::rate_limit,
    validation::{PageQuery, optional_text},
};

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    Router::new()
        .route("/flashcard-sets", post(create_set).get(list_own_sets))
        .route("/flashcard-sets/public", get(list_public_sets))
        .route(
            "/flashcard-sets/{id}",
            get(get_set).put(replace_set).delete(delete_set),
        )
        .route("/flashcard-sets/{id}/generate-quiz", post(generate_quiz))
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_PERIOD,
            rate_limit::GENERAL_BURST_SIZE
        ))
}

/// Load a set the user may read; sets they may not see are reported as missing
async fn readable_set(pool: &PgPool, set_id: Uuid, user: &AuthUser) -> Result<FlashcardSet, ApiError> {
    let not_found = || ApiError::NotFound("Flashcard set not found".to_string());
    let set = flashcard_repo::find_set(pool, set_id).await?.ok_or_else(not_found)?;

    let allowed = match set.visibility {
        _ if set.owner_id == user.user_id => true,
        Visibility::Public => true,
        Visibility::Sections => {
            section_repo::is_member_of_owner(pool, set.owner_id, user.user_id).await?
        }
        Visibility::Private => false,
    };

    if allowed { Ok(set) } else { Err(not_found()) }
}

async fn owned_set(pool: &PgPool, set_id: Uuid, user: &AuthUser) -> Result<FlashcardSet, ApiError> {
    flashcard_repo::find_set(pool, set_id)
        .await?
        .filter(|s| s.owner_id == user.user_id)
        .ok_or_else(|| ApiError::NotFound("Flashcard set not found".to_string()))
}

fn invalidate_public_sets(state: &ApiState) {
    state.cache.delete_prefix(keys::PUBLIC_FLASHCARD_SETS_PREFIX);
}

async fn create_set(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    JsonBody(payload): JsonBody<FlashcardSetInput>,
) -> Result<(StatusCode, Json<FlashcardSetDetail>), ApiError> {
    let valid = payload.validate()?;

    let mut tx = state.pool.begin().await?;
    let set = flashcard_repo::create_set(
        &mut *tx,
        auth_user.user_id,
        &valid.title,
        valid.description.as_deref(),
        valid.visibility,
    )
    .await?;
    flashcard_repo::insert_cards(&mut *tx, set.id, &valid.cards).await?;
    let cards = flashcard_repo::find_cards(&mut *tx, set.id).await?;
    tx.commit().await?;

    if set.visibility == Visibility::Public {
        invalidate_public_sets(&state);
    }
    tracing::info!(set_id = %set.id, cards = cards.len(), "Flashcard set created");

    Ok((StatusCode::CREATED, Json(FlashcardSetDetail { set, cards })))
}

async fn list_own_sets(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<FlashcardSetSummary>>, ApiError> {
    let sets = flashcard_repo::list_owned(&state.pool, auth_user.user_id).await?;
    Ok(Json(sets))
}

async fn list_public_sets(
    _auth_user: AuthUser,
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<FlashcardSetSummary>>, ApiError> {
    let page = query.page()?;
    let key = keys::public_flashcard_sets(page);
    if let Some(cached) = state.cache.get::<Vec<FlashcardSetSummary>>(&key) {
        return Ok(Json(cached));
    }

    let (limit, offset) = query.limit_offset()?;
    let sets = flashcard_repo::list_public(&state.pool, limit, offset).await?;
    state.cache.set(key, &sets);

    Ok(Json(sets))
}

async fn get_set(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(set_id): Path<Uuid>,
) -> Result<Json<FlashcardSetDetail>, ApiError> {
    let set = readable_set(&state.pool, set_id, &auth_user).await?;
    let cards = flashcard_repo::find_cards(&state.pool, set.id).await?;
    Ok(Json(FlashcardSetDetail { set, cards }))
}

async fn replace_set(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(set_id): Path<Uuid>,
    JsonBody(payload): JsonBody<FlashcardSetInput>,
) -> Result<Json<FlashcardSetDetail>, ApiError> {
    let valid = payload.validate()?;
    let previous = owned_set(&state.pool, set_id, &auth_user).await?;

    let mut tx = state.pool.begin().await?;
    let set = flashcard_repo::update_set(
        &mut *tx,
        set_id,
        &valid.title,
        valid.description.as_deref(),
        valid.visibility,
    )
    .await?;
    flashcard_repo::delete_cards(&mut *tx, set_id).await?;
    flashcard_repo::insert_cards(&mut *tx, set_id, &valid.cards).await?;
    let cards = flashcard_repo::find_cards(&mut *tx, set_id).await?;
    tx.commit().await?;

    if previous.visibility == Visibility::Public || set.visibility == Visibility::Public {
        invalidate_public_sets(&state);
    }

    Ok(Json(FlashcardSetDetail { set, cards }))
}

async fn delete_set(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(set_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let set = owned_set(&state.pool, set_id, &auth_user).await?;
    flashcard_repo::delete_set(&state.pool, set_id).await?;

    if set.visibility == Visibility::Public {
        invalidate_public_sets(&state);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Build a private multiple-choice quiz from a readable set
async fn generate_quiz(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<ApiState>,
    Path(set_id): Path<Uuid>,
    JsonBody(payload): JsonBody<GenerateQuizRequest>,
) -> Result<(StatusCode, Json<Quiz>), ApiError> {
    payload.validate()?;
    let title = optional_text("Title", payload.title.as_deref(), MAX_TITLE_LEN)?;

    let set = readable_set(&state.pool, set_id, &teacher).await?;
    let cards: Vec<SourceCard> = flashcard_repo::find_cards(&state.pool, set.id)
        .await?
        .into_iter()
        .map(|c| SourceCard {
            term: c.term,
            definition: c.definition,
        })
        .collect();

    let questions = generate_questions(&cards, payload.question_count, &mut rand::thread_rng())?;

    let title = title.unwrap_or_else(|| {
        let mut t = format!("{} quiz", set.title);
        if t.chars().count() > MAX_TITLE_LEN {
            t = set.title.clone();
        }
        t
    });
    let draft = QuizDraft {
        title: &title,
        description: set.description.as_deref(),
        visibility: Visibility::Private,
        time_limit_minutes: None,
        source_set_id: Some(set.id),
    };

    let mut tx = state.pool.begin().await?;
    let quiz = quiz_repo::create_quiz(&mut *tx, teacher.user_id, &draft).await?;
    quiz_repo::insert_questions(&mut *tx, quiz.id, &questions).await?;
    tx.commit().await?;

    tracing::info!(
        quiz_id = %quiz.id,
        %set_id,
        questions = questions.len(),
        "Quiz generated from flashcard set"
    );

    Ok((StatusCode::CREATED, Json(quiz)))
}
