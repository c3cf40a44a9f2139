use qf_grading::Question;
use sqlx::{Executor, Postgres, types::Json};
use uuid::Uuid;

use crate::models::{QuestionRow, Quiz, QuizDraft, QuizSummary, RatingSummary, Visibility};

pub async fn create_quiz<'e, E>(
    executor: E,
    owner_id: Uuid,
    draft: &QuizDraft<'_>,
) -> Result<Quiz, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO quizzes (owner_id, title, description, visibility, time_limit_minutes, source_set_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner_id, title, description, visibility, time_limit_minutes,
                      source_set_id, rating_avg, rating_count, created_at, updated_at
        "#,
    )
    .bind(owner_id)
    .bind(draft.title)
    .bind(draft.description)
    .bind(draft.visibility)
    .bind(draft.time_limit_minutes)
    .bind(draft.source_set_id)
    .fetch_one(executor)
    .await
}

/// Insert questions in one round trip; positions follow slice order.
pub async fn insert_questions<'e, E>(
    executor: E,
    quiz_id: Uuid,
    questions: &[Question],
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
    let prompts: Vec<&str> = questions.iter().map(|q| q.prompt.as_str()).collect();
    let kinds: Vec<Json<&qf_grading::QuestionKind>> =
        questions.iter().map(|q| Json(&q.kind)).collect();
    let points: Vec<i32> = questions
        .iter()
        .map(|q| i32::try_from(q.points).unwrap_or(i32::MAX))
        .collect();

    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO quiz_questions (id, quiz_id, position, prompt, kind, points)
            SELECT t.id, $1, (t.ord - 1)::int, t.prompt, t.kind, t.points
            FROM UNNEST($2::uuid[], $3::text[], $4::jsonb[], $5::int[])
                WITH ORDINALITY AS t(id, prompt, kind, points, ord)
        "#,
    )
    .bind(quiz_id)
    .bind(ids)
    .bind(prompts)
    .bind(kinds)
    .bind(points)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_questions<'e, E>(executor: E, quiz_id: Uuid) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM quiz_questions
            WHERE quiz_id = $1
        "#,
    )
    .bind(quiz_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_quiz<'e, E>(executor: E, quiz_id: Uuid) -> Result<Option<Quiz>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, owner_id, title, description, visibility, time_limit_minutes,
                   source_set_id, rating_avg, rating_count, created_at, updated_at
            FROM quizzes
            WHERE id = $1
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_questions<'e, E>(executor: E, quiz_id: Uuid) -> Result<Vec<QuestionRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, position, prompt, kind, points
            FROM quiz_questions
            WHERE quiz_id = $1
            ORDER BY position
        "#,
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub async fn update_quiz<'e, E>(
    executor: E,
    quiz_id: Uuid,
    draft: &QuizDraft<'_>,
) -> Result<Quiz, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE quizzes
            SET title = $2,
                description = $3,
                visibility = $4,
                time_limit_minutes = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, title, description, visibility, time_limit_minutes,
                      source_set_id, rating_avg, rating_count, created_at, updated_at
        "#,
    )
    .bind(quiz_id)
    .bind(draft.title)
    .bind(draft.description)
    .bind(draft.visibility)
    .bind(draft.time_limit_minutes)
    .fetch_one(executor)
    .await
}

pub async fn delete_quiz<'e, E>(executor: E, quiz_id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM quizzes
            WHERE id = $1
        "#,
    )
    .bind(quiz_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn list_owned<'e, E>(executor: E, owner_id: Uuid) -> Result<Vec<QuizSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                q.id,
                q.owner_id,
                u.username as owner_username,
                q.title,
                q.description,
                q.visibility,
                q.time_limit_minutes,
                (SELECT COUNT(*) FROM quiz_questions qq WHERE qq.quiz_id = q.id) as question_count,
                q.rating_avg,
                q.rating_count,
                q.updated_at
            FROM quizzes q
            JOIN users u ON u.id = q.owner_id
            WHERE q.owner_id = $1
            ORDER BY q.updated_at DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await
}

/// Quizzes shared with any section the user belongs to.
pub async fn list_assigned<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<QuizSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT DISTINCT ON (q.id)
                q.id,
                q.owner_id,
                u.username as owner_username,
                q.title,
                q.description,
                q.visibility,
                q.time_limit_minutes,
                (SELECT COUNT(*) FROM quiz_questions qq WHERE qq.quiz_id = q.id) as question_count,
                q.rating_avg,
                q.rating_count,
                q.updated_at
            FROM section_members sm
            JOIN quiz_sections qs ON qs.section_id = sm.section_id
            JOIN quizzes q ON q.id = qs.quiz_id
            JOIN users u ON u.id = q.owner_id
            WHERE sm.user_id = $1 AND q.visibility <> 'private'
            ORDER BY q.id, q.updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn list_public<'e, E>(
    executor: E,
    limit: i64,
    offset: i64,
) -> Result<Vec<QuizSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                q.id,
                q.owner_id,
                u.username as owner_username,
                q.title,
                q.description,
                q.visibility,
                q.time_limit_minutes,
                (SELECT COUNT(*) FROM quiz_questions qq WHERE qq.quiz_id = q.id) as question_count,
                q.rating_avg,
                q.rating_count,
                q.updated_at
            FROM quizzes q
            JOIN users u ON u.id = q.owner_id
            WHERE q.visibility = 'public'
            ORDER BY q.created_at DESC
            LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

/// Whether the quiz is shared with a section that `user_id` belongs to.
pub async fn is_assigned_to_user<'e, E>(
    executor: E,
    quiz_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT EXISTS(
                SELECT 1
                FROM quiz_sections qs
                JOIN section_members sm ON sm.section_id = qs.section_id
                WHERE qs.quiz_id = $1 AND sm.user_id = $2
            )
        "#,
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn assign_sections<'e, E>(
    executor: E,
    quiz_id: Uuid,
    section_ids: &[Uuid],
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO quiz_sections (quiz_id, section_id)
            SELECT $1, s FROM UNNEST($2::uuid[]) AS s
            ON CONFLICT DO NOTHING
        "#,
    )
    .bind(quiz_id)
    .bind(section_ids)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn set_visibility<'e, E>(
    executor: E,
    quiz_id: Uuid,
    visibility: Visibility,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE quizzes
            SET visibility = $2, updated_at = NOW()
            WHERE id = $1
        "#,
    )
    .bind(quiz_id)
    .bind(visibility)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn has_submitted_attempts<'e, E>(executor: E, quiz_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT EXISTS(
                SELECT 1 FROM quiz_attempts
                WHERE quiz_id = $1 AND status = 'submitted'
            )
        "#,
    )
    .bind(quiz_id)
    .fetch_one(executor)
    .await
}

/// Lock the quiz row until the surrounding transaction ends.
pub async fn lock_quiz<'e, E>(executor: E, quiz_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let locked: Option<Uuid> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT id FROM quizzes
            WHERE id = $1
            FOR UPDATE
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(executor)
    .await?;
    Ok(locked.is_some())
}

/// Share-lock the quiz row so its questions cannot be replaced until commit
pub async fn lock_quiz_shared<'e, E>(executor: E, quiz_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let locked: Option<Uuid> = sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT id FROM quizzes
            WHERE id = $1
            FOR SHARE
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(executor)
    .await?;
    Ok(locked.is_some())
}

pub async fn upsert_rating<'e, E>(
    executor: E,
    quiz_id: Uuid,
    user_id: Uuid,
    rating: i16,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO quiz_ratings (quiz_id, user_id, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (quiz_id, user_id)
            DO UPDATE SET rating = $3, updated_at = NOW()
        "#,
    )
    .bind(quiz_id)
    .bind(user_id)
    .bind(rating)
    .execute(executor)
    .await?;
    Ok(())
}

/// Recompute the denormalized rating columns from `quiz_ratings`.
pub async fn refresh_rating<'e, E>(executor: E, quiz_id: Uuid) -> Result<RatingSummary, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE quizzes q
            SET rating_avg = COALESCE(r.avg, 0),
                rating_count = r.count
            FROM (
                SELECT AVG(rating)::float8 as avg, COUNT(*)::int as count
                FROM quiz_ratings
                WHERE quiz_id = $1
            ) r
            WHERE q.id = $1
            RETURNING q.rating_avg, q.rating_count
        "#,
    )
    .bind(quiz_id)
    .fetch_one(executor)
    .await
}
