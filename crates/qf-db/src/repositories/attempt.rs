use sqlx::{Executor, Postgres, types::Json};
use uuid::Uuid;

use crate::models::{
    Attempt, AttemptWithQuiz, AttemptWithUser, GradedSubmission, LiveAttempt, SubmissionStats,
};

const ATTEMPT_COLUMNS: &str = "id, quiz_id, user_id, status, answers, report, score, max_score, \
     percentage, answered_count, focus_lost_count, late, started_at, last_heartbeat_at, submitted_at";

/// Start an attempt unless one is already open for this quiz and user.
///
/// Returns `None` when an open attempt exists; the caller should fetch it
/// with [`find_open`].
pub async fn create_attempt<'e, E>(
    executor: E,
    quiz_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Attempt>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        // language=PostgreSQL
        r#"
            INSERT INTO quiz_attempts (quiz_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (quiz_id, user_id) WHERE status = 'in_progress' DO NOTHING
            RETURNING {ATTEMPT_COLUMNS}
        "#
    ))
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_open<'e, E>(
    executor: E,
    quiz_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Attempt>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        // language=PostgreSQL
        r#"
            SELECT {ATTEMPT_COLUMNS}
            FROM quiz_attempts
            WHERE quiz_id = $1 AND user_id = $2 AND status = 'in_progress'
        "#
    ))
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_by_id<'e, E>(executor: E, attempt_id: Uuid) -> Result<Option<Attempt>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        // language=PostgreSQL
        r#"
            SELECT {ATTEMPT_COLUMNS}
            FROM quiz_attempts
            WHERE id = $1
        "#
    ))
    .bind(attempt_id)
    .fetch_optional(executor)
    .await
}

/// Fetch an attempt and lock it until the surrounding transaction ends.
pub async fn find_for_update<'e, E>(
    executor: E,
    attempt_id: Uuid,
) -> Result<Option<Attempt>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        // language=PostgreSQL
        r#"
            SELECT {ATTEMPT_COLUMNS}
            FROM quiz_attempts
            WHERE id = $1
            FOR UPDATE
        "#
    ))
    .bind(attempt_id)
    .fetch_optional(executor)
    .await
}

/// Record client-reported progress on an open attempt.
///
/// Counters only move forward; returns `None` if the attempt is not open.
pub async fn update_progress<'e, E>(
    executor: E,
    attempt_id: Uuid,
    answered_count: i32,
    focus_lost_count: i32,
) -> Result<Option<Attempt>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(&format!(
        // language=PostgreSQL
        r#"
            UPDATE quiz_attempts
            SET answered_count = GREATEST(answered_count, $2),
                focus_lost_count = GREATEST(focus_lost_count, $3),
                last_heartbeat_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING {ATTEMPT_COLUMNS}
        "#
    ))
    .bind(attempt_id)
    .bind(answered_count)
    .bind(focus_lost_count)
    .fetch_optional(executor)
    .await
}

pub async fn submit<'e, E>(
    executor: E,
    attempt_id: Uuid,
    submission: &GradedSubmission,
) -> Result<Attempt, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let report = &submission.report;
    let answered = i32::try_from(submission.answers.len()).unwrap_or(i32::MAX);

    sqlx::query_as(&format!(
        // language=PostgreSQL
        r#"
            UPDATE quiz_attempts
            SET status = 'submitted',
                answers = $2,
                report = $3,
                score = $4,
                max_score = $5,
                percentage = $6,
                late = $7,
                answered_count = $8,
                last_heartbeat_at = NOW(),
                submitted_at = NOW()
            WHERE id = $1
            RETURNING {ATTEMPT_COLUMNS}
        "#
    ))
    .bind(attempt_id)
    .bind(Json(&submission.answers))
    .bind(Json(report))
    .bind(i32::try_from(report.score).unwrap_or(i32::MAX))
    .bind(i32::try_from(report.max_score).unwrap_or(i32::MAX))
    .bind(report.percentage)
    .bind(submission.late)
    .bind(answered)
    .fetch_one(executor)
    .await
}

pub async fn list_for_quiz<'e, E>(
    executor: E,
    quiz_id: Uuid,
) -> Result<Vec<AttemptWithUser>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                a.id,
                a.user_id,
                u.username,
                a.status,
                a.score,
                a.max_score,
                a.percentage,
                a.late,
                a.focus_lost_count,
                a.started_at,
                a.submitted_at
            FROM quiz_attempts a
            JOIN users u ON u.id = a.user_id
            WHERE a.quiz_id = $1
            ORDER BY a.started_at DESC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub async fn list_for_user<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Vec<AttemptWithQuiz>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                a.id,
                a.quiz_id,
                q.title as quiz_title,
                a.status,
                a.score,
                a.max_score,
                a.percentage,
                a.late,
                a.started_at,
                a.submitted_at
            FROM quiz_attempts a
            JOIN quizzes q ON q.id = a.quiz_id
            WHERE a.user_id = $1
            ORDER BY a.started_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn list_live<'e, E>(executor: E, quiz_id: Uuid) -> Result<Vec<LiveAttempt>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                a.id as attempt_id,
                a.user_id,
                u.username,
                a.answered_count,
                a.focus_lost_count,
                a.started_at,
                a.last_heartbeat_at
            FROM quiz_attempts a
            JOIN users u ON u.id = a.user_id
            WHERE a.quiz_id = $1 AND a.status = 'in_progress'
            ORDER BY a.started_at
        "#,
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

pub async fn submission_stats<'e, E>(
    executor: E,
    quiz_id: Uuid,
) -> Result<SubmissionStats, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                COUNT(*) as submitted_count,
                AVG(percentage)::float8 as average_percentage
            FROM quiz_attempts
            WHERE quiz_id = $1 AND status = 'submitted'
        "#,
    )
    .bind(quiz_id)
    .fetch_one(executor)
    .await
}

/// Mark open attempts without a heartbeat for `idle_hours` as abandoned.
pub async fn abandon_stale<'e, E>(executor: E, idle_hours: i32) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE quiz_attempts
            SET status = 'abandoned'
            WHERE status = 'in_progress'
                AND last_heartbeat_at < NOW() - make_interval(hours => $1)
        "#,
    )
    .bind(idle_hours)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
