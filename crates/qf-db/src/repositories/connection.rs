use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{Connection, ConnectionStatus, ConnectionWithUser};

/// Whether any link already exists between the two users, in either direction.
pub async fn exists_between<'e, E>(executor: E, a: Uuid, b: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT EXISTS(
                SELECT 1 FROM connections
                WHERE (requester_id = $1 AND recipient_id = $2)
                   OR (requester_id = $2 AND recipient_id = $1)
            )
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_one(executor)
    .await
}

pub async fn create_connection<'e, E>(
    executor: E,
    requester_id: Uuid,
    recipient_id: Uuid,
) -> Result<Connection, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO connections (requester_id, recipient_id)
            VALUES ($1, $2)
            RETURNING id, requester_id, recipient_id, status, created_at, responded_at
        "#,
    )
    .bind(requester_id)
    .bind(recipient_id)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id<'e, E>(
    executor: E,
    connection_id: Uuid,
) -> Result<Option<Connection>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, requester_id, recipient_id, status, created_at, responded_at
            FROM connections
            WHERE id = $1
        "#,
    )
    .bind(connection_id)
    .fetch_optional(executor)
    .await
}

/// List links involving `user_id`, optionally filtered by status.
pub async fn list_for_user<'e, E>(
    executor: E,
    user_id: Uuid,
    status: Option<ConnectionStatus>,
) -> Result<Vec<ConnectionWithUser>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                c.id,
                c.status,
                (c.requester_id = $1) as outgoing,
                c.created_at,
                c.responded_at,
                u.id as other_user_id,
                u.username as other_username,
                u.display_name as other_display_name,
                u.role as other_role
            FROM connections c
            JOIN users u
                ON u.id = CASE WHEN c.requester_id = $1 THEN c.recipient_id ELSE c.requester_id END
            WHERE (c.requester_id = $1 OR c.recipient_id = $1)
                AND ($2::connection_status IS NULL OR c.status = $2)
            ORDER BY c.created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(status)
    .fetch_all(executor)
    .await
}

/// Resolve a pending request. Returns `None` if it was no longer pending.
pub async fn respond<'e, E>(
    executor: E,
    connection_id: Uuid,
    status: ConnectionStatus,
) -> Result<Option<Connection>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE connections
            SET status = $2, responded_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING id, requester_id, recipient_id, status, created_at, responded_at
        "#,
    )
    .bind(connection_id)
    .bind(status)
    .fetch_optional(executor)
    .await
}

pub async fn delete_connection<'e, E>(executor: E, connection_id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM connections
            WHERE id = $1
        "#,
    )
    .bind(connection_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
