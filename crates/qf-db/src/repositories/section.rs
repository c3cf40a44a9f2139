use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{Section, SectionMember, SectionSummary};

pub async fn create_section<'e, E>(
    executor: E,
    owner_id: Uuid,
    name: &str,
    description: Option<&str>,
    join_code: &str,
) -> Result<Section, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO sections (owner_id, name, description, join_code)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, name, description, join_code, created_at, updated_at
        "#,
    )
    .bind(owner_id)
    .bind(name)
    .bind(description)
    .bind(join_code)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id<'e, E>(executor: E, section_id: Uuid) -> Result<Option<Section>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, owner_id, name, description, join_code, created_at, updated_at
            FROM sections
            WHERE id = $1
        "#,
    )
    .bind(section_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_by_join_code<'e, E>(
    executor: E,
    join_code: &str,
) -> Result<Option<Section>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, owner_id, name, description, join_code, created_at, updated_at
            FROM sections
            WHERE join_code = $1
        "#,
    )
    .bind(join_code)
    .fetch_optional(executor)
    .await
}

pub async fn list_owned<'e, E>(executor: E, owner_id: Uuid) -> Result<Vec<SectionSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                s.id,
                s.owner_id,
                u.username as owner_username,
                s.name,
                s.description,
                (SELECT COUNT(*) FROM section_members sm WHERE sm.section_id = s.id) as member_count,
                s.created_at
            FROM sections s
            JOIN users u ON u.id = s.owner_id
            WHERE s.owner_id = $1
            ORDER BY s.created_at DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await
}

pub async fn list_joined<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<SectionSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                s.id,
                s.owner_id,
                u.username as owner_username,
                s.name,
                s.description,
                (SELECT COUNT(*) FROM section_members sm2 WHERE sm2.section_id = s.id) as member_count,
                s.created_at
            FROM section_members sm
            JOIN sections s ON s.id = sm.section_id
            JOIN users u ON u.id = s.owner_id
            WHERE sm.user_id = $1
            ORDER BY sm.joined_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn list_members<'e, E>(
    executor: E,
    section_id: Uuid,
) -> Result<Vec<SectionMember>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT u.id as user_id, u.username, u.display_name, sm.joined_at
            FROM section_members sm
            JOIN users u ON u.id = sm.user_id
            WHERE sm.section_id = $1
            ORDER BY u.username
        "#,
    )
    .bind(section_id)
    .fetch_all(executor)
    .await
}

pub async fn is_member<'e, E>(executor: E, section_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT EXISTS(
                SELECT 1 FROM section_members
                WHERE section_id = $1 AND user_id = $2
            )
        "#,
    )
    .bind(section_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Whether `user_id` belongs to any section owned by `owner_id`.
pub async fn is_member_of_owner<'e, E>(
    executor: E,
    owner_id: Uuid,
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
                FROM section_members sm
                JOIN sections s ON s.id = sm.section_id
                WHERE s.owner_id = $1 AND sm.user_id = $2
            )
        "#,
    )
    .bind(owner_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Add a member. Returns `false` when they already belong to the section.
pub async fn add_member<'e, E>(executor: E, section_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO section_members (section_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
        "#,
    )
    .bind(section_id)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn remove_member<'e, E>(
    executor: E,
    section_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM section_members
            WHERE section_id = $1 AND user_id = $2
        "#,
    )
    .bind(section_id)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_section<'e, E>(
    executor: E,
    section_id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Section, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE sections
            SET name = COALESCE($2, name),
                description = CASE WHEN $3::text IS NULL THEN description ELSE NULLIF($3, '') END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, name, description, join_code, created_at, updated_at
        "#,
    )
    .bind(section_id)
    .bind(name)
    .bind(description)
    .fetch_one(executor)
    .await
}

pub async fn update_join_code<'e, E>(
    executor: E,
    section_id: Uuid,
    join_code: &str,
) -> Result<Section, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE sections
            SET join_code = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, name, description, join_code, created_at, updated_at
        "#,
    )
    .bind(section_id)
    .bind(join_code)
    .fetch_one(executor)
    .await
}

pub async fn delete_section<'e, E>(executor: E, section_id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM sections
            WHERE id = $1
        "#,
    )
    .bind(section_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Count how many of `section_ids` are owned by `owner_id`.
pub async fn count_owned<'e, E>(
    executor: E,
    owner_id: Uuid,
    section_ids: &[Uuid],
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*)
            FROM sections
            WHERE owner_id = $1 AND id = ANY($2)
        "#,
    )
    .bind(owner_id)
    .bind(section_ids)
    .fetch_one(executor)
    .await
}
