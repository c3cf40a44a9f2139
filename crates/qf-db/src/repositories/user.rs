use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{PublicProfile, User, UserCredentials, UserRole};

pub async fn create_user<'e, E>(
    executor: E,
    username: &str,
    email: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, role, display_name, bio, profile_picture_url, created_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id<'e, E>(executor: E, user_id: Uuid) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, username, email, role, display_name, bio, profile_picture_url, created_at
            FROM users
            WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_credentials_by_email<'e, E>(
    executor: E,
    email: &str,
) -> Result<Option<UserCredentials>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, email, role, password_hash
            FROM users
            WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(executor)
    .await
}

pub async fn find_password_hash<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Option<String>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT password_hash
            FROM users
            WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_public_profile<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Option<PublicProfile>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, username, role, display_name, bio, profile_picture_url
            FROM users
            WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_public_profile_by_username<'e, E>(
    executor: E,
    username: &str,
) -> Result<Option<PublicProfile>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, username, role, display_name, bio, profile_picture_url
            FROM users
            WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(executor)
    .await
}

/// Update profile fields. `None` leaves a field unchanged, `Some("")` clears it.
pub async fn update_profile<'e, E>(
    executor: E,
    user_id: Uuid,
    display_name: Option<&str>,
    bio: Option<&str>,
    profile_picture_url: Option<&str>,
) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE users
            SET display_name = CASE WHEN $2::text IS NULL THEN display_name ELSE NULLIF($2, '') END,
                bio = CASE WHEN $3::text IS NULL THEN bio ELSE NULLIF($3, '') END,
                profile_picture_url = CASE WHEN $4::text IS NULL THEN profile_picture_url ELSE NULLIF($4, '') END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, role, display_name, bio, profile_picture_url, created_at
        "#,
    )
    .bind(user_id)
    .bind(display_name)
    .bind(bio)
    .bind(profile_picture_url)
    .fetch_one(executor)
    .await
}

pub async fn update_password_hash<'e, E>(
    executor: E,
    user_id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(password_hash)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_user<'e, E>(executor: E, user_id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM users
            WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
