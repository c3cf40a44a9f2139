use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{Flashcard, FlashcardSet, FlashcardSetSummary, NewFlashcard, Visibility};

pub async fn create_set<'e, E>(
    executor: E,
    owner_id: Uuid,
    title: &str,
    description: Option<&str>,
    visibility: Visibility,
) -> Result<FlashcardSet, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO flashcard_sets (owner_id, title, description, visibility)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, title, description, visibility, created_at, updated_at
        "#,
    )
    .bind(owner_id)
    .bind(title)
    .bind(description)
    .bind(visibility)
    .fetch_one(executor)
    .await
}

/// Insert cards in one round trip; positions follow slice order.
pub async fn insert_cards<'e, E>(
    executor: E,
    set_id: Uuid,
    cards: &[NewFlashcard],
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let terms: Vec<&str> = cards.iter().map(|c| c.term.as_str()).collect();
    let definitions: Vec<&str> = cards.iter().map(|c| c.definition.as_str()).collect();

    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO flashcards (set_id, position, term, definition)
            SELECT $1, (t.ord - 1)::int, t.term, t.definition
            FROM UNNEST($2::text[], $3::text[]) WITH ORDINALITY AS t(term, definition, ord)
        "#,
    )
    .bind(set_id)
    .bind(terms)
    .bind(definitions)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn delete_cards<'e, E>(executor: E, set_id: Uuid) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM flashcards
            WHERE set_id = $1
        "#,
    )
    .bind(set_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_set<'e, E>(executor: E, set_id: Uuid) -> Result<Option<FlashcardSet>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, owner_id, title, description, visibility, created_at, updated_at
            FROM flashcard_sets
            WHERE id = $1
        "#,
    )
    .bind(set_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_cards<'e, E>(executor: E, set_id: Uuid) -> Result<Vec<Flashcard>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, position, term, definition
            FROM flashcards
            WHERE set_id = $1
            ORDER BY position
        "#,
    )
    .bind(set_id)
    .fetch_all(executor)
    .await
}

pub async fn list_owned<'e, E>(
    executor: E,
    owner_id: Uuid,
) -> Result<Vec<FlashcardSetSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                fs.id,
                fs.owner_id,
                u.username as owner_username,
                fs.title,
                fs.description,
                fs.visibility,
                (SELECT COUNT(*) FROM flashcards f WHERE f.set_id = fs.id) as card_count,
                fs.updated_at
            FROM flashcard_sets fs
            JOIN users u ON u.id = fs.owner_id
            WHERE fs.owner_id = $1
            ORDER BY fs.updated_at DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await
}

pub async fn list_public<'e, E>(
    executor: E,
    limit: i64,
    offset: i64,
) -> Result<Vec<FlashcardSetSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                fs.id,
                fs.owner_id,
                u.username as owner_username,
                fs.title,
                fs.description,
                fs.visibility,
                (SELECT COUNT(*) FROM flashcards f WHERE f.set_id = fs.id) as card_count,
                fs.updated_at
            FROM flashcard_sets fs
            JOIN users u ON u.id = fs.owner_id
            WHERE fs.visibility = 'public'
            ORDER BY fs.created_at DESC
            LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub async fn update_set<'e, E>(
    executor: E,
    set_id: Uuid,
    title: &str,
    description: Option<&str>,
    visibility: Visibility,
) -> Result<FlashcardSet, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            UPDATE flashcard_sets
            SET title = $2, description = $3, visibility = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, title, description, visibility, created_at, updated_at
        "#,
    )
    .bind(set_id)
    .bind(title)
    .bind(description)
    .bind(visibility)
    .fetch_one(executor)
    .await
}

pub async fn delete_set<'e, E>(executor: E, set_id: Uuid) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            DELETE FROM flashcard_sets
            WHERE id = $1
        "#,
    )
    .bind(set_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
