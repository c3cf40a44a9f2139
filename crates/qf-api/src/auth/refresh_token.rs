use base64::Engine;
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

use qf_db::repositories::token as token_repo;

/// Generate a cryptographically secure random refresh token
/// Returns the token string (to send to client) and its SHA-256 hash (to store in DB)
pub fn generate_refresh_token() -> (String, String) {
    let mut token_bytes = [0u8; 32];
    rand::thread_rng().fill(&mut token_bytes);

    let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_bytes);
    let token_hash = hash_refresh_token(&token);

    (token, token_hash)
}

/// SHA-256 of the token as lowercase hex
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Store a refresh token in the database
pub async fn store_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    device_info: Option<&str>,
    expiry_days: i64,
) -> Result<Uuid, ApiError> {
    let expires_at = Utc::now() + chrono::Duration::days(expiry_days);

    let token_id =
        token_repo::store_refresh_token(pool, user_id, token_hash, device_info, expires_at).await?;

    Ok(token_id)
}

/// Verify a refresh token and rotate it
///
/// The old token is deleted and a new one stored in the same transaction, so
/// a token can be exchanged at most once. Returns the user id and the new
/// plaintext token.
pub async fn verify_and_rotate_refresh_token(
    pool: &PgPool,
    token: &str,
    expiry_days: i64,
) -> Result<(Uuid, String), ApiError> {
    let token_hash = hash_refresh_token(token);

    let mut tx = pool.begin().await?;

    let record = token_repo::find_refresh_token_for_update(&mut *tx, &token_hash)
        .await?
        .ok_or_else(|| ApiError::Auth("Invalid refresh token".to_string()))?;

    if record.expires_at < Utc::now() {
        token_repo::delete_refresh_token(&mut *tx, record.id).await?;
        tx.commit().await?;
        return Err(ApiError::Auth("Refresh token expired".to_string()));
    }

    token_repo::delete_refresh_token(&mut *tx, record.id).await?;

    let (new_token, new_token_hash) = generate_refresh_token();
    let new_expires_at = Utc::now() + chrono::Duration::days(expiry_days);

    token_repo::store_refresh_token(
        &mut *tx,
        record.user_id,
        &new_token_hash,
        record.device_info.as_deref(),
        new_expires_at,
    )
    .await?;

    tx.commit().await?;

    Ok((record.user_id, new_token))
}

/// Revoke a specific refresh token; unknown tokens are ignored
pub async fn revoke_refresh_token(pool: &PgPool, token: &str) -> Result<u64, ApiError> {
    let rows = token_repo::delete_refresh_token_by_hash(pool, &hash_refresh_token(token)).await?;
    Ok(rows)
}

/// Revoke all refresh tokens for a user (logout from all devices)
pub async fn revoke_all_user_tokens(pool: &PgPool, user_id: Uuid) -> Result<u64, ApiError> {
    let rows = token_repo::delete_all_user_refresh_tokens(pool, user_id).await?;
    Ok(rows)
}
