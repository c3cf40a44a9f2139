use qf_db::{
    models::{User, UserRole},
    repositories::user as user_repo,
};
use sqlx::PgPool;

use super::validation;
use crate::error::ApiError;

/// Message for every failed login, so responses do not reveal which emails exist
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Hash a password with bcrypt off the async runtime
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Password hashing task failed: {e}")))??;
    Ok(hash)
}

/// Check a password against a bcrypt hash off the async runtime
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Password verification task failed: {e}")))??;
    Ok(valid)
}

/// Validated registration input
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

impl Registration {
    /// Validate raw input. Emails are compared case-insensitively, so they are
    /// lowercased here.
    pub fn parse(username: &str, email: &str, password: String, role: &str) -> Result<Self, ApiError> {
        let username = username.trim();
        let email = email.trim().to_lowercase();

        validation::validate_username(username)?;
        validation::validate_email(&email)?;
        validation::validate_password(&password)?;
        let role = role
            .parse::<UserRole>()
            .map_err(|_| ApiError::Validation("Role must be 'teacher' or 'student'".to_string()))?;

        Ok(Self {
            username: username.to_string(),
            email,
            password,
            role,
        })
    }
}

/// Create an account
pub async fn register_user(
    pool: &PgPool,
    registration: Registration,
    bcrypt_cost: u32,
) -> Result<User, ApiError> {
    let password_hash = hash_password(registration.password, bcrypt_cost).await?;

    match user_repo::create_user(
        pool,
        &registration.username,
        &registration.email,
        &password_hash,
        registration.role,
    )
    .await
    {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(db_err)) if db_err.constraint() == Some("users_email_key") => {
            Err(ApiError::Conflict("Email is already registered".to_string()))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.constraint() == Some("users_username_key") => {
            Err(ApiError::Conflict("Username is already taken".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Check credentials and return the user
pub async fn authenticate(pool: &PgPool, email: &str, password: String) -> Result<User, ApiError> {
    let email = email.trim().to_lowercase();

    let Some(credentials) = user_repo::find_credentials_by_email(pool, &email).await? else {
        return Err(ApiError::Auth(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(password, credentials.password_hash).await? {
        return Err(ApiError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    user_repo::find_by_id(pool, credentials.id)
        .await?
        .ok_or_else(|| ApiError::Auth(INVALID_CREDENTIALS.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_parse_normalizes() {
        let reg = Registration::parse(" teacher_1 ", " Teacher@Example.COM ", "password123".into(), "teacher")
            .expect("Registration should be valid");

        assert_eq!(reg.username, "teacher_1");
        assert_eq!(reg.email, "teacher@example.com");
        assert_eq!(reg.role, UserRole::Teacher);
    }

    #[test]
    fn test_registration_parse_rejects_unknown_role() {
        let result = Registration::parse("student1", "s@example.com", "password123".into(), "admin");
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_registration_parse_rejects_weak_password() {
        let result = Registration::parse("student1", "s@example.com", "password".into(), "student");
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_hash_and_verify_password() {
        let hash = hash_password("password123".to_string(), 4)
            .await
            .expect("Hashing should succeed");

        assert!(verify_password("password123".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong-password1".to_string(), hash).await.unwrap());
    }
}
