use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use qf_db::models::UserRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id as string
    pub email: String,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

/// Generate an access token for a user
pub fn generate_jwt_token(
    user_id: Uuid,
    email: &str,
    role: UserRole,
    jwt_secret: &str,
    expiry_hours: i64,
) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::hours(expiry_hours)).timestamp() as usize,
    };

    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode an access token
pub fn verify_jwt_token(token: &str, jwt_secret: &str) -> Result<Claims, ApiError> {
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Auth("Invalid or expired token".to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_jwt_secret_minimum_32_characters_long";

    #[test]
    fn test_generate_and_verify_jwt_token() {
        let user_id = Uuid::new_v4();

        let token = generate_jwt_token(user_id, "teacher@example.com", UserRole::Teacher, SECRET, 24)
            .expect("Failed to generate token");
        assert!(!token.is_empty(), "Token should not be empty");

        let claims = verify_jwt_token(&token, SECRET).expect("Failed to verify token");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "teacher@example.com");
        assert_eq!(claims.role, UserRole::Teacher);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_jwt_token_with_wrong_secret() {
        let token = generate_jwt_token(Uuid::new_v4(), "a@example.com", UserRole::Student, SECRET, 24)
            .expect("Failed to generate token");

        let result = verify_jwt_token(&token, "wrong_jwt_secret_minimum_32_characters_long");
        match result {
            Err(ApiError::Auth(msg)) => assert!(msg.contains("Invalid or expired token")),
            other => panic!("Expected Auth error, got {other:?}"),
        }
    }

    #[test]
    fn test_verify_invalid_jwt_token() {
        assert!(matches!(
            verify_jwt_token("invalid.jwt.token", SECRET),
            Err(ApiError::Auth(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Expired well past the default 60s leeway
        let token = generate_jwt_token(Uuid::new_v4(), "a@example.com", UserRole::Student, SECRET, -2)
            .expect("Failed to generate token");
        assert!(verify_jwt_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_jwt_token_expiration() {
        let token = generate_jwt_token(Uuid::new_v4(), "a@example.com", UserRole::Student, SECRET, 24)
            .expect("Failed to generate token");
        let claims = verify_jwt_token(&token, SECRET).expect("Failed to verify token");

        let expiration_duration = claims.exp - claims.iat;
        assert!(
            (86390..=86410).contains(&expiration_duration),
            "Token should expire in approximately 24 hours, got {expiration_duration} seconds"
        );
    }
}
