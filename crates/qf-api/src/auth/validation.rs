use crate::error::ApiError;
use validator::ValidateEmail;

pub const MAX_DISPLAY_NAME_LEN: usize = 60;
pub const MAX_BIO_LEN: usize = 500;
const MAX_PICTURE_URL_LEN: usize = 2048;

/// Validate email format using the validator crate
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::Validation("Email cannot be empty".to_string()));
    }

    if !email.validate_email() {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }

    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(ApiError::Validation(
            "Password must be at most 128 characters long".to_string(),
        ));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_number = password.chars().any(|c| c.is_numeric());

    if !has_letter || !has_number {
        return Err(ApiError::Validation(
            "Password must contain at least one letter and one number".to_string(),
        ));
    }

    Ok(())
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::Validation("Username cannot be empty".to_string()));
    }

    if username.len() < 3 {
        return Err(ApiError::Validation(
            "Username must be at least 3 characters long".to_string(),
        ));
    }

    if username.len() > 30 {
        return Err(ApiError::Validation(
            "Username must be at most 30 characters long".to_string(),
        ));
    }

    // ASCII only; also keeps markup out of usernames
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::Validation(
            "Username can only contain letters, numbers, underscores, and hyphens".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_display_name(name: &str) -> Result<(), ApiError> {
    if name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(ApiError::Validation(format!(
            "Display name must be at most {MAX_DISPLAY_NAME_LEN} characters long"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(ApiError::Validation(
            "Display name cannot contain control characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_bio(bio: &str) -> Result<(), ApiError> {
    if bio.chars().count() > MAX_BIO_LEN {
        return Err(ApiError::Validation(format!(
            "Bio must be at most {MAX_BIO_LEN} characters long"
        )));
    }
    Ok(())
}

/// Validate profile picture URL
/// Only allows HTTPS URLs or image data URIs
pub fn validate_profile_picture_url(url: &str) -> Result<(), ApiError> {
    if url.is_empty() {
        return Ok(());
    }

    if url.len() > MAX_PICTURE_URL_LEN {
        return Err(ApiError::Validation(
            "Profile picture URL is too long".to_string(),
        ));
    }

    if !url.starts_with("https://") && !url.starts_with("data:image/") {
        return Err(ApiError::Validation(
            "Profile picture URL must use HTTPS or be a data URI".to_string(),
        ));
    }

    let url_lower = url.to_lowercase();
    if url_lower.contains("javascript:")
        || url_lower.contains("data:text/html")
        || url_lower.contains("<script")
        || url_lower.contains("onerror=")
        || url_lower.contains("onload=")
    {
        return Err(ApiError::Validation(
            "Profile picture URL contains invalid patterns".to_string(),
        ));
    }

    Ok(())
}
