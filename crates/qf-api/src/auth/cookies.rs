use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::Environment;

pub const AUTH_COOKIE: &str = "auth_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const CSRF_COOKIE: &str = "csrf_token";

/// Create an auth cookie with the JWT token
///
/// Cookies are secure (HTTPS-only) in production and usable over HTTP in
/// development. `SameSite=Lax` plus the CSRF header check guard cookie
/// authenticated requests.
pub fn create_auth_cookie(
    token: String,
    environment: &Environment,
    expiry_hours: i64,
    cookie_domain: &str,
) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .max_age(time::Duration::hours(expiry_hours))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!environment.is_development())
        .domain(cookie_domain.to_string())
        .build()
}

/// Create a refresh token cookie
pub fn create_refresh_token_cookie(
    token: String,
    environment: &Environment,
    expiry_days: i64,
    cookie_domain: &str,
) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .path("/")
        .max_age(time::Duration::days(expiry_days))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!environment.is_development())
        .domain(cookie_domain.to_string())
        .build()
}

/// Create the CSRF cookie.
///
/// Not HttpOnly: the frontend reads it and echoes it in `X-CSRF-Token`.
pub fn create_csrf_cookie(
    token: String,
    environment: &Environment,
    cookie_domain: &str,
) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .path("/")
        .http_only(false)
        .same_site(SameSite::Lax)
        .secure(!environment.is_development())
        .domain(cookie_domain.to_string())
        .build()
}

/// Cookie value used to remove `name`; path and domain must match the original
pub fn removal_cookie(name: &'static str, cookie_domain: &str) -> Cookie<'static> {
    Cookie::build(name)
        .path("/")
        .domain(cookie_domain.to_string())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_auth_cookie_development() {
        let cookie = create_auth_cookie(
            "test_token".to_string(),
            &Environment::Development,
            24,
            "localhost",
        );

        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.value(), "test_token");
        assert_eq!(cookie.path(), Some("/"));
        assert!(cookie.http_only().unwrap_or(false));
        assert!(
            !cookie.secure().unwrap_or(true),
            "Should not be secure in development"
        );
        assert_eq!(cookie.domain(), Some("localhost"));
    }

    #[test]
    fn test_create_refresh_cookie_production() {
        let cookie = create_refresh_token_cookie(
            "refresh".to_string(),
            &Environment::Production,
            30,
            "quizforge.app",
        );

        assert_eq!(cookie.name(), REFRESH_COOKIE);
        assert!(cookie.http_only().unwrap_or(false));
        assert!(
            cookie.secure().unwrap_or(false),
            "Should be secure in production"
        );
        assert_eq!(cookie.max_age(), Some(time::Duration::days(30)));
    }

    #[test]
    fn test_csrf_cookie_is_readable_by_scripts() {
        let cookie = create_csrf_cookie("abc".to_string(), &Environment::Development, "localhost");

        assert_eq!(cookie.name(), CSRF_COOKIE);
        assert_eq!(cookie.http_only(), Some(false));
    }
}
