//! Double-submit cookie CSRF check.
//!
//! Browsers attach the auth cookies to cross-site requests, so a mutating
//! request that authenticates with cookies must also echo the readable
//! `csrf_token` cookie in the `X-CSRF-Token` header. Requests carrying a
//! bearer token, or no credential cookies at all, are not affected. Any other
//! `Authorization` scheme still authenticates by cookie and is checked.

use axum::{
    extract::Request,
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use subtle::ConstantTimeEq;

use crate::{
    auth::{
        cookies::{AUTH_COOKIE, CSRF_COOKIE, REFRESH_COOKIE},
        middleware::bearer_token,
    },
    error::ApiError,
};

pub const CSRF_HEADER: &str = "x-csrf-token";

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Whether the request passes the double-submit check
pub fn check_csrf(method: &Method, headers: &HeaderMap) -> Result<(), ApiError> {
    if !is_mutating(method) || bearer_token(headers).is_some() {
        return Ok(());
    }

    let jar = CookieJar::from_headers(headers);
    if jar.get(AUTH_COOKIE).is_none() && jar.get(REFRESH_COOKIE).is_none() {
        return Ok(());
    }

    let cookie_token = jar
        .get(CSRF_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Forbidden("Missing CSRF token".to_string()))?;

    let header_token = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Forbidden("Missing CSRF token".to_string()))?;

    let matches: bool = cookie_token
        .as_bytes()
        .ct_eq(header_token.as_bytes())
        .into();
    if !matches {
        return Err(ApiError::Forbidden("Invalid CSRF token".to_string()));
    }

    Ok(())
}

pub async fn csrf_middleware(req: Request, next: Next) -> Response {
    if let Err(err) = check_csrf(req.method(), req.headers()) {
        tracing::warn!(method = %req.method(), uri = %req.uri(), "CSRF check failed");
        return err.into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_safe_methods_pass() {
        let h = headers(&[("cookie", "auth_token=abc")]);
        assert!(check_csrf(&Method::GET, &h).is_ok());
        assert!(check_csrf(&Method::OPTIONS, &h).is_ok());
    }

    #[test]
    fn test_requests_without_cookies_pass() {
        assert!(check_csrf(&Method::POST, &HeaderMap::new()).is_ok());
        let h = headers(&[("cookie", "theme=dark")]);
        assert!(check_csrf(&Method::DELETE, &h).is_ok());
    }

    #[test]
    fn test_bearer_requests_pass() {
        let h = headers(&[("cookie", "auth_token=abc"), ("authorization", "Bearer t")]);
        assert!(check_csrf(&Method::POST, &h).is_ok());
    }

    #[test]
    fn test_cookie_request_needs_matching_header() {
        let missing = headers(&[("cookie", "auth_token=abc; csrf_token=tok")]);
        assert!(matches!(
            check_csrf(&Method::POST, &missing),
            Err(ApiError::Forbidden(_))
        ));

        let wrong = headers(&[
            ("cookie", "auth_token=abc; csrf_token=tok"),
            (CSRF_HEADER, "other"),
        ]);
        assert!(check_csrf(&Method::PATCH, &wrong).is_err());

        let no_cookie = headers(&[("cookie", "refresh_token=abc"), (CSRF_HEADER, "tok")]);
        assert!(check_csrf(&Method::POST, &no_cookie).is_err());

        let ok = headers(&[
            ("cookie", "auth_token=abc; csrf_token=tok"),
            (CSRF_HEADER, "tok"),
        ]);
        assert!(check_csrf(&Method::PUT, &ok).is_ok());
    }

    #[test]
    fn test_non_bearer_authorization_is_still_checked() {
        let basic = headers(&[
            ("cookie", "auth_token=abc; csrf_token=tok"),
            ("authorization", "Basic Zm9vOmJhcg=="),
        ]);
        assert!(matches!(
            check_csrf(&Method::POST, &basic),
            Err(ApiError::Forbidden(_))
        ));

        let empty_bearer = headers(&[
            ("cookie", "auth_token=abc; csrf_token=tok"),
            ("authorization", "Bearer "),
        ]);
        assert!(check_csrf(&Method::DELETE, &empty_bearer).is_err());
    }

    #[test]
    fn test_token_of_different_length_is_rejected() {
        let h = headers(&[
            ("cookie", "auth_token=abc; csrf_token=tok"),
            (CSRF_HEADER, "tokk"),
        ]);
        assert!(check_csrf(&Method::POST, &h).is_err());
    }
}
