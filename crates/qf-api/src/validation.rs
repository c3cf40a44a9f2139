//! Shared request validation helpers.

use serde::Deserialize;

use crate::error::ApiError;

/// Items per page on paginated listings
pub const PAGE_SIZE: u32 = 20;
/// Deepest page served; keeps offsets and cache keys bounded
pub const MAX_PAGE: u32 = 500;

/// Trim a required text field and check its length in characters
///
/// # Examples
/// ```
/// use qf_api::validation::required_text;
///
/// assert_eq!(required_text("Title", "  Algebra  ", 200).unwrap(), "Algebra");
/// assert!(required_text("Title", "   ", 200).is_err());
/// ```
pub fn required_text(field: &str, value: &str, max_len: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(ApiError::Validation(format!(
            "{field} must be at most {max_len} characters long"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank values become `None`
pub fn optional_text(
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => required_text(field, v, max_len).map(Some),
    }
}

/// `?page=` query for public listings, 1-based
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> Result<u32, ApiError> {
        match self.page.unwrap_or(1) {
            0 => Err(ApiError::Validation("Page must be at least 1".to_string())),
            p if p > MAX_PAGE => Err(ApiError::Validation(format!(
                "Page must be at most {MAX_PAGE}"
            ))),
            p => Ok(p),
        }
    }

    /// `(limit, offset)` for the repository query
    pub fn limit_offset(&self) -> Result<(i64, i64), ApiError> {
        let page = self.page()?;
        Ok((
            i64::from(PAGE_SIZE),
            i64::from(page - 1) * i64::from(PAGE_SIZE),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("Name", " Period 3 ", 10).unwrap(), "Period 3");
        assert!(required_text("Name", "", 10).is_err());
        assert!(required_text("Name", "ééééééééééé", 10).is_err());
        assert!(required_text("Name", "éééééééééé", 10).is_ok());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("Bio", None, 5).unwrap(), None);
        assert_eq!(optional_text("Bio", Some("   "), 5).unwrap(), None);
        assert_eq!(optional_text("Bio", Some(" hi "), 5).unwrap(), Some("hi".to_string()));
        assert!(optional_text("Bio", Some("toolong"), 5).is_err());
    }

    #[test]
    fn test_page_query() {
        assert_eq!(PageQuery::default().limit_offset().unwrap(), (20, 0));
        assert_eq!(PageQuery { page: Some(3) }.limit_offset().unwrap(), (20, 40));
        assert!(PageQuery { page: Some(0) }.page().is_err());
        assert!(PageQuery { page: Some(MAX_PAGE + 1) }.page().is_err());
    }
}
