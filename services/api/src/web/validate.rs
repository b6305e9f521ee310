//! services/api/src/web/validate.rs
//!
//! Request validation. Payloads derive `validator::Validate`; whatever it
//! reports is rendered as one `VALIDATION_ERROR` whose message reads
//! `[json.endPage] ...; [json.title] ...`.

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::ApiError;

/// A field rule failure carrying the message clients see.
pub fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// A struct-level rule failure reported against `field` (snake_case, like the
/// derived field errors).
pub fn schema_error(field: &'static str, code: &'static str, message: &'static str) -> ValidationError {
    let mut error = field_error(code, message);
    error.add_param(Cow::Borrowed("field"), &field);
    error
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Renders every issue as `[json.field] message`, ordered by field.
pub fn render_errors(errors: &ValidationErrors) -> String {
    let mut issues: Vec<(String, String)> = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        let field: &str = &field;
        for error in field_errors.iter() {
            let target = error
                .params
                .get("field")
                .and_then(|value| value.as_str())
                .unwrap_or(field);
            let message = error.message.as_deref().unwrap_or(&*error.code);
            issues.push((camel_case(target), message.to_string()));
        }
    }
    // Stable, so a field's own issues keep their declaration order.
    issues.sort_by(|a, b| a.0.cmp(&b.0));

    issues
        .into_iter()
        .map(|(path, message)| format!("[json.{}] {}", path, message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A JSON body that deserialized and passed `Validate`.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(format!("[json] {}", rejection.body_text())))?;

        value
            .validate()
            .map_err(|errors| ApiError::Validation(render_errors(&errors)))?;
        Ok(Self(value))
    }
}

/// Parses a UUID taken from a path segment or query string. `path` names the
/// source in the error message, e.g. `param.bookId`.
pub fn parse_id(path: &str, raw: Option<&str>) -> Result<Uuid, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("[{}] Required", path)))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation(format!("[{}] Invalid UUID", path)))
}

/// Shared rules for optional text fields: trimmed, non-empty when present.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Custom rule for required text: whitespace alone does not count.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(field_error("required", "Required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_order(pages: &Pages) -> Result<(), ValidationError> {
        if pages.end_page < pages.start_page {
            return Err(schema_error(
                "end_page",
                "page_order",
                "Must be greater than or equal to startPage",
            ));
        }
        Ok(())
    }

    #[derive(Validate)]
    #[validate(schema(function = "page_order", skip_on_field_errors = false))]
    struct Pages {
        #[validate(range(min = 0, message = "Must be greater than or equal to 0"))]
        start_page: i32,
        end_page: i32,
        #[validate(custom(function = "not_blank"))]
        note_title: String,
    }

    #[test]
    fn issues_are_rendered_by_field() {
        let errors = Pages {
            start_page: -1,
            end_page: -3,
            note_title: " ".to_string(),
        }
        .validate()
        .expect_err("invalid pages");

        assert_eq!(
            render_errors(&errors),
            "[json.endPage] Must be greater than or equal to startPage; \
             [json.noteTitle] Required; \
             [json.startPage] Must be greater than or equal to 0"
        );
    }

    #[test]
    fn valid_payloads_pass() {
        let pages = Pages {
            start_page: 3,
            end_page: 3,
            note_title: "Chapter 1".to_string(),
        };
        assert!(pages.validate().is_ok());
    }

    #[test]
    fn ids_must_be_present_and_well_formed() {
        assert!(parse_id("query.bookId", Some("0190a0f4-7b1c-7cc3-8f1e-3c2b9d4e5f60")).is_ok());
        assert!(matches!(
            parse_id("query.bookId", None),
            Err(ApiError::Validation(m)) if m == "[query.bookId] Required"
        ));
        assert!(matches!(
            parse_id("param.bookId", Some("42")),
            Err(ApiError::Validation(m)) if m == "[param.bookId] Invalid UUID"
        ));
    }

    #[test]
    fn blank_optional_text_becomes_none() {
        assert_eq!(normalize_optional(Some("  ".to_string())), None);
        assert_eq!(
            normalize_optional(Some(" Le Guin ".to_string())),
            Some("Le Guin".to_string())
        );
        assert_eq!(normalize_optional(None), None);
    }
}
