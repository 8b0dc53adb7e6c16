//! JSON request-body decoding.
//!
//! Two entry points, both usually reached through [`Request`] methods:
//!
//! - [`parse_json`] gates on `Content-Type: application/json` and decodes.
//! - [`parse_valid_json`] does the same, then runs the value's declared
//!   validation rules.
//!
//! Hard failures (wrong content type, malformed body) come back as
//! [`JsonError`]. Validation failures are *not* errors: they are returned as
//! data in [`Parsed::violations`] so the handler can answer with a 422 and the
//! messages. routekit never picks a status code for you.
//!
//! ```rust
//! use routekit::{Request, Response};
//! use http::StatusCode;
//! use serde::Deserialize;
//! use validator::Validate;
//!
//! #[derive(Deserialize, Validate)]
//! struct Product {
//!     #[validate(length(min = 1, message = "name is required"))]
//!     name: String,
//!     price: f64,
//! }
//!
//! async fn create(req: Request) -> Response {
//!     let parsed = match req.parse_valid_json::<Product>() {
//!         Ok(parsed) => parsed,
//!         Err(e) => return Response::error(StatusCode::BAD_REQUEST, e),
//!     };
//!     if !parsed.is_valid() {
//!         return Response::error(StatusCode::UNPROCESSABLE_ENTITY, parsed.violations.join("-"));
//!     }
//!     Response::status(StatusCode::NO_CONTENT)
//! }
//! ```

use std::fmt;

use serde::de::DeserializeOwned;
use validator::Validate;

use crate::request::Request;
use crate::validate::validate;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Request media types understood by the content-type gate.
///
/// Only [`ContentType::Json`] is used by the decoder; the others are here so
/// handlers can gate on them with [`Request::ensure_content_type`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Text,           // text/plain
    Json,           // application/json
    MultipartForm,  // multipart/form-data
    FormUrlEncoded, // application/x-www-form-urlencoded
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text           => "text/plain",
            Self::Json           => "application/json",
            Self::MultipartForm  => "multipart/form-data",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Errors and results ────────────────────────────────────────────────────────

/// A hard failure while decoding a request body.
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    /// The declared `Content-Type` was missing or not an exact match.
    #[error("request content-type is not {expected}")]
    ContentTypeMismatch {
        expected: ContentType,
        found: Option<String>,
    },

    /// The body is not valid JSON for the target type.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

/// A decoded value together with its validation outcome.
#[derive(Debug)]
pub struct Parsed<T> {
    pub value: T,
    /// One human-readable message per violated rule; empty when valid.
    pub violations: Vec<String>,
}

impl<T> Parsed<T> {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Splits into the value on success, or the violations otherwise.
    pub fn into_result(self) -> Result<T, Vec<String>> {
        if self.violations.is_empty() { Ok(self.value) } else { Err(self.violations) }
    }
}

// ── Operations ────────────────────────────────────────────────────────────────

/// The content-type gate. Exact string comparison: `application/json;
/// charset=utf-8` does not match `application/json`.
pub fn ensure_content_type(req: &Request, expected: ContentType) -> Result<(), JsonError> {
    match req.content_type() {
        Some(found) if found == expected.as_str() => Ok(()),
        found => Err(JsonError::ContentTypeMismatch {
            expected,
            found: found.map(str::to_owned),
        }),
    }
}

/// Decodes the request body into `T`.
///
/// Fails with [`JsonError::ContentTypeMismatch`] before the body is touched,
/// or with [`JsonError::Decode`] if the body does not decode into `T`.
pub fn parse_json<T: DeserializeOwned>(req: &Request) -> Result<T, JsonError> {
    ensure_content_type(req, ContentType::Json)?;
    Ok(serde_json::from_slice(req.body())?)
}

/// [`parse_json`], then the value's validation rules.
pub fn parse_valid_json<T>(req: &Request) -> Result<Parsed<T>, JsonError>
where
    T: DeserializeOwned + Validate,
{
    let value: T = parse_json(req)?;
    let violations = validate(&value);
    Ok(Parsed { value, violations })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct Product {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
        price: f64,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        builder.body(Bytes::from_static(body.as_bytes())).unwrap().into()
    }

    #[test]
    fn parse_json_populates_target() {
        let req = request(Some("application/json"), r#"{"name":"Gopher","price":122.22}"#);

        let product: Product = parse_json(&req).unwrap();

        assert_eq!(product.name, "Gopher");
        assert_eq!(product.price, 122.22);
    }

    #[test]
    fn wrong_content_type_is_rejected_before_decoding() {
        let req = request(Some("text/plain"), r#"{"name":"Gopher","price":122.22}"#);

        let err = parse_json::<Product>(&req).unwrap_err();

        assert!(matches!(
            err,
            JsonError::ContentTypeMismatch { expected: ContentType::Json, found: Some(ref f) } if f == "text/plain"
        ));
        assert_eq!(err.to_string(), "request content-type is not application/json");
    }

    #[test]
    fn content_type_match_is_exact() {
        let req = request(Some("application/json; charset=utf-8"), r#"{"name":"a","price":1}"#);
        assert!(matches!(
            parse_json::<Product>(&req),
            Err(JsonError::ContentTypeMismatch { .. })
        ));

        let req = request(None, r#"{"name":"a","price":1}"#);
        assert!(matches!(
            parse_json::<Product>(&req),
            Err(JsonError::ContentTypeMismatch { found: None, .. })
        ));
    }

    #[test]
    fn truncated_body_is_a_decode_error() {
        let req = request(Some("application/json"), r#"{"name":"Gopher","price":122.22"#);

        let err = parse_json::<Product>(&req).unwrap_err();

        match err {
            JsonError::Decode(e) => assert!(e.is_eof()),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_shape_is_a_decode_error() {
        let req = request(Some("application/json"), r#"{"name":"Gopher","price":"cheap"}"#);
        assert!(matches!(parse_json::<Product>(&req), Err(JsonError::Decode(_))));
    }

    #[test]
    fn valid_body_has_no_violations() {
        let req = request(Some("application/json"), r#"{"name":"Gopher","price":122.22}"#);

        let parsed = parse_valid_json::<Product>(&req).unwrap();

        assert!(parsed.is_valid());
        assert_eq!(parsed.into_result().unwrap().name, "Gopher");
    }

    #[test]
    fn violations_are_data_not_errors() {
        let req = request(Some("application/json"), r#"{"name":"","price":122.22}"#);

        let parsed = parse_valid_json::<Product>(&req).unwrap();

        assert!(!parsed.is_valid());
        assert_eq!(parsed.violations.len(), 1);
        assert!(parsed.violations[0].contains("name"));
    }

    #[test]
    fn validated_decode_still_gates_on_content_type() {
        let req = request(Some("application/"), r#"{"name":"Gopher","price":122.22}"#);
        assert!(matches!(
            parse_valid_json::<Product>(&req),
            Err(JsonError::ContentTypeMismatch { .. })
        ));
    }
}
