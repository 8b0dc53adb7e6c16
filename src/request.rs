//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri, header};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::json::{self, ContentType, JsonError, Parsed};

/// An incoming HTTP request with its body fully buffered.
///
/// Path parameters are filled in by the router once a route matches.
pub struct Request {
    head: Parts,
    body: Bytes,
    params: HashMap<String, String>,
}

impl Request {
    pub fn new(head: Parts, body: Bytes) -> Self {
        Self { head, body, params: HashMap::new() }
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn path(&self) -> &str { self.head.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Names are case-insensitive; values that are not
    /// visible ASCII are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The declared `Content-Type`, verbatim.
    pub fn content_type(&self) -> Option<&str> {
        self.head.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Rejects the request unless its `Content-Type` is exactly `expected`.
    pub fn ensure_content_type(&self, expected: ContentType) -> Result<(), JsonError> {
        json::ensure_content_type(self, expected)
    }

    /// Decodes the body as JSON into `T`. See [`json::parse_json`].
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T, JsonError> {
        json::parse_json(self)
    }

    /// Decodes the body as JSON into `T` and validates it.
    /// See [`json::parse_valid_json`].
    pub fn parse_valid_json<T>(&self) -> Result<Parsed<T>, JsonError>
    where
        T: DeserializeOwned + Validate,
    {
        json::parse_valid_json(self)
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (head, body) = req.into_parts();
        Self::new(head, body)
    }
}
