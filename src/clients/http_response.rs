//! HTTP response types for the transport collaborator.

use std::collections::HashMap;

/// A raw HTTP response, used when the body is not a JSON document.
///
/// Successful DELETEs (`204 No Content`) and redirects (`303 See Other`) are
/// the common cases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, keyed by lowercase name (headers may have multiple values).
    pub headers: HashMap<String, Vec<String>>,
    /// The unparsed response body.
    pub text: String,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`.
    #[must_use]
    pub const fn new(code: u16, headers: HashMap<String, Vec<String>>, text: String) -> Self {
        Self {
            code,
            headers,
            text,
        }
    }

    /// Returns the first value of a header, looked up case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the `Location` header, if present.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    /// Returns `true` if the status code is in the 3xx range.
    #[must_use]
    pub const fn is_redirect(&self) -> bool {
        self.code >= 300 && self.code <= 399
    }
}

/// The outcome of a successful request.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiResponse {
    /// A parsed JSON:API document (`{data, included?, links?, meta?}`).
    Document(serde_json::Value),
    /// A response without a JSON body, passed through unchanged.
    Raw(HttpResponse),
}

impl ApiResponse {
    /// Returns the parsed document, if any.
    #[must_use]
    pub const fn document(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Document(document) => Some(document),
            Self::Raw(_) => None,
        }
    }

    /// Returns the redirect target if this is a 3xx response with a `Location`.
    #[must_use]
    pub fn redirect_location(&self) -> Option<&str> {
        match self {
            Self::Raw(response) if response.is_redirect() => response.location(),
            _ => None,
        }
    }
}
