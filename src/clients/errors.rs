//! Transport-level error types.
//!
//! - [`ProtocolError`]: the server answered with a JSON:API error document
//! - [`HttpResponseError`]: a failed response whose body is not a JSON:API error document
//! - [`InvalidHttpRequestError`]: a request rejected before sending
//! - [`HttpError`]: unified error type encompassing all of the above
//!
//! # Example
//!
//! ```rust,ignore
//! use jsonapi_client::clients::HttpError;
//!
//! match client.request(request).await {
//!     Ok(response) => { /* ... */ }
//!     Err(HttpError::Protocol(e)) => {
//!         for error in &e.errors {
//!             println!("{:?}: {:?}", error.code, error.detail);
//!         }
//!     }
//!     Err(HttpError::Response(e)) => println!("HTTP {}: {}", e.code, e.message),
//!     Err(other) => println!("{other}"),
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::auth::AuthError;

/// One entry of a JSON:API error document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDetail {
    /// The HTTP status code applicable to this problem, as a string.
    ///
    /// Servers that send a number here are accepted; the number is kept in
    /// its string form.
    #[serde(deserialize_with = "lenient_string")]
    pub status: Option<String>,
    /// An application-specific error code.
    #[serde(deserialize_with = "lenient_string")]
    pub code: Option<String>,
    /// A short, human-readable summary of the problem.
    #[serde(deserialize_with = "lenient_string")]
    pub title: Option<String>,
    /// A human-readable explanation specific to this occurrence.
    #[serde(deserialize_with = "lenient_string")]
    pub detail: Option<String>,
    /// References to the source of the error (`pointer`, `parameter`, `header`).
    pub source: Option<serde_json::Value>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(value)) => Some(value),
        Some(other) => Some(other.to_string()),
    })
}

/// Returned by the single-error shortcuts of [`ProtocolError`] when the error
/// document does not contain exactly one error.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Error shortcuts require exactly 1 error, but the response carried {count}.")]
pub struct AmbiguousErrorAccess {
    /// The number of errors in the document.
    pub count: usize,
}

/// A non-success response carrying a JSON:API error document.
///
/// The errors keep the order the server assigned them. When exactly one
/// error is present its fields are reachable through the shortcut accessors.
///
/// # Example
///
/// ```rust
/// use jsonapi_client::clients::{ErrorDetail, ProtocolError};
///
/// let error = ProtocolError {
///     status_code: 409,
///     errors: vec![ErrorDetail {
///         code: Some("conflict".to_string()),
///         ..ErrorDetail::default()
///     }],
/// };
/// assert_eq!(error.code().unwrap(), Some("conflict"));
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Request failed with status {status_code}: {}", summarize(.errors))]
pub struct ProtocolError {
    /// The HTTP status code of the response.
    pub status_code: u16,
    /// The errors, in server order.
    pub errors: Vec<ErrorDetail>,
}

fn summarize(errors: &[ErrorDetail]) -> String {
    errors
        .iter()
        .map(|e| {
            e.detail
                .as_deref()
                .or(e.title.as_deref())
                .or(e.code.as_deref())
                .unwrap_or("unknown error")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProtocolError {
    /// Builds a protocol error from a response body, if it is a JSON:API
    /// error document.
    #[must_use]
    pub fn from_document(status_code: u16, body: &serde_json::Value) -> Option<Self> {
        let errors = body.get("errors")?;
        let errors = serde_json::from_value::<Vec<ErrorDetail>>(errors.clone()).ok()?;
        Some(Self {
            status_code,
            errors,
        })
    }

    fn single(&self) -> Result<&ErrorDetail, AmbiguousErrorAccess> {
        match self.errors.as_slice() {
            [only] => Ok(only),
            _ => Err(AmbiguousErrorAccess {
                count: self.errors.len(),
            }),
        }
    }

    /// The `status` of the only error.
    ///
    /// # Errors
    ///
    /// Returns [`AmbiguousErrorAccess`] unless exactly one error is present.
    pub fn status(&self) -> Result<Option<&str>, AmbiguousErrorAccess> {
        Ok(self.single()?.status.as_deref())
    }

    /// The `code` of the only error.
    ///
    /// # Errors
    ///
    /// Returns [`AmbiguousErrorAccess`] unless exactly one error is present.
    pub fn code(&self) -> Result<Option<&str>, AmbiguousErrorAccess> {
        Ok(self.single()?.code.as_deref())
    }

    /// The `title` of the only error.
    ///
    /// # Errors
    ///
    /// Returns [`AmbiguousErrorAccess`] unless exactly one error is present.
    pub fn title(&self) -> Result<Option<&str>, AmbiguousErrorAccess> {
        Ok(self.single()?.title.as_deref())
    }

    /// The `detail` of the only error.
    ///
    /// # Errors
    ///
    /// Returns [`AmbiguousErrorAccess`] unless exactly one error is present.
    pub fn detail(&self) -> Result<Option<&str>, AmbiguousErrorAccess> {
        Ok(self.single()?.detail.as_deref())
    }

    /// The `source` of the only error.
    ///
    /// # Errors
    ///
    /// Returns [`AmbiguousErrorAccess`] unless exactly one error is present.
    pub fn source(&self) -> Result<Option<&serde_json::Value>, AmbiguousErrorAccess> {
        Ok(self.single()?.source.as_ref())
    }
}

/// A non-success response that is not a JSON:API error document.
#[derive(Debug, Error)]
#[error("HTTP {code}: {message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// The raw response body.
    pub message: String,
}

/// Error returned when a request fails validation before it is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A POST or PATCH request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },
}

/// Unified error type for the transport collaborator.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The server returned a JSON:API error document.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server returned a non-success response without an error document.
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Authentication headers could not be produced.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conflict_document() -> serde_json::Value {
        json!({"errors": [{
            "status": "409",
            "code": "conflict",
            "title": "Conflict",
            "detail": "Name already taken",
            "source": {"pointer": "/data/attributes/x"}
        }]})
    }

    #[test]
    fn test_single_error_shortcuts() {
        let error = ProtocolError::from_document(409, &conflict_document()).unwrap();
        assert_eq!(error.status_code, 409);
        assert_eq!(error.status().unwrap(), Some("409"));
        assert_eq!(error.code().unwrap(), Some("conflict"));
        assert_eq!(error.title().unwrap(), Some("Conflict"));
        assert_eq!(error.detail().unwrap(), Some("Name already taken"));
        assert_eq!(
            error.source().unwrap(),
            Some(&json!({"pointer": "/data/attributes/x"}))
        );
    }

    #[test]
    fn test_shortcuts_fail_with_multiple_errors() {
        let body = json!({"errors": [{"code": "a"}, {"code": "b"}]});
        let error = ProtocolError::from_document(400, &body).unwrap();
        assert_eq!(error.code(), Err(AmbiguousErrorAccess { count: 2 }));
        assert!(error.title().is_err());
        assert_eq!(error.errors[1].code.as_deref(), Some("b"));
    }

    #[test]
    fn test_shortcuts_fail_with_no_errors() {
        let error = ProtocolError {
            status_code: 400,
            errors: Vec::new(),
        };
        assert_eq!(error.detail(), Err(AmbiguousErrorAccess { count: 0 }));
    }

    #[test]
    fn test_numeric_status_and_code_are_accepted() {
        let body = json!({"errors": [{"status": 409, "code": 7, "detail": "x"}]});
        let error = ProtocolError::from_document(409, &body).unwrap();
        assert_eq!(error.status().unwrap(), Some("409"));
        assert_eq!(error.code().unwrap(), Some("7"));
        assert_eq!(error.detail().unwrap(), Some("x"));
    }

    #[test]
    fn test_from_document_requires_errors_array() {
        assert!(ProtocolError::from_document(500, &json!({"message": "boom"})).is_none());
        assert!(ProtocolError::from_document(500, &json!({"errors": "boom"})).is_none());
    }

    #[test]
    fn test_display_summarizes_details() {
        let error = ProtocolError::from_document(409, &conflict_document()).unwrap();
        let message = error.to_string();
        assert!(message.contains("409"));
        assert!(message.contains("Name already taken"));
    }

    #[test]
    fn test_invalid_request_error_missing_body() {
        let error = InvalidHttpRequestError::MissingBody {
            method: "post".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot use post without specifying data.");
    }
}
