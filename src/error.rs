//! Error types for client configuration.
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation.
//!
//! # Example
//!
//! ```rust
//! use jsonapi_client::{ConfigError, HostUrl};
//!
//! let result = HostUrl::new("api.example.com");
//! assert!(matches!(result, Err(ConfigError::InvalidHostUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while building a [`JsonApiConfig`](crate::JsonApiConfig).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// Host URL is invalid.
    #[error("Invalid host URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://api.example.com').")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A bearer token or other credential was empty.
    #[error("Credential for '{scheme}' authentication cannot be empty.")]
    EmptyCredential {
        /// The authentication scheme the credential was meant for.
        scheme: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_field_error_message() {
        let error = ConfigError::MissingRequiredField { field: "host" };
        let message = error.to_string();
        assert!(message.contains("host"));
        assert!(message.contains("must be set"));
    }

    #[test]
    fn test_invalid_host_url_error_message() {
        let error = ConfigError::InvalidHostUrl {
            url: "nope".to_string(),
        };
        assert!(error.to_string().contains("'nope'"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let error = ConfigError::EmptyCredential {
            scheme: "Bearer".to_string(),
        };
        let _: &dyn std::error::Error = &error;
    }
}
