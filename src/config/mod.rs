//! Configuration types for the JSON:API client.
//!
//! # Overview
//!
//! - [`JsonApiConfig`]: host, authentication and default headers
//! - [`JsonApiConfigBuilder`]: a builder for constructing [`JsonApiConfig`] instances
//! - [`HostUrl`]: a validated base URL
//!
//! # Example
//!
//! ```rust
//! use jsonapi_client::{HostUrl, JsonApiConfig};
//!
//! let config = JsonApiConfig::builder()
//!     .host(HostUrl::new("https://api.example.com").unwrap())
//!     .bearer_token("my-token")
//!     .unwrap()
//!     .header("X-Client", "batch-scripts")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.host().as_ref(), "https://api.example.com");
//! ```

mod newtypes;

pub use newtypes::HostUrl;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::auth::{Authenticator, BearerAuth};
use crate::error::ConfigError;

/// Configuration for a JSON:API connection.
///
/// `JsonApiConfig` is `Clone`, `Send`, and `Sync`; the authenticator is shared
/// between clones.
#[derive(Clone)]
pub struct JsonApiConfig {
    host: HostUrl,
    auth: Option<Arc<dyn Authenticator>>,
    headers: HashMap<String, String>,
    user_agent_prefix: Option<String>,
}

impl JsonApiConfig {
    /// Creates a new builder for constructing a `JsonApiConfig`.
    #[must_use]
    pub fn builder() -> JsonApiConfigBuilder {
        JsonApiConfigBuilder::new()
    }

    /// Returns the host URL relative paths are resolved against.
    #[must_use]
    pub const fn host(&self) -> &HostUrl {
        &self.host
    }

    /// Returns the authenticator, if configured.
    #[must_use]
    pub fn auth(&self) -> Option<&dyn Authenticator> {
        self.auth.as_deref()
    }

    /// Returns the extra headers sent with every request.
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }
}

impl fmt::Debug for JsonApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonApiConfig")
            .field("host", &self.host)
            .field("auth", &self.auth.as_ref().map(|_| "*****"))
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("user_agent_prefix", &self.user_agent_prefix)
            .finish()
    }
}

// Verify JsonApiConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<JsonApiConfig>();
};

/// Builder for constructing [`JsonApiConfig`] instances.
///
/// `host` is required. Everything else is optional.
#[derive(Default)]
pub struct JsonApiConfigBuilder {
    host: Option<HostUrl>,
    auth: Option<Arc<dyn Authenticator>>,
    headers: HashMap<String, String>,
    user_agent_prefix: Option<String>,
}

impl JsonApiConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host URL (required).
    #[must_use]
    pub fn host(mut self, host: HostUrl) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the authentication strategy.
    #[must_use]
    pub fn auth(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    /// Shorthand for `.auth(BearerAuth::new(token)?)`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyCredential`] if the token is empty.
    pub fn bearer_token(self, token: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(self.auth(BearerAuth::new(token)?))
    }

    /// Adds a default header sent with every request.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Replaces all default headers.
    #[must_use]
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Builds the [`JsonApiConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `host` is not set.
    pub fn build(self) -> Result<JsonApiConfig, ConfigError> {
        let host = self
            .host
            .ok_or(ConfigError::MissingRequiredField { field: "host" })?;

        Ok(JsonApiConfig {
            host,
            auth: self.auth,
            headers: self.headers,
            user_agent_prefix: self.user_agent_prefix,
        })
    }
}
