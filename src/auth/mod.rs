//! Authentication strategies for JSON:API requests.
//!
//! Authentication is a single-method contract: an [`Authenticator`] produces
//! the headers to attach to every outgoing request. The transport calls it
//! once per request, so strategies with expiring credentials (such as
//! [`JwtAuth`]) can mint a fresh token each time.
//!
//! # Provided strategies
//!
//! - [`BearerAuth`]: `Authorization: Bearer <token>`
//! - [`SchemeAuth`]: `Authorization: <scheme> <credentials>` for custom schemes
//! - [`HeaderAuth`]: arbitrary fixed key/value headers
//! - [`JwtAuth`]: a signed, short-lived JWT per request
//! - any `Fn() -> Vec<(String, String)>` closure
//!
//! # Example
//!
//! ```rust
//! use jsonapi_client::auth::{Authenticator, BearerAuth, SchemeAuth};
//!
//! let bearer = BearerAuth::new("secret-token").unwrap();
//! assert_eq!(
//!     bearer.headers().unwrap(),
//!     vec![("Authorization".to_string(), "Bearer secret-token".to_string())]
//! );
//!
//! let custom = SchemeAuth::with_secret("ULF", "public", "private").unwrap();
//! assert_eq!(custom.headers().unwrap()[0].1, "ULF public:private");
//! ```

mod jwt;

pub use jwt::JwtAuth;

use std::fmt;

use thiserror::Error;

use crate::error::ConfigError;

/// Header name used by the built-in strategies.
pub const AUTHORIZATION: &str = "Authorization";

/// Errors raised while producing authentication headers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A token could not be signed.
    #[error("Failed to encode authentication token: {0}")]
    TokenEncoding(#[from] jsonwebtoken::errors::Error),
}

/// Produces the authentication headers for a request.
///
/// Implementations must be cheap to call; they run before every request.
pub trait Authenticator: Send + Sync {
    /// Returns the headers to merge into the outgoing request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the credentials cannot be produced.
    fn headers(&self) -> Result<Vec<(String, String)>, AuthError>;
}

impl<F> Authenticator for F
where
    F: Fn() -> Vec<(String, String)> + Send + Sync,
{
    fn headers(&self) -> Result<Vec<(String, String)>, AuthError> {
        Ok(self())
    }
}

/// Bearer token authentication.
///
/// The token is masked in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    /// Creates a bearer strategy for the given token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyCredential`] if the token is empty.
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ConfigError::EmptyCredential {
                scheme: "Bearer".to_string(),
            });
        }
        Ok(Self { token })
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerAuth(*****)")
    }
}

impl Authenticator for BearerAuth {
    fn headers(&self) -> Result<Vec<(String, String)>, AuthError> {
        Ok(vec![(
            AUTHORIZATION.to_string(),
            format!("Bearer {}", self.token),
        )])
    }
}

/// Authentication with a custom `Authorization` scheme.
///
/// Produces `Authorization: <scheme> <public>` or, when a secret is given,
/// `Authorization: <scheme> <public>:<secret>`.
#[derive(Clone, PartialEq, Eq)]
pub struct SchemeAuth {
    scheme: String,
    public: String,
    secret: Option<String>,
}

impl SchemeAuth {
    /// Creates a strategy that sends `credentials` under `scheme`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyCredential`] if `credentials` is empty.
    pub fn new(
        scheme: impl Into<String>,
        credentials: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let scheme = scheme.into();
        let public = credentials.into();
        if public.is_empty() {
            return Err(ConfigError::EmptyCredential { scheme });
        }
        Ok(Self {
            scheme,
            public,
            secret: None,
        })
    }

    /// Creates a strategy that sends `public:secret` under `scheme`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyCredential`] if `public` is empty.
    pub fn with_secret(
        scheme: impl Into<String>,
        public: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let mut auth = Self::new(scheme, public)?;
        auth.secret = Some(secret.into());
        Ok(auth)
    }
}

impl fmt::Debug for SchemeAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemeAuth({}, *****)", self.scheme)
    }
}

impl Authenticator for SchemeAuth {
    fn headers(&self) -> Result<Vec<(String, String)>, AuthError> {
        let value = match &self.secret {
            Some(secret) => format!("{} {}:{}", self.scheme, self.public, secret),
            None => format!("{} {}", self.scheme, self.public),
        };
        Ok(vec![(AUTHORIZATION.to_string(), value)])
    }
}

/// Fixed key/value header authentication (API keys in custom headers and the like).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HeaderAuth {
    headers: Vec<(String, String)>,
}

impl HeaderAuth {
    /// Creates an empty header strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

impl fmt::Debug for HeaderAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("HeaderAuth").field("keys", &keys).finish()
    }
}

impl Authenticator for HeaderAuth {
    fn headers(&self) -> Result<Vec<(String, String)>, AuthError> {
        Ok(self.headers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header_value() {
        let auth = BearerAuth::new("abc").unwrap();
        assert_eq!(
            auth.headers().unwrap(),
            vec![("Authorization".to_string(), "Bearer abc".to_string())]
        );
    }

    #[test]
    fn test_bearer_rejects_empty_token() {
        assert!(matches!(
            BearerAuth::new(""),
            Err(ConfigError::EmptyCredential { .. })
        ));
    }

    #[test]
    fn test_bearer_masks_token_in_debug() {
        let auth = BearerAuth::new("super-secret").unwrap();
        let debug = format!("{auth:?}");
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_scheme_auth_with_and_without_secret() {
        let public_only = SchemeAuth::new("ULF", "pub").unwrap();
        assert_eq!(public_only.headers().unwrap()[0].1, "ULF pub");

        let with_secret = SchemeAuth::with_secret("ULF", "pub", "sec").unwrap();
        assert_eq!(with_secret.headers().unwrap()[0].1, "ULF pub:sec");
        assert!(!format!("{with_secret:?}").contains("sec)"));
    }

    #[test]
    fn test_header_auth_returns_all_headers() {
        let auth = HeaderAuth::new()
            .header("X-Api-Key", "k")
            .header("X-Tenant", "t");
        assert_eq!(auth.headers().unwrap().len(), 2);
    }

    #[test]
    fn test_closure_is_an_authenticator() {
        let auth = || vec![("X-Token".to_string(), "dynamic".to_string())];
        let boxed: Box<dyn Authenticator> = Box::new(auth);
        assert_eq!(boxed.headers().unwrap()[0].1, "dynamic");
    }
}
