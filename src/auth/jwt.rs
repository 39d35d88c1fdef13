//! Short-lived JWT authentication.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{Map, Value};

use super::{AuthError, Authenticator, AUTHORIZATION};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Signs a fresh JWT for every request.
///
/// The token carries the configured payload plus an `exp` claim set to
/// "now + duration", and is sent as `Authorization: JWT <token>`. Only
/// HMAC algorithms (`HS256`, `HS384`, `HS512`) are supported since the key is
/// a shared secret.
///
/// # Example
///
/// ```rust
/// use jsonapi_client::auth::{Authenticator, JwtAuth};
/// use serde_json::json;
///
/// let auth = JwtAuth::new(json!({"username": "bot"}), "shared-secret", 300);
/// let headers = auth.headers().unwrap();
/// assert!(headers[0].1.starts_with("JWT "));
/// ```
#[derive(Clone)]
pub struct JwtAuth {
    payload: Map<String, Value>,
    secret: String,
    duration: Duration,
    algorithm: Algorithm,
    clock: Clock,
}

impl JwtAuth {
    /// Creates a JWT strategy signing `payload` with `secret` (HS256), valid
    /// for `duration_secs` seconds from the moment of each request.
    ///
    /// Non-object payloads are treated as an empty claim set.
    #[must_use]
    pub fn new(payload: Value, secret: impl Into<String>, duration_secs: i64) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            payload,
            secret: secret.into(),
            duration: Duration::seconds(duration_secs),
            algorithm: Algorithm::HS256,
            clock: Arc::new(Utc::now),
        }
    }

    /// Uses a different HMAC algorithm.
    #[must_use]
    pub const fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Replaces the clock used to compute `exp`.
    #[must_use]
    pub fn clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn token(&self) -> Result<String, AuthError> {
        let exp = (self.clock)() + self.duration;
        let mut claims = self.payload.clone();
        claims.insert("exp".to_string(), Value::from(exp.timestamp()));

        let key = EncodingKey::from_secret(self.secret.as_bytes());
        Ok(encode(&Header::new(self.algorithm), &claims, &key)?)
    }
}

impl fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuth")
            .field("payload", &self.payload)
            .field("duration", &self.duration)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl Authenticator for JwtAuth {
    fn headers(&self) -> Result<Vec<(String, String)>, AuthError> {
        Ok(vec![(AUTHORIZATION.to_string(), format!("JWT {}", self.token()?))])
    }
}
