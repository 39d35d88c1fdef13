//! HTTP client for JSON:API communication.
//!
//! This module provides the [`HttpClient`] type, the single transport
//! collaborator used by resources and pages.

use std::collections::HashMap;

use crate::clients::errors::{HttpError, HttpResponseError, ProtocolError};
use crate::clients::http_request::{HttpRequest, RequestBody};
use crate::clients::http_response::{ApiResponse, HttpResponse};
use crate::config::JsonApiConfig;

/// Library version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Media type of JSON:API documents.
pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

/// HTTP client for making requests to a JSON:API service.
///
/// The client handles:
/// - Resolving relative paths against the configured host
/// - Default headers including User-Agent and Accept
/// - Authentication headers, produced per request
/// - Content-Type negotiation (plain, bulk profile, or transport-chosen for forms)
/// - Mapping error documents to [`ProtocolError`]
///
/// Redirects are never followed, so `303 See Other` responses reach the caller
/// with their `Location` header intact.
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`, making it safe to share across async tasks.
pub struct HttpClient {
    client: reqwest::Client,
    config: JsonApiConfig,
    default_headers: HashMap<String, String>,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("host", self.config.host())
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Creates a new HTTP client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the underlying reqwest client cannot
    /// be created (e.g., TLS initialization failure).
    pub fn new(config: &JsonApiConfig) -> Result<Self, HttpError> {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent =
            format!("{user_agent_prefix}JSON:API Client Library v{SDK_VERSION} | Rust {rust_version}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), JSONAPI_MEDIA_TYPE.to_string());
        for (key, value) in config.headers() {
            default_headers.insert(key.clone(), value.clone());
        }

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
            default_headers,
        })
    }

    /// Returns the configuration this client was built from.
    #[must_use]
    pub const fn config(&self) -> &JsonApiConfig {
        &self.config
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Resolves a path or URL against the configured host.
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        self.config.host().resolve(url)
    }

    /// Builds the full header set for `request`.
    ///
    /// Later sources win: defaults, request headers, authentication. The
    /// negotiated Content-Type is only added when no source set one.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Auth`] if the authenticator fails.
    pub fn request_headers(&self, request: &HttpRequest) -> Result<Vec<(String, String)>, HttpError> {
        let mut headers: Vec<(String, String)> = self
            .default_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut set = |key: &str, value: &str| {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
            headers.push((key.to_string(), value.to_string()));
        };
        for (key, value) in &request.extra_headers {
            set(key, value);
        }
        if let Some(auth) = self.config.auth() {
            for (key, value) in auth.headers()? {
                set(&key, &value);
            }
        }

        if let Some(data_type) = request.data_type() {
            if !headers
                .iter()
                .any(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            {
                headers.push((
                    "Content-Type".to_string(),
                    data_type.as_content_type().to_string(),
                ));
            }
        }

        Ok(headers)
    }

    /// Sends a request to the JSON:API service.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if:
    /// - Request validation fails (`InvalidRequest`)
    /// - Authentication headers cannot be produced (`Auth`)
    /// - A network error occurs (`Network`)
    /// - The server answers with a JSON:API error document (`Protocol`)
    /// - The server answers with any other failure status (`Response`)
    pub async fn request(&self, request: HttpRequest) -> Result<ApiResponse, HttpError> {
        request.verify()?;

        let url = self.resolve_url(&request.url);
        let headers = self.request_headers(&request)?;

        tracing::debug!(
            method = %request.http_method,
            url = %url,
            bulk = request.bulk,
            "Sending JSON:API request"
        );

        let mut req_builder = self.client.request(request.http_method.into(), &url);
        for (key, value) in &headers {
            req_builder = req_builder.header(key, value);
        }
        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }
        match request.body {
            Some(RequestBody::Json(body)) => {
                req_builder = req_builder.body(body.to_string());
            }
            Some(RequestBody::Form(form)) => {
                req_builder = req_builder.multipart(form.into_multipart());
            }
            None => {}
        }

        let res = req_builder.send().await?;

        let code = res.status().as_u16();
        let res_headers = Self::parse_response_headers(res.headers());
        let text = res.text().await.unwrap_or_default();

        Self::interpret(code, res_headers, text)
    }

    /// Turns a status, headers and body into the transport outcome.
    fn interpret(
        code: u16,
        headers: HashMap<String, Vec<String>>,
        text: String,
    ) -> Result<ApiResponse, HttpError> {
        if code >= 400 {
            let document = serde_json::from_str::<serde_json::Value>(&text).ok();
            if let Some(error) = document
                .as_ref()
                .and_then(|body| ProtocolError::from_document(code, body))
            {
                tracing::warn!(
                    status = code,
                    errors = error.errors.len(),
                    "JSON:API request failed with an error document"
                );
                return Err(error.into());
            }
            return Err(HttpResponseError {
                code,
                message: text,
            }
            .into());
        }

        let response = HttpResponse::new(code, headers, text);
        if response.is_redirect() {
            tracing::debug!(status = code, location = ?response.location(), "Surfacing redirect");
            return Ok(ApiResponse::Raw(response));
        }

        match serde_json::from_str::<serde_json::Value>(&response.text) {
            Ok(document) => Ok(ApiResponse::Document(document)),
            // Most likely an empty body, e.g. after a DELETE
            Err(_) => Ok(ApiResponse::Raw(response)),
        }
    }

    /// Parses response headers into a `HashMap` keyed by lowercase name.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SchemeAuth;
    use crate::clients::{FormData, HttpMethod};
    use crate::config::HostUrl;
    use serde_json::json;

    fn create_test_config() -> JsonApiConfig {
        JsonApiConfig::builder()
            .host(HostUrl::new("https://api.example.com").unwrap())
            .bearer_token("test_api_key")
            .unwrap()
            .build()
            .unwrap()
    }

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_user_agent_header_format() {
        let client = HttpClient::new(&create_test_config()).unwrap();
        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.contains("JSON:API Client Library v"));
        assert!(user_agent.contains("Rust"));
    }

    #[test]
    fn test_user_agent_with_prefix() {
        let config = JsonApiConfig::builder()
            .host(HostUrl::new("https://api.example.com").unwrap())
            .user_agent_prefix("MyApp/1.0")
            .build()
            .unwrap();
        let client = HttpClient::new(&config).unwrap();
        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.starts_with("MyApp/1.0 | "));
    }

    #[test]
    fn test_relative_urls_resolve_against_host() {
        let client = HttpClient::new(&create_test_config()).unwrap();
        assert_eq!(client.resolve_url("/foos/1"), "https://api.example.com/foos/1");
        assert_eq!(
            client.resolve_url("https://elsewhere.example.com/foos?page=2"),
            "https://elsewhere.example.com/foos?page=2"
        );
    }

    #[test]
    fn test_headers_for_plain_request() {
        let client = HttpClient::new(&create_test_config()).unwrap();
        let request = HttpRequest::builder(HttpMethod::Get, "/foos").build().unwrap();
        let headers = client.request_headers(&request).unwrap();

        assert_eq!(header(&headers, "content-type"), Some("application/vnd.api+json"));
        assert_eq!(header(&headers, "authorization"), Some("Bearer test_api_key"));
        assert_eq!(header(&headers, "accept"), Some("application/vnd.api+json"));
    }

    #[test]
    fn test_headers_for_bulk_request() {
        let client = HttpClient::new(&create_test_config()).unwrap();
        let request = HttpRequest::builder(HttpMethod::Delete, "/foos")
            .json(json!({"data": []}))
            .bulk(true)
            .build()
            .unwrap();
        let headers = client.request_headers(&request).unwrap();

        assert_eq!(
            header(&headers, "content-type"),
            Some(r#"application/vnd.api+json;profile="bulk""#)
        );
    }

    #[test]
    fn test_no_content_type_for_forms() {
        let client = HttpClient::new(&create_test_config()).unwrap();
        let request = HttpRequest::builder(HttpMethod::Post, "/uploads")
            .form(FormData::new().text("name", "x"))
            .build()
            .unwrap();
        let headers = client.request_headers(&request).unwrap();
        assert_eq!(header(&headers, "content-type"), None);
    }

    #[test]
    fn test_caller_content_type_is_kept() {
        let client = HttpClient::new(&create_test_config()).unwrap();
        let request = HttpRequest::builder(HttpMethod::Get, "/foos")
            .header("Content-Type", "application/json")
            .build()
            .unwrap();
        let headers = client.request_headers(&request).unwrap();
        assert_eq!(header(&headers, "content-type"), Some("application/json"));
    }

    #[test]
    fn test_auth_headers_override_request_headers() {
        let config = JsonApiConfig::builder()
            .host(HostUrl::new("https://api.example.com").unwrap())
            .auth(SchemeAuth::with_secret("ULF", "pub", "sec").unwrap())
            .build()
            .unwrap();
        let client = HttpClient::new(&config).unwrap();
        let request = HttpRequest::builder(HttpMethod::Get, "/foos")
            .header("authorization", "stale")
            .build()
            .unwrap();
        let headers = client.request_headers(&request).unwrap();

        let values: Vec<&str> = headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(values, vec!["ULF pub:sec"]);
    }

    #[test]
    fn test_interpret_error_document() {
        let body = json!({"errors": [{"status": "404", "code": "not_found"}]}).to_string();
        let result = HttpClient::interpret(404, HashMap::new(), body);
        match result {
            Err(HttpError::Protocol(error)) => {
                assert_eq!(error.status_code, 404);
                assert_eq!(error.code().unwrap(), Some("not_found"));
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_interpret_unparseable_failure() {
        let result = HttpClient::interpret(502, HashMap::new(), "<html>bad gateway</html>".into());
        assert!(matches!(
            result,
            Err(HttpError::Response(HttpResponseError { code: 502, .. }))
        ));
    }

    #[test]
    fn test_interpret_empty_success_is_raw() {
        let result = HttpClient::interpret(204, HashMap::new(), String::new()).unwrap();
        assert!(matches!(result, ApiResponse::Raw(HttpResponse { code: 204, .. })));
    }

    #[test]
    fn test_interpret_redirect_is_raw_even_with_body() {
        let mut headers = HashMap::new();
        headers.insert("location".to_string(), vec!["/exports/1".to_string()]);
        let result = HttpClient::interpret(303, headers, "{}".into()).unwrap();
        assert_eq!(result.redirect_location(), Some("/exports/1"));
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpClient>();
    }
}
