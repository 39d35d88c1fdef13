//! Transport collaborator for JSON:API services.
//!
//! This module provides the HTTP layer the resource engine delegates to. It is
//! deliberately stateless: it resolves URLs, merges headers, negotiates the
//! content type and maps responses, nothing more.
//!
//! # Overview
//!
//! - [`HttpClient`]: the async HTTP client
//! - [`HttpRequest`]: a request to be sent, built with [`HttpRequest::builder`]
//! - [`ApiResponse`]: a parsed document or a raw pass-through response
//! - [`HttpMethod`]: supported HTTP methods (GET, POST, PATCH, DELETE)
//! - [`DataType`]: plain or bulk-profile content types
//! - [`FormData`]: multipart bodies for upload endpoints
//! - [`HttpError`]: transport failures, including [`ProtocolError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use jsonapi_client::clients::{HttpClient, HttpMethod, HttpRequest};
//!
//! let client = HttpClient::new(&config)?;
//! let request = HttpRequest::builder(HttpMethod::Get, "/articles")
//!     .query_param("include", "author")
//!     .build()?;
//!
//! let response = client.request(request).await?;
//! ```

mod errors;
mod http_client;
mod http_request;
mod http_response;

pub use errors::{
    AmbiguousErrorAccess, ErrorDetail, HttpError, HttpResponseError, InvalidHttpRequestError,
    ProtocolError,
};
pub use http_client::{HttpClient, JSONAPI_MEDIA_TYPE, SDK_VERSION};
pub use http_request::{
    DataType, FormData, FormFile, HttpMethod, HttpRequest, HttpRequestBuilder, RequestBody,
};
pub use http_response::{ApiResponse, HttpResponse};
