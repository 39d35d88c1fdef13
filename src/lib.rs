//! # JSON:API Client
//!
//! A typed client-side binding layer for services that follow the
//! [JSON:API](https://jsonapi.org) specification.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`JsonApiConfig`] and [`JsonApiConfigBuilder`]
//! - Pluggable authentication strategies via [`auth`]
//! - An async transport that negotiates JSON:API content types and surfaces
//!   error documents as structured errors
//! - Resource binding: attributes, relationship linkage and a related-object
//!   cache kept in sync after writes
//! - Lazy, immutable pagination with `next`/`previous` links and streams
//! - Bulk create, update and delete through the bulk profile
//!
//! ## Quick Start
//!
//! ```rust
//! use jsonapi_client::{HostUrl, JsonApi, JsonApiConfig};
//!
//! let config = JsonApiConfig::builder()
//!     .host(HostUrl::new("https://api.example.com").unwrap())
//!     .bearer_token("my-token")
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let api = JsonApi::new(config).unwrap();
//! ```
//!
//! ## Declaring Resource Types
//!
//! ```rust,ignore
//! use jsonapi_client::resources::ResourceType;
//!
//! struct Article;
//!
//! impl ResourceType for Article {
//!     const TYPE: &'static str = "articles";
//!     const EDITABLE: Option<&'static [&'static str]> = Some(&["title", "author"]);
//! }
//!
//! let articles = api.register::<Article>();
//!
//! // GET /articles/1?include=author
//! let mut article = articles.get("1", &["author"]).await?;
//! article.set_attribute("title", "Hello")?;
//!
//! // PATCH /articles/1 with `title` and `author` only
//! article.save(&[]).await?;
//! ```
//!
//! ## Pagination
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//!
//! let recent = articles.filter("published__gt", "2024-01-01").sort(&["-published"]);
//!
//! let first_page = recent.items().await?;
//! let everything: Vec<_> = recent.all().try_collect().await?;
//! ```
//!
//! ## Error Handling
//!
//! ```rust,ignore
//! use jsonapi_client::clients::HttpError;
//! use jsonapi_client::resources::ResourceError;
//!
//! if let Err(ResourceError::Http(HttpError::Protocol(error))) = article.save(&[]).await {
//!     // Shortcuts succeed only when the server returned exactly one error
//!     println!("{:?} {:?}", error.code(), error.source());
//! }
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: each [`JsonApi`] owns its own type registry
//! - **Fail-fast validation**: misuse is reported before any request is sent
//! - **Thread-safe**: handles, resources and pages are `Send + Sync`
//! - **Async-first**: designed for use with the Tokio async runtime

pub mod api;
pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod resources;

// Re-export public types at crate root for convenience
pub use api::JsonApi;
pub use config::{HostUrl, JsonApiConfig, JsonApiConfigBuilder};
pub use error::ConfigError;

// Re-export HTTP client types
pub use clients::{
    ApiResponse, DataType, HttpClient, HttpError, HttpMethod, HttpRequest, HttpRequestBuilder,
    HttpResponse, HttpResponseError, InvalidHttpRequestError, ProtocolError,
};

// Re-export resource types
pub use resources::{
    BulkItem, Page, Related, Resource, ResourceClass, ResourceError, ResourceType,
};
