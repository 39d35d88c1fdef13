//! The [`JsonApi`] connection handle.
//!
//! A `JsonApi` owns the transport and the type registry. Resources and pages
//! keep a clone of the handle they were decoded through, so every follow-up
//! request goes to the same connection. Cloning is cheap (an `Arc`).
//!
//! # Example
//!
//! ```rust,ignore
//! use jsonapi_client::{HostUrl, JsonApi, JsonApiConfig};
//! use jsonapi_client::resources::ResourceType;
//!
//! struct Article;
//!
//! impl ResourceType for Article {
//!     const TYPE: &'static str = "articles";
//! }
//!
//! let config = JsonApiConfig::builder()
//!     .host(HostUrl::new("https://api.example.com")?)
//!     .bearer_token("token")?
//!     .build()?;
//! let api = JsonApi::new(config)?;
//!
//! let articles = api.register::<Article>();
//! let article = articles.get("1", &["author"]).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::clients::{ApiResponse, HttpClient, HttpError, HttpRequest};
use crate::config::JsonApiConfig;
use crate::resources::{
    Included, Resource, ResourceClass, ResourceDescription, ResourceError,
    ResourceIdentifier, ResourceType, Registry,
};

struct Inner {
    client: HttpClient,
    registry: Registry,
}

/// A connection to a JSON:API service.
#[derive(Clone)]
pub struct JsonApi {
    inner: Arc<Inner>,
}

// Verify JsonApi is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<JsonApi>();
};

impl fmt::Debug for JsonApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonApi")
            .field("client", &self.inner.client)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

impl JsonApi {
    /// Creates a connection from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the HTTP client cannot be built.
    pub fn new(config: JsonApiConfig) -> Result<Self, HttpError> {
        let client = HttpClient::new(&config)?;
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                registry: Registry::new(),
            }),
        })
    }

    /// The transport collaborator.
    #[must_use]
    pub fn client(&self) -> &HttpClient {
        &self.inner.client
    }

    /// The type registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Registers a resource type and returns its class handle.
    pub fn register<T: ResourceType>(&self) -> ResourceClass {
        self.register_description(T::description())
    }

    /// Registers a runtime description and returns its class handle.
    pub fn register_description(&self, description: ResourceDescription) -> ResourceClass {
        let description = self.inner.registry.register(description);
        ResourceClass::new(self.clone(), description)
    }

    /// Returns the class handle of `T`, registering it on first use.
    #[must_use]
    pub fn class<T: ResourceType>(&self) -> ResourceClass {
        match self.inner.registry.resolve(T::TYPE) {
            Ok(description) => ResourceClass::new(self.clone(), description),
            Err(_) => self.register::<T>(),
        }
    }

    /// Returns the class handle of a registered type name.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownType`] if nothing is registered.
    pub fn class_of(&self, name: &str) -> Result<ResourceClass, ResourceError> {
        let description = self.inner.registry.resolve(name)?;
        Ok(ResourceClass::new(self.clone(), description))
    }

    /// Decodes a document or bare resource object, choosing the description
    /// from its `type` member. Unregistered types decode generically.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidDocument`] if the value is not a
    /// single resource with a `type`.
    pub fn decode(&self, document: &Value) -> Result<Resource, ResourceError> {
        let object = document.get("data").unwrap_or(document);
        let description = self.describe(object)?;
        Resource::from_document(self.clone(), description, document)
    }

    /// Best-effort conversion: the decoded resource, or the value unchanged.
    ///
    /// # Errors
    ///
    /// Returns the original value if it does not decode as a resource.
    pub fn as_resource(&self, value: Value) -> Result<Resource, Value> {
        self.decode(&value).map_err(|error| {
            tracing::trace!(%error, "Value is not a resource, keeping it raw");
            value
        })
    }

    /// Decodes a resource object that is not part of a compound document.
    pub(crate) fn decode_object(&self, object: &Value) -> Result<Resource, ResourceError> {
        self.decode_with_included(object, &Included::new())
    }

    /// Decodes a resource object of a compound document.
    pub(crate) fn decode_with_included(
        &self,
        object: &Value,
        included: &Included<'_>,
    ) -> Result<Resource, ResourceError> {
        let description = self.describe(object)?;
        Resource::from_object(self.clone(), description, object, included)
    }

    /// Decodes the primary data of a document as a resource of a known class.
    pub(crate) fn decode_as(
        &self,
        description: Arc<ResourceDescription>,
        document: &Value,
    ) -> Result<Resource, ResourceError> {
        Resource::from_document(self.clone(), description, document)
    }

    /// An unloaded resource carrying only an identity.
    pub(crate) fn stub(&self, identifier: &ResourceIdentifier) -> Resource {
        let description = self.inner.registry.resolve_or_generic(&identifier.type_name);
        let mut resource = Resource::empty(self.clone(), description);
        resource.id.clone_from(&identifier.id);
        resource
    }

    fn describe(&self, object: &Value) -> Result<Arc<ResourceDescription>, ResourceError> {
        let type_name = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ResourceError::invalid_document("resource object has no 'type'"))?;
        Ok(self.inner.registry.resolve_or_generic(type_name))
    }

    /// Sends a request through the transport.
    pub(crate) async fn request(&self, request: HttpRequest) -> Result<ApiResponse, HttpError> {
        self.inner.client.request(request).await
    }
}
