//! Class-level operations of a registered resource type.
//!
//! A [`ResourceClass`] is what [`JsonApi::register`] hands back: the type's
//! description paired with the connection. It builds new resources, starts
//! collection queries and runs the bulk operations.
//!
//! # Example
//!
//! ```rust,ignore
//! use jsonapi_client::resources::BulkItem;
//! use serde_json::json;
//!
//! let users = api.class_of("users")?;
//!
//! let mut user = users.build().attribute("username", "one").build()?;
//! user.save(&[]).await?;
//!
//! let admins = users.filter("role", "admin").include(&["groups"]);
//! for admin in admins.items().await? {
//!     println!("{admin}");
//! }
//!
//! let created = users
//!     .bulk_create(vec![json!({"username": "two"}).into(), json!({"username": "three"}).into()])
//!     .await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::api::JsonApi;
use crate::clients::{ApiResponse, FormData, HttpMethod, HttpRequest};
use crate::resources::bulk::{BulkContext, BulkItem};
use crate::resources::errors::ResourceError;
use crate::resources::identity::{normalize, to_linkage, IdentifierLike, Linkage};
use crate::resources::page::{FilterValue, Page};
use crate::resources::persistence::Followed;
use crate::resources::registry::ResourceDescription;
use crate::resources::resource::{Related, Resource};

/// A registered resource type bound to a connection.
#[derive(Clone, Debug)]
pub struct ResourceClass {
    api: JsonApi,
    description: Arc<ResourceDescription>,
}

impl ResourceClass {
    pub(crate) fn new(api: JsonApi, description: Arc<ResourceDescription>) -> Self {
        Self { api, description }
    }

    /// The type name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.description.name()
    }

    /// The type description.
    #[must_use]
    pub fn description(&self) -> &ResourceDescription {
        &self.description
    }

    /// The collection URL, `/{type}`.
    #[must_use]
    pub fn collection_url(&self) -> String {
        format!("/{}", self.name())
    }

    /// Starts building a new, unsaved resource.
    #[must_use]
    pub fn build(&self) -> ResourceBuilder {
        ResourceBuilder {
            class: self.clone(),
            id: None,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Decodes a document or bare resource object as this type.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::TypeMismatch`] if the value names another
    /// type, or [`ResourceError::InvalidDocument`] if it is malformed.
    pub fn from_value(&self, value: &Value) -> Result<Resource, ResourceError> {
        self.api.decode_as(self.description.clone(), value)
    }

    /// An unloaded resource with only an id.
    #[must_use]
    pub fn stub(&self, id: impl Into<String>) -> Resource {
        let mut resource = Resource::empty(self.api.clone(), self.description.clone());
        resource.id = Some(id.into());
        resource
    }

    /// An unevaluated page over the whole collection.
    #[must_use]
    pub fn list(&self) -> Page {
        Page::new(self.api.clone(), &self.collection_url())
    }

    /// Shorthand for `list().filter(key, value)`.
    #[must_use]
    pub fn filter(&self, key: &str, value: impl Into<FilterValue>) -> Page {
        self.list().filter(key, value)
    }

    /// Shorthand for `list().page(token)`.
    #[must_use]
    pub fn page(&self, token: impl ToString) -> Page {
        self.list().page(token)
    }

    /// Shorthand for `list().page_by(params)`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPagination`] if `params` is empty.
    pub fn page_by(&self, params: &[(&str, &str)]) -> Result<Page, ResourceError> {
        self.list().page_by(params)
    }

    /// Shorthand for `list().include(relationships)`.
    #[must_use]
    pub fn include(&self, relationships: &[&str]) -> Page {
        self.list().include(relationships)
    }

    /// Shorthand for `list().sort(fields)`.
    #[must_use]
    pub fn sort(&self, fields: &[&str]) -> Page {
        self.list().sort(fields)
    }

    /// Shorthand for `list().fields(fields)`.
    #[must_use]
    pub fn fields(&self, fields: &[&str]) -> Page {
        self.list().fields(fields)
    }

    /// Shorthand for `list().extra(key, value)`.
    #[must_use]
    pub fn extra(&self, key: impl Into<String>, value: impl ToString) -> Page {
        self.list().extra(key, value)
    }

    /// Fetches one resource by id.
    ///
    /// # Errors
    ///
    /// Returns whatever [`Resource::reload`] fails with.
    pub async fn get(&self, id: impl Into<String>, include: &[&str]) -> Result<Resource, ResourceError> {
        let mut resource = self.stub(id);
        resource.reload(include).await?;
        Ok(resource)
    }

    /// Saves a new resource.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnexpectedIdentifier`] if the resource already
    /// has an id, or whatever [`Resource::save`] fails with.
    pub async fn create(&self, mut resource: Resource) -> Result<Resource, ResourceError> {
        if let Some(id) = resource.id() {
            return Err(ResourceError::UnexpectedIdentifier {
                resource_type: self.name().to_string(),
                index: 0,
                id: id.to_string(),
            });
        }
        resource.save(&[]).await?;
        Ok(resource)
    }

    /// Creates a resource from a multipart upload.
    ///
    /// The transport picks the Content-Type. The response is decoded by its
    /// own `type`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Http`] if the request fails, or
    /// [`ResourceError::InvalidDocument`] if the response has no document.
    pub async fn create_with_form(&self, form: FormData) -> Result<Resource, ResourceError> {
        let request = HttpRequest::builder(HttpMethod::Post, self.collection_url())
            .form(form)
            .build()?;
        let document = self.send(request).await?;
        self.api.decode(&document)
    }

    /// Starts an upload job with a multipart form and waits for its result.
    ///
    /// The created job is polled every `interval` until the server redirects
    /// to the result, which is then fetched.
    ///
    /// # Errors
    ///
    /// Same as [`create_with_form`](Self::create_with_form) and
    /// [`Resource::wait_until_redirect`].
    pub async fn upload(&self, form: FormData, interval: Duration) -> Result<Followed, ResourceError> {
        let mut job = self.create_with_form(form).await?;
        tracing::debug!(job = %job, "Upload job created");
        job.wait_until_redirect(interval).await
    }

    /// Deletes many resources in one request and returns how many were sent.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MissingIdentifier`] for an item without an
    /// id, before anything is sent.
    pub async fn bulk_delete(&self, items: Vec<BulkItem>) -> Result<usize, ResourceError> {
        let data = self.bulk_payload(items, BulkContext::Delete, &[])?;
        let count = data.len();
        let request = HttpRequest::builder(HttpMethod::Delete, self.collection_url())
            .json(json!({ "data": data }))
            .bulk(true)
            .build()?;
        self.api.request(request).await?;
        tracing::debug!(resource_type = %self.name(), count, "Bulk delete sent");
        Ok(count)
    }

    /// Creates many resources in one request.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnexpectedIdentifier`] for an item that
    /// already has an id, before anything is sent.
    pub async fn bulk_create(&self, items: Vec<BulkItem>) -> Result<Page, ResourceError> {
        let data = self.bulk_payload(items, BulkContext::Create, &[])?;
        self.bulk_write(HttpMethod::Post, data).await
    }

    /// Updates many resources in one request.
    ///
    /// Written fields follow the same rule as [`Resource::save`].
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::MissingIdentifier`] for an item without an
    /// id, before anything is sent.
    pub async fn bulk_update(
        &self,
        items: Vec<BulkItem>,
        fields: &[&str],
    ) -> Result<Page, ResourceError> {
        let data = self.bulk_payload(items, BulkContext::Update, fields)?;
        self.bulk_write(HttpMethod::Patch, data).await
    }

    fn bulk_payload(
        &self,
        items: Vec<BulkItem>,
        context: BulkContext,
        fields: &[&str],
    ) -> Result<Vec<Value>, ResourceError> {
        let selection = match context {
            BulkContext::Update => self.description.writable_fields(fields),
            BulkContext::Create | BulkContext::Delete => None,
        };
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let entry = item.shape(self.name(), context, index)?;
                Ok::<_, ResourceError>(entry.to_value(self.name(), context, selection.as_ref()))
            })
            .collect()
    }

    async fn bulk_write(&self, method: HttpMethod, data: Vec<Value>) -> Result<Page, ResourceError> {
        let count = data.len();
        let request = HttpRequest::builder(method, self.collection_url())
            .json(json!({ "data": data }))
            .bulk(true)
            .build()?;
        let document = self.send(request).await?;
        tracing::debug!(resource_type = %self.name(), count, "Bulk write completed");
        Page::from_document(self.api.clone(), &self.collection_url(), &document)
    }

    async fn send(&self, request: HttpRequest) -> Result<Value, ResourceError> {
        match self.api.request(request).await? {
            ApiResponse::Document(document) => Ok(document),
            ApiResponse::Raw(response) => Err(ResourceError::invalid_document(format!(
                "expected a document, got HTTP {} without one",
                response.code
            ))),
        }
    }
}

/// Builds an unsaved [`Resource`] from discrete fields.
#[derive(Debug)]
#[must_use]
pub struct ResourceBuilder {
    class: ResourceClass,
    id: Option<String>,
    attributes: Map<String, Value>,
    relationships: BTreeMap<String, RelationshipValue>,
}

#[derive(Debug)]
enum RelationshipValue {
    Null,
    Value(IdentifierLike),
    Linkage(Linkage),
}

impl ResourceBuilder {
    /// Sets the id. Resources with an id are saved with PATCH.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets one attribute.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Merges an attribute object. Non-object values are ignored.
    pub fn attributes(mut self, attributes: Value) -> Self {
        if let Value::Object(attributes) = attributes {
            self.attributes.extend(attributes);
        }
        self
    }

    /// Points a to-one relationship at a resource, identifier or id.
    ///
    /// Bare ids need a full identifier here since the related type is unknown.
    pub fn relationship(mut self, name: impl Into<String>, value: impl Into<IdentifierLike>) -> Self {
        self.relationships
            .insert(name.into(), RelationshipValue::Value(value.into()));
        self
    }

    /// Declares a relationship as null.
    pub fn null_relationship(mut self, name: impl Into<String>) -> Self {
        self.relationships.insert(name.into(), RelationshipValue::Null);
        self
    }

    /// Sets a relationship's linkage as is, e.g. a to-many linkage.
    pub fn linkage(mut self, name: impl Into<String>, linkage: Linkage) -> Self {
        self.relationships
            .insert(name.into(), RelationshipValue::Linkage(linkage));
        self
    }

    /// Builds the resource.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::FieldConflict`] if a name is both an attribute and a relationship
    /// - [`ResourceError::InvalidIdentifier`] if a relationship value does not point at a resource
    pub fn build(self) -> Result<Resource, ResourceError> {
        let Self {
            class,
            id,
            attributes,
            relationships,
        } = self;

        if let Some(name) = relationships.keys().find(|name| attributes.contains_key(*name)) {
            return Err(ResourceError::FieldConflict { name: name.clone() });
        }

        let mut resource = Resource::empty(class.api.clone(), class.description.clone());
        resource.id = id;
        resource.attributes = attributes;

        for (name, value) in relationships {
            let (linkage, related) = match value {
                RelationshipValue::Null => (None, None),
                RelationshipValue::Linkage(linkage) => (Some(linkage), None),
                RelationshipValue::Value(value) if value.is_null() => (None, None),
                RelationshipValue::Value(value) => {
                    let identifier = normalize(&value, None)?;
                    let related = match value {
                        IdentifierLike::Resource(resource) => Some(Related::One(resource)),
                        _ => None,
                    };
                    (Some(to_linkage(identifier)), related)
                }
            };
            if let Some(related) = related {
                resource.related.insert(name.clone(), Some(related));
            } else if linkage.is_none() {
                resource.related.insert(name.clone(), None);
            }
            resource.relationships.insert(name, linkage);
        }
        Ok(resource)
    }
}
