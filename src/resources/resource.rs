//! The [`Resource`] type: a bound JSON:API resource object.
//!
//! A resource keeps two views of each relationship apart:
//!
//! - the *linkage* (`relationships`): the type/id pointer or navigation links
//!   the server sent, and
//! - the *related* cache (`related`): the bound object behind it, a
//!   [`Resource`] for to-one relationships or a [`Page`] for to-many ones.
//!
//! Network operations (`reload`, `save`, `fetch`, `change` and friends) live
//! in the persistence module; this module covers decoding and local edits.
//!
//! # Example
//!
//! ```rust,ignore
//! let child = children.get("1", &["parent"]).await?;
//!
//! // The included parent was spliced into the related cache
//! let parent = child.get_related("parent").and_then(Related::as_resource).unwrap();
//! println!("{}", parent.get_attribute("name").unwrap());
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::api::JsonApi;
use crate::resources::errors::ResourceError;
use crate::resources::identity::{
    classify, normalize, parse_id, parse_links, to_linkage, IdentifierLike, Linkage, LinkageData,
    LinkageKind, ResourceIdentifier,
};
use crate::resources::page::Page;
use crate::resources::registry::ResourceDescription;

/// Members allowed in a resource object.
const RESOURCE_MEMBERS: &[&str] = &[
    "type",
    "id",
    "lid",
    "attributes",
    "relationships",
    "links",
    "meta",
];

/// Side-loaded resources of a compound document, keyed by `(type, id)`.
pub(crate) type Included<'a> = HashMap<(String, String), &'a Value>;

/// Indexes the `included` member of a document.
pub(crate) fn index_included(document: &Value) -> Result<Included<'_>, ResourceError> {
    let mut index = HashMap::new();
    match document.get("included") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for item in items {
                let identifier = ResourceIdentifier::from_value(item)?;
                if let Some(id) = identifier.id {
                    index.insert((identifier.type_name, id), item);
                }
            }
        }
        Some(other) => {
            return Err(ResourceError::invalid_document(format!(
                "'included' must be an array, got {other}"
            )))
        }
    }
    Ok(index)
}

fn lookup<'a>(included: &Included<'a>, identifier: &ResourceIdentifier) -> Option<&'a Value> {
    let id = identifier.id.as_ref()?;
    included
        .get(&(identifier.type_name.clone(), id.clone()))
        .copied()
}

/// The bound value behind a relationship.
#[derive(Clone, Debug)]
pub enum Related {
    /// A to-one relationship's resource.
    One(Box<Resource>),
    /// A to-many relationship's collection.
    Many(Page),
}

impl Related {
    /// Returns the resource of a to-one relationship.
    #[must_use]
    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::One(resource) => Some(&**resource),
            Self::Many(_) => None,
        }
    }

    /// Returns the page of a to-many relationship.
    #[must_use]
    pub const fn as_page(&self) -> Option<&Page> {
        match self {
            Self::Many(page) => Some(page),
            Self::One(_) => None,
        }
    }
}

/// A JSON:API resource bound to a connection.
///
/// Two resources are equal when their type and id are equal; unsaved
/// resources of the same type compare equal to each other.
#[derive(Clone)]
pub struct Resource {
    pub(crate) api: JsonApi,
    pub(crate) description: Arc<ResourceDescription>,
    pub(crate) id: Option<String>,
    pub(crate) attributes: Map<String, Value>,
    pub(crate) relationships: BTreeMap<String, Option<Linkage>>,
    pub(crate) related: BTreeMap<String, Option<Related>>,
    pub(crate) links: BTreeMap<String, String>,
    pub(crate) redirect: Option<String>,
}

// Verify Resource is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Resource>();
};

impl Resource {
    /// Creates an empty resource of the given description.
    pub(crate) fn empty(api: JsonApi, description: Arc<ResourceDescription>) -> Self {
        Self {
            api,
            description,
            id: None,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
            related: BTreeMap::new(),
            links: BTreeMap::new(),
            redirect: None,
        }
    }

    /// Decodes a top-level document (`{data, included}`) or a bare resource
    /// object.
    pub(crate) fn from_document(
        api: JsonApi,
        description: Arc<ResourceDescription>,
        document: &Value,
    ) -> Result<Self, ResourceError> {
        match document.get("data") {
            Some(data @ Value::Object(_)) => {
                let included = index_included(document)?;
                Self::from_object(api, description, data, &included)
            }
            Some(other) => Err(ResourceError::invalid_document(format!(
                "expected a single resource object, got {other}"
            ))),
            None => Self::from_object(api, description, document, &HashMap::new()),
        }
    }

    /// Decodes a resource object, splicing matching `included` entries into
    /// the related cache.
    pub(crate) fn from_object(
        api: JsonApi,
        description: Arc<ResourceDescription>,
        object: &Value,
        included: &Included<'_>,
    ) -> Result<Self, ResourceError> {
        let members = object.as_object().ok_or_else(|| {
            ResourceError::invalid_document(format!("expected a resource object, got {object}"))
        })?;
        if let Some(member) = members
            .keys()
            .find(|key| !RESOURCE_MEMBERS.contains(&key.as_str()))
        {
            return Err(ResourceError::invalid_document(format!(
                "unexpected member '{member}' in resource object"
            )));
        }

        if let Some(found) = members.get("type") {
            let found = found
                .as_str()
                .ok_or_else(|| ResourceError::invalid_document("'type' must be a string"))?;
            if found != description.name() {
                return Err(ResourceError::TypeMismatch {
                    expected: description.name().to_string(),
                    found: found.to_string(),
                });
            }
        }

        let attributes = match members.get("attributes") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(attributes)) => attributes.clone(),
            Some(other) => {
                return Err(ResourceError::invalid_document(format!(
                    "'attributes' must be an object, got {other}"
                )))
            }
        };

        let mut relationships = BTreeMap::new();
        match members.get("relationships") {
            None | Some(Value::Null) => {}
            Some(Value::Object(entries)) => {
                for (name, value) in entries {
                    relationships.insert(name.clone(), Linkage::parse(value)?);
                }
            }
            Some(other) => {
                return Err(ResourceError::invalid_document(format!(
                    "'relationships' must be an object, got {other}"
                )))
            }
        }

        let links = match members.get("links") {
            Some(links) => parse_links(links)?,
            None => BTreeMap::new(),
        };

        let mut resource = Self {
            id: parse_id(members.get("id"))?,
            attributes,
            relationships,
            links,
            ..Self::empty(api, description)
        };
        resource.bind_related(included)?;
        Ok(resource)
    }

    /// Fills the related cache from the linkage: to-one relationships get
    /// their included resource or a stub, null ones get `None`, and inline
    /// to-many data becomes an evaluated page when every member is included.
    fn bind_related(&mut self, included: &Included<'_>) -> Result<(), ResourceError> {
        let mut related = BTreeMap::new();
        for (name, linkage) in &self.relationships {
            let Some(linkage) = linkage else {
                related.insert(name.clone(), None);
                continue;
            };
            match &linkage.data {
                LinkageData::Null => {
                    related.insert(name.clone(), None);
                }
                LinkageData::One(identifier) => {
                    let resource = match lookup(included, identifier) {
                        Some(object) => self.api.decode_object(object)?,
                        None => self.api.stub(identifier),
                    };
                    related.insert(name.clone(), Some(Related::One(Box::new(resource))));
                }
                LinkageData::Many(identifiers) if !identifiers.is_empty() => {
                    let objects: Option<Vec<&Value>> = identifiers
                        .iter()
                        .map(|identifier| lookup(included, identifier))
                        .collect();
                    if let Some(objects) = objects {
                        let items = objects
                            .into_iter()
                            .map(|object| self.api.decode_object(object))
                            .collect::<Result<Vec<_>, _>>()?;
                        let url = self.related_url(name, linkage);
                        related.insert(
                            name.clone(),
                            Some(Related::Many(Page::evaluated(self.api.clone(), &url, items))),
                        );
                    }
                }
                LinkageData::Many(_) | LinkageData::Absent => {}
            }
        }
        self.related = related;
        Ok(())
    }

    /// The type name.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.description.name()
    }

    /// The type description this resource is bound to.
    #[must_use]
    pub fn description(&self) -> &ResourceDescription {
        &self.description
    }

    /// The connection this resource is bound to.
    #[must_use]
    pub const fn api(&self) -> &JsonApi {
        &self.api
    }

    /// The id, or `None` if the resource is unsaved.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns `true` once the server has assigned an id.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    /// All attributes.
    #[must_use]
    pub const fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// All relationship linkage, keyed by relationship name.
    #[must_use]
    pub const fn relationships(&self) -> &BTreeMap<String, Option<Linkage>> {
        &self.relationships
    }

    /// The related cache, keyed by relationship name.
    #[must_use]
    pub const fn related(&self) -> &BTreeMap<String, Option<Related>> {
        &self.related
    }

    /// The resource's links.
    #[must_use]
    pub const fn links(&self) -> &BTreeMap<String, String> {
        &self.links
    }

    /// The pending redirect target, set by a `303 See Other` on reload.
    #[must_use]
    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Returns an attribute deserialized into `T`, or `None` if unset.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidDocument`] if the value does not
    /// deserialize into `T`.
    pub fn attribute_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ResourceError> {
        self.attributes
            .get(name)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    ResourceError::invalid_document(format!("attribute '{name}': {e}"))
                })
            })
            .transpose()
    }

    /// Sets an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::FieldConflict`] if `name` is a relationship.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), ResourceError> {
        let name = name.into();
        if self.relationships.contains_key(&name) {
            return Err(ResourceError::FieldConflict { name });
        }
        self.attributes.insert(name, value.into());
        Ok(())
    }

    /// Returns `true` if `name` is a declared relationship.
    #[must_use]
    pub fn has_relationship(&self, name: &str) -> bool {
        self.relationships.contains_key(name)
    }

    /// Returns a relationship's linkage (`None` for unknown or null
    /// relationships).
    #[must_use]
    pub fn linkage(&self, name: &str) -> Option<&Linkage> {
        self.relationships.get(name).and_then(Option::as_ref)
    }

    /// Returns the cached related value of a relationship.
    #[must_use]
    pub fn get_related(&self, name: &str) -> Option<&Related> {
        self.related.get(name).and_then(Option::as_ref)
    }

    /// Returns the identifier of this resource.
    #[must_use]
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier {
            type_name: self.description.name().to_string(),
            id: self.id.clone(),
        }
    }

    /// Returns `{data: identifier}` for use as another resource's linkage.
    #[must_use]
    pub fn as_linkage(&self) -> Linkage {
        to_linkage(self.identifier())
    }

    /// Assigns a to-one relationship locally.
    ///
    /// The linkage is replaced only when the identifier actually changes; the
    /// related cache is refreshed either way. `None` (or JSON `null`) clears
    /// the relationship.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::UnknownRelationship`] if `name` is not declared
    /// - [`ResourceError::PluralRelationship`] if the relationship is to-many
    /// - any error of [`normalize`]
    pub fn set_related(
        &mut self,
        name: &str,
        value: Option<IdentifierLike>,
    ) -> Result<(), ResourceError> {
        let current = self.relationship_entry(name)?;
        if classify(current) == LinkageKind::Plural {
            return Err(ResourceError::PluralRelationship {
                name: name.to_string(),
            });
        }

        let (identifier, cached) = match value.filter(|value| !value.is_null()) {
            None => (None, None),
            Some(value) => {
                let default_type = current.and_then(Linkage::data_type).map(str::to_string);
                let identifier = normalize(&value, default_type.as_deref())?;
                let cached = self.bind_value(value, &identifier);
                (Some(identifier), Some(cached))
            }
        };

        let changed = match (&identifier, current) {
            (Some(new), Some(linkage)) => linkage.identifier() != Some(new),
            (None, None) => false,
            _ => true,
        };
        if changed {
            self.relationships
                .insert(name.to_string(), identifier.map(to_linkage));
        }
        self.related.insert(
            name.to_string(),
            cached.map(|resource| Related::One(Box::new(resource))),
        );
        Ok(())
    }

    /// Looks up a declared relationship.
    pub(crate) fn relationship_entry(&self, name: &str) -> Result<Option<&Linkage>, ResourceError> {
        self.relationships
            .get(name)
            .map(Option::as_ref)
            .ok_or_else(|| ResourceError::UnknownRelationship {
                resource_type: self.resource_type().to_string(),
                name: name.to_string(),
            })
    }

    /// Turns a relationship value into the resource to cache for it.
    pub(crate) fn bind_value(&self, value: IdentifierLike, identifier: &ResourceIdentifier) -> Self {
        match value {
            IdentifierLike::Resource(resource) => *resource,
            IdentifierLike::Json(value) => self
                .api
                .as_resource(value)
                .unwrap_or_else(|_| self.api.stub(identifier)),
            _ => self.api.stub(identifier),
        }
    }

    /// Returns `true` if attributes or relationships have been loaded.
    pub(crate) fn is_populated(&self) -> bool {
        !self.attributes.is_empty() || !self.relationships.is_empty()
    }

    /// The collection URL of this resource's type.
    pub(crate) fn collection_url(&self) -> String {
        format!("/{}", self.resource_type())
    }

    /// The canonical URL: `links.self`, else `/{type}/{id}`. Unsaved
    /// resources always use the conventional path with an empty id.
    pub(crate) fn item_url(&self) -> String {
        match (&self.id, self.links.get("self")) {
            (Some(_), Some(url)) => url.clone(),
            (id, _) => format!(
                "/{}/{}",
                self.resource_type(),
                id.as_deref().unwrap_or_default()
            ),
        }
    }

    /// The related-collection URL of a relationship.
    pub(crate) fn related_url(&self, name: &str, linkage: &Linkage) -> String {
        linkage.link("related").map_or_else(
            || {
                format!(
                    "/{}/{}/{name}",
                    self.resource_type(),
                    self.id.as_deref().unwrap_or_default()
                )
            },
            str::to_string,
        )
    }

    /// Attributes to write, restricted to `selection` when given.
    pub(crate) fn attributes_payload(&self, selection: Option<&BTreeSet<String>>) -> Map<String, Value> {
        self.attributes
            .iter()
            .filter(|(name, _)| selection.map_or(true, |fields| fields.contains(*name)))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Relationships to write, restricted to `selection` when given.
    /// Links-only linkage cannot be written and is skipped.
    pub(crate) fn relationships_payload(
        &self,
        selection: Option<&BTreeSet<String>>,
    ) -> Map<String, Value> {
        self.relationships
            .iter()
            .filter(|(name, _)| selection.map_or(true, |fields| fields.contains(*name)))
            .filter_map(|(name, linkage)| {
                let payload = match linkage {
                    None => Some(Linkage::null().to_value()),
                    Some(linkage) => linkage.payload(),
                };
                payload.map(|payload| (name.clone(), payload))
            })
            .collect()
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.resource_type() == other.resource_type() && self.id == other.id
    }
}

impl Eq for Resource {}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}: {}",
            self.resource_type(),
            self.id.as_deref().unwrap_or("Unsaved")
        )?;
        if self.redirect.is_some() {
            write!(f, " (redirect ready)")?;
        }
        write!(f, ">")
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("type", &self.resource_type())
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("relationships", &self.relationships)
            .field("related", &self.related.keys().collect::<Vec<_>>())
            .field("links", &self.links)
            .field("redirect", &self.redirect)
            .finish_non_exhaustive()
    }
}
