//! Identity and linkage codec.
//!
//! Converts between resource identifiers (`{type, id}`), relationship linkage
//! (`{data?, links?}`) and the values callers pass to relationship-editing
//! operations. Every operation that accepts "something that points at a
//! resource" goes through [`normalize`].
//!
//! # Example
//!
//! ```rust
//! use jsonapi_client::resources::{classify, normalize, to_linkage, IdentifierLike, LinkageKind, ResourceIdentifier};
//!
//! let parent = ResourceIdentifier::new("parents", "1");
//! let linkage = to_linkage(parent.clone());
//! assert_eq!(classify(Some(&linkage)), LinkageKind::Singular);
//!
//! let back = normalize(&IdentifierLike::Linkage(linkage), None).unwrap();
//! assert_eq!(back, parent);
//!
//! let from_id = normalize(&IdentifierLike::from("2"), Some("parents")).unwrap();
//! assert_eq!(from_id, ResourceIdentifier::new("parents", "2"));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Map, Value};

use crate::resources::errors::ResourceError;
use crate::resources::resource::Resource;

/// The identity of a resource: its type and, once persisted, its id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdentifier {
    /// The resource type name.
    pub type_name: String,
    /// The id, or `None` for a resource that has not been saved yet.
    pub id: Option<String>,
}

impl ResourceIdentifier {
    /// Creates an identifier for a persisted resource.
    #[must_use]
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: Some(id.into()),
        }
    }

    /// Creates an identifier for an unsaved resource.
    #[must_use]
    pub fn unsaved(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
        }
    }

    /// Parses a `{type, id}` object. Numeric ids are accepted and stringified.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidIdentifier`] if `type` is missing or
    /// `id` is neither a string, a number nor null.
    pub fn from_value(value: &Value) -> Result<Self, ResourceError> {
        let object = value
            .as_object()
            .ok_or_else(|| ResourceError::invalid_identifier(format!("expected an object, got {value}")))?;
        let type_name = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ResourceError::invalid_identifier("missing 'type'"))?;
        Ok(Self {
            type_name: type_name.to_string(),
            id: parse_id(object.get("id"))?,
        })
    }

    /// Serializes as `{"type": .., "id": ..}`, omitting a missing id.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".to_string(), Value::String(self.type_name.clone()));
        if let Some(id) = &self.id {
            object.insert("id".to_string(), Value::String(id.clone()));
        }
        Value::Object(object)
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{id}", self.type_name),
            None => write!(f, "{}:<unsaved>", self.type_name),
        }
    }
}

/// Reads an id that may be a string, a number, null or missing.
pub(crate) fn parse_id(value: Option<&Value>) -> Result<Option<String>, ResourceError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id.clone())),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(other) => Err(ResourceError::invalid_identifier(format!(
            "id must be a string or a number, got {other}"
        ))),
    }
}

/// The `data` member of a relationship linkage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkageData {
    /// No `data` key: a to-many relationship reachable through its links.
    Absent,
    /// `data: null`: an empty to-one relationship.
    Null,
    /// A to-one relationship.
    One(ResourceIdentifier),
    /// A to-many relationship with inline members.
    Many(Vec<ResourceIdentifier>),
}

/// How a relationship may be edited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkageKind {
    /// To-one: assign with `set_related` or `change`.
    Singular,
    /// To-many: edit with `add`, `remove` or `reset`.
    Plural,
    /// The relationship itself is null.
    Null,
}

/// A relationship pointer: identifier data, navigation links, or both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Linkage {
    /// The linkage data.
    pub data: LinkageData,
    /// Navigation links (`self`, `related`).
    pub links: BTreeMap<String, String>,
}

impl Linkage {
    /// Creates a `{data: null}` linkage.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            data: LinkageData::Null,
            links: BTreeMap::new(),
        }
    }

    /// Creates a links-only linkage pointing at a related collection.
    #[must_use]
    pub fn related_link(url: impl Into<String>) -> Self {
        let mut links = BTreeMap::new();
        links.insert("related".to_string(), url.into());
        Self {
            data: LinkageData::Absent,
            links,
        }
    }

    /// Parses a relationship value. JSON `null` yields `None`.
    ///
    /// Accepts `{data, links}` objects as well as a bare `{type, id}`
    /// identifier, which is read as `{data: {type, id}}`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidDocument`] if the value carries
    /// neither `data` nor `links`, or if they are malformed.
    pub fn parse(value: &Value) -> Result<Option<Self>, ResourceError> {
        let object = match value {
            Value::Null => return Ok(None),
            Value::Object(object) => object,
            other => {
                return Err(ResourceError::invalid_document(format!(
                    "relationship must be an object or null, got {other}"
                )))
            }
        };

        if object.contains_key("type") && !object.contains_key("data") {
            return Ok(Some(Self {
                data: LinkageData::One(ResourceIdentifier::from_value(value)?),
                links: BTreeMap::new(),
            }));
        }

        let data = match object.get("data") {
            None => LinkageData::Absent,
            Some(Value::Null) => LinkageData::Null,
            Some(Value::Array(items)) => LinkageData::Many(
                items
                    .iter()
                    .map(ResourceIdentifier::from_value)
                    .collect::<Result<_, _>>()?,
            ),
            Some(item) => LinkageData::One(ResourceIdentifier::from_value(item)?),
        };
        let links = match object.get("links") {
            Some(links) => parse_links(links)?,
            None => BTreeMap::new(),
        };

        if data == LinkageData::Absent && links.is_empty() {
            return Err(ResourceError::invalid_document(
                "relationship has neither 'data' nor 'links'",
            ));
        }
        Ok(Some(Self { data, links }))
    }

    /// Returns the identifier of a to-one linkage.
    #[must_use]
    pub const fn identifier(&self) -> Option<&ResourceIdentifier> {
        match &self.data {
            LinkageData::One(identifier) => Some(identifier),
            _ => None,
        }
    }

    /// Returns a navigation link by name.
    #[must_use]
    pub fn link(&self, name: &str) -> Option<&str> {
        self.links.get(name).map(String::as_str)
    }

    /// Type name of the linked data, if any member is present.
    #[must_use]
    pub fn data_type(&self) -> Option<&str> {
        match &self.data {
            LinkageData::One(identifier) => Some(&identifier.type_name),
            LinkageData::Many(items) => items.first().map(|i| i.type_name.as_str()),
            LinkageData::Absent | LinkageData::Null => None,
        }
    }

    /// Serializes the full linkage, including links.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        if let Some(data) = self.data_value() {
            object.insert("data".to_string(), data);
        }
        if !self.links.is_empty() {
            object.insert("links".to_string(), json!(self.links));
        }
        Value::Object(object)
    }

    /// Serializes the linkage for a write request: `{data}` only.
    ///
    /// Returns `None` for links-only linkage, which cannot be written.
    #[must_use]
    pub fn payload(&self) -> Option<Value> {
        self.data_value().map(|data| json!({ "data": data }))
    }

    fn data_value(&self) -> Option<Value> {
        match &self.data {
            LinkageData::Absent => None,
            LinkageData::Null => Some(Value::Null),
            LinkageData::One(identifier) => Some(identifier.to_value()),
            LinkageData::Many(items) => Some(Value::Array(
                items.iter().map(ResourceIdentifier::to_value).collect(),
            )),
        }
    }
}

/// Parses a `links` object. Values may be URLs or `{href}` link objects;
/// null links are dropped.
pub(crate) fn parse_links(value: &Value) -> Result<BTreeMap<String, String>, ResourceError> {
    let object = match value {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Object(object) => object,
        other => {
            return Err(ResourceError::invalid_document(format!(
                "links must be an object, got {other}"
            )))
        }
    };
    let mut links = BTreeMap::new();
    for (name, link) in object {
        let href = match link {
            Value::Null => continue,
            Value::String(href) => href.clone(),
            Value::Object(link) => match link.get("href").and_then(Value::as_str) {
                Some(href) => href.to_string(),
                None => continue,
            },
            other => {
                return Err(ResourceError::invalid_document(format!(
                    "link '{name}' must be a string, got {other}"
                )))
            }
        };
        links.insert(name.clone(), href);
    }
    Ok(links)
}

/// Wraps an identifier as `{data: identifier}`.
#[must_use]
pub fn to_linkage(identifier: ResourceIdentifier) -> Linkage {
    Linkage {
        data: LinkageData::One(identifier),
        links: BTreeMap::new(),
    }
}

/// Classifies a relationship.
///
/// `Null` iff the linkage itself is null, `Singular` iff it carries a to-one
/// `data` member (including `data: null`), `Plural` otherwise.
#[must_use]
pub fn classify(linkage: Option<&Linkage>) -> LinkageKind {
    match linkage {
        None => LinkageKind::Null,
        Some(Linkage {
            data: LinkageData::Null | LinkageData::One(_),
            ..
        }) => LinkageKind::Singular,
        Some(_) => LinkageKind::Plural,
    }
}

/// Anything that can point at a resource.
#[derive(Clone, Debug)]
pub enum IdentifierLike {
    /// A bound resource.
    Resource(Box<Resource>),
    /// An explicit identifier.
    Identifier(ResourceIdentifier),
    /// A relationship linkage with to-one data.
    Linkage(Linkage),
    /// A bare id; the type comes from context.
    Id(String),
    /// A raw JSON value: `{type, id}`, `{data: {type, id}}`, a full resource
    /// object, or a bare string/number id.
    Json(Value),
}

impl IdentifierLike {
    /// Returns `true` for a JSON `null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Json(Value::Null))
    }
}

impl From<Resource> for IdentifierLike {
    fn from(resource: Resource) -> Self {
        Self::Resource(Box::new(resource))
    }
}

impl From<&Resource> for IdentifierLike {
    fn from(resource: &Resource) -> Self {
        Self::Resource(Box::new(resource.clone()))
    }
}

impl From<ResourceIdentifier> for IdentifierLike {
    fn from(identifier: ResourceIdentifier) -> Self {
        Self::Identifier(identifier)
    }
}

impl From<Linkage> for IdentifierLike {
    fn from(linkage: Linkage) -> Self {
        Self::Linkage(linkage)
    }
}

impl From<&str> for IdentifierLike {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for IdentifierLike {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<u64> for IdentifierLike {
    fn from(id: u64) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<Value> for IdentifierLike {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Resolves any [`IdentifierLike`] to an identifier.
///
/// `default_type` completes bare ids.
///
/// # Errors
///
/// Returns [`ResourceError::InvalidIdentifier`] if the value does not point
/// at a resource, or is a bare id without a `default_type`.
pub fn normalize(
    value: &IdentifierLike,
    default_type: Option<&str>,
) -> Result<ResourceIdentifier, ResourceError> {
    match value {
        IdentifierLike::Resource(resource) => Ok(resource.identifier()),
        IdentifierLike::Identifier(identifier) => Ok(identifier.clone()),
        IdentifierLike::Linkage(linkage) => linkage.identifier().cloned().ok_or_else(|| {
            ResourceError::invalid_identifier("linkage does not carry to-one data")
        }),
        IdentifierLike::Id(id) => with_default_type(id.clone(), default_type),
        IdentifierLike::Json(value) => normalize_json(value, default_type),
    }
}

/// Like [`normalize`], but requires the result to be of `expected_type`.
///
/// # Errors
///
/// Returns [`ResourceError::TypeMismatch`] if the value names another type,
/// or any error of [`normalize`].
pub fn normalize_as(
    value: &IdentifierLike,
    expected_type: &str,
) -> Result<ResourceIdentifier, ResourceError> {
    let identifier = normalize(value, Some(expected_type))?;
    if identifier.type_name != expected_type {
        return Err(ResourceError::TypeMismatch {
            expected: expected_type.to_string(),
            found: identifier.type_name,
        });
    }
    Ok(identifier)
}

fn normalize_json(
    value: &Value,
    default_type: Option<&str>,
) -> Result<ResourceIdentifier, ResourceError> {
    match value {
        Value::String(id) => with_default_type(id.clone(), default_type),
        Value::Number(id) => with_default_type(id.to_string(), default_type),
        Value::Object(object) => match object.get("data") {
            // A relationship document: `data` must itself be an identifier
            Some(data @ Value::Object(_)) => ResourceIdentifier::from_value(data),
            Some(_) => Err(ResourceError::invalid_identifier(
                "relationship document does not carry to-one data",
            )),
            None => ResourceIdentifier::from_value(value),
        },
        other => Err(ResourceError::invalid_identifier(format!(
            "cannot point at a resource with {other}"
        ))),
    }
}

fn with_default_type(
    id: String,
    default_type: Option<&str>,
) -> Result<ResourceIdentifier, ResourceError> {
    default_type
        .map(|type_name| ResourceIdentifier::new(type_name, id.clone()))
        .ok_or_else(|| {
            ResourceError::invalid_identifier(format!("cannot infer the type of bare id '{id}'"))
        })
}
