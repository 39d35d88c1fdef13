//! Payload shaping for bulk operations.
//!
//! Bulk endpoints take one request carrying an array of resource objects.
//! Callers may pass a mix of inputs; each [`BulkItem`] is shaped into a
//! uniform `{type, id?, attributes?, relationships?}` entry, and the
//! operation decides whether an id is required or forbidden.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use crate::resources::errors::ResourceError;
use crate::resources::identity::{
    normalize, normalize_as, parse_id, IdentifierLike, Linkage, ResourceIdentifier,
};
use crate::resources::resource::Resource;

const FRAGMENT_MEMBERS: &[&str] = &["type", "id", "attributes", "relationships", "links", "meta"];

/// Members that may not appear as attribute names.
const RESERVED_MEMBERS: &[&str] = &["type", "id"];

/// One input of a bulk operation.
///
/// # Example
///
/// ```rust
/// use jsonapi_client::resources::BulkItem;
/// use serde_json::json;
///
/// let items: Vec<BulkItem> = vec![
///     json!({"type": "foos", "id": "2"}).into(),
///     json!({"data": {"type": "foos", "id": "3"}}).into(),
///     "4".into(),
///     (json!({"name": "five"}), json!({"parent": {"type": "bars", "id": "1"}})).into(),
/// ];
/// assert_eq!(items.len(), 4);
/// ```
#[derive(Clone, Debug)]
pub enum BulkItem {
    /// A bound resource of the operation's type.
    Resource(Box<Resource>),
    /// A document (`{data: {...}}`), a resource fragment, a bare attribute
    /// map (create only) or a bare id (update and delete only).
    ///
    /// An object is a fragment when every key is a resource object member
    /// (`type`, `id`, `attributes`, `relationships`, `links`, `meta`).
    /// Anything else is an attribute map, which may not use the reserved
    /// `type` and `id` names.
    Json(Value),
    /// Positional `(attributes, relationships[, id])`.
    Fields {
        /// Explicit id, if any.
        id: Option<String>,
        /// An attribute object, or null.
        attributes: Value,
        /// A relationship object, or null.
        relationships: Value,
    },
    /// A bare id.
    Id(String),
}

impl From<Resource> for BulkItem {
    fn from(resource: Resource) -> Self {
        Self::Resource(Box::new(resource))
    }
}

impl From<&Resource> for BulkItem {
    fn from(resource: &Resource) -> Self {
        Self::Resource(Box::new(resource.clone()))
    }
}

impl From<Value> for BulkItem {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for BulkItem {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for BulkItem {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<(Value, Value)> for BulkItem {
    fn from((attributes, relationships): (Value, Value)) -> Self {
        Self::Fields {
            id: None,
            attributes,
            relationships,
        }
    }
}

impl From<(Value, Value, String)> for BulkItem {
    fn from((attributes, relationships, id): (Value, Value, String)) -> Self {
        Self::Fields {
            id: Some(id),
            attributes,
            relationships,
        }
    }
}

impl From<(Value, Value, &str)> for BulkItem {
    fn from((attributes, relationships, id): (Value, Value, &str)) -> Self {
        Self::Fields {
            id: Some(id.to_string()),
            attributes,
            relationships,
        }
    }
}

/// Which bulk operation an item is shaped for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BulkContext {
    Create,
    Update,
    Delete,
}

/// A shaped bulk entry. Relationship values are already write payloads.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct BulkEntry {
    pub(crate) id: Option<String>,
    pub(crate) attributes: Map<String, Value>,
    pub(crate) relationships: Map<String, Value>,
}

impl BulkEntry {
    /// The resource object sent for this entry.
    ///
    /// Deletes only send identifiers. `selection` restricts the fields of
    /// creates and updates.
    pub(crate) fn to_value(
        &self,
        resource_type: &str,
        context: BulkContext,
        selection: Option<&BTreeSet<String>>,
    ) -> Value {
        let mut object = Map::new();
        object.insert("type".to_string(), json!(resource_type));
        if let Some(id) = &self.id {
            object.insert("id".to_string(), json!(id));
        }
        if context == BulkContext::Delete {
            return Value::Object(object);
        }

        let selected = |name: &String| selection.map_or(true, |fields| fields.contains(name));
        let attributes: Map<String, Value> = self
            .attributes
            .iter()
            .filter(|(name, _)| selected(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let relationships: Map<String, Value> = self
            .relationships
            .iter()
            .filter(|(name, _)| selected(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        if !attributes.is_empty() {
            object.insert("attributes".to_string(), Value::Object(attributes));
        }
        if !relationships.is_empty() {
            object.insert("relationships".to_string(), Value::Object(relationships));
        }
        Value::Object(object)
    }
}

impl BulkItem {
    /// Shapes the item for `context`, checking id presence.
    ///
    /// Deletes only need an identifier, so their items are resolved like any
    /// other identifier of `resource_type`.
    pub(crate) fn shape(
        self,
        resource_type: &str,
        context: BulkContext,
        index: usize,
    ) -> Result<BulkEntry, ResourceError> {
        if context == BulkContext::Delete {
            return self.identify(resource_type, index).map(|id| BulkEntry {
                id: Some(id),
                ..BulkEntry::default()
            });
        }

        let entry = match self {
            Self::Resource(resource) => from_resource(&resource, resource_type)?,
            Self::Json(value) => from_json(value, resource_type, context, index)?,
            Self::Fields {
                id,
                attributes,
                relationships,
            } => BulkEntry {
                id,
                attributes: attribute_map(attributes)?,
                relationships: relationship_map(relationships)?,
            },
            Self::Id(id) => BulkEntry {
                id: Some(id),
                ..BulkEntry::default()
            },
        };

        match (context, &entry.id) {
            (BulkContext::Create, Some(id)) => Err(ResourceError::UnexpectedIdentifier {
                resource_type: resource_type.to_string(),
                index,
                id: id.clone(),
            }),
            (BulkContext::Update, None) => Err(ResourceError::MissingIdentifier {
                resource_type: resource_type.to_string(),
                index,
            }),
            _ => Ok(entry),
        }
    }

    /// Resolves the item to the id of a `resource_type` resource.
    fn identify(self, resource_type: &str, index: usize) -> Result<String, ResourceError> {
        let missing = || ResourceError::MissingIdentifier {
            resource_type: resource_type.to_string(),
            index,
        };
        let value = match self {
            Self::Resource(resource) => IdentifierLike::Resource(resource),
            Self::Json(Value::Object(object))
                if !object.contains_key("id") && !object.contains_key("data") =>
            {
                return Err(missing());
            }
            Self::Json(value) => IdentifierLike::Json(value),
            Self::Fields { id: Some(id), .. } | Self::Id(id) => IdentifierLike::Id(id),
            Self::Fields { id: None, .. } => return Err(missing()),
        };
        normalize_as(&value, resource_type)?.id.ok_or_else(missing)
    }
}

fn from_resource(resource: &Resource, resource_type: &str) -> Result<BulkEntry, ResourceError> {
    check_type(resource.resource_type(), resource_type)?;
    Ok(BulkEntry {
        id: resource.id().map(ToString::to_string),
        attributes: resource.attributes_payload(None),
        relationships: resource.relationships_payload(None),
    })
}

fn from_json(
    value: Value,
    resource_type: &str,
    context: BulkContext,
    index: usize,
) -> Result<BulkEntry, ResourceError> {
    let value = match value {
        Value::Object(mut object) if object.contains_key("data") => {
            object.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    match value {
        Value::Object(object)
            if !object.is_empty()
                && object.keys().all(|key| FRAGMENT_MEMBERS.contains(&key.as_str())) =>
        {
            from_fragment(object, resource_type)
        }
        Value::Object(attributes) => {
            if let Some(reserved) = RESERVED_MEMBERS.iter().find(|key| attributes.contains_key(**key)) {
                return Err(ResourceError::invalid_document(format!(
                    "bulk item {index} mixes '{reserved}' with attribute names"
                )));
            }
            shape_attributes(attributes, resource_type, context, index)
        }
        Value::String(id) => Ok(BulkEntry {
            id: Some(id),
            ..BulkEntry::default()
        }),
        Value::Number(id) => Ok(BulkEntry {
            id: Some(id.to_string()),
            ..BulkEntry::default()
        }),
        other => Err(ResourceError::invalid_document(format!(
            "bulk item {index} is not a resource, fragment or id: {other}"
        ))),
    }
}

fn shape_attributes(
    attributes: Map<String, Value>,
    resource_type: &str,
    context: BulkContext,
    index: usize,
) -> Result<BulkEntry, ResourceError> {
    match context {
        BulkContext::Create => Ok(BulkEntry {
            attributes,
            ..BulkEntry::default()
        }),
        BulkContext::Update | BulkContext::Delete => Err(ResourceError::MissingIdentifier {
            resource_type: resource_type.to_string(),
            index,
        }),
    }
}

fn from_fragment(
    mut object: Map<String, Value>,
    resource_type: &str,
) -> Result<BulkEntry, ResourceError> {
    if let Some(found) = object.get("type").and_then(Value::as_str) {
        check_type(found, resource_type)?;
    }
    let id = parse_id(object.get("id"))?;
    Ok(BulkEntry {
        id,
        attributes: attribute_map(object.remove("attributes").unwrap_or(Value::Null))?,
        relationships: relationship_map(object.remove("relationships").unwrap_or(Value::Null))?,
    })
}

fn check_type(found: &str, expected: &str) -> Result<(), ResourceError> {
    if found == expected {
        Ok(())
    } else {
        Err(ResourceError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

fn attribute_map(value: Value) -> Result<Map<String, Value>, ResourceError> {
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(attributes) => Ok(attributes),
        other => Err(ResourceError::invalid_document(format!(
            "attributes must be an object, got {other}"
        ))),
    }
}

fn relationship_map(value: Value) -> Result<Map<String, Value>, ResourceError> {
    let relationships = match value {
        Value::Null => return Ok(Map::new()),
        Value::Object(relationships) => relationships,
        other => {
            return Err(ResourceError::invalid_document(format!(
                "relationships must be an object, got {other}"
            )))
        }
    };

    let mut payloads = Map::new();
    for (name, value) in relationships {
        if let Some(payload) = relationship_payload(&value)? {
            payloads.insert(name, payload);
        }
    }
    Ok(payloads)
}

/// Turns a relationship value into `{data}`. Links-only linkage is dropped.
fn relationship_payload(value: &Value) -> Result<Option<Value>, ResourceError> {
    match value {
        Value::Null => Ok(Some(json!({ "data": null }))),
        Value::Array(items) => {
            let data = items
                .iter()
                .map(|item| identifier_of(item).map(|identifier| identifier.to_value()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(json!({ "data": data })))
        }
        Value::Object(object) if object.contains_key("data") || object.contains_key("links") => {
            Ok(Linkage::parse(value)?.and_then(|linkage| linkage.payload()))
        }
        other => Ok(Some(json!({ "data": identifier_of(other)?.to_value() }))),
    }
}

fn identifier_of(value: &Value) -> Result<ResourceIdentifier, ResourceError> {
    normalize(&IdentifierLike::Json(value.clone()), None)
}
