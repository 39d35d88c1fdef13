//! Resource type registry.
//!
//! Decoding is type-directed: the `type` member of a document picks the
//! [`ResourceDescription`] to bind, regardless of what the call site expected.
//! Types nobody registered decode with a generic description, so documents
//! mentioning new server-side types never fail to decode.
//!
//! # Declaring resource types
//!
//! ```rust
//! use jsonapi_client::resources::{Registry, ResourceType};
//!
//! struct Article;
//!
//! impl ResourceType for Article {
//!     const TYPE: &'static str = "articles";
//!     const EDITABLE: Option<&'static [&'static str]> = Some(&["title", "body", "author"]);
//! }
//!
//! let registry = Registry::new();
//! registry.register(Article::description());
//!
//! assert!(registry.resolve("articles").is_ok());
//! assert!(registry.resolve("comments").is_err());
//! assert_eq!(registry.resolve_or_generic("comments").name(), "comments");
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::resources::errors::ResourceError;

/// Static metadata of a resource type.
///
/// Implement this on a marker type and register it with
/// [`JsonApi::register`](crate::JsonApi::register).
pub trait ResourceType {
    /// The JSON:API `type` name.
    const TYPE: &'static str;

    /// Fields written by `save` and `bulk_update` when no explicit field list
    /// is given. `None` writes every field that is set.
    const EDITABLE: Option<&'static [&'static str]> = None;

    /// Builds the runtime description of this type.
    #[must_use]
    fn description() -> ResourceDescription {
        ResourceDescription {
            name: Self::TYPE.to_string(),
            editable: Self::EDITABLE.map(|fields| fields.iter().map(ToString::to_string).collect()),
        }
    }
}

/// Runtime description of a resource type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceDescription {
    name: String,
    editable: Option<Vec<String>>,
}

impl ResourceDescription {
    /// Creates a description with no editable-field allowlist.
    #[must_use]
    pub fn generic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            editable: None,
        }
    }

    /// Sets the editable-field allowlist.
    #[must_use]
    pub fn with_editable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.editable = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// The type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The editable-field allowlist, if declared.
    #[must_use]
    pub fn editable(&self) -> Option<&[String]> {
        self.editable.as_deref()
    }

    /// Fields a write should include: `explicit` if non-empty, else the
    /// allowlist, else `None` meaning every field.
    #[must_use]
    pub fn writable_fields(&self, explicit: &[&str]) -> Option<BTreeSet<String>> {
        if !explicit.is_empty() {
            return Some(explicit.iter().map(ToString::to_string).collect());
        }
        self.editable
            .as_ref()
            .map(|fields| fields.iter().cloned().collect())
    }
}

/// Maps type names to descriptions.
///
/// Registration must happen before documents of that type are decoded;
/// there is no teardown.
#[derive(Debug, Default)]
pub struct Registry {
    types: RwLock<HashMap<String, Arc<ResourceDescription>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a description, replacing any previous one of the same name.
    pub fn register(&self, description: ResourceDescription) -> Arc<ResourceDescription> {
        let description = Arc::new(description);
        tracing::debug!(resource_type = %description.name, "Registering resource type");
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(description.name.clone(), Arc::clone(&description));
        description
    }

    /// Looks up a description by type name.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownType`] if nothing is registered.
    pub fn resolve(&self, name: &str) -> Result<Arc<ResourceDescription>, ResourceError> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ResourceError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Looks up a description, falling back to a generic one.
    #[must_use]
    pub fn resolve_or_generic(&self, name: &str) -> Arc<ResourceDescription> {
        self.resolve(name)
            .unwrap_or_else(|_| Arc::new(ResourceDescription::generic(name)))
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo;

    impl ResourceType for Foo {
        const TYPE: &'static str = "foos";
        const EDITABLE: Option<&'static [&'static str]> = Some(&["name", "parent"]);
    }

    struct Bar;

    impl ResourceType for Bar {
        const TYPE: &'static str = "bars";
    }

    #[test]
    fn test_description_from_resource_type() {
        let description = Foo::description();
        assert_eq!(description.name(), "foos");
        assert_eq!(
            description.editable(),
            Some(&["name".to_string(), "parent".to_string()][..])
        );
        assert!(Bar::description().editable().is_none());
    }

    #[test]
    fn test_resolve_unknown_type() {
        let registry = Registry::new();
        registry.register(Foo::description());

        assert_eq!(registry.resolve("foos").unwrap().name(), "foos");
        assert!(matches!(
            registry.resolve("bars"),
            Err(ResourceError::UnknownType { name }) if name == "bars"
        ));
    }

    #[test]
    fn test_generic_fallback() {
        let registry = Registry::new();
        let description = registry.resolve_or_generic("widgets");
        assert_eq!(description.name(), "widgets");
        assert!(description.editable().is_none());
        assert!(!registry.contains("widgets"));
    }

    #[test]
    fn test_register_replaces() {
        let registry = Registry::new();
        registry.register(ResourceDescription::generic("foos"));
        registry.register(Foo::description());
        assert!(registry.resolve("foos").unwrap().editable().is_some());
    }

    #[test]
    fn test_writable_fields_precedence() {
        let description = Foo::description();
        let explicit = description.writable_fields(&["other"]).unwrap();
        assert!(explicit.contains("other") && explicit.len() == 1);

        let declared = description.writable_fields(&[]).unwrap();
        assert!(declared.contains("name") && declared.contains("parent"));

        assert!(Bar::description().writable_fields(&[]).is_none());
    }
}
