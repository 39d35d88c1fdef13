//! Error types for resource, relationship and pagination operations.
//!
//! Local contract violations (type mismatches, misuse of relationship
//! operations, missing identifiers) are reported before any request is sent.
//! Transport failures are wrapped unchanged in [`ResourceError::Http`].
//!
//! # Example
//!
//! ```rust,ignore
//! use jsonapi_client::clients::HttpError;
//! use jsonapi_client::resources::ResourceError;
//!
//! match article.save(&[]).await {
//!     Ok(()) => {}
//!     Err(ResourceError::Http(HttpError::Protocol(e))) => {
//!         if let Ok(Some(pointer)) = e.source() {
//!             println!("invalid field: {pointer}");
//!         }
//!     }
//!     Err(e) => println!("{e}"),
//! }
//! ```

use thiserror::Error;

use crate::clients::{HttpError, InvalidHttpRequestError, ProtocolError};

/// Error type for resource operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A `type` field conflicts with the expected resource type.
    #[error("Type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch {
        /// The type the operation expected.
        expected: String,
        /// The type that was supplied.
        found: String,
    },

    /// The name is not a relationship of this resource.
    #[error("'{name}' is not a relationship of '{resource_type}'")]
    UnknownRelationship {
        /// The resource type.
        resource_type: String,
        /// The requested relationship name.
        name: String,
    },

    /// A to-many relationship was used where a to-one relationship is required.
    #[error("Relationship '{name}' is plural; use add, remove or reset instead")]
    PluralRelationship {
        /// The relationship name.
        name: String,
    },

    /// A to-one relationship was used where a to-many relationship is required.
    #[error("Relationship '{name}' is singular; use change instead")]
    SingularRelationship {
        /// The relationship name.
        name: String,
    },

    /// A resource needs an id for this operation but has none.
    #[error("Item {index} of '{resource_type}' has no id")]
    MissingIdentifier {
        /// The resource type.
        resource_type: String,
        /// Position of the offending item (0 for single-resource operations).
        index: usize,
    },

    /// The resource has not been saved, so it has no server-side endpoint yet.
    #[error("'{resource_type}' resource has no id yet; save it first")]
    Unsaved {
        /// The resource type.
        resource_type: String,
    },

    /// A resource carries an id but the operation creates new resources.
    #[error("Item {index} of '{resource_type}' already has id '{id}'")]
    UnexpectedIdentifier {
        /// The resource type.
        resource_type: String,
        /// Position of the offending item (0 for single-resource operations).
        index: usize,
        /// The id that was found.
        id: String,
    },

    /// No resource description is registered for the type name.
    #[error("Unknown resource type '{name}'")]
    UnknownType {
        /// The type name.
        name: String,
    },

    /// A value could not be interpreted as a resource identifier.
    #[error("Invalid resource identifier: {reason}")]
    InvalidIdentifier {
        /// What was wrong with the value.
        reason: String,
    },

    /// A document did not have the expected JSON:API shape.
    #[error("Invalid JSON:API document: {reason}")]
    InvalidDocument {
        /// What was wrong with the document.
        reason: String,
    },

    /// An attribute write collides with a relationship name.
    #[error("'{name}' is a relationship, not an attribute")]
    FieldConflict {
        /// The conflicting key.
        name: String,
    },

    /// `follow` was called on a resource without a pending redirect.
    #[error("Resource has no redirect to follow")]
    NotRedirected,

    /// Pagination parameters were not usable.
    #[error("Invalid pagination: {reason}")]
    InvalidPagination {
        /// What was wrong with the parameters.
        reason: String,
    },

    /// The transport collaborator failed.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl From<InvalidHttpRequestError> for ResourceError {
    fn from(error: InvalidHttpRequestError) -> Self {
        Self::Http(error.into())
    }
}

impl ResourceError {
    pub(crate) fn invalid_document(reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_identifier(reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            reason: reason.into(),
        }
    }

    /// Returns the server's error document, if this is a protocol error.
    #[must_use]
    pub const fn protocol(&self) -> Option<&ProtocolError> {
        match self {
            Self::Http(HttpError::Protocol(error)) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ErrorDetail;

    #[test]
    fn test_messages_name_the_offending_item() {
        let error = ResourceError::MissingIdentifier {
            resource_type: "foos".to_string(),
            index: 2,
        };
        assert_eq!(error.to_string(), "Item 2 of 'foos' has no id");

        let error = ResourceError::PluralRelationship {
            name: "children".to_string(),
        };
        assert!(error.to_string().contains("children"));

        let error = ResourceError::Unsaved {
            resource_type: "foos".to_string(),
        };
        assert_eq!(error.to_string(), "'foos' resource has no id yet; save it first");
    }

    #[test]
    fn test_protocol_accessor() {
        let error: ResourceError = HttpError::from(ProtocolError {
            status_code: 409,
            errors: vec![ErrorDetail::default()],
        })
        .into();
        assert_eq!(error.protocol().map(|e| e.status_code), Some(409));
        assert!(ResourceError::NotRedirected.protocol().is_none());
    }
}
