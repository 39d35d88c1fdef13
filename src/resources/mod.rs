//! Resource binding and pagination.
//!
//! This module maps JSON:API documents to bound [`Resource`] values and
//! lazily evaluated [`Page`]s, and runs the operations that keep the two
//! in sync with the server.
//!
//! # Overview
//!
//! - [`ResourceType`] declares a type name and its editable fields
//! - [`ResourceClass`] runs class-level operations: `list`, `get`, `create`, bulk writes
//! - [`Resource`] holds attributes, relationship linkage and the related cache
//! - [`Page`] is an immutable query that evaluates on first access
//!
//! # Relationships
//!
//! A relationship has two sides. Its [`Linkage`] is what the server said the
//! relationship points at; its [`Related`] value is the resource or page
//! loaded for it. Decoding a compound document fills the related side from
//! `included` without extra requests, and [`Resource::fetch`] fills the rest.
//!
//! # Example
//!
//! ```rust,ignore
//! use jsonapi_client::resources::{Related, ResourceType};
//!
//! struct Child;
//!
//! impl ResourceType for Child {
//!     const TYPE: &'static str = "children";
//!     const EDITABLE: Option<&'static [&'static str]> = Some(&["name", "parent"]);
//! }
//!
//! let children = api.register::<Child>();
//! let mut child = children.get("1", &["parent"]).await?;
//!
//! // `parent` came in `included`, no request needed
//! if let Some(Related::One(parent)) = child.get_related("parent") {
//!     println!("{parent}: {:?}", parent.get_attribute("name"));
//! }
//!
//! child.set_attribute("name", "renamed")?;
//! child.save(&[]).await?;
//! ```

mod bulk;
mod class;
mod errors;
mod identity;
mod page;
mod persistence;
mod registry;
mod resource;

pub use bulk::BulkItem;
pub use class::{ResourceBuilder, ResourceClass};
pub use errors::ResourceError;
pub use identity::{
    classify, normalize, normalize_as, to_linkage, IdentifierLike, Linkage, LinkageData,
    LinkageKind, ResourceIdentifier,
};
pub use page::{FilterValue, Page};
pub use persistence::Followed;
pub use registry::{Registry, ResourceDescription, ResourceType};
pub use resource::{Related, Resource};

pub(crate) use resource::Included;
