//! Lazy, paginated views over collection endpoints.
//!
//! A [`Page`] is a value: query-building methods return a new, unevaluated
//! page and never touch the receiver. The first accessor that needs data
//! (length, items, links) performs exactly one GET; afterwards the page is
//! immutable.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//!
//! let page = children
//!     .list()
//!     .filter("parent__in", "1,2")
//!     .include(&["parent"])
//!     .page_by(&[("size", "50")])?;
//!
//! println!("first page has {} items", page.len().await?);
//!
//! // Walk every page after the first
//! let everything: Vec<Resource> = page.all().try_collect().await?;
//! ```

use std::collections::BTreeMap;
use std::fmt;

use futures::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::api::JsonApi;
use crate::clients::{ApiResponse, HttpMethod, HttpRequest};
use crate::resources::errors::ResourceError;
use crate::resources::identity::parse_links;
use crate::resources::resource::{index_included, Resource};

/// A value usable in a filter; resources filter by their id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterValue(String);

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for FilterValue {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self(value.to_string())
    }
}

impl From<&Resource> for FilterValue {
    fn from(resource: &Resource) -> Self {
        Self(resource.id().unwrap_or_default().to_string())
    }
}

impl From<Resource> for FilterValue {
    fn from(resource: Resource) -> Self {
        Self::from(&resource)
    }
}

#[derive(Clone, Debug)]
struct Evaluated {
    items: Vec<Resource>,
    next: Option<String>,
    previous: Option<String>,
}

/// One page of a collection endpoint.
#[derive(Clone)]
pub struct Page {
    api: JsonApi,
    path: String,
    params: BTreeMap<String, String>,
    state: OnceCell<Evaluated>,
}

// Verify Page is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Page>();
};

/// Splits `url` into its path and decoded query parameters.
fn split_url(url: &str) -> (String, BTreeMap<String, String>) {
    let Some((path, query)) = url.split_once('?') else {
        return (url.to_string(), BTreeMap::new());
    };
    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect();
    (path.to_string(), params)
}

fn decode_component(component: &str) -> String {
    let component = component.replace('+', " ");
    urlencoding::decode(&component).map_or_else(|_| component.clone(), |decoded| decoded.into_owned())
}

impl Page {
    /// Creates an unevaluated page over `url`. Query parameters in `url`
    /// become the page's parameters.
    #[must_use]
    pub fn new(api: JsonApi, url: &str) -> Self {
        let (path, params) = split_url(url);
        Self {
            api,
            path,
            params,
            state: OnceCell::new(),
        }
    }

    /// Creates an already-evaluated page without navigation links.
    pub(crate) fn evaluated(api: JsonApi, url: &str, items: Vec<Resource>) -> Self {
        let (path, params) = split_url(url);
        Self {
            api,
            path,
            params,
            state: OnceCell::from(Evaluated {
                items,
                next: None,
                previous: None,
            }),
        }
    }

    /// Creates an evaluated page from a collection document.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidDocument`] if `data` is not an array
    /// of resource objects.
    pub fn from_document(api: JsonApi, url: &str, document: &Value) -> Result<Self, ResourceError> {
        let evaluated = Self::parse(&api, document)?;
        let (path, params) = split_url(url);
        Ok(Self {
            api,
            path,
            params,
            state: OnceCell::from(evaluated),
        })
    }

    fn parse(api: &JsonApi, document: &Value) -> Result<Evaluated, ResourceError> {
        let Some(Value::Array(data)) = document.get("data") else {
            return Err(ResourceError::invalid_document(
                "collection document must have a 'data' array",
            ));
        };
        let included = index_included(document)?;
        let items = data
            .iter()
            .map(|item| api.decode_with_included(item, &included))
            .collect::<Result<Vec<_>, _>>()?;

        let links = match document.get("links") {
            Some(links) => parse_links(links)?,
            None => BTreeMap::new(),
        };
        let previous = links
            .get("previous")
            .or_else(|| links.get("prev"))
            .cloned();
        Ok(Evaluated {
            items,
            next: links.get("next").cloned(),
            previous,
        })
    }

    async fn load(&self) -> Result<Evaluated, ResourceError> {
        let request = HttpRequest::builder(HttpMethod::Get, self.path.clone())
            .query(self.params.clone())
            .build()?;
        match self.api.request(request).await? {
            ApiResponse::Document(document) => Self::parse(&self.api, &document),
            ApiResponse::Raw(response) => Err(ResourceError::invalid_document(format!(
                "expected a collection document, got HTTP {} without one",
                response.code
            ))),
        }
    }

    async fn evaluate(&self) -> Result<&Evaluated, ResourceError> {
        self.state.get_or_try_init(|| self.load()).await
    }

    /// The collection path, without query parameters.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query parameters this page is fetched with.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Returns `true` once the page has been fetched.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.state.initialized()
    }

    // Evaluation

    /// The items of this page.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching the page fails.
    pub async fn items(&self) -> Result<&[Resource], ResourceError> {
        Ok(&self.evaluate().await?.items)
    }

    /// The number of items on this page.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching the page fails.
    pub async fn len(&self) -> Result<usize, ResourceError> {
        Ok(self.evaluate().await?.items.len())
    }

    /// Returns `true` if this page has no items.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching the page fails.
    pub async fn is_empty(&self) -> Result<bool, ResourceError> {
        Ok(self.evaluate().await?.items.is_empty())
    }

    /// The item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching the page fails.
    pub async fn get(&self, index: usize) -> Result<Option<&Resource>, ResourceError> {
        Ok(self.evaluate().await?.items.get(index))
    }

    /// Consumes the page, returning its items.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching the page fails.
    pub async fn into_items(self) -> Result<Vec<Resource>, ResourceError> {
        self.evaluate().await?;
        Ok(self
            .state
            .into_inner()
            .map(|evaluated| evaluated.items)
            .unwrap_or_default())
    }

    // Pagination

    /// The link to the next page, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching the page fails.
    pub async fn next_link(&self) -> Result<Option<&str>, ResourceError> {
        Ok(self.evaluate().await?.next.as_deref())
    }

    /// The link to the previous page, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching the page fails.
    pub async fn previous_link(&self) -> Result<Option<&str>, ResourceError> {
        Ok(self.evaluate().await?.previous.as_deref())
    }

    /// Returns `true` if there is a next page.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching the page fails.
    pub async fn has_next(&self) -> Result<bool, ResourceError> {
        Ok(self.next_link().await?.is_some())
    }

    /// Returns `true` if there is a previous page.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching the page fails.
    pub async fn has_previous(&self) -> Result<bool, ResourceError> {
        Ok(self.previous_link().await?.is_some())
    }

    /// A new, unevaluated page for the next link.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching this page fails.
    pub async fn next(&self) -> Result<Option<Self>, ResourceError> {
        let link = self.next_link().await?;
        Ok(link.map(|link| self.adjacent(link)))
    }

    /// A new, unevaluated page for the previous link.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError`] if fetching this page fails.
    pub async fn previous(&self) -> Result<Option<Self>, ResourceError> {
        let link = self.previous_link().await?;
        Ok(link.map(|link| self.adjacent(link)))
    }

    /// Keeps this page's parameters; the link's own query wins on conflict.
    fn adjacent(&self, link: &str) -> Self {
        let (path, link_params) = split_url(link);
        let mut params = self.params.clone();
        params.extend(link_params);
        Self {
            api: self.api.clone(),
            path,
            params,
            state: OnceCell::new(),
        }
    }

    /// Every page, starting at this one if it has items, walking `next`
    /// links. Each page is fetched as the stream is polled.
    pub fn all_pages(&self) -> impl Stream<Item = Result<Self, ResourceError>> + Send + 'static {
        stream::try_unfold((Some(self.clone()), true), |(current, first)| async move {
            let Some(page) = current else {
                return Ok(None);
            };
            if first && page.is_empty().await? {
                let Some(page) = page.next().await? else {
                    return Ok(None);
                };
                let next = page.next().await?;
                return Ok(Some((page, (next, false))));
            }
            let next = page.next().await?;
            Ok::<_, ResourceError>(Some((page, (next, false))))
        })
    }

    /// Every item of every page, in server order.
    pub fn all(&self) -> impl Stream<Item = Result<Resource, ResourceError>> + Send + 'static {
        self.all_pages()
            .map_ok(|page| {
                let items = page
                    .state
                    .into_inner()
                    .map(|evaluated| evaluated.items)
                    .unwrap_or_default();
                stream::iter(items.into_iter().map(Ok::<Resource, ResourceError>))
            })
            .try_flatten()
    }

    // Query building

    fn with_params(&self, update: impl FnOnce(&mut BTreeMap<String, String>)) -> Self {
        let mut params = self.params.clone();
        update(&mut params);
        Self {
            api: self.api.clone(),
            path: self.path.clone(),
            params,
            state: OnceCell::new(),
        }
    }

    /// Adds a filter. `field__modifier` keys become `filter[field][modifier]`.
    #[must_use]
    pub fn filter(&self, key: &str, value: impl Into<FilterValue>) -> Self {
        let key: String = std::iter::once("filter".to_string())
            .chain(key.split("__").map(|part| format!("[{part}]")))
            .collect();
        let FilterValue(value) = value.into();
        self.with_params(|params| {
            params.insert(key, value);
        })
    }

    /// Selects a page by opaque token: `page=token`.
    #[must_use]
    pub fn page(&self, token: impl ToString) -> Self {
        let token = token.to_string();
        self.with_params(|params| {
            params.insert("page".to_string(), token);
        })
    }

    /// Selects a page by named parameters: `page[key]=value`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPagination`] if `params` is empty.
    pub fn page_by(&self, page_params: &[(&str, &str)]) -> Result<Self, ResourceError> {
        if page_params.is_empty() {
            return Err(ResourceError::InvalidPagination {
                reason: "at least one page parameter is required".to_string(),
            });
        }
        Ok(self.with_params(|params| {
            for (key, value) in page_params {
                params.insert(format!("page[{key}]"), (*value).to_string());
            }
        }))
    }

    /// Requests related resources to be included: `include=a,b`.
    #[must_use]
    pub fn include(&self, relationships: &[&str]) -> Self {
        self.joined("include", relationships)
    }

    /// Sorts the collection: `sort=a,-b`.
    #[must_use]
    pub fn sort(&self, fields: &[&str]) -> Self {
        self.joined("sort", fields)
    }

    /// Restricts returned fields: `fields=a,b`.
    #[must_use]
    pub fn fields(&self, fields: &[&str]) -> Self {
        self.joined("fields", fields)
    }

    /// Restricts returned fields of one type: `fields[type]=a,b`.
    #[must_use]
    pub fn sparse_fields(&self, resource_type: &str, fields: &[&str]) -> Self {
        self.joined(&format!("fields[{resource_type}]"), fields)
    }

    /// Adds an arbitrary query parameter.
    #[must_use]
    pub fn extra(&self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        self.with_params(|params| {
            params.insert(key, value);
        })
    }

    fn joined(&self, key: &str, values: &[&str]) -> Self {
        let value = values.join(",");
        self.with_params(|params| {
            params.insert(key.to_string(), value);
        })
    }
}

/// Pages are equal when they address the same path with the same parameters.
impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.params == other.params
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Page");
        debug.field("path", &self.path).field("params", &self.params);
        match self.state.get() {
            Some(evaluated) => debug
                .field("items", &evaluated.items)
                .field("next", &evaluated.next)
                .field("previous", &evaluated.previous),
            None => debug.field("items", &"<unevaluated>"),
        };
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HostUrl, JsonApiConfig};
    use serde_json::json;

    fn api() -> JsonApi {
        let config = JsonApiConfig::builder()
            .host(HostUrl::new("https://api.example.com").unwrap())
            .build()
            .unwrap();
        JsonApi::new(config).unwrap()
    }

    #[test]
    fn test_new_splits_query_string() {
        let page = Page::new(api(), "/items?page%5Bsize%5D=3&filter[name]=a+b");
        assert_eq!(page.path(), "/items");
        assert_eq!(page.params().get("page[size]"), Some(&"3".to_string()));
        assert_eq!(page.params().get("filter[name]"), Some(&"a b".to_string()));
        assert!(!page.is_evaluated());
    }

    #[test]
    fn test_filter_does_not_mutate_receiver() {
        let page = Page::new(api(), "/items");
        let filtered = page.filter("x", 1_i64);

        assert!(page.params().is_empty());
        assert_eq!(filtered.params().get("filter[x]"), Some(&"1".to_string()));
        assert_ne!(page, filtered);
        assert!(!filtered.is_evaluated());
    }

    #[test]
    fn test_filter_modifiers_become_brackets() {
        let page = Page::new(api(), "/items").filter("created__gte__date", "2024-01-01");
        assert_eq!(
            page.params().get("filter[created][gte][date]"),
            Some(&"2024-01-01".to_string())
        );
    }

    #[test]
    fn test_filter_accepts_plain_literals() {
        let page = Page::new(api(), "/items").filter("priority", 5).filter("open", true);
        assert_eq!(page.params().get("filter[priority]"), Some(&"5".to_string()));
        assert_eq!(page.params().get("filter[open]"), Some(&"true".to_string()));
    }

    #[test]
    fn test_filter_by_resource_uses_its_id() {
        let api = api();
        let parent = api.decode(&json!({"type": "parents", "id": "7"})).unwrap();
        let page = Page::new(api, "/children").filter("parent", &parent);
        assert_eq!(page.params().get("filter[parent]"), Some(&"7".to_string()));
    }

    #[test]
    fn test_page_forms() {
        let page = Page::new(api(), "/items");
        assert_eq!(page.page(2).params().get("page"), Some(&"2".to_string()));

        let by = page.page_by(&[("number", "2"), ("size", "10")]).unwrap();
        assert_eq!(by.params().get("page[number]"), Some(&"2".to_string()));
        assert_eq!(by.params().get("page[size]"), Some(&"10".to_string()));

        assert!(matches!(
            page.page_by(&[]),
            Err(ResourceError::InvalidPagination { .. })
        ));
    }

    #[test]
    fn test_joined_parameters() {
        let page = Page::new(api(), "/items")
            .include(&["parent", "children"])
            .sort(&["-created", "name"])
            .fields(&["name"])
            .sparse_fields("parents", &["name", "age"])
            .extra("locale", "en");

        let params = page.params();
        assert_eq!(params["include"], "parent,children");
        assert_eq!(params["sort"], "-created,name");
        assert_eq!(params["fields"], "name");
        assert_eq!(params["fields[parents]"], "name,age");
        assert_eq!(params["locale"], "en");
    }

    #[tokio::test]
    async fn test_from_document_is_evaluated() {
        let document = json!({
            "data": [
                {"type": "items", "id": "1", "relationships": {"owner": {"data": {"type": "users", "id": "1"}}}},
                {"type": "items", "id": "2"}
            ],
            "included": [{"type": "users", "id": "1", "attributes": {"name": "Ann"}}],
            "links": {"next": "/items?page=2", "previous": null}
        });
        let page = Page::from_document(api(), "/items", &document).unwrap();

        assert!(page.is_evaluated());
        assert_eq!(page.len().await.unwrap(), 2);
        assert_eq!(page.next_link().await.unwrap(), Some("/items?page=2"));
        assert!(!page.has_previous().await.unwrap());

        let owner = page.get(0).await.unwrap().unwrap().get_related("owner").unwrap();
        assert_eq!(
            owner.as_resource().unwrap().get_attribute("name"),
            Some(&json!("Ann"))
        );
    }

    #[tokio::test]
    async fn test_next_merges_params_and_link_wins() {
        let document = json!({"data": [], "links": {"next": "/items?page=2"}});
        let page = Page::from_document(api(), "/items?page=1&sort=name", &document).unwrap();

        let next = page.next().await.unwrap().unwrap();
        assert_eq!(next.path(), "/items");
        assert_eq!(next.params()["page"], "2");
        assert_eq!(next.params()["sort"], "name");
        assert!(!next.is_evaluated());
    }

    #[tokio::test]
    async fn test_prev_link_alias() {
        let document = json!({"data": [], "links": {"prev": "/items?page=1"}});
        let page = Page::from_document(api(), "/items", &document).unwrap();
        assert_eq!(page.previous_link().await.unwrap(), Some("/items?page=1"));
    }

    #[test]
    fn test_from_document_requires_array() {
        let result = Page::from_document(api(), "/items", &json!({"data": {"type": "items"}}));
        assert!(matches!(result, Err(ResourceError::InvalidDocument { .. })));
    }
}
