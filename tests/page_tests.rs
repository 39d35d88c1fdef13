//! Integration tests for lazy pagination.

use futures::TryStreamExt;
use jsonapi_client::resources::ResourceType;
use jsonapi_client::{HostUrl, JsonApi, JsonApiConfig, Page, Resource};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Foo;

impl ResourceType for Foo {
    const TYPE: &'static str = "foos";
}

/// Creates a connection to the mock server.
fn create_api(server: &MockServer) -> JsonApi {
    let config = JsonApiConfig::builder()
        .host(HostUrl::new(server.uri()).unwrap())
        .build()
        .unwrap();
    JsonApi::new(config).unwrap()
}

fn jsonapi_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/vnd.api+json")
}

fn foos(ids: &[&str]) -> serde_json::Value {
    ids.iter()
        .map(|id| json!({"type": "foos", "id": id}))
        .collect()
}

/// Mounts two pages of three items: `/foos` and `/foos?page=2`.
async fn mount_two_pages(server: &MockServer) {
    // More specific mock first: it wins over the catch-all below
    Mock::given(method("GET"))
        .and(path("/foos"))
        .and(query_param("page", "2"))
        .respond_with(jsonapi_response(json!({
            "data": foos(&["4", "5", "6"]),
            "links": {"previous": "/foos?page=1", "next": null}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/foos"))
        .respond_with(jsonapi_response(json!({
            "data": foos(&["1", "2", "3"]),
            "links": {"next": "/foos?page=2"}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_evaluation_is_lazy_and_happens_once() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;
    let api = create_api(&server);

    let page = api.register::<Foo>().list();
    assert!(!page.is_evaluated());
    assert!(server.received_requests().await.unwrap().is_empty());

    assert_eq!(page.len().await.unwrap(), 3);
    assert!(page.has_next().await.unwrap());
    assert!(!page.has_previous().await.unwrap());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_next_and_previous_are_new_pages() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;
    let api = create_api(&server);

    let first = api.register::<Foo>().list();
    let second = first.next().await.unwrap().unwrap();
    assert!(!second.is_evaluated());

    let ids: Vec<_> = second
        .items()
        .await
        .unwrap()
        .iter()
        .map(|foo| foo.id().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["4", "5", "6"]);
    assert!(second.next().await.unwrap().is_none());

    let back = second.previous().await.unwrap().unwrap();
    assert_eq!(back.params()["page"], "1");
}

#[tokio::test]
async fn test_all_pages_and_all_items() {
    let server = MockServer::start().await;
    mount_two_pages(&server).await;
    let api = create_api(&server);
    let list = api.register::<Foo>().list();

    let pages: Vec<Page> = list.all_pages().try_collect().await.unwrap();
    assert_eq!(pages.len(), 2);

    let items: Vec<Resource> = list.all().try_collect().await.unwrap();
    let ids: Vec<_> = items.iter().filter_map(Resource::id).collect();
    assert_eq!(ids, ["1", "2", "3", "4", "5", "6"]);

    // Each call walks from the start again
    let again: Vec<Resource> = list.all().try_collect().await.unwrap();
    assert_eq!(again.len(), 6);
}

#[tokio::test]
async fn test_filter_does_not_mutate_receiver() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/foos"))
        .and(query_param("filter[name][contains]", "x"))
        .and(query_param("include", "parent,owner"))
        .respond_with(jsonapi_response(json!({"data": foos(&["1"])})))
        .expect(1)
        .mount(&server)
        .await;
    let api = create_api(&server);

    let list = api.register::<Foo>().list();
    let filtered = list
        .filter("name__contains", "x")
        .include(&["parent", "owner"]);

    assert!(list.params().is_empty());
    assert_ne!(list, filtered);
    assert_eq!(filtered.len().await.unwrap(), 1);
    assert!(!list.is_evaluated());
}

#[tokio::test]
async fn test_page_by_keywords() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/foos"))
        .and(query_param("page[size]", "2"))
        .and(query_param("page[number]", "3"))
        .respond_with(jsonapi_response(json!({"data": foos(&["5", "6"])})))
        .expect(1)
        .mount(&server)
        .await;
    let api = create_api(&server);

    let page = api
        .register::<Foo>()
        .page_by(&[("size", "2"), ("number", "3")])
        .unwrap();
    assert_eq!(page.into_items().await.unwrap().len(), 2);
}
