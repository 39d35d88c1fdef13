//! Integration tests for relationship loading and editing.

use jsonapi_client::resources::{
    Followed, IdentifierLike, LinkageData, Related, ResourceError, ResourceIdentifier,
};
use jsonapi_client::{HostUrl, JsonApi, JsonApiConfig, Resource};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a connection to the mock server.
fn create_api(server: &MockServer) -> JsonApi {
    let config = JsonApiConfig::builder()
        .host(HostUrl::new(server.uri()).unwrap())
        .build()
        .unwrap();
    JsonApi::new(config).unwrap()
}

fn jsonapi_response(status: u16, body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/vnd.api+json")
}

fn child(api: &JsonApi) -> Resource {
    api.decode(&json!({
        "data": {
            "type": "children",
            "id": "1",
            "attributes": {"name": "child"},
            "relationships": {
                "parent": {
                    "data": {"type": "parents", "id": "1"},
                    "links": {"self": "/children/1/relationships/parent"}
                },
                "owner": {"data": null},
                "siblings": {
                    "links": {
                        "self": "/children/1/relationships/siblings",
                        "related": "/children/1/siblings"
                    }
                }
            }
        }
    }))
    .unwrap()
}

// ============================================================================
// Fetch
// ============================================================================

#[tokio::test]
async fn test_fetch_null_relationship_sends_nothing() {
    let server = MockServer::start().await;
    let api = create_api(&server);
    let mut child = child(&api);

    let related = child.fetch(&["owner"], false).await.unwrap();
    assert!(related.is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_singular_reloads_stub() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parents/1"))
        .respond_with(jsonapi_response(
            200,
            json!({"data": {"type": "parents", "id": "1", "attributes": {"name": "parent"}}}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let api = create_api(&server);
    let mut child = child(&api);

    let parent = child.fetch(&["parent"], false).await.unwrap().unwrap();
    assert_eq!(
        parent.as_resource().unwrap().get_attribute("name"),
        Some(&json!("parent"))
    );

    // Already populated: no second request
    child.fetch(&["parent"], false).await.unwrap();
}

#[tokio::test]
async fn test_fetch_plural_pages_related_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/children/1/siblings"))
        .respond_with(jsonapi_response(
            200,
            json!({"data": [{"type": "children", "id": "2"}, {"type": "children", "id": "3"}]}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let api = create_api(&server);
    let mut child = child(&api);

    let Some(Related::Many(siblings)) = child.fetch(&["siblings"], false).await.unwrap() else {
        panic!("siblings is a to-many relationship");
    };
    assert_eq!(siblings.len().await.unwrap(), 2);
    assert_eq!(siblings.get(1).await.unwrap().unwrap().id(), Some("3"));
}

#[tokio::test]
async fn test_fetch_unknown_name_fails_before_any_request() {
    let server = MockServer::start().await;
    let api = create_api(&server);
    let mut child = child(&api);

    let result = child.fetch(&["parent", "nope"], false).await;
    assert!(matches!(
        result,
        Err(ResourceError::UnknownRelationship { ref name, .. }) if name == "nope"
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ============================================================================
// Local assignment
// ============================================================================

#[tokio::test]
async fn test_set_related_on_plural_fails() {
    let server = MockServer::start().await;
    let api = create_api(&server);
    let mut child = child(&api);

    let result = child.set_related("siblings", Some("2".into()));
    assert!(matches!(
        result,
        Err(ResourceError::PluralRelationship { .. })
    ));
}

// ============================================================================
// Server-side edits
// ============================================================================

#[tokio::test]
async fn test_change_sends_one_patch_and_updates_linkage() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/children/1/relationships/parent"))
        .and(body_json(json!({"data": {"type": "parents", "id": "2"}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = create_api(&server);
    let mut child = child(&api);
    child.change("parent", Some("2".into())).await.unwrap();

    let linkage = child.linkage("parent").unwrap();
    assert_eq!(
        linkage.data,
        LinkageData::One(ResourceIdentifier::new("parents", "2"))
    );
    assert_eq!(
        linkage.link("self"),
        Some("/children/1/relationships/parent")
    );
    assert_eq!(
        child.get_related("parent").unwrap().as_resource().unwrap().id(),
        Some("2")
    );
}

#[tokio::test]
async fn test_change_to_null() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/children/1/relationships/parent"))
        .and(body_json(json!({"data": null})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = create_api(&server);
    let mut child = child(&api);
    child.change("parent", None).await.unwrap();

    assert_eq!(child.linkage("parent").unwrap().data, LinkageData::Null);
    assert!(child.get_related("parent").is_none());
}

#[tokio::test]
async fn test_add_and_remove_send_identifier_arrays() {
    let server = MockServer::start().await;
    let members = json!({"data": [{"type": "children", "id": "2"}, {"type": "children", "id": "3"}]});
    Mock::given(method("POST"))
        .and(path("/children/1/relationships/siblings"))
        .and(body_json(members.clone()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/children/1/relationships/siblings"))
        .and(body_json(members))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = create_api(&server);
    let mut child = child(&api);
    let values: Vec<IdentifierLike> = vec![
        ResourceIdentifier::new("children", "2").into(),
        json!({"type": "children", "id": "3"}).into(),
    ];
    child.add("siblings", &values).await.unwrap();
    child.remove("siblings", &values).await.unwrap();

    // Membership edits leave the related cache alone
    assert!(child.get_related("siblings").is_none());
}

#[tokio::test]
async fn test_reset_on_singular_fails() {
    let server = MockServer::start().await;
    let api = create_api(&server);
    let mut child = child(&api);

    let result = child.reset("parent", &[]).await;
    assert!(matches!(
        result,
        Err(ResourceError::SingularRelationship { .. })
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reset_replaces_all_members() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/children/1/relationships/siblings"))
        .and(body_json(json!({"data": [{"type": "children", "id": "4"}]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = create_api(&server);
    let mut child = child(&api);
    child
        .reset("siblings", &[ResourceIdentifier::new("children", "4").into()])
        .await
        .unwrap();

    // An empty reset clears the relationship
    Mock::given(method("PATCH"))
        .and(path("/children/1/relationships/siblings"))
        .and(body_json(json!({"data": []})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    child.reset("siblings", &[]).await.unwrap();
}

// ============================================================================
// Follow
// ============================================================================

#[tokio::test]
async fn test_follow_to_collection_gives_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/children/1"))
        .respond_with(ResponseTemplate::new(303).insert_header("Location", "/children/1/siblings"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/children/1/siblings"))
        .respond_with(jsonapi_response(
            200,
            json!({"data": [
                {"type": "children", "id": "2"},
                {"type": "children", "id": "3"}
            ]}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let api = create_api(&server);
    let mut child = child(&api);
    child.reload(&[]).await.unwrap();

    let Followed::Page(page) = child.follow().await.unwrap() else {
        panic!("redirect target is a collection");
    };
    assert!(page.is_evaluated());
    let ids: Vec<_> = page
        .items()
        .await
        .unwrap()
        .iter()
        .filter_map(Resource::id)
        .collect();
    assert_eq!(ids, ["2", "3"]);
}
