//! Integration tests for bulk operations.
//!
//! Bulk requests go to the collection URL in a single request and carry the
//! bulk profile Content-Type.

use jsonapi_client::resources::{ResourceError, ResourceType};
use jsonapi_client::{BulkItem, HostUrl, JsonApi, JsonApiConfig};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BULK_CONTENT_TYPE: &str = "application/vnd.api+json;profile=\"bulk\"";

struct Foo;

impl ResourceType for Foo {
    const TYPE: &'static str = "foos";
    const EDITABLE: Option<&'static [&'static str]> = Some(&["name"]);
}

/// Creates a connection to the mock server.
fn create_api(server: &MockServer) -> JsonApi {
    let config = JsonApiConfig::builder()
        .host(HostUrl::new(server.uri()).unwrap())
        .build()
        .unwrap();
    JsonApi::new(config).unwrap()
}

fn jsonapi_response(status: u16, body: Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/vnd.api+json")
}

#[tokio::test]
async fn test_bulk_delete_mixed_items() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/foos"))
        .and(header("content-type", BULK_CONTENT_TYPE))
        .and(body_json(json!({
            "data": [
                {"type": "foos", "id": "1"},
                {"type": "foos", "id": "2"},
                {"type": "foos", "id": "3"}
            ]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = create_api(&server);
    let foos = api.register::<Foo>();
    let resource_a = foos
        .from_value(&json!({"type": "foos", "id": "1", "attributes": {"name": "a"}}))
        .unwrap();

    let deleted = foos
        .bulk_delete(vec![
            resource_a.into(),
            json!({"type": "foos", "id": "2"}).into(),
            json!({"data": {"type": "foos", "id": "3"}}).into(),
        ])
        .await
        .unwrap();
    assert_eq!(deleted, 3);
}

#[tokio::test]
async fn test_bulk_create_returns_page_of_created() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/foos"))
        .and(header("content-type", BULK_CONTENT_TYPE))
        .and(body_json(json!({
            "data": [
                {"type": "foos", "attributes": {"name": "one"}},
                {
                    "type": "foos",
                    "attributes": {"name": "two"},
                    "relationships": {"parent": {"data": {"type": "bars", "id": "1"}}}
                }
            ]
        })))
        .respond_with(jsonapi_response(
            201,
            json!({"data": [
                {"type": "foos", "id": "10", "attributes": {"name": "one"}},
                {"type": "foos", "id": "11", "attributes": {"name": "two"}}
            ]}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let api = create_api(&server);
    let foos = api.register::<Foo>();
    let created = foos
        .bulk_create(vec![
            json!({"name": "one"}).into(),
            (json!({"name": "two"}), json!({"parent": {"type": "bars", "id": "1"}})).into(),
        ])
        .await
        .unwrap();

    assert!(created.is_evaluated());
    let ids: Vec<_> = created
        .items()
        .await
        .unwrap()
        .iter()
        .filter_map(|foo| foo.id().map(ToString::to_string))
        .collect();
    assert_eq!(ids, ["10", "11"]);
}

#[tokio::test]
async fn test_bulk_update_restricts_to_editable_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/foos"))
        .and(header("content-type", BULK_CONTENT_TYPE))
        .and(body_json(json!({
            "data": [
                {"type": "foos", "id": "1", "attributes": {"name": "a"}},
                {"type": "foos", "id": "2"}
            ]
        })))
        .respond_with(jsonapi_response(
            200,
            json!({"data": [
                {"type": "foos", "id": "1", "attributes": {"name": "a"}},
                {"type": "foos", "id": "2"}
            ]}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let api = create_api(&server);
    let foos = api.register::<Foo>();
    let updated = foos
        .bulk_update(
            vec![
                (json!({"name": "a", "secret": true}), Value::Null, "1").into(),
                BulkItem::from("2"),
            ],
            &[],
        )
        .await
        .unwrap();
    assert_eq!(updated.len().await.unwrap(), 2);
}

#[tokio::test]
async fn test_bulk_item_errors_carry_index() {
    let server = MockServer::start().await;
    let api = create_api(&server);
    let foos = api.register::<Foo>();

    let result = foos
        .bulk_update(vec!["1".into(), json!({"name": "no id"}).into()], &[])
        .await;
    assert!(matches!(
        result,
        Err(ResourceError::MissingIdentifier { index: 1, .. })
    ));

    let result = foos
        .bulk_delete(vec![json!({"type": "bars", "id": "1"}).into()])
        .await;
    assert!(matches!(result, Err(ResourceError::TypeMismatch { .. })));

    assert!(server.received_requests().await.unwrap().is_empty());
}
