//! End-to-end tests: selections compiled by `query!`/`mutation!`, executed
//! against a mock server, and read back through the same closures.

#[path = "support/fragments.rs"]
mod fragments;
#[path = "support/requests.rs"]
mod requests;
#[path = "support/surface.rs"]
mod surface;

use fragments::{with_avatar, RenameVars};
use requests::{GetUserName, Rename};
use serde_json::{json, Value};
use surface::{Circle, GraphQLClient, Query, Square};
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zeroql::{Operation, Request, ZeroQLError};

async fn setup(response: ResponseTemplate) -> (MockServer, GraphQLClient) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(response)
        .mount(&server)
        .await;
    let client = GraphQLClient::new(server.uri());
    (server, client)
}

async fn setup_data(data: Value) -> (MockServer, GraphQLClient) {
    setup(ResponseTemplate::new(200).set_body_json(json!({ "data": data }))).await
}

async fn sent_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "expected exactly one request");
    serde_json::from_slice(&requests[0].body).unwrap()
}

// ── Selections ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_sends_compiled_text_and_variables() {
    let (server, client) = setup_data(json!({ "user": { "firstName": "Ann" } })).await;

    let id = 7;
    let result = zeroql::query!(
        client,
        schema = "tests/support/schema.graphql",
        |q| q.user(id, |o| o.first_name.clone())
    )
    .await
    .unwrap();

    assert_eq!(result.data, Some(Some("Ann".to_string())));
    assert_eq!(
        result.query,
        "query ($id: Int!) { user(id: $id) { firstName } }"
    );
    let body = sent_body(&server).await;
    assert_eq!(body["query"], result.query);
    assert_eq!(body["variables"], json!({ "id": 7 }));
}

#[tokio::test]
async fn fragments_are_inlined() {
    let (server, client) = setup_data(json!({
        "me": { "firstName": "Ann", "avatar": "ann.png" }
    }))
    .await;

    let result = zeroql::query!(
        client,
        schema = "tests/support/schema.graphql",
        fragments = "tests/support/fragments.rs",
        |q| q.me(|o| with_avatar(o, 64))
    )
    .await
    .unwrap();

    assert_eq!(
        result.data,
        Some(Some(("Ann".to_string(), Some("ann.png".to_string()))))
    );
    let body = sent_body(&server).await;
    assert_eq!(body["query"], "query { me { firstName avatar(size: 64) } }");
}

#[tokio::test]
async fn lists_and_nested_arguments() {
    let (server, client) = setup_data(json!({
        "me": { "friends": [{ "id": 1 }, { "id": 2 }] }
    }))
    .await;

    let result = zeroql::query!(
        client,
        schema = "tests/support/schema.graphql",
        |q| q.me(|o| o.friends(Some(2), |f| f.id))
    )
    .await
    .unwrap();

    assert_eq!(result.data, Some(Some(vec![1, 2])));
    let body = sent_body(&server).await;
    assert_eq!(body["query"], "query { me { friends(first: 2) { id } } }");
}

#[tokio::test]
async fn unions_are_narrowed_by_typename() {
    let (server, client) = setup_data(json!({
        "shape": { "__typename": "Square", "side": 3.0 }
    }))
    .await;

    let result = zeroql::query!(
        client,
        schema = "tests/support/schema.graphql",
        |q| q.shape(|s| (s.on(|c: &Circle| c.radius), s.on(|sq: &Square| sq.side)))
    )
    .await
    .unwrap();

    assert_eq!(result.data, Some(Some((None, Some(3.0)))));
    let body = sent_body(&server).await;
    assert_eq!(
        body["query"],
        "query { shape { __typename ... on Circle { radius } ... on Square { side } } }"
    );
}

#[tokio::test]
async fn mutation_with_variables_object() {
    let (server, client) = setup_data(json!({ "rename": { "firstName": "Bo" } })).await;

    let result = zeroql::mutation!(
        client,
        schema = "tests/support/schema.graphql",
        fragments = "tests/support/fragments.rs",
        variables = RenameVars { id: 1, name: "Bo".to_string() },
        |vars: RenameVars, m| m.rename(vars.id, &vars.name, |o| o.first_name.clone())
    )
    .await
    .unwrap();

    assert_eq!(result.data, Some("Bo".to_string()));
    let body = sent_body(&server).await;
    assert_eq!(
        body["query"],
        "mutation ($id: Int!, $name: String!) { rename(id: $id, name: $name) { firstName } }"
    );
    assert_eq!(body["variables"], json!({ "id": 1, "name": "Bo" }));
}

#[tokio::test]
async fn request_struct_sends_its_fields() {
    let (server, client) = setup_data(json!({ "user": { "firstName": "Ann" } })).await;

    let result = client.request(&GetUserName { id: 7 }).await.unwrap();

    assert_eq!(result.into_data().unwrap(), Some("Ann".to_string()));
    let body = sent_body(&server).await;
    assert_eq!(
        body["query"],
        "query ($id: Int!) { user(id: $id) { firstName } }"
    );
    assert_eq!(body["variables"], json!({ "id": 7 }));
}

#[tokio::test]
async fn request_struct_as_mutation() {
    let (server, client) = setup_data(json!({ "rename": { "firstName": "Bo" } })).await;

    let request = Rename {
        id: 1,
        name: "Bo".to_string(),
    };
    let result = client.request(&request).await.unwrap();

    assert_eq!(result.data, Some("Bo".to_string()));
    assert_eq!(
        Rename::OPERATION,
        "mutation ($id: Int!, $name: String!) { rename(id: $id, name: $name) { firstName } }"
    );
    let body = sent_body(&server).await;
    assert_eq!(body["query"], Rename::OPERATION);
    assert_eq!(body["variables"], json!({ "id": 1, "name": "Bo" }));
}

#[test]
fn operation_without_client() {
    let operation = zeroql::query!(schema = "tests/support/schema.graphql", |q| q.me(|o| o.id));
    assert_eq!(operation.text, "query { me { id } }");
    assert_eq!(operation.variables, json!({}));
}

// ── Responses ────────────────────────────────────────────────────────────────

fn me_id() -> Operation {
    Operation::query("query { me { id } }", json!({}))
}

#[tokio::test]
async fn graphql_errors_are_returned_in_the_result() {
    let (_server, client) = setup(ResponseTemplate::new(200).set_body_json(json!({
        "data": null,
        "errors": [{ "message": "boom", "path": ["me"] }]
    })))
    .await;

    let result = client
        .query(me_id(), |q: &Query| q.me(|o| o.id))
        .await
        .unwrap();
    assert!(result.data.is_none());
    assert!(result.has_errors());
    match result.into_data() {
        Err(ZeroQLError::GraphQL { errors, query }) => {
            assert_eq!(errors[0].message, "boom");
            assert_eq!(query, "query { me { id } }");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn null_fields_read_as_none() {
    let (_server, client) = setup_data(json!({ "me": null })).await;
    let result = client
        .query(me_id(), |q: &Query| q.me(|o| o.id))
        .await
        .unwrap();
    assert_eq!(result.data, Some(None));
}

#[tokio::test]
async fn unauthorized_maps_to_authentication() {
    let (_server, client) = setup(ResponseTemplate::new(401).set_body_string("bad token")).await;
    let err = client
        .query(me_id(), |q: &Query| q.me(|o| o.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ZeroQLError::Authentication(ref m) if m == "bad token"));
}

#[tokio::test]
async fn forbidden_maps_to_forbidden() {
    let (_server, client) = setup(ResponseTemplate::new(403)).await;
    let err = client
        .query(me_id(), |q: &Query| q.me(|o| o.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ZeroQLError::Forbidden(_)));
}

#[tokio::test]
async fn rate_limit_reads_retry_after() {
    let (_server, client) = setup(
        ResponseTemplate::new(429)
            .insert_header("retry-after", "12")
            .set_body_string("slow down"),
    )
    .await;
    let err = client
        .query(me_id(), |q: &Query| q.me(|o| o.id))
        .await
        .unwrap_err();
    match err {
        ZeroQLError::RateLimited {
            retry_after,
            message,
        } => {
            assert_eq!(retry_after, Some(12.0));
            assert_eq!(message, "slow down");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn other_statuses_map_to_http_error() {
    let (_server, client) = setup(ResponseTemplate::new(502).set_body_string("gateway")).await;
    let err = client
        .query(me_id(), |q: &Query| q.me(|o| o.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ZeroQLError::HttpError { status: 502, .. }));
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "me": { "id": 3 } } })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = zeroql::HttpTransport::new(server.uri()).with_bearer_token("secret");
    let client = GraphQLClient::with_transport(transport);
    let result = client
        .query(me_id(), |q: &Query| q.me(|o| o.id))
        .await
        .unwrap();
    assert_eq!(result.data, Some(Some(3)));
}
