//! Mock service tests for the docdb-rest client.
//!
//! These tests use wiremock to stand in for the document database REST API
//! and exercise resolution, queries, and document operations end to end.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use docdb_core::error::TransportError;
use docdb_core::{
    ContinuationToken, DocDbConfig, Document, Error, HttpRequest, HttpResponse, QueryParameters,
    ResourceType, RetryPolicy, Transport, Verb,
};
use docdb_rest::{DocDbClient, ResolutionState};
use futures_util::StreamExt;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use url::form_urlencoded;
use wiremock::matchers::{body_json, body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MASTER_KEY: &str = "c2VjcmV0LW1hc3Rlci1rZXk=";
const DOCS_PATH: &str = "/dbs/Abc123=/colls/Def456=/docs";

/// Configuration pointing at the mock server, with near-instant retries.
fn mock_config(server: &MockServer) -> DocDbConfig {
    DocDbConfig::from_settings(&server.uri(), MASTER_KEY, "iot-db", "devices")
        .unwrap()
        .with_retry(
            RetryPolicy::new(3)
                .with_initial_delay(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(5)),
        )
}

fn find_body(scope: &str, name: &str) -> serde_json::Value {
    json!({
        "query": format!("SELECT * FROM {} c WHERE c.id = @id", scope),
        "parameters": [{"name": "@id", "value": name}]
    })
}

/// Mount lookups that find both the database and the collection.
async fn mount_existing_resources(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(body_json(find_body("dbs", "iot-db")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Databases": [{"id": "iot-db", "_rid": "Abc123="}]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dbs/Abc123=/colls"))
        .and(body_json(find_body("colls", "devices")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "DocumentCollections": [{"id": "devices", "_rid": "Def456="}]
        })))
        .mount(server)
        .await;
}

async fn initialized_client(server: &MockServer) -> DocDbClient {
    mount_existing_resources(server).await;
    let client = DocDbClient::new(mock_config(server)).unwrap();
    client.initialize().await.unwrap();
    client
}

// ============================================================================
// Resolution Tests
// ============================================================================

#[tokio::test]
async fn test_resolve_database_creates_when_absent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(header("x-ms-documentdb-isquery", "true"))
        .and(header("content-type", "application/query+json"))
        .and(body_json(find_body("dbs", "iot-db")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Databases": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"id": "iot-db"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "iot-db",
            "_rid": "Abc123="
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DocDbClient::new(mock_config(&server)).unwrap();
    assert_eq!(client.database_state(), ResolutionState::Unresolved);

    let rid = client.resolve_database().await.unwrap();
    assert_eq!(rid.as_str(), "Abc123=");
    assert_eq!(client.database_state(), ResolutionState::Resolved);

    // Second call is answered from the cell; expect(1) checks on drop.
    let again = client.resolve_database().await.unwrap();
    assert_eq!(again, rid);
}

#[tokio::test]
async fn test_resolve_existing_database_does_not_create() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(body_json(find_body("dbs", "iot-db")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Databases": [
                {"id": "other-db", "_rid": "Zzz000="},
                {"id": "iot-db", "_rid": "Abc123="}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(body_json(json!({"id": "iot-db"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = DocDbClient::new(mock_config(&server)).unwrap();
    let rid = client.resolve_database().await.unwrap();
    assert_eq!(rid.as_str(), "Abc123=");
}

#[tokio::test]
async fn test_resolve_follows_continuation_pages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(header("x-ms-continuation", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Databases": [{"id": "iot-db", "_rid": "Abc123="}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(body_json(find_body("dbs", "iot-db")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"Databases": []}))
                .insert_header("x-ms-continuation", "page-2"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = DocDbClient::new(mock_config(&server)).unwrap();
    let rid = client.resolve_database().await.unwrap();
    assert_eq!(rid.as_str(), "Abc123=");
}

#[tokio::test]
async fn test_initialize_resolves_collection_under_database() {
    let server = MockServer::start().await;
    mount_existing_resources(&server).await;

    let client = DocDbClient::new(mock_config(&server)).unwrap();
    client.initialize().await.unwrap();

    assert_eq!(client.database_id().unwrap().as_str(), "Abc123=");
    assert_eq!(client.collection_id().unwrap().as_str(), "Def456=");
    assert_eq!(client.collection_state(), ResolutionState::Resolved);
}

#[tokio::test]
async fn test_create_conflict_queries_again() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(body_json(find_body("dbs", "iot-db")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Databases": []})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(body_json(find_body("dbs", "iot-db")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Databases": [{"id": "iot-db", "_rid": "Abc123="}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(body_json(json!({"id": "iot-db"})))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "Conflict",
            "message": "Resource with specified id already exists."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DocDbClient::new(mock_config(&server)).unwrap();
    let rid = client.resolve_database().await.unwrap();
    assert_eq!(rid.as_str(), "Abc123=");
}

#[tokio::test]
async fn test_failed_resolution_can_be_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "code": "Forbidden",
            "message": "denied"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_existing_resources(&server).await;

    let client = DocDbClient::new(mock_config(&server)).unwrap();
    assert!(client.initialize().await.is_err());
    assert_eq!(client.database_state(), ResolutionState::Unresolved);

    client.initialize().await.unwrap();
    assert_eq!(client.collection_id().unwrap().as_str(), "Def456=");
}

// ============================================================================
// Query Tests
// ============================================================================

#[tokio::test]
async fn test_query_sends_parameters_and_page_size() {
    let server = MockServer::start().await;
    let client = initialized_client(&server).await;

    Mock::given(method("POST"))
        .and(path(DOCS_PATH))
        .and(header("x-ms-documentdb-isquery", "true"))
        .and(header("content-type", "application/query+json"))
        .and(header("x-ms-max-item-count", "50"))
        .and(header("x-ms-version", "2015-08-06"))
        .and(header_exists("x-ms-date"))
        .and(header_exists("authorization"))
        .and(body_json(json!({
            "query": "SELECT * FROM docs d WHERE d.type = @t",
            "parameters": [{"name": "@t", "value": "sensor"}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "Documents": [
                        {"id": "a", "_rid": "Doc1=", "type": "sensor"},
                        {"id": "b", "_rid": "Doc2=", "type": "sensor"}
                    ]
                }))
                .insert_header("x-ms-item-count", "2"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let params = QueryParameters::new().with("@t", "sensor").unwrap();
    let page = client
        .query("SELECT * FROM docs d WHERE d.type = @t", &params, Some(50), None)
        .await
        .unwrap();

    assert_eq!(page.documents.len(), 2);
    assert_eq!(page.documents[0].id(), Some("a"));
    assert_eq!(page.item_count, Some(2));
    assert!(page.is_terminal());
}

#[tokio::test]
async fn test_query_forwards_continuation_token() {
    let server = MockServer::start().await;
    let client = initialized_client(&server).await;

    Mock::given(method("POST"))
        .and(path(DOCS_PATH))
        .and(header("x-ms-continuation", "+RID:abc#RT:1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"Documents": [{"id": "c"}]}))
                .insert_header("x-ms-item-count", "1")
                .insert_header("x-ms-continuation", "+RID:abc#RT:2"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = ContinuationToken::new("+RID:abc#RT:1").unwrap();
    let page = client
        .query("SELECT * FROM docs", &QueryParameters::new(), None, Some(&token))
        .await
        .unwrap();

    assert_eq!(page.documents.len(), 1);
    assert_eq!(page.continuation.unwrap().as_str(), "+RID:abc#RT:2");
}

#[tokio::test]
async fn test_query_without_results_field_is_empty() {
    let server = MockServer::start().await;
    let client = initialized_client(&server).await;

    Mock::given(method("POST"))
        .and(path(DOCS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_count": 0})))
        .mount(&server)
        .await;

    let page = client
        .query("SELECT * FROM docs", &QueryParameters::new(), None, None)
        .await
        .unwrap();

    assert!(page.documents.is_empty());
    assert_eq!(page.item_count, None);
}

#[tokio::test]
async fn test_query_pages_follows_continuations() {
    let server = MockServer::start().await;
    let client = initialized_client(&server).await;

    Mock::given(method("POST"))
        .and(path(DOCS_PATH))
        .and(header("x-ms-continuation", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Documents": [{"id": "b"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(DOCS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"Documents": [{"id": "a"}]}))
                .insert_header("x-ms-continuation", "p2"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pages: Vec<_> = client
        .query_pages("SELECT * FROM docs", QueryParameters::new(), Some(1))
        .collect()
        .await;

    assert_eq!(pages.len(), 2);
    let ids: Vec<_> = pages
        .iter()
        .map(|page| page.as_ref().unwrap().documents[0].id().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_query_before_initialize_fails() {
    let server = MockServer::start().await;
    let client = DocDbClient::new(mock_config(&server)).unwrap();

    let result = client
        .query("SELECT * FROM docs", &QueryParameters::new(), None, None)
        .await;

    assert!(matches!(result, Err(Error::NotInitialized { .. })));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_query_is_rejected() {
    let server = MockServer::start().await;
    let client = initialized_client(&server).await;
    let before = server.received_requests().await.unwrap().len();

    let result = client.query("   ", &QueryParameters::new(), None, None).await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(server.received_requests().await.unwrap().len(), before);
}

// ============================================================================
// Document Tests
// ============================================================================

#[tokio::test]
async fn test_create_document_assigns_id() {
    let server = MockServer::start().await;
    let client = initialized_client(&server).await;

    Mock::given(method("POST"))
        .and(path(DOCS_PATH))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({"type": "sensor"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "generated",
            "type": "sensor",
            "_rid": "Xyz789="
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_document(Document::new(json!({"type": "sensor"})).unwrap())
        .await
        .unwrap();
    assert_eq!(created.resource_id().unwrap().as_str(), "Xyz789=");

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    let id = sent["id"].as_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_update_document_puts_to_resource_id() {
    let server = MockServer::start().await;
    let client = initialized_client(&server).await;

    Mock::given(method("PUT"))
        .and(path("/dbs/Abc123=/colls/Def456=/docs/Xyz789="))
        .and(body_partial_json(json!({"id": "d1", "temp": 21})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "d1",
            "temp": 21,
            "_rid": "Xyz789=",
            "_etag": "\"v2\""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let document = Document::new(json!({"id": "d1", "temp": 21, "_rid": "Xyz789="})).unwrap();
    let updated = client.update_document(&document).await.unwrap();
    assert_eq!(updated.get_str("_etag"), Some("\"v2\""));
}

#[tokio::test]
async fn test_update_without_resource_id_sends_nothing() {
    let server = MockServer::start().await;
    let client = initialized_client(&server).await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let document = Document::new(json!({"id": "d1"})).unwrap();
    let result = client.update_document(&document).await;

    assert!(matches!(result, Err(Error::Precondition(_))));
}

#[tokio::test]
async fn test_delete_document() {
    let server = MockServer::start().await;
    let client = initialized_client(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/dbs/Abc123=/colls/Def456=/docs/Xyz789="))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let document = Document::new(json!({"id": "d1", "_rid": "Xyz789="})).unwrap();
    client.delete_document(&document).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests.last().unwrap().body.is_empty());
}

#[tokio::test]
async fn test_delete_without_resource_id_is_precondition_error() {
    let server = MockServer::start().await;
    let client = initialized_client(&server).await;

    let document = Document::new(json!({"id": "d1", "_rid": ""})).unwrap();
    let result = client.delete_document(&document).await;

    assert!(matches!(result, Err(Error::Precondition(_))));
}

// ============================================================================
// Error and Retry Tests
// ============================================================================

#[tokio::test]
async fn test_unavailable_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_existing_resources(&server).await;

    let client = DocDbClient::new(mock_config(&server)).unwrap();
    let rid = client.resolve_database().await.unwrap();
    assert_eq!(rid.as_str(), "Abc123=");
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "Unauthorized",
            "message": "The input authorization token can't serve the request."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DocDbClient::new(mock_config(&server)).unwrap();
    let err = client.initialize().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(!err.is_transient());
    match err {
        Error::Protocol(e) => {
            assert!(e.is_auth_error());
            assert_eq!(e.code.as_deref(), Some("Unauthorized"));
            assert_eq!(e.context.verb, Verb::Post);
            assert_eq!(e.context.resource_type, ResourceType::Databases);
            assert!(e.context.resource_id.is_root());
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
}

/// Recompute the authorization header for a recorded request.
///
/// Container requests (`.../dbs`, `.../colls`, `.../docs`) are signed with
/// the parent id; requests to a single document with its own id.
fn expected_authorization(request: &wiremock::Request) -> String {
    let segments: Vec<&str> = request.url.path().trim_start_matches('/').split('/').collect();
    let last = segments[segments.len() - 1];
    let (resource_type, resource_id) = if matches!(last, "dbs" | "colls" | "docs") {
        let parent = if segments.len() >= 2 { segments[segments.len() - 2] } else { "" };
        (last, parent)
    } else {
        (segments[segments.len() - 2], last)
    };
    let date = request.headers.get("x-ms-date").unwrap().to_str().unwrap();

    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        request.method.as_str().to_lowercase(),
        resource_type,
        resource_id.to_lowercase(),
        date.to_lowercase()
    );

    let key = STANDARD.decode(MASTER_KEY).unwrap();
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
    mac.update(payload.as_bytes());
    let sig = STANDARD.encode(mac.finalize().into_bytes());

    let token = format!("type=master&ver=1.0&sig={}", sig);
    form_urlencoded::byte_serialize(token.as_bytes()).collect()
}

#[tokio::test]
async fn test_requests_are_signed_with_their_own_date() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/dbs"))
        .and(body_json(find_body("dbs", "iot-db")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Databases": [{"id": "iot-db", "_rid": "Abc123="}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dbs/Abc123=/colls"))
        .and(body_json(find_body("colls", "devices")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "DocumentCollections": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dbs/Abc123=/colls"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"id": "devices"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "devices",
            "_rid": "Def456="
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(DOCS_PATH))
        .and(body_partial_json(json!({"id": "d1", "type": "sensor"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "d1",
            "type": "sensor",
            "_rid": "Xyz789="
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/dbs/Abc123=/colls/Def456=/docs/Xyz789="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "d1",
            "type": "sensor",
            "_rid": "Xyz789="
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/dbs/Abc123=/colls/Def456=/docs/Xyz789="))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = DocDbClient::new(mock_config(&server)).unwrap();
    client.initialize().await.unwrap();
    assert_eq!(client.collection_id().unwrap().as_str(), "Def456=");

    let created = client
        .create_document(Document::new(json!({"id": "d1", "type": "sensor"})).unwrap())
        .await
        .unwrap();
    let updated = client.update_document(&created).await.unwrap();
    client.delete_document(&updated).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let signed: Vec<_> = requests
        .iter()
        .map(|r| (r.method.as_str().to_string(), r.url.path().to_string()))
        .collect();
    assert_eq!(
        signed,
        vec![
            ("POST".to_string(), "/dbs".to_string()),
            ("POST".to_string(), "/dbs/Abc123=/colls".to_string()),
            ("POST".to_string(), "/dbs/Abc123=/colls".to_string()),
            ("POST".to_string(), DOCS_PATH.to_string()),
            ("PUT".to_string(), "/dbs/Abc123=/colls/Def456=/docs/Xyz789=".to_string()),
            ("DELETE".to_string(), "/dbs/Abc123=/colls/Def456=/docs/Xyz789=".to_string()),
        ]
    );

    for request in &requests {
        let auth = request.headers.get("authorization").unwrap().to_str().unwrap();
        assert!(auth.starts_with("type%3Dmaster%26ver%3D1.0%26sig%3D"));
        assert_eq!(auth, expected_authorization(request), "{} {}", request.method, request.url);

        let date = request.headers.get("x-ms-date").unwrap().to_str().unwrap();
        assert!(date.ends_with(" GMT"));
    }
}

/// Transport that always reports cancellation.
#[derive(Default)]
struct CancelledTransport {
    calls: AtomicU32,
}

#[async_trait]
impl Transport for CancelledTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Cancelled)
    }
}

#[tokio::test]
async fn test_cancelled_transport_is_not_retried() {
    let config = DocDbConfig::from_settings(
        "https://myaccount.documents.example.com",
        MASTER_KEY,
        "iot-db",
        "devices",
    )
    .unwrap()
    .with_retry(RetryPolicy::new(5).with_initial_delay(Duration::from_millis(1)));

    let transport = Arc::new(CancelledTransport::default());
    let client = DocDbClient::with_transport(config, Arc::clone(&transport)).unwrap();

    let err = client.initialize().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport {
            source: TransportError::Cancelled,
            ..
        }
    ));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.database_state(), ResolutionState::Unresolved);
}
