//! `ApiService` behaviour against a scripted transport.
//!
//! Every test inspects the exact requests that reached the transport, so
//! these double as checks on the wire contract of each resource family.

mod support;

use caseapi_core::{
    ApiError, ApiService, ClientConfig, EntityUpdate, GraphQuery, HttpMethod, OrgLevel, Payload, RequestBody,
    RequestOptions, TransportError,
};
use serde_json::{json, Value};
use support::{text_response, ScriptedTransport};

const BASE_URL: &str = "http://localhost:8000/api";

fn service() -> (ApiService<ScriptedTransport>, ScriptedTransport) {
    let transport = ScriptedTransport::new();
    let service = ApiService::with_transport(ClientConfig::new(BASE_URL), transport.clone());
    (service, transport)
}

fn json_body(body: &Option<RequestBody>) -> Value {
    let text = body.as_ref().and_then(RequestBody::as_json).expect("expected a JSON body");
    serde_json::from_str(text).unwrap()
}

// ---------------------------------------------------------------------------
// Request primitive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn caller_content_type_wins_over_default() {
    let (service, transport) = service();
    let options = RequestOptions::new(HttpMethod::Get).header("Content-Type", "multipart/form-data");
    service.request("/cases", options).await.unwrap();

    let req = transport.last_request();
    assert_eq!(req.header("content-type"), Some("multipart/form-data"));
    assert_eq!(req.header("accept"), Some("application/json"));
}

#[tokio::test]
async fn not_found_is_an_http_error() {
    let (service, transport) = service();
    transport.push_json(404, "{ this is not json");

    let err = service.get_case("unknown").await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 404, .. }));
    assert_eq!(transport.last_request().url, format!("{BASE_URL}/cases/unknown"));
}

#[tokio::test]
async fn json_and_text_bodies_are_classified_by_content_type() {
    let (service, transport) = service();
    transport.push_json(200, r#"{"id":"c1"}"#);
    transport.push(Ok(text_response(200, "ok")));

    assert_eq!(service.get("/cases/c1").await.unwrap(), Payload::Json(json!({"id": "c1"})));
    assert_eq!(service.get("/system/status").await.unwrap(), Payload::Text("ok".to_string()));
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let (service, transport) = service();
    transport.push_json(200, "{\"id\":");

    let err = service.list_cases().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn transport_failure_is_a_network_error() {
    let (service, transport) = service();
    transport.push(Err(TransportError::Connect("connection refused".to_string())));

    let err = service.list_cases().await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn malformed_header_never_reaches_the_transport() {
    let (service, transport) = service();
    let options = RequestOptions::new(HttpMethod::Get).header("Bad Name", "v");
    let err = service.request("/cases", options).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)), "{err:?}");
    assert!(!err.is_network());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn transport_rejection_is_not_a_network_error() {
    let (service, transport) = service();
    transport.push(Err(TransportError::InvalidRequest("builder error".to_string())));

    let err = service.list_cases().await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)), "{err:?}");
    assert!(!err.is_network());
}

#[tokio::test]
async fn invalid_endpoint_never_reaches_the_transport() {
    let (service, transport) = service();
    let err = service.get("cases").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidEndpoint(_)));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn failures_are_not_retried() {
    let (service, transport) = service();
    transport.push_json(503, "{}");

    assert!(service.get_system_status().await.is_err());
    assert_eq!(transport.request_count(), 1);
}

// ---------------------------------------------------------------------------
// Resource families
// ---------------------------------------------------------------------------

#[tokio::test]
async fn case_family_follows_crud_shape() {
    let (service, transport) = service();
    let body = json!({"title": "Shell companies"});

    service.list_cases().await.unwrap();
    service.get_case("c1").await.unwrap();
    service.create_case(&body).await.unwrap();
    service.update_case("c1", &body).await.unwrap();
    service.delete_case("c1").await.unwrap();

    let seen: Vec<(HttpMethod, String)> = transport
        .requests()
        .into_iter()
        .map(|r| (r.method, r.url.trim_start_matches(BASE_URL).to_string()))
        .collect();
    assert_eq!(
        seen,
        vec![
            (HttpMethod::Get, "/cases".to_string()),
            (HttpMethod::Get, "/cases/c1".to_string()),
            (HttpMethod::Post, "/cases".to_string()),
            (HttpMethod::Put, "/cases/c1".to_string()),
            (HttpMethod::Delete, "/cases/c1".to_string()),
        ]
    );
    assert_eq!(json_body(&transport.requests()[2].body), body);
}

#[tokio::test]
async fn entity_family_paths() {
    let (service, transport) = service();
    service.list_entities("case_1").await.unwrap();
    service.create_entity("case_1", &json!({"name": "ACME"})).await.unwrap();
    service.update_entity("case_1", "e1", &json!({"name": "ACME Ltd"})).await.unwrap();
    service.delete_entity("case_1", "e1").await.unwrap();

    let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            format!("{BASE_URL}/cases/case_1/entities"),
            format!("{BASE_URL}/cases/case_1/entities"),
            format!("{BASE_URL}/cases/case_1/entities/e1"),
            format!("{BASE_URL}/cases/case_1/entities/e1"),
        ]
    );
}

#[tokio::test]
async fn evidence_upload_is_multipart_without_content_type() {
    let (service, transport) = service();
    service
        .upload_evidence("case_1", "ledger.csv", b"a,b\n1,2\n".to_vec(), Some("text/csv"))
        .await
        .unwrap();

    let req = transport.last_request();
    assert_eq!(req.method, HttpMethod::Post);
    assert_eq!(req.url, format!("{BASE_URL}/cases/case_1/evidence"));
    assert_eq!(req.header("content-type"), None);
    match req.body {
        Some(RequestBody::Multipart(file)) => {
            assert_eq!(file.field, "evidence");
            assert_eq!(file.file_name, "ledger.csv");
            assert_eq!(file.mime_type.as_deref(), Some("text/csv"));
            assert_eq!(file.bytes, b"a,b\n1,2\n");
        }
        other => panic!("expected multipart body, got {other:?}"),
    }
}

#[tokio::test]
async fn batch_delete_is_one_request() {
    let (service, transport) = service();
    let ids = vec!["e1".to_string(), "e2".to_string()];
    service.batch_delete_entities("case_1", &ids).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].url, format!("{BASE_URL}/cases/case_1/entities/batch-delete"));
    assert_eq!(json_body(&requests[0].body), json!({"entityIds": ["e1", "e2"]}));
}

#[tokio::test]
async fn batch_update_surfaces_single_outcome() {
    let (service, transport) = service();
    transport.push_json(207, r#"{"applied":1,"failed":["e2"]}"#);
    let updates = vec![
        EntityUpdate::new("e1").set("risk", "high"),
        EntityUpdate::new("e2").set("risk", "low"),
    ];

    let outcome = service.batch_update_entities("case_1", &updates).await.unwrap();
    assert_eq!(outcome, Payload::Json(json!({"applied": 1, "failed": ["e2"]})));

    let req = transport.last_request();
    assert_eq!(transport.request_count(), 1);
    assert_eq!(req.url, format!("{BASE_URL}/cases/case_1/entities/batch"));
    assert_eq!(
        json_body(&req.body),
        json!({"updates": [{"id": "e1", "risk": "high"}, {"id": "e2", "risk": "low"}]})
    );
}

#[tokio::test]
async fn search_encodes_term_and_filters() {
    let (service, transport) = service();
    service
        .search_entities("john & jane", &[("type", Some("Person")), ("org", None)])
        .await
        .unwrap();

    let url = transport.last_request().url;
    let (path, query) = url.split_once('?').unwrap();
    assert_eq!(path, format!("{BASE_URL}/search/entities"));
    let pairs: Vec<&str> = query.split('&').collect();
    assert!(pairs.contains(&"query=john%20%26%20jane"), "{query}");
    assert!(pairs.contains(&"type=Person"), "{query}");
    assert!(!query.contains("org="));
}

#[tokio::test]
async fn evidence_search_uses_evidence_collection() {
    let (service, transport) = service();
    service.search_evidence("invoice", &[]).await.unwrap();
    assert_eq!(transport.last_request().url, format!("{BASE_URL}/search/evidence?query=invoice"));
}

#[tokio::test]
async fn export_defaults_to_json_format() {
    let (service, transport) = service();
    service.export_case("c1", None).await.unwrap();
    assert_eq!(transport.last_request().url, format!("{BASE_URL}/cases/c1/export?format=json"));
}

#[tokio::test]
async fn reporting_reads_are_plain_gets() {
    let (service, transport) = service();
    service.get_dashboard_stats().await.unwrap();
    service.get_case_timeline("c1").await.unwrap();
    service.get_entity_distribution("c1").await.unwrap();
    service.generate_report("c1", "summary").await.unwrap();
    service.get_processing_queue().await.unwrap();
    service.get_network_data("c1").await.unwrap();
    service.get_analysis_results("c1", "a7").await.unwrap();

    let requests = transport.requests();
    assert!(requests.iter().all(|r| r.method == HttpMethod::Get && r.body.is_none()));
    let paths: Vec<String> = requests
        .into_iter()
        .map(|r| r.url.trim_start_matches(BASE_URL).to_string())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/dashboard/stats",
            "/cases/c1/timeline",
            "/cases/c1/entity-distribution",
            "/cases/c1/reports/summary",
            "/system/queue",
            "/cases/c1/network",
            "/cases/c1/analysis/a7",
        ]
    );
}

#[tokio::test]
async fn analysis_run_posts_config() {
    let (service, transport) = service();
    service.run_analysis("c1", &json!({"depth": 2})).await.unwrap();
    let req = transport.last_request();
    assert_eq!(req.method, HttpMethod::Post);
    assert_eq!(req.url, format!("{BASE_URL}/cases/c1/analyze"));
    assert_eq!(json_body(&req.body), json!({"depth": 2}));
}

#[tokio::test]
async fn configuration_read_and_write() {
    let (service, transport) = service();
    service.get_configuration().await.unwrap();
    service.update_configuration(&json!({"theme": "dark"})).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[1].method, HttpMethod::Put);
    assert_eq!(requests[1].url, format!("{BASE_URL}/config"));
}

// ---------------------------------------------------------------------------
// Graph schema and registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn graph_query_sends_query_and_variables() {
    let (service, transport) = service();
    let query = GraphQuery::new("{ nodes { id } }").with_variables(json!({"limit": 5}));
    service.execute_graph_query(&query).await.unwrap();

    let req = transport.last_request();
    assert_eq!(req.url, format!("{BASE_URL}/v1/hypergraphql/query"));
    assert_eq!(json_body(&req.body), json!({"query": "{ nodes { id } }", "variables": {"limit": 5}}));
}

#[tokio::test]
async fn graph_node_listing_filters() {
    let (service, transport) = service();
    service.list_graph_nodes(Some("Person"), Some(OrgLevel::Org)).await.unwrap();
    service.list_graph_edges(None, None).await.unwrap();
    service.create_graph_node(&json!({"id": "n1"})).await.unwrap();
    service.get_graph_edge("x1").await.unwrap();

    let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(urls[0], format!("{BASE_URL}/v1/hypergraphql/nodes?type=Person&orgLevel=ORG"));
    assert_eq!(urls[1], format!("{BASE_URL}/v1/hypergraphql/edges"));
    assert_eq!(urls[2], format!("{BASE_URL}/v1/hypergraphql/nodes"));
    assert_eq!(urls[3], format!("{BASE_URL}/v1/hypergraphql/edges/x1"));
}

#[tokio::test]
async fn org_registration_defaults_level() {
    let (service, transport) = service();
    service.register_org("acme", None).await.unwrap();
    assert_eq!(
        json_body(&transport.last_request().body),
        json!({"orgName": "acme", "orgLevel": "ORG"})
    );
}

#[tokio::test]
async fn aggregate_posts_without_body() {
    let (service, transport) = service();
    service.aggregate_org_schemas("acme").await.unwrap();
    let req = transport.last_request();
    assert_eq!(req.method, HttpMethod::Post);
    assert_eq!(req.url, format!("{BASE_URL}/v1/hypergraphql/github/org/acme/aggregate"));
    assert!(req.body.is_none());
}

#[tokio::test]
async fn hgnnql_defaults_case_id() {
    let (service, transport) = service();
    service.execute_hgnnql("MATCH (n)", None).await.unwrap();
    assert_eq!(
        json_body(&transport.last_request().body),
        json!({"query": "MATCH (n)", "case_id": "default_case"})
    );
}
