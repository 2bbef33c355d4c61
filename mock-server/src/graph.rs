//! Graph-schema service under `/v1/hypergraphql`: nodes, edges, queries,
//! organisation registration and HGNNQL.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{Db, GraphElement};

#[derive(Deserialize)]
pub struct ElementFilter {
    #[serde(rename = "type")]
    pub element_type: Option<String>,
    #[serde(rename = "orgLevel")]
    pub org_level: Option<String>,
}

#[derive(Deserialize)]
pub struct OrgLevelFilter {
    #[serde(rename = "orgLevel")]
    pub org_level: Option<String>,
}

#[derive(Deserialize)]
pub struct GraphQueryBody {
    pub query: String,
    #[serde(default)]
    pub variables: Value,
}

#[derive(Deserialize)]
pub struct RegisterOrg {
    #[serde(rename = "orgName")]
    pub org_name: String,
    #[serde(rename = "orgLevel", default)]
    pub org_level: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterRepo {
    #[serde(rename = "repoName")]
    pub repo_name: String,
    #[serde(rename = "repoPath")]
    pub repo_path: String,
}

#[derive(Deserialize)]
pub struct HgnnqlQuery {
    pub query: String,
    pub case_id: String,
}

pub(crate) fn routes() -> Router<Db> {
    Router::new()
        .route("/v1/hypergraphql/schema", get(schema))
        .route("/v1/hypergraphql/query", post(query))
        .route("/v1/hypergraphql/nodes", get(list_nodes).post(create_node))
        .route("/v1/hypergraphql/nodes/{id}", get(get_node))
        .route("/v1/hypergraphql/edges", get(list_edges).post(create_edge))
        .route("/v1/hypergraphql/edges/{id}", get(get_edge))
        .route("/v1/hypergraphql/export", get(export))
        .route("/v1/hypergraphql/github/repo/init", post(repo_action))
        .route("/v1/hypergraphql/github/repo/project", post(repo_action))
        .route("/v1/hypergraphql/github/repo/load", post(repo_action))
        .route("/v1/hypergraphql/github/repo/compress", post(repo_action))
        .route("/v1/hypergraphql/github/org/register", post(register_org))
        .route("/v1/hypergraphql/github/org/{org}/repos", post(register_repo))
        .route("/v1/hypergraphql/github/org/{org}/aggregate", post(aggregate_org))
        .route("/v1/hypergraphql/github/org/{org}/stats", get(org_stats))
        .route("/v1/hypergraphql/hgnnql/query", post(hgnnql_query))
        .route("/v1/hypergraphql/hgnnql/atomspace/{case_id}/atoms", get(atomspace_atoms))
        .route("/v1/hypergraphql/hgnnql/convert/hypergnn", post(convert_hypergnn))
}

fn filtered(elements: &[GraphElement], filter: &ElementFilter) -> Vec<GraphElement> {
    elements
        .iter()
        .filter(|e| filter.element_type.as_ref().map_or(true, |t| &e.element_type == t))
        .filter(|e| filter.org_level.as_ref().map_or(true, |l| &e.org_level == l))
        .cloned()
        .collect()
}

async fn schema(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let mut node_types: Vec<&str> = store.nodes.iter().map(|n| n.element_type.as_str()).collect();
    node_types.sort_unstable();
    node_types.dedup();
    let mut edge_types: Vec<&str> = store.edges.iter().map(|e| e.element_type.as_str()).collect();
    edge_types.sort_unstable();
    edge_types.dedup();
    Json(json!({"nodeTypes": node_types, "edgeTypes": edge_types}))
}

/// Supports the two queries the dashboard issues: `nodes` and `edges`.
async fn query(State(db): State<Db>, Json(body): Json<GraphQueryBody>) -> Result<Json<Value>, StatusCode> {
    let store = db.read().await;
    let text = body.query.trim();
    let data = if text.contains("nodes") {
        json!({"nodes": store.nodes})
    } else if text.contains("edges") {
        json!({"edges": store.edges})
    } else {
        return Err(StatusCode::BAD_REQUEST);
    };
    Ok(Json(json!({"data": data, "variables": body.variables})))
}

async fn list_nodes(State(db): State<Db>, Query(filter): Query<ElementFilter>) -> Json<Vec<GraphElement>> {
    Json(filtered(&db.read().await.nodes, &filter))
}

async fn create_node(State(db): State<Db>, Json(node): Json<GraphElement>) -> Result<(StatusCode, Json<GraphElement>), StatusCode> {
    let mut store = db.write().await;
    if store.nodes.iter().any(|n| n.id == node.id) {
        return Err(StatusCode::CONFLICT);
    }
    store.nodes.push(node.clone());
    Ok((StatusCode::CREATED, Json(node)))
}

async fn get_node(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<GraphElement>, StatusCode> {
    let store = db.read().await;
    store.nodes.iter().find(|n| n.id == id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn list_edges(State(db): State<Db>, Query(filter): Query<ElementFilter>) -> Json<Vec<GraphElement>> {
    Json(filtered(&db.read().await.edges, &filter))
}

async fn create_edge(State(db): State<Db>, Json(edge): Json<GraphElement>) -> Result<(StatusCode, Json<GraphElement>), StatusCode> {
    let mut store = db.write().await;
    if store.edges.iter().any(|e| e.id == edge.id) {
        return Err(StatusCode::CONFLICT);
    }
    store.edges.push(edge.clone());
    Ok((StatusCode::CREATED, Json(edge)))
}

async fn get_edge(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<GraphElement>, StatusCode> {
    let store = db.read().await;
    store.edges.iter().find(|e| e.id == id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn export(State(db): State<Db>, Query(filter): Query<OrgLevelFilter>) -> Json<Value> {
    let store = db.read().await;
    let by_level = ElementFilter {
        element_type: None,
        org_level: filter.org_level,
    };
    Json(json!({
        "nodes": filtered(&store.nodes, &by_level),
        "edges": filtered(&store.edges, &by_level),
    }))
}

/// Repository init/project/load/compress: acknowledged and echoed back.
async fn repo_action(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({"status": "ok", "request": body}))
}

async fn register_org(State(db): State<Db>, Json(body): Json<RegisterOrg>) -> (StatusCode, Json<Value>) {
    let mut store = db.write().await;
    store.orgs.entry(body.org_name.clone()).or_default();
    let level = body.org_level.unwrap_or_else(|| "ORG".to_string());
    (StatusCode::CREATED, Json(json!({"orgName": body.org_name, "orgLevel": level})))
}

async fn register_repo(
    State(db): State<Db>,
    Path(org): Path<String>,
    Json(body): Json<RegisterRepo>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let mut store = db.write().await;
    let repos = store.orgs.get_mut(&org).ok_or(StatusCode::NOT_FOUND)?;
    repos.push(body.repo_name.clone());
    Ok((
        StatusCode::CREATED,
        Json(json!({"orgName": org, "repoName": body.repo_name, "repoPath": body.repo_path})),
    ))
}

async fn aggregate_org(State(db): State<Db>, Path(org): Path<String>) -> Result<Json<Value>, StatusCode> {
    let store = db.read().await;
    let repos = store.orgs.get(&org).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({"orgName": org, "aggregatedRepos": repos.len()})))
}

async fn org_stats(State(db): State<Db>, Path(org): Path<String>) -> Result<Json<Value>, StatusCode> {
    let store = db.read().await;
    let repos = store.orgs.get(&org).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({"orgName": org, "repoCount": repos.len(), "repos": repos})))
}

async fn hgnnql_query(Json(body): Json<HgnnqlQuery>) -> Json<Value> {
    Json(json!({"case_id": body.case_id, "query": body.query, "results": []}))
}

async fn atomspace_atoms(Path(case_id): Path<String>) -> Json<Value> {
    Json(json!({"case_id": case_id, "atoms": []}))
}

async fn convert_hypergnn(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({"case_id": body["case_id"], "converted": true}))
}
