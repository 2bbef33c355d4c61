use std::{collections::HashMap, sync::Arc};

use axum::{
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};

mod cases;
mod graph;
mod system;

pub use cases::{CreateCase, CreateEntity, UpdateCase};

/// Path prefix every route is mounted under.
pub const API_PREFIX: &str = "/api";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Case {
    pub id: String,
    pub title: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub attributes: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    pub id: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub size: u64,
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GraphElement {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(rename = "orgLevel", default = "default_org_level")]
    pub org_level: String,
    #[serde(default)]
    pub properties: Value,
}

fn default_org_level() -> String {
    "ORG".to_string()
}

/// Everything the server knows about one case besides the record itself.
#[derive(Debug, Default)]
pub struct CaseData {
    pub entities: Vec<Entity>,
    pub evidence: Vec<Evidence>,
    pub analyses: HashMap<String, Value>,
    /// Change notifications not yet handed out by the updates endpoint.
    pub pending_updates: Vec<Value>,
}

#[derive(Debug, Default)]
pub struct Store {
    pub cases: HashMap<String, Case>,
    pub case_data: HashMap<String, CaseData>,
    pub config: serde_json::Map<String, Value>,
    pub nodes: Vec<GraphElement>,
    pub edges: Vec<GraphElement>,
    /// Organisation name to registered repository names.
    pub orgs: HashMap<String, Vec<String>>,
}

impl Store {
    /// Record a change notification for `case_id`.
    pub fn notify(&mut self, case_id: &str, update: Value) {
        self.case_data
            .entry(case_id.to_string())
            .or_default()
            .pending_updates
            .push(update);
    }

    /// Attach `evidence` to an existing case and notify. Returns `false`,
    /// leaving the store untouched, when the case no longer exists.
    pub fn add_evidence(&mut self, case_id: &str, evidence: Evidence) -> bool {
        if !self.cases.contains_key(case_id) {
            return false;
        }
        let evidence_id = evidence.id.clone();
        self.case_data
            .entry(case_id.to_string())
            .or_default()
            .evidence
            .push(evidence);
        self.notify(case_id, serde_json::json!({"event": "evidence.uploaded", "evidenceId": evidence_id}));
        true
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Router mounted under `/api`, with a fresh empty store.
pub fn app() -> Router {
    Router::new().nest(API_PREFIX, routes()).with_state(Db::default())
}

fn routes() -> Router<Db> {
    Router::new()
        .route("/cases", get(cases::list_cases).post(cases::create_case))
        .route("/cases/import", post(cases::import_case))
        .route(
            "/cases/{id}",
            get(cases::get_case).put(cases::update_case).delete(cases::delete_case),
        )
        .route("/cases/{id}/export", get(cases::export_case))
        .route("/cases/{id}/updates", get(cases::take_updates))
        .route("/cases/{id}/entities", get(cases::list_entities).post(cases::create_entity))
        .route("/cases/{id}/entities/batch", post(cases::batch_update_entities))
        .route("/cases/{id}/entities/batch-delete", post(cases::batch_delete_entities))
        .route(
            "/cases/{id}/entities/{entity_id}",
            put(cases::update_entity).delete(cases::delete_entity),
        )
        .route("/cases/{id}/evidence", get(cases::list_evidence).post(cases::upload_evidence))
        .route(
            "/cases/{id}/evidence/{evidence_id}",
            put(cases::update_evidence).delete(cases::delete_evidence),
        )
        .route("/cases/{id}/analyze", post(cases::run_analysis))
        .route("/cases/{id}/analysis/{analysis_id}", get(cases::get_analysis))
        .route("/cases/{id}/network", get(cases::network))
        .route("/cases/{id}/timeline", get(cases::timeline))
        .route("/cases/{id}/entity-distribution", get(cases::entity_distribution))
        .route("/cases/{id}/reports/{report_type}", get(cases::report))
        .route("/search/entities", get(cases::search_entities))
        .route("/search/evidence", get(cases::search_evidence))
        .route("/dashboard/stats", get(system::dashboard_stats))
        .route("/system/status", get(system::status))
        .route("/system/queue", get(system::queue))
        .route("/config", get(system::get_config).put(system::update_config))
        .merge(graph::routes())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, prefix = API_PREFIX, "mock case API listening");
    }
    axum::serve(listener, app()).await
}
