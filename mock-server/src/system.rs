use axum::{extract::State, Json};
use serde_json::{json, Map, Value};

use crate::Db;

pub async fn dashboard_stats(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let entities: usize = store.case_data.values().map(|d| d.entities.len()).sum();
    let evidence: usize = store.case_data.values().map(|d| d.evidence.len()).sum();
    let open = store.cases.values().filter(|c| c.status == "open").count();
    Json(json!({
        "totalCases": store.cases.len(),
        "openCases": open,
        "totalEntities": entities,
        "totalEvidence": evidence,
    }))
}

/// Plain-text liveness string.
pub async fn status() -> &'static str {
    "ok"
}

pub async fn queue(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let pending: usize = store.case_data.values().map(|d| d.pending_updates.len()).sum();
    Json(json!({"pending": pending, "running": 0}))
}

pub async fn get_config(State(db): State<Db>) -> Json<Map<String, Value>> {
    Json(db.read().await.config.clone())
}

/// Shallow-merge the submitted keys into the stored configuration.
pub async fn update_config(State(db): State<Db>, Json(patch): Json<Map<String, Value>>) -> Json<Map<String, Value>> {
    let mut store = db.write().await;
    store.config.extend(patch);
    Json(store.config.clone())
}
