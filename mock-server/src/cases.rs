//! Case, entity, evidence, analysis and search handlers.

use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{Case, CaseData, Db, Entity, Evidence};

#[derive(Deserialize)]
pub struct CreateCase {
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCase {
    pub title: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub attributes: Value,
}

#[derive(Deserialize)]
pub struct UpdateEntity {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub attributes: Option<Value>,
}

#[derive(Deserialize)]
pub struct BatchUpdate {
    pub updates: Vec<EntityPatch>,
}

#[derive(Deserialize)]
pub struct EntityPatch {
    pub id: String,
    #[serde(flatten)]
    pub changes: UpdateEntity,
}

#[derive(Deserialize)]
pub struct BatchDelete {
    #[serde(rename = "entityIds")]
    pub entity_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateEvidence {
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

// --- cases ---

pub async fn list_cases(State(db): State<Db>) -> Json<Vec<Case>> {
    let store = db.read().await;
    let mut cases: Vec<Case> = store.cases.values().cloned().collect();
    cases.sort_by(|a, b| a.id.cmp(&b.id));
    Json(cases)
}

pub async fn create_case(State(db): State<Db>, Json(input): Json<CreateCase>) -> (StatusCode, Json<Case>) {
    let case = Case {
        id: new_id("case"),
        title: input.title,
        status: input.status.unwrap_or_else(|| "open".to_string()),
        description: input.description,
    };
    let mut store = db.write().await;
    store.cases.insert(case.id.clone(), case.clone());
    store.case_data.entry(case.id.clone()).or_default();
    (StatusCode::CREATED, Json(case))
}

/// Import a case bundle as produced by the JSON export: `{case, entities}`.
pub async fn import_case(State(db): State<Db>, Json(bundle): Json<Value>) -> Result<(StatusCode, Json<Case>), StatusCode> {
    let input: CreateCase =
        serde_json::from_value(bundle["case"].clone()).map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?;
    let entities: Vec<CreateEntity> = match bundle.get("entities") {
        Some(list) => serde_json::from_value(list.clone()).map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?,
        None => Vec::new(),
    };

    let case = Case {
        id: new_id("case"),
        title: input.title,
        status: input.status.unwrap_or_else(|| "open".to_string()),
        description: input.description,
    };
    let data = CaseData {
        entities: entities
            .into_iter()
            .map(|e| Entity {
                id: new_id("ent"),
                name: e.name,
                entity_type: e.entity_type,
                attributes: e.attributes,
            })
            .collect(),
        ..CaseData::default()
    };

    let mut store = db.write().await;
    store.cases.insert(case.id.clone(), case.clone());
    store.case_data.insert(case.id.clone(), data);
    Ok((StatusCode::CREATED, Json(case)))
}

pub async fn get_case(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Case>, StatusCode> {
    let store = db.read().await;
    store.cases.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn update_case(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCase>,
) -> Result<Json<Case>, StatusCode> {
    let mut store = db.write().await;
    let case = store.cases.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(title) = input.title {
        case.title = title;
    }
    if let Some(status) = input.status {
        case.status = status;
    }
    if let Some(description) = input.description {
        case.description = Some(description);
    }
    let updated = case.clone();
    store.notify(&id, json!({"event": "case.updated", "caseId": id}));
    Ok(Json(updated))
}

pub async fn delete_case(State(db): State<Db>, Path(id): Path<String>) -> StatusCode {
    let mut store = db.write().await;
    match store.cases.remove(&id) {
        Some(_) => {
            store.case_data.remove(&id);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// `format=json` (default) returns the case bundle; `format=csv` returns the
/// entity table as plain text.
pub async fn export_case(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Response, StatusCode> {
    let store = db.read().await;
    let case = store.cases.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let entities = store.case_data.get(&id).map(|d| d.entities.as_slice()).unwrap_or_default();

    match params.format.as_deref().unwrap_or("json") {
        "json" => Ok(Json(json!({"case": case, "entities": entities})).into_response()),
        "csv" => {
            let out = entities_csv(entities).map_err(|err| {
                tracing::error!(case_id = %id, error = %err, "CSV export failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], out).into_response())
        }
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

/// Entity table with a header row. Fields holding a delimiter, quote or line
/// break are quoted.
pub(crate) fn entities_csv(entities: &[Entity]) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(["id", "name", "type"])?;
    for e in entities {
        writer.write_record([e.id.as_str(), e.name.as_str(), e.entity_type.as_str()])?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Hand out and clear the pending change notifications for a case.
pub async fn take_updates(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    let mut store = db.write().await;
    if !store.cases.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    let updates = store
        .case_data
        .get_mut(&id)
        .map(|d| std::mem::take(&mut d.pending_updates))
        .unwrap_or_default();
    Ok(Json(json!({"caseId": id, "updates": updates})))
}

// --- entities ---

pub async fn list_entities(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Vec<Entity>>, StatusCode> {
    let store = db.read().await;
    if !store.cases.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(store.case_data.get(&id).map(|d| d.entities.clone()).unwrap_or_default()))
}

pub async fn create_entity(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<CreateEntity>,
) -> Result<(StatusCode, Json<Entity>), StatusCode> {
    let mut store = db.write().await;
    if !store.cases.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    let entity = Entity {
        id: new_id("ent"),
        name: input.name,
        entity_type: input.entity_type,
        attributes: input.attributes,
    };
    store.case_data.entry(id.clone()).or_default().entities.push(entity.clone());
    store.notify(&id, json!({"event": "entity.created", "entityId": entity.id}));
    Ok((StatusCode::CREATED, Json(entity)))
}

fn apply_entity_changes(entity: &mut Entity, changes: UpdateEntity) {
    if let Some(name) = changes.name {
        entity.name = name;
    }
    if let Some(entity_type) = changes.entity_type {
        entity.entity_type = entity_type;
    }
    if let Some(attributes) = changes.attributes {
        entity.attributes = attributes;
    }
}

pub async fn update_entity(
    State(db): State<Db>,
    Path((id, entity_id)): Path<(String, String)>,
    Json(input): Json<UpdateEntity>,
) -> Result<Json<Entity>, StatusCode> {
    let mut store = db.write().await;
    let data = store.case_data.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    let entity = data
        .entities
        .iter_mut()
        .find(|e| e.id == entity_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    apply_entity_changes(entity, input);
    let updated = entity.clone();
    store.notify(&id, json!({"event": "entity.updated", "entityId": entity_id}));
    Ok(Json(updated))
}

pub async fn delete_entity(State(db): State<Db>, Path((id, entity_id)): Path<(String, String)>) -> StatusCode {
    let mut store = db.write().await;
    let Some(data) = store.case_data.get_mut(&id) else {
        return StatusCode::NOT_FOUND;
    };
    let before = data.entities.len();
    data.entities.retain(|e| e.id != entity_id);
    if data.entities.len() == before {
        return StatusCode::NOT_FOUND;
    }
    store.notify(&id, json!({"event": "entity.deleted", "entityId": entity_id}));
    StatusCode::NO_CONTENT
}

/// Apply all patches or none: any unknown id rejects the whole batch.
pub async fn batch_update_entities(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(batch): Json<BatchUpdate>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut store = db.write().await;
    let data = store
        .case_data
        .get_mut(&id)
        .ok_or((StatusCode::NOT_FOUND, Json(json!({"error": "case not found"}))))?;

    let missing: Vec<&str> = batch
        .updates
        .iter()
        .filter(|p| !data.entities.iter().any(|e| e.id == p.id))
        .map(|p| p.id.as_str())
        .collect();
    if !missing.is_empty() {
        return Err((StatusCode::CONFLICT, Json(json!({"error": "unknown entities", "missing": missing}))));
    }

    let updated = batch.updates.len();
    for patch in batch.updates {
        if let Some(entity) = data.entities.iter_mut().find(|e| e.id == patch.id) {
            apply_entity_changes(entity, patch.changes);
        }
    }
    store.notify(&id, json!({"event": "entities.batch_updated", "count": updated}));
    Ok(Json(json!({"updated": updated})))
}

pub async fn batch_delete_entities(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(batch): Json<BatchDelete>,
) -> Result<Json<Value>, StatusCode> {
    let mut store = db.write().await;
    let data = store.case_data.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    let before = data.entities.len();
    data.entities.retain(|e| !batch.entity_ids.contains(&e.id));
    let deleted = before - data.entities.len();
    store.notify(&id, json!({"event": "entities.batch_deleted", "count": deleted}));
    Ok(Json(json!({"deleted": deleted})))
}

// --- evidence ---

pub async fn list_evidence(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Vec<Evidence>>, StatusCode> {
    let store = db.read().await;
    if !store.cases.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(store.case_data.get(&id).map(|d| d.evidence.clone()).unwrap_or_default()))
}

/// Accept a multipart body with one file under the `evidence` field.
pub async fn upload_evidence(
    State(db): State<Db>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Evidence>), StatusCode> {
    if !db.read().await.cases.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }

    let mut uploaded = None;
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        if field.name() != Some("evidence") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("unnamed").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        uploaded = Some(Evidence {
            id: new_id("ev"),
            file_name,
            size: bytes.len() as u64,
            content_type,
            description: None,
        });
    }
    let evidence = uploaded.ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;

    // The case may have been deleted while the body was being read.
    let mut store = db.write().await;
    if !store.add_evidence(&id, evidence.clone()) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok((StatusCode::CREATED, Json(evidence)))
}

pub async fn update_evidence(
    State(db): State<Db>,
    Path((id, evidence_id)): Path<(String, String)>,
    Json(input): Json<UpdateEvidence>,
) -> Result<Json<Evidence>, StatusCode> {
    let mut store = db.write().await;
    let data = store.case_data.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    let evidence = data
        .evidence
        .iter_mut()
        .find(|e| e.id == evidence_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(description) = input.description {
        evidence.description = Some(description);
    }
    Ok(Json(evidence.clone()))
}

pub async fn delete_evidence(State(db): State<Db>, Path((id, evidence_id)): Path<(String, String)>) -> StatusCode {
    let mut store = db.write().await;
    let Some(data) = store.case_data.get_mut(&id) else {
        return StatusCode::NOT_FOUND;
    };
    let before = data.evidence.len();
    data.evidence.retain(|e| e.id != evidence_id);
    if data.evidence.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

// --- analysis and reporting ---

pub async fn run_analysis(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(config): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let mut store = db.write().await;
    let data = store.case_data.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    let analysis_id = new_id("an");
    let result = json!({
        "analysisId": analysis_id,
        "status": "completed",
        "config": config,
        "entityCount": data.entities.len(),
    });
    data.analyses.insert(analysis_id.clone(), result);
    store.notify(&id, json!({"event": "analysis.completed", "analysisId": analysis_id}));
    Ok((StatusCode::ACCEPTED, Json(json!({"analysisId": analysis_id, "status": "queued"}))))
}

pub async fn get_analysis(
    State(db): State<Db>,
    Path((id, analysis_id)): Path<(String, String)>,
) -> Result<Json<Value>, StatusCode> {
    let store = db.read().await;
    store
        .case_data
        .get(&id)
        .and_then(|d| d.analyses.get(&analysis_id))
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn network(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    let store = db.read().await;
    let data = store.case_data.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let nodes: Vec<Value> = data
        .entities
        .iter()
        .map(|e| json!({"id": e.id, "label": e.name, "group": e.entity_type}))
        .collect();
    Ok(Json(json!({"nodes": nodes, "links": []})))
}

pub async fn timeline(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    let store = db.read().await;
    let case = store.cases.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!([{"event": "case.opened", "caseId": case.id, "title": case.title}])))
}

pub async fn entity_distribution(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    let store = db.read().await;
    let data = store.case_data.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for e in &data.entities {
        *counts.entry(e.entity_type.as_str()).or_default() += 1;
    }
    Ok(Json(json!(counts)))
}

pub async fn report(
    State(db): State<Db>,
    Path((id, report_type)): Path<(String, String)>,
) -> Result<Json<Value>, StatusCode> {
    let store = db.read().await;
    let case = store.cases.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let data = store.case_data.get(&id);
    Ok(Json(json!({
        "caseId": case.id,
        "reportType": report_type,
        "title": case.title,
        "entityCount": data.map_or(0, |d| d.entities.len()),
        "evidenceCount": data.map_or(0, |d| d.evidence.len()),
    })))
}

// --- search ---

fn matches_term(haystack: &str, term: &str) -> bool {
    haystack.to_lowercase().contains(&term.to_lowercase())
}

/// `query` matches entity names; `type` filters by entity type; other
/// filters are accepted and ignored.
pub async fn search_entities(State(db): State<Db>, Query(params): Query<HashMap<String, String>>) -> Json<Vec<Entity>> {
    let term = params.get("query").map(String::as_str).unwrap_or("");
    let wanted_type = params.get("type");
    let store = db.read().await;
    let mut hits: Vec<Entity> = store
        .case_data
        .values()
        .flat_map(|d| d.entities.iter())
        .filter(|e| matches_term(&e.name, term))
        .filter(|e| wanted_type.map_or(true, |t| &e.entity_type == t))
        .cloned()
        .collect();
    hits.sort_by(|a, b| a.id.cmp(&b.id));
    Json(hits)
}

pub async fn search_evidence(State(db): State<Db>, Query(params): Query<HashMap<String, String>>) -> Json<Vec<Evidence>> {
    let term = params.get("query").map(String::as_str).unwrap_or("");
    let store = db.read().await;
    let mut hits: Vec<Evidence> = store
        .case_data
        .values()
        .flat_map(|d| d.evidence.iter())
        .filter(|e| matches_term(&e.file_name, term) || e.description.as_deref().is_some_and(|d| matches_term(d, term)))
        .cloned()
        .collect();
    hits.sort_by(|a, b| a.id.cmp(&b.id));
    Json(hits)
}
