//! Payload and DTO types for the case-analysis API.
//!
//! # Design
//! Most endpoints exchange documents whose schema belongs to the server, so
//! responses come back as a `Payload` and callers `decode` into whatever
//! shape they expect. The request bodies the client itself assembles (batch
//! operations, graph queries) are typed here so their wire field names are
//! fixed in one place. These types are defined
//! independently of the mock-server crate; integration tests catch drift.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// A successfully classified response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Body declared as JSON and decoded.
    Json(Value),
    /// Any other body, returned as text.
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Json(_) => None,
            Payload::Text(text) => Some(text),
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    /// Deserialize a JSON payload into `T`. Text payloads are a decode error.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Payload::Json(value) => {
                serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
            }
            Payload::Text(_) => Err(ApiError::Decode("expected a JSON payload, got text".to_string())),
        }
    }
}

/// A case record as returned by the cases resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// An entity attached to a case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub attributes: Value,
}

/// Metadata of an uploaded evidence item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    pub id: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub description: Option<String>,
}

/// One element of a batch entity update: the entity id plus the fields to
/// change. Fields are opaque to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityUpdate {
    pub id: String,
    #[serde(flatten)]
    pub changes: serde_json::Map<String, Value>,
}

impl EntityUpdate {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            changes: serde_json::Map::new(),
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.changes.insert(field.to_string(), value.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchUpdateBody<'a> {
    pub updates: &'a [EntityUpdate],
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchDeleteBody<'a> {
    #[serde(rename = "entityIds")]
    pub entity_ids: &'a [String],
}

/// Body of a structured graph query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphQuery {
    pub query: String,
    #[serde(default = "empty_object")]
    pub variables: Value,
}

impl GraphQuery {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            variables: empty_object(),
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Hierarchy level an organisation is registered at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrgLevel {
    Enterprise,
    #[default]
    Org,
    Repo,
}

impl OrgLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgLevel::Enterprise => "ENTERPRISE",
            OrgLevel::Org => "ORG",
            OrgLevel::Repo => "REPO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_json_payload_into_case() {
        let payload = Payload::Json(json!({"id": "c1", "title": "Fraud"}));
        let case: Case = payload.decode().unwrap();
        assert_eq!(case.id, "c1");
        assert_eq!(case.status, None);
    }

    #[test]
    fn decode_text_payload_fails() {
        let err = Payload::Text("ok".to_string()).decode::<Case>().unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn entity_update_flattens_changes() {
        let update = EntityUpdate::new("e1").set("name", "Jane").set("risk", 3);
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, json!({"id": "e1", "name": "Jane", "risk": 3}));
    }

    #[test]
    fn batch_delete_uses_camel_case_field() {
        let ids = vec!["e1".to_string(), "e2".to_string()];
        let body = BatchDeleteBody { entity_ids: &ids };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"entityIds": ["e1", "e2"]}));
    }

    #[test]
    fn graph_query_defaults_variables_to_empty_object() {
        let value = serde_json::to_value(GraphQuery::new("{ nodes { id } }")).unwrap();
        assert_eq!(value, json!({"query": "{ nodes { id } }", "variables": {}}));
    }

    #[test]
    fn org_level_serializes_uppercase() {
        assert_eq!(serde_json::to_value(OrgLevel::default()).unwrap(), json!("ORG"));
        assert_eq!(OrgLevel::Enterprise.as_str(), "ENTERPRISE");
    }
}
