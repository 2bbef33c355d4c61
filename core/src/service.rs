//! Async API client: the pure `CaseClient` paired with a `Transport`.
//!
//! # Design
//! Every call funnels through `ApiService::request`, which builds the request,
//! executes it, classifies the response, and logs any failure with the
//! endpoint before handing it back. The verb wrappers and resource families
//! are fixed-shape calls into that one primitive. Nothing is retried, cached,
//! or deduplicated.
//!
//! The service is constructed explicitly and passed to its consumers. Clones
//! are cheap and share the transport.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, instrument};

use crate::client::{CaseClient, RequestOptions};
use crate::config::ClientConfig;
use crate::endpoints::{self, SearchTarget};
use crate::error::{ApiError, TransportError};
use crate::http::{HttpMethod, MultipartFile, RequestBody};
use crate::subscription::Subscription;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{BatchDeleteBody, BatchUpdateBody, EntityUpdate, GraphQuery, OrgLevel, Payload};

/// Form field evidence files are uploaded under.
pub const EVIDENCE_FIELD: &str = "evidence";

/// Case id used by HGNNQL calls when the caller names none.
pub const DEFAULT_HGNNQL_CASE: &str = "default_case";

pub struct ApiService<T: Transport = ReqwestTransport> {
    client: CaseClient,
    transport: Arc<T>,
    config: ClientConfig,
}

impl<T: Transport> Clone for ApiService<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl ApiService<ReqwestTransport> {
    /// Build a service backed by reqwest, honouring `config.timeout`.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> ApiService<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            client: CaseClient::new(&config.base_url),
            transport: Arc::new(transport),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client(&self) -> &CaseClient {
        &self.client
    }

    // -----------------------------------------------------------------------
    // Core primitive and verbs
    // -----------------------------------------------------------------------

    /// Issue one request against `base_url + endpoint`.
    #[instrument(level = "debug", skip(self, options))]
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Payload, ApiError> {
        self.execute(endpoint, options).await.map_err(|err| {
            error!(endpoint, error = %err, "API request failed");
            err
        })
    }

    /// `request` without the failure log, for callers that report errors
    /// themselves.
    pub(crate) async fn execute(&self, endpoint: &str, options: RequestOptions) -> Result<Payload, ApiError> {
        let request = self.client.build_request(endpoint, options)?;
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "received response");
        self.client.parse_response(response)
    }

    pub async fn get(&self, endpoint: &str) -> Result<Payload, ApiError> {
        self.request(endpoint, RequestOptions::new(HttpMethod::Get)).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, payload: &B) -> Result<Payload, ApiError> {
        let options = with_json(endpoint, HttpMethod::Post, payload)?;
        self.request(endpoint, options).await
    }

    /// POST with no body.
    pub async fn post_empty(&self, endpoint: &str) -> Result<Payload, ApiError> {
        self.request(endpoint, RequestOptions::new(HttpMethod::Post)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, endpoint: &str, payload: &B) -> Result<Payload, ApiError> {
        let options = with_json(endpoint, HttpMethod::Put, payload)?;
        self.request(endpoint, options).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Payload, ApiError> {
        self.request(endpoint, RequestOptions::new(HttpMethod::Delete)).await
    }

    /// POST `file` as a multipart body. No content type is set here.
    pub async fn upload(&self, endpoint: &str, file: MultipartFile) -> Result<Payload, ApiError> {
        let options = RequestOptions::new(HttpMethod::Post).body(RequestBody::Multipart(file));
        self.request(endpoint, options).await
    }

    // -----------------------------------------------------------------------
    // Cases
    // -----------------------------------------------------------------------

    pub async fn list_cases(&self) -> Result<Payload, ApiError> {
        self.get(&endpoints::cases()).await
    }

    pub async fn get_case(&self, case_id: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::case(case_id)).await
    }

    pub async fn create_case<B: Serialize + ?Sized>(&self, case: &B) -> Result<Payload, ApiError> {
        self.post(&endpoints::cases(), case).await
    }

    pub async fn update_case<B: Serialize + ?Sized>(&self, case_id: &str, case: &B) -> Result<Payload, ApiError> {
        self.put(&endpoints::case(case_id), case).await
    }

    pub async fn delete_case(&self, case_id: &str) -> Result<Payload, ApiError> {
        self.delete(&endpoints::case(case_id)).await
    }

    /// Export a case; `format` is passed through, `"json"` when `None`.
    pub async fn export_case(&self, case_id: &str, format: Option<&str>) -> Result<Payload, ApiError> {
        self.get(&endpoints::case_export(case_id, format.unwrap_or("json"))).await
    }

    pub async fn import_case<B: Serialize + ?Sized>(&self, case_data: &B) -> Result<Payload, ApiError> {
        self.post(&endpoints::case_import(), case_data).await
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    pub async fn list_entities(&self, case_id: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::entities(case_id)).await
    }

    pub async fn create_entity<B: Serialize + ?Sized>(&self, case_id: &str, entity: &B) -> Result<Payload, ApiError> {
        self.post(&endpoints::entities(case_id), entity).await
    }

    pub async fn update_entity<B: Serialize + ?Sized>(
        &self,
        case_id: &str,
        entity_id: &str,
        entity: &B,
    ) -> Result<Payload, ApiError> {
        self.put(&endpoints::entity(case_id, entity_id), entity).await
    }

    pub async fn delete_entity(&self, case_id: &str, entity_id: &str) -> Result<Payload, ApiError> {
        self.delete(&endpoints::entity(case_id, entity_id)).await
    }

    /// Send every update in one request. The server applies them as a unit
    /// or reports partial failure; the outcome is returned as-is.
    pub async fn batch_update_entities(&self, case_id: &str, updates: &[EntityUpdate]) -> Result<Payload, ApiError> {
        self.post(&endpoints::entities_batch(case_id), &BatchUpdateBody { updates }).await
    }

    /// Delete every listed entity in one request.
    pub async fn batch_delete_entities(&self, case_id: &str, entity_ids: &[String]) -> Result<Payload, ApiError> {
        self.post(
            &endpoints::entities_batch_delete(case_id),
            &BatchDeleteBody { entity_ids },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Evidence
    // -----------------------------------------------------------------------

    pub async fn list_evidence(&self, case_id: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::evidence_list(case_id)).await
    }

    /// Upload one evidence file under the `evidence` form field.
    pub async fn upload_evidence(
        &self,
        case_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime_type: Option<&str>,
    ) -> Result<Payload, ApiError> {
        let mut file = MultipartFile::new(EVIDENCE_FIELD, file_name, bytes);
        if let Some(mime) = mime_type {
            file = file.with_mime_type(mime);
        }
        self.upload(&endpoints::evidence_list(case_id), file).await
    }

    pub async fn update_evidence<B: Serialize + ?Sized>(
        &self,
        case_id: &str,
        evidence_id: &str,
        evidence: &B,
    ) -> Result<Payload, ApiError> {
        self.put(&endpoints::evidence(case_id, evidence_id), evidence).await
    }

    pub async fn delete_evidence(&self, case_id: &str, evidence_id: &str) -> Result<Payload, ApiError> {
        self.delete(&endpoints::evidence(case_id, evidence_id)).await
    }

    // -----------------------------------------------------------------------
    // Analysis and reporting
    // -----------------------------------------------------------------------

    pub async fn run_analysis<B: Serialize + ?Sized>(&self, case_id: &str, analysis_config: &B) -> Result<Payload, ApiError> {
        self.post(&endpoints::analyze(case_id), analysis_config).await
    }

    pub async fn get_analysis_results(&self, case_id: &str, analysis_id: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::analysis(case_id, analysis_id)).await
    }

    pub async fn get_network_data(&self, case_id: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::network(case_id)).await
    }

    pub async fn get_dashboard_stats(&self) -> Result<Payload, ApiError> {
        self.get(&endpoints::dashboard_stats()).await
    }

    pub async fn get_case_timeline(&self, case_id: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::timeline(case_id)).await
    }

    pub async fn get_entity_distribution(&self, case_id: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::entity_distribution(case_id)).await
    }

    pub async fn generate_report(&self, case_id: &str, report_type: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::report(case_id, report_type)).await
    }

    pub async fn get_system_status(&self) -> Result<Payload, ApiError> {
        self.get(&endpoints::system_status()).await
    }

    pub async fn get_processing_queue(&self) -> Result<Payload, ApiError> {
        self.get(&endpoints::processing_queue()).await
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Free-text entity search. Filters behave as a map: a repeated key keeps
    /// its last value and a `None` value is omitted.
    pub async fn search_entities(&self, term: &str, filters: &[(&str, Option<&str>)]) -> Result<Payload, ApiError> {
        self.get(&endpoints::search(SearchTarget::Entities, term, filters)).await
    }

    pub async fn search_evidence(&self, term: &str, filters: &[(&str, Option<&str>)]) -> Result<Payload, ApiError> {
        self.get(&endpoints::search(SearchTarget::Evidence, term, filters)).await
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub async fn get_configuration(&self) -> Result<Payload, ApiError> {
        self.get(&endpoints::configuration()).await
    }

    pub async fn update_configuration<B: Serialize + ?Sized>(&self, config: &B) -> Result<Payload, ApiError> {
        self.put(&endpoints::configuration(), config).await
    }

    // -----------------------------------------------------------------------
    // Graph schema
    // -----------------------------------------------------------------------

    pub async fn get_graph_schema(&self) -> Result<Payload, ApiError> {
        self.get(&endpoints::graph_schema()).await
    }

    pub async fn execute_graph_query(&self, query: &GraphQuery) -> Result<Payload, ApiError> {
        self.post(&endpoints::graph_query(), query).await
    }

    pub async fn list_graph_nodes(&self, node_type: Option<&str>, org_level: Option<OrgLevel>) -> Result<Payload, ApiError> {
        self.get(&endpoints::graph_nodes(node_type, org_level.as_ref().map(OrgLevel::as_str)))
            .await
    }

    pub async fn get_graph_node(&self, node_id: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::graph_node(node_id)).await
    }

    pub async fn create_graph_node<B: Serialize + ?Sized>(&self, node: &B) -> Result<Payload, ApiError> {
        self.post(&endpoints::graph_nodes(None, None), node).await
    }

    pub async fn list_graph_edges(&self, edge_type: Option<&str>, org_level: Option<OrgLevel>) -> Result<Payload, ApiError> {
        self.get(&endpoints::graph_edges(edge_type, org_level.as_ref().map(OrgLevel::as_str)))
            .await
    }

    pub async fn get_graph_edge(&self, edge_id: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::graph_edge(edge_id)).await
    }

    pub async fn create_graph_edge<B: Serialize + ?Sized>(&self, edge: &B) -> Result<Payload, ApiError> {
        self.post(&endpoints::graph_edges(None, None), edge).await
    }

    pub async fn export_graph_schema(&self, org_level: Option<OrgLevel>) -> Result<Payload, ApiError> {
        self.get(&endpoints::graph_export(org_level.as_ref().map(OrgLevel::as_str)))
            .await
    }

    // -----------------------------------------------------------------------
    // Organisation and repository registration
    // -----------------------------------------------------------------------

    pub async fn init_repo_structure(&self, repo_path: &str) -> Result<Payload, ApiError> {
        self.post(&endpoints::repo_init(), &json!({ "repoPath": repo_path })).await
    }

    pub async fn project_schema_to_repo(&self, repo_path: &str) -> Result<Payload, ApiError> {
        self.post(&endpoints::repo_project(), &json!({ "repoPath": repo_path })).await
    }

    pub async fn load_from_repo(&self, repo_path: &str, org_name: &str) -> Result<Payload, ApiError> {
        self.post(
            &endpoints::repo_load(),
            &json!({ "repoPath": repo_path, "orgName": org_name }),
        )
        .await
    }

    pub async fn register_org(&self, org_name: &str, org_level: Option<OrgLevel>) -> Result<Payload, ApiError> {
        let level = org_level.unwrap_or_default();
        self.post(
            &endpoints::org_register(),
            &json!({ "orgName": org_name, "orgLevel": level }),
        )
        .await
    }

    pub async fn register_repo_to_org(&self, org_name: &str, repo_name: &str, repo_path: &str) -> Result<Payload, ApiError> {
        self.post(
            &endpoints::org_repos(org_name),
            &json!({ "repoName": repo_name, "repoPath": repo_path }),
        )
        .await
    }

    pub async fn aggregate_org_schemas(&self, org_name: &str) -> Result<Payload, ApiError> {
        self.post_empty(&endpoints::org_aggregate(org_name)).await
    }

    pub async fn get_org_stats(&self, org_name: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::org_stats(org_name)).await
    }

    pub async fn compress_repo(&self, org_name: &str, repo_name: &str, output_path: &str) -> Result<Payload, ApiError> {
        self.post(
            &endpoints::repo_compress(),
            &json!({ "orgName": org_name, "repoName": repo_name, "outputPath": output_path }),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // HGNNQL
    // -----------------------------------------------------------------------

    pub async fn execute_hgnnql(&self, query: &str, case_id: Option<&str>) -> Result<Payload, ApiError> {
        let case_id = case_id.unwrap_or(DEFAULT_HGNNQL_CASE);
        self.post(&endpoints::hgnnql_query(), &json!({ "query": query, "case_id": case_id }))
            .await
    }

    pub async fn get_atomspace_atoms(&self, case_id: &str) -> Result<Payload, ApiError> {
        self.get(&endpoints::atomspace_atoms(case_id)).await
    }

    pub async fn convert_hypergnn_to_hgnnql(&self, case_id: &str, hypergnn_data: Value) -> Result<Payload, ApiError> {
        self.post(
            &endpoints::hgnnql_convert(),
            &json!({ "case_id": case_id, "hypergnn_data": hypergnn_data }),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    /// Poll `/cases/{case_id}/updates` every `poll_interval` and hand each
    /// successful payload to `callback`.
    ///
    /// A failed poll is logged once at `warn` and skipped; the next tick still
    /// fires. A zero `poll_interval` is raised to `MIN_POLL_INTERVAL`. Must be
    /// called from within a Tokio runtime.
    pub fn subscribe_to_updates<F>(&self, case_id: &str, callback: F) -> Subscription
    where
        F: FnMut(Payload) + Send + 'static,
    {
        Subscription::spawn(self.clone(), case_id, self.config.poll_interval, callback)
    }
}

fn with_json<B: Serialize + ?Sized>(endpoint: &str, method: HttpMethod, payload: &B) -> Result<RequestOptions, ApiError> {
    RequestOptions::new(method).json(payload).map_err(|err| {
        error!(endpoint, error = %err, "API request failed");
        err
    })
}
