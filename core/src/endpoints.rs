//! Endpoint paths for every resource the API exposes.
//!
//! Paths are relative to the configured base URL and always begin with `/`.
//! Identifiers are inserted as given; query strings are form-urlencoded and
//! filters whose value is `None` are left out.

use url::form_urlencoded;

/// Prefix of the graph-schema service.
pub const GRAPH_PREFIX: &str = "/v1/hypergraphql";

// ---------------------------------------------------------------------------
// Cases
// ---------------------------------------------------------------------------

pub fn cases() -> String {
    "/cases".to_string()
}

pub fn case(case_id: &str) -> String {
    format!("/cases/{case_id}")
}

pub fn case_import() -> String {
    "/cases/import".to_string()
}

pub fn case_export(case_id: &str, format: &str) -> String {
    with_query(&format!("/cases/{case_id}/export"), &[("format", Some(format))])
}

pub fn case_updates(case_id: &str) -> String {
    format!("/cases/{case_id}/updates")
}

// ---------------------------------------------------------------------------
// Entities and evidence
// ---------------------------------------------------------------------------

pub fn entities(case_id: &str) -> String {
    format!("/cases/{case_id}/entities")
}

pub fn entity(case_id: &str, entity_id: &str) -> String {
    format!("/cases/{case_id}/entities/{entity_id}")
}

pub fn entities_batch(case_id: &str) -> String {
    format!("/cases/{case_id}/entities/batch")
}

pub fn entities_batch_delete(case_id: &str) -> String {
    format!("/cases/{case_id}/entities/batch-delete")
}

pub fn evidence_list(case_id: &str) -> String {
    format!("/cases/{case_id}/evidence")
}

pub fn evidence(case_id: &str, evidence_id: &str) -> String {
    format!("/cases/{case_id}/evidence/{evidence_id}")
}

// ---------------------------------------------------------------------------
// Analysis and reporting
// ---------------------------------------------------------------------------

pub fn analyze(case_id: &str) -> String {
    format!("/cases/{case_id}/analyze")
}

pub fn analysis(case_id: &str, analysis_id: &str) -> String {
    format!("/cases/{case_id}/analysis/{analysis_id}")
}

pub fn network(case_id: &str) -> String {
    format!("/cases/{case_id}/network")
}

pub fn timeline(case_id: &str) -> String {
    format!("/cases/{case_id}/timeline")
}

pub fn entity_distribution(case_id: &str) -> String {
    format!("/cases/{case_id}/entity-distribution")
}

pub fn report(case_id: &str, report_type: &str) -> String {
    format!("/cases/{case_id}/reports/{report_type}")
}

pub fn dashboard_stats() -> String {
    "/dashboard/stats".to_string()
}

pub fn system_status() -> String {
    "/system/status".to_string()
}

pub fn processing_queue() -> String {
    "/system/queue".to_string()
}

pub fn configuration() -> String {
    "/config".to_string()
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Searchable collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    Entities,
    Evidence,
}

impl SearchTarget {
    fn segment(&self) -> &'static str {
        match self {
            SearchTarget::Entities => "entities",
            SearchTarget::Evidence => "evidence",
        }
    }
}

/// `/search/{target}?query=<term>&<filters>`.
pub fn search(target: SearchTarget, term: &str, filters: &[(&str, Option<&str>)]) -> String {
    let mut params = Vec::with_capacity(filters.len() + 1);
    params.push(("query", Some(term)));
    params.extend_from_slice(filters);
    with_query(&format!("/search/{}", target.segment()), &params)
}

// ---------------------------------------------------------------------------
// Graph schema
// ---------------------------------------------------------------------------

pub fn graph_schema() -> String {
    format!("{GRAPH_PREFIX}/schema")
}

pub fn graph_query() -> String {
    format!("{GRAPH_PREFIX}/query")
}

pub fn graph_nodes(node_type: Option<&str>, org_level: Option<&str>) -> String {
    with_query(
        &format!("{GRAPH_PREFIX}/nodes"),
        &[("type", node_type), ("orgLevel", org_level)],
    )
}

pub fn graph_node(node_id: &str) -> String {
    format!("{GRAPH_PREFIX}/nodes/{node_id}")
}

pub fn graph_edges(edge_type: Option<&str>, org_level: Option<&str>) -> String {
    with_query(
        &format!("{GRAPH_PREFIX}/edges"),
        &[("type", edge_type), ("orgLevel", org_level)],
    )
}

pub fn graph_edge(edge_id: &str) -> String {
    format!("{GRAPH_PREFIX}/edges/{edge_id}")
}

pub fn graph_export(org_level: Option<&str>) -> String {
    with_query(&format!("{GRAPH_PREFIX}/export"), &[("orgLevel", org_level)])
}

// ---------------------------------------------------------------------------
// Organisation and repository registration
// ---------------------------------------------------------------------------

pub fn repo_init() -> String {
    format!("{GRAPH_PREFIX}/github/repo/init")
}

pub fn repo_project() -> String {
    format!("{GRAPH_PREFIX}/github/repo/project")
}

pub fn repo_load() -> String {
    format!("{GRAPH_PREFIX}/github/repo/load")
}

pub fn repo_compress() -> String {
    format!("{GRAPH_PREFIX}/github/repo/compress")
}

pub fn org_register() -> String {
    format!("{GRAPH_PREFIX}/github/org/register")
}

pub fn org_repos(org_name: &str) -> String {
    format!("{GRAPH_PREFIX}/github/org/{org_name}/repos")
}

pub fn org_aggregate(org_name: &str) -> String {
    format!("{GRAPH_PREFIX}/github/org/{org_name}/aggregate")
}

pub fn org_stats(org_name: &str) -> String {
    format!("{GRAPH_PREFIX}/github/org/{org_name}/stats")
}

// ---------------------------------------------------------------------------
// HGNNQL
// ---------------------------------------------------------------------------

pub fn hgnnql_query() -> String {
    format!("{GRAPH_PREFIX}/hgnnql/query")
}

pub fn atomspace_atoms(case_id: &str) -> String {
    format!("{GRAPH_PREFIX}/hgnnql/atomspace/{case_id}/atoms")
}

pub fn hgnnql_convert() -> String {
    format!("{GRAPH_PREFIX}/hgnnql/convert/hypergnn")
}

/// Append the present parameters of `params` to `path` as a query string.
/// Returns `path` unchanged when every value is `None`.
///
/// `params` is read as a map: a repeated key keeps its first position but
/// takes its last value, so a trailing `None` removes it.
///
/// Spaces are written as `%20` rather than `+`. A literal `+` is already
/// escaped to `%2B` by the serializer, so the substitution is lossless.
pub fn with_query(path: &str, params: &[(&str, Option<&str>)]) -> String {
    let mut merged: Vec<(&str, Option<&str>)> = Vec::with_capacity(params.len());
    for &(key, value) in params {
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => merged.push((key, value)),
        }
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in merged {
        if let Some(value) = value {
            serializer.append_pair(key, value);
            any = true;
        }
    }
    if any {
        format!("{path}?{}", serializer.finish().replace('+', "%20"))
    } else {
        path.to_string()
    }
}
