//! Stateless HTTP request builder and response classifier for the
//! case-analysis API.
//!
//! # Design
//! `CaseClient` holds only the base URL and the default header set, and
//! carries no mutable state between calls. `build_request` turns an endpoint
//! and a `RequestOptions` into an `HttpRequest`; `parse_response` turns an
//! `HttpResponse` into a `Payload` or an `ApiError`. Executing the round-trip
//! is left to a `Transport`, keeping this half deterministic and free of I/O.

use reqwest::header::{HeaderName, HeaderValue};
use serde::Serialize;

use crate::config::DEFAULT_HEADERS;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartFile, RequestBody, CONTENT_TYPE};
use crate::types::Payload;

/// Per-call overrides for `CaseClient::build_request`.
///
/// Defaults: `GET`, no extra headers, no body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    /// Merged over the client's default headers; these win on conflict.
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `payload` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self, ApiError> {
        let text = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.body(RequestBody::Json(text)))
    }
}

/// Synchronous, stateless client for the case-analysis API.
#[derive(Debug, Clone)]
pub struct CaseClient {
    base_url: String,
    default_headers: Vec<(String, String)>,
}

impl CaseClient {
    /// `base_url` is used verbatim: no trailing-slash trimming and no
    /// collapsing of duplicate slashes when joined with an endpoint.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            default_headers: DEFAULT_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    /// Build the request for `endpoint` with `options` applied.
    ///
    /// The endpoint must be non-empty and start with `/`, and every caller
    /// header must be a legal HTTP name/value pair. A multipart body drops
    /// any `Content-Type` header, default or caller-supplied, so the
    /// transport can write its own boundary.
    pub fn build_request(&self, endpoint: &str, options: RequestOptions) -> Result<HttpRequest, ApiError> {
        validate_endpoint(endpoint)?;
        for (name, value) in &options.headers {
            validate_header(name, value)?;
        }

        let mut headers = merge_headers(&self.default_headers, &options.headers);
        if options.body.as_ref().is_some_and(RequestBody::is_multipart) {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(CONTENT_TYPE));
        }

        Ok(HttpRequest {
            method: options.method,
            url: format!("{}{}", self.base_url, endpoint),
            headers,
            body: options.body,
        })
    }

    pub fn build_get(&self, endpoint: &str) -> Result<HttpRequest, ApiError> {
        self.build_request(endpoint, RequestOptions::new(HttpMethod::Get))
    }

    pub fn build_post<T: Serialize + ?Sized>(&self, endpoint: &str, payload: &T) -> Result<HttpRequest, ApiError> {
        self.build_request(endpoint, RequestOptions::new(HttpMethod::Post).json(payload)?)
    }

    /// POST with no body at all, for endpoints that act on the path alone.
    pub fn build_post_empty(&self, endpoint: &str) -> Result<HttpRequest, ApiError> {
        self.build_request(endpoint, RequestOptions::new(HttpMethod::Post))
    }

    pub fn build_put<T: Serialize + ?Sized>(&self, endpoint: &str, payload: &T) -> Result<HttpRequest, ApiError> {
        self.build_request(endpoint, RequestOptions::new(HttpMethod::Put).json(payload)?)
    }

    pub fn build_delete(&self, endpoint: &str) -> Result<HttpRequest, ApiError> {
        self.build_request(endpoint, RequestOptions::new(HttpMethod::Delete))
    }

    /// POST `file` unmodified as a multipart body.
    pub fn build_upload(&self, endpoint: &str, file: MultipartFile) -> Result<HttpRequest, ApiError> {
        self.build_request(
            endpoint,
            RequestOptions::new(HttpMethod::Post).body(RequestBody::Multipart(file)),
        )
    }

    /// Classify a response.
    ///
    /// Non-2xx statuses become `ApiError::Http` without looking at the body.
    /// A JSON content type is decoded; anything else is returned as text.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Payload, ApiError> {
        if !response.is_success() {
            return Err(ApiError::Http {
                status: response.status,
                body: response.body,
            });
        }
        if response.is_json() {
            return serde_json::from_str(&response.body)
                .map(Payload::Json)
                .map_err(|e| ApiError::Decode(e.to_string()));
        }
        Ok(Payload::Text(response.body))
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ApiError> {
    if endpoint.starts_with('/') {
        Ok(())
    } else {
        Err(ApiError::InvalidEndpoint(endpoint.to_string()))
    }
}

fn validate_header(name: &str, value: &str) -> Result<(), ApiError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ApiError::InvalidRequest(format!("invalid header name {name:?}")))?;
    HeaderValue::from_str(value)
        .map_err(|_| ApiError::InvalidRequest(format!("invalid value for header {name:?}")))?;
    Ok(())
}

/// Overlay `overrides` on `defaults`, matching names case-insensitively.
///
/// A default whose name is overridden takes the override's name and value in
/// its original position; override-only names are appended in order.
pub fn merge_headers(defaults: &[(String, String)], overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = defaults.to_vec();
    for (name, value) in overrides {
        match merged.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(slot) => *slot = (name.clone(), value.clone()),
            None => merged.push((name.clone(), value.clone())),
        }
    }
    merged
}
