//! The I/O half: executing an `HttpRequest` and returning an `HttpResponse`.
//!
//! `Transport` is the seam between the pure request/response layer and the
//! network. Implementations must return non-2xx responses as data, leaving
//! status interpretation to `CaseClient::parse_response`, and report only
//! transport-level failures as `TransportError`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            Some(RequestBody::Json(text)) => builder.body(text),
            Some(RequestBody::Multipart(file)) => {
                let mut part = Part::bytes(file.bytes).file_name(file.file_name);
                if let Some(mime) = file.mime_type {
                    part = part
                        .mime_str(&mime)
                        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                }
                builder.multipart(Form::new().part(file.field, part))
            }
            None => builder,
        };

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.text().await.map_err(classify)?;

        Ok(HttpResponse { status, headers, body })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    // Builder errors are raised by `send` before any connection is attempted.
    if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str, headers: &[(&str, &str)]) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body: None,
        }
    }

    #[tokio::test]
    async fn url_without_http_scheme_is_rejected_before_sending() {
        let transport = ReqwestTransport::new(Duration::from_secs(1)).unwrap();
        let err = transport.execute(get("localhost:8000/api/cases", &[])).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)), "{err:?}");
    }

    #[tokio::test]
    async fn illegal_header_name_is_rejected_before_sending() {
        let transport = ReqwestTransport::new(Duration::from_secs(1)).unwrap();
        let err = transport
            .execute(get("http://127.0.0.1:1/api/cases", &[("Bad Name", "v")]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)), "{err:?}");
    }
}
