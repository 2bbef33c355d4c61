//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The pure
//! half of the crate builds `HttpRequest` values and classifies
//! `HttpResponse` values without touching the network; a `Transport`
//! implementation performs the actual round-trip.
//!
//! All fields use owned types (`String`, `Vec`) so a request can be moved
//! into a spawned task or a test double without lifetime concerns.

use std::fmt;

/// Header name used for the declared body format.
pub const CONTENT_TYPE: &str = "content-type";

/// Media type that marks a structured payload.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file sent as a single-part `multipart/form-data` body.
///
/// The boundary is chosen by the transport, which is why requests carrying
/// this body never include a `content-type` header of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    /// Form field the file is attached under.
    pub field: String,
    pub file_name: String,
    /// MIME type of the file part, if known.
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl MultipartFile {
    pub fn new(field: &str, file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            field: field.to_string(),
            file_name: file_name.to_string(),
            mime_type: None,
            bytes,
        }
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Already-serialized JSON text.
    Json(String),
    /// Raw file upload, sent unmodified.
    Multipart(MultipartFile),
}

impl RequestBody {
    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart(_))
    }

    /// The JSON text, if this is a structured body.
    pub fn as_json(&self) -> Option<&str> {
        match self {
            RequestBody::Json(text) => Some(text),
            RequestBody::Multipart(_) => None,
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
///
/// Produced by a `Transport` after executing an `HttpRequest`, then passed
/// to `CaseClient::parse_response` for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when the declared content type names a JSON payload.
    pub fn is_json(&self) -> bool {
        self.header(CONTENT_TYPE)
            .is_some_and(|ct| ct.to_ascii_lowercase().contains(JSON_MEDIA_TYPE))
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(content_type: Option<&str>) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: content_type
                .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
                .unwrap_or_default(),
            body: String::new(),
        }
    }

    #[test]
    fn json_detection_ignores_parameters_and_case() {
        assert!(response(Some("application/json; charset=utf-8")).is_json());
        assert!(response(Some("Application/JSON")).is_json());
        assert!(!response(Some("text/plain")).is_json());
        assert!(!response(None).is_json());
    }

    #[test]
    fn success_range_is_2xx_only() {
        let mut r = response(None);
        for (status, ok) in [(199, false), (200, true), (204, true), (299, true), (301, false), (404, false)] {
            r.status = status;
            assert_eq!(r.is_success(), ok, "status {status}");
        }
    }

    #[test]
    fn method_renders_uppercase() {
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
    }
}
