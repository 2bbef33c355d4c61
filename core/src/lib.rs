//! Client core for the case-analysis API.
//!
//! # Overview
//! Builds `HttpRequest` values and classifies `HttpResponse` values without
//! touching the network (host-does-IO pattern), then layers an async
//! `ApiService` on top that executes requests through a `Transport`.
//!
//! # Design
//! - `CaseClient` is stateless: base URL plus default headers.
//! - `ApiService::request` is the single primitive; verbs, resource
//!   families, search and batch calls are fixed-shape wrappers around it.
//! - Update subscriptions are background pollers owned by a `Subscription`
//!   handle and stopped by cancelling or dropping it.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod service;
pub mod subscription;
pub mod transport;
pub mod types;

pub use client::{merge_headers, CaseClient, RequestOptions};
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, MultipartFile, RequestBody};
pub use service::ApiService;
pub use subscription::{Subscription, SubscriptionState, MIN_POLL_INTERVAL};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Case, Entity, EntityUpdate, Evidence, GraphQuery, OrgLevel, Payload};
