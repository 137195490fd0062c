//! Client for the Miniflux feed-reader REST API.
//!
//! # Overview
//! `MinifluxClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network (host-does-IO pattern). `Miniflux`
//! wraps it with a reqwest executor and exposes one async method per
//! endpoint. With the `blocking` feature, `executor::blocking` runs the same
//! requests through ureq.
//!
//! # Design
//! - Clients are immutable after construction: a validated base URL and a
//!   single `Auth` (token, basic, or none).
//! - Every request carries `content-type: application/json` and at most one
//!   auth header. Bodies are always produced by serde.
//! - Responses: 204 is empty, other 2xx carry JSON or text depending on the
//!   content type, anything else becomes `ApiError::Api` with the server's
//!   `error_message`.
//! - No retries, no timeouts, no caching.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod miniflux;
pub mod types;

pub use auth::{Auth, Credentials};
pub use client::{read_payload, MinifluxClient, Payload};
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use miniflux::Miniflux;
pub use types::{
    Category, CreatedFeed, Entry, EntryDirection, EntryList, EntryOrder, EntryStatus, ErrorBody,
    Feed, FeedLink, Filter, Icon, IconReference, User, UserRef, UserSettings,
};
