//! Stateless HTTP request builder and response parser for the Miniflux API.
//!
//! # Design
//! `MinifluxClient` holds only the validated server URL and the active
//! `Auth`, and carries no mutable state between calls. Each endpoint has a
//! `build_*` method producing an `HttpRequest`; responses go through one of
//! three parsers (`parse_json`, `parse_empty`, `parse_text`) which share the
//! status and content-type rules in `read_payload`. The caller, or the async
//! `Miniflux` wrapper, executes the round-trip in between.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;
use url::Url;

use crate::auth::Auth;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    CategoryId, CategoryRequest, CreateFeedRequest, CreateUserRequest, DiscoverRequest,
    EntryStatus, ErrorBody, Filter, UpdateEntriesRequest, UpdateFeedRequest, UserRef,
    UserSettings,
};

pub const CONTENT_TYPE_HEADER: &str = "content-type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Successful response body, classified by status and content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// 2xx with a JSON content type.
    Json(String),
    /// 2xx with any other content type (the OPML export is XML).
    Text(String),
    /// 204 No Content.
    Empty,
}

/// Classify a response: 204 is empty, other 2xx carry a body, everything
/// else is an error built from the `error_message` payload.
pub fn read_payload(response: HttpResponse) -> Result<Payload, ApiError> {
    match response.status {
        204 => Ok(Payload::Empty),
        200..=299 if response.is_json() => Ok(Payload::Json(response.body)),
        200..=299 => Ok(Payload::Text(response.body)),
        status => {
            warn!(status, "miniflux request failed");
            Err(match serde_json::from_str::<ErrorBody>(&response.body) {
                Ok(body) => ApiError::Api { status, body },
                Err(_) => ApiError::HttpError {
                    status,
                    body: response.body,
                },
            })
        }
    }
}

/// Synchronous, stateless client for the Miniflux API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct MinifluxClient {
    base_url: Url,
    auth: Auth,
}

impl MinifluxClient {
    /// Fails with `InvalidUrl` unless `server_url` is absolute with a host.
    ///
    /// Empty path segments and any fragment are dropped, so
    /// `https://h.example/base//#top` and `https://h.example/base` are the
    /// same base.
    pub fn new(server_url: &str, auth: impl Into<Auth>) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(server_url.trim())?;
        if base_url.cannot_be_a_base() || base_url.host_str().is_none() {
            return Err(ApiError::InvalidUrl(format!("{server_url} has no host")));
        }
        let path = base_url
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        base_url.set_path(&path);
        base_url.set_fragment(None);
        Ok(Self {
            base_url,
            auth: auth.into(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(&config.server_url, config.credentials.clone())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    // -----------------------------------------------------------------------
    // Feeds
    // -----------------------------------------------------------------------

    pub fn build_discover(&self, url: &str) -> Result<HttpRequest, ApiError> {
        let body = DiscoverRequest {
            url: url.to_string(),
        };
        self.json_request(HttpMethod::Post, self.endpoint(&["v1", "discover"], None), &body)
    }

    pub fn build_feeds(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.endpoint(&["v1", "feeds"], None), None)
    }

    pub fn build_get_feed(&self, feed_id: i64) -> HttpRequest {
        let id = feed_id.to_string();
        self.request(HttpMethod::Get, self.endpoint(&["v1", "feeds", &id], None), None)
    }

    pub fn build_get_feed_icon(&self, feed_id: i64) -> HttpRequest {
        let id = feed_id.to_string();
        self.request(HttpMethod::Get, self.endpoint(&["v1", "feeds", &id, "icon"], None), None)
    }

    pub fn build_create_feed(&self, feed_url: &str, category_id: Option<i64>) -> Result<HttpRequest, ApiError> {
        let body = CreateFeedRequest {
            feed_url: feed_url.to_string(),
            category_id,
        };
        self.json_request(HttpMethod::Post, self.endpoint(&["v1", "feeds"], None), &body)
    }

    /// Rejects locally when neither a title nor a category is given.
    pub fn build_update_feed(
        &self,
        feed_id: i64,
        title: Option<&str>,
        category_id: Option<i64>,
    ) -> Result<HttpRequest, ApiError> {
        if title.is_none() && category_id.is_none() {
            return Err(ApiError::Validation("No title or category specified".to_string()));
        }
        let body = UpdateFeedRequest {
            title: title.map(str::to_string),
            category: category_id.map(|id| CategoryId { id }),
        };
        let id = feed_id.to_string();
        self.json_request(HttpMethod::Put, self.endpoint(&["v1", "feeds", &id], None), &body)
    }

    pub fn build_refresh_feed(&self, feed_id: i64) -> HttpRequest {
        let id = feed_id.to_string();
        self.request(HttpMethod::Put, self.endpoint(&["v1", "feeds", &id, "refresh"], None), None)
    }

    pub fn build_remove_feed(&self, feed_id: i64) -> HttpRequest {
        let id = feed_id.to_string();
        self.request(HttpMethod::Delete, self.endpoint(&["v1", "feeds", &id], None), None)
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    pub fn build_get_feed_entry(&self, feed_id: i64, entry_id: i64) -> HttpRequest {
        let (feed, entry) = (feed_id.to_string(), entry_id.to_string());
        let url = self.endpoint(&["v1", "feeds", &feed, "entries", &entry], None);
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_get_entry(&self, entry_id: i64) -> HttpRequest {
        let id = entry_id.to_string();
        self.request(HttpMethod::Get, self.endpoint(&["v1", "entries", &id], None), None)
    }

    pub fn build_get_feed_entries(&self, feed_id: i64, filter: Option<&Filter>) -> HttpRequest {
        let id = feed_id.to_string();
        let url = self.endpoint(&["v1", "feeds", &id, "entries"], filter);
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_get_entries(&self, filter: Option<&Filter>) -> HttpRequest {
        self.request(HttpMethod::Get, self.endpoint(&["v1", "entries"], filter), None)
    }

    pub fn build_update_entries(&self, entry_ids: &[i64], status: EntryStatus) -> Result<HttpRequest, ApiError> {
        let body = UpdateEntriesRequest {
            entry_ids: entry_ids.to_vec(),
            status,
        };
        self.json_request(HttpMethod::Put, self.endpoint(&["v1", "entries"], None), &body)
    }

    pub fn build_toggle_bookmark(&self, entry_id: i64) -> HttpRequest {
        let id = entry_id.to_string();
        let url = self.endpoint(&["v1", "entries", &id, "bookmark"], None);
        self.request(HttpMethod::Put, url, None)
    }

    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    pub fn build_categories(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.endpoint(&["v1", "categories"], None), None)
    }

    pub fn build_create_category(&self, title: &str) -> Result<HttpRequest, ApiError> {
        let body = CategoryRequest {
            title: title.to_string(),
        };
        self.json_request(HttpMethod::Post, self.endpoint(&["v1", "categories"], None), &body)
    }

    pub fn build_update_category(&self, category_id: i64, title: &str) -> Result<HttpRequest, ApiError> {
        let body = CategoryRequest {
            title: title.to_string(),
        };
        let id = category_id.to_string();
        self.json_request(HttpMethod::Put, self.endpoint(&["v1", "categories", &id], None), &body)
    }

    pub fn build_delete_category(&self, category_id: i64) -> HttpRequest {
        let id = category_id.to_string();
        self.request(HttpMethod::Delete, self.endpoint(&["v1", "categories", &id], None), None)
    }

    /// OPML export; the server answers with XML text, not JSON.
    pub fn build_opml_export(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.endpoint(&["v1", "export"], None), None)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub fn build_create_user(&self, username: &str, password: &str, is_admin: bool) -> Result<HttpRequest, ApiError> {
        let body = CreateUserRequest {
            username: username.to_string(),
            password: password.to_string(),
            is_admin,
        };
        self.json_request(HttpMethod::Post, self.endpoint(&["v1", "users"], None), &body)
    }

    pub fn build_update_user(&self, user_id: i64, settings: &UserSettings) -> Result<HttpRequest, ApiError> {
        let id = user_id.to_string();
        self.json_request(HttpMethod::Put, self.endpoint(&["v1", "users", &id], None), settings)
    }

    pub fn build_users(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.endpoint(&["v1", "users"], None), None)
    }

    /// Accepts a numeric id or a username.
    pub fn build_get_user(&self, user: impl Into<UserRef>) -> HttpRequest {
        let user = user.into().to_string();
        self.request(HttpMethod::Get, self.endpoint(&["v1", "users", &user], None), None)
    }

    pub fn build_delete_user(&self, user_id: i64) -> HttpRequest {
        let id = user_id.to_string();
        self.request(HttpMethod::Delete, self.endpoint(&["v1", "users", &id], None), None)
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    /// Decode a JSON success body into `T`.
    pub fn parse_json<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        match read_payload(response)? {
            Payload::Json(body) | Payload::Text(body) => {
                serde_json::from_str(&body).map_err(|e| ApiError::DeserializationError(e.to_string()))
            }
            Payload::Empty => Err(ApiError::DeserializationError(
                "expected a response body, got 204 No Content".to_string(),
            )),
        }
    }

    /// Accept any success response and discard its body.
    pub fn parse_empty(&self, response: HttpResponse) -> Result<(), ApiError> {
        read_payload(response).map(|_| ())
    }

    /// Return a success body as raw text.
    pub fn parse_text(&self, response: HttpResponse) -> Result<String, ApiError> {
        match read_payload(response)? {
            Payload::Json(body) | Payload::Text(body) => Ok(body),
            Payload::Empty => Ok(String::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Append path segments (percent-encoded) and the filter query to the
    /// base URL. A base path such as `/miniflux` is kept.
    fn endpoint(&self, segments: &[&str], filter: Option<&Filter>) -> String {
        let mut url = self.base_url.clone();
        // Always Ok: `new` rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        let query = filter.map(Filter::to_query_string).unwrap_or_default();
        url.set_query(if query.is_empty() { None } else { Some(query.as_str()) });
        url.into()
    }

    fn request(&self, method: HttpMethod, url: String, body: Option<String>) -> HttpRequest {
        let mut headers = vec![(CONTENT_TYPE_HEADER.to_string(), JSON_CONTENT_TYPE.to_string())];
        headers.extend(self.auth.header());
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    fn json_request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        url: String,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(self.request(method, url, Some(body)))
    }
}
