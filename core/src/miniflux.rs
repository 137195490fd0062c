//! Async Miniflux client: one method per endpoint.
//!
//! Each method builds the request with `MinifluxClient`, sends it through
//! the reqwest executor and parses the reply. Calls are independent; the
//! client can be cloned and shared across tasks.

use crate::auth::Auth;
use crate::client::MinifluxClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::executor::execute;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{
    Category, CreatedFeed, Entry, EntryList, EntryStatus, Feed, FeedLink, Filter, Icon, User,
    UserRef, UserSettings,
};

#[derive(Debug, Clone)]
pub struct Miniflux {
    client: MinifluxClient,
    http: reqwest::Client,
}

impl Miniflux {
    pub fn new(server_url: &str, auth: impl Into<Auth>) -> Result<Self, ApiError> {
        Ok(Self::with_http_client(MinifluxClient::new(server_url, auth)?, reqwest::Client::new()))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_http_client(MinifluxClient::from_config(config)?, reqwest::Client::new()))
    }

    /// Use a preconfigured reqwest client (proxy, TLS roots, user agent).
    pub fn with_http_client(client: MinifluxClient, http: reqwest::Client) -> Self {
        Self { client, http }
    }

    pub fn client(&self) -> &MinifluxClient {
        &self.client
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        execute(&self.http, request).await
    }

    /// POST /v1/discover
    pub async fn discover(&self, url: &str) -> Result<Vec<FeedLink>, ApiError> {
        let request = self.client.build_discover(url)?;
        self.client.parse_json(self.send(request).await?)
    }

    /// GET /v1/feeds
    pub async fn feeds(&self) -> Result<Vec<Feed>, ApiError> {
        let response = self.send(self.client.build_feeds()).await?;
        self.client.parse_json(response)
    }

    /// GET /v1/feeds/:feed_id
    pub async fn get_feed(&self, feed_id: i64) -> Result<Feed, ApiError> {
        let response = self.send(self.client.build_get_feed(feed_id)).await?;
        self.client.parse_json(response)
    }

    /// GET /v1/feeds/:feed_id/icon
    pub async fn get_feed_icon(&self, feed_id: i64) -> Result<Icon, ApiError> {
        let response = self.send(self.client.build_get_feed_icon(feed_id)).await?;
        self.client.parse_json(response)
    }

    /// POST /v1/feeds
    pub async fn create_feed(&self, feed_url: &str, category_id: Option<i64>) -> Result<CreatedFeed, ApiError> {
        let request = self.client.build_create_feed(feed_url, category_id)?;
        self.client.parse_json(self.send(request).await?)
    }

    /// PUT /v1/feeds/:feed_id
    ///
    /// Fails with `ApiError::Validation`, without sending anything, when both
    /// `title` and `category_id` are `None`.
    pub async fn update_feed(
        &self,
        feed_id: i64,
        title: Option<&str>,
        category_id: Option<i64>,
    ) -> Result<Feed, ApiError> {
        let request = self.client.build_update_feed(feed_id, title, category_id)?;
        self.client.parse_json(self.send(request).await?)
    }

    /// PUT /v1/feeds/:feed_id/refresh
    pub async fn refresh_feed(&self, feed_id: i64) -> Result<(), ApiError> {
        let response = self.send(self.client.build_refresh_feed(feed_id)).await?;
        self.client.parse_empty(response)
    }

    /// DELETE /v1/feeds/:feed_id
    pub async fn remove_feed(&self, feed_id: i64) -> Result<(), ApiError> {
        let response = self.send(self.client.build_remove_feed(feed_id)).await?;
        self.client.parse_empty(response)
    }

    /// GET /v1/feeds/:feed_id/entries/:entry_id
    pub async fn get_feed_entry(&self, feed_id: i64, entry_id: i64) -> Result<Entry, ApiError> {
        let response = self.send(self.client.build_get_feed_entry(feed_id, entry_id)).await?;
        self.client.parse_json(response)
    }

    /// GET /v1/entries/:entry_id
    pub async fn get_entry(&self, entry_id: i64) -> Result<Entry, ApiError> {
        let response = self.send(self.client.build_get_entry(entry_id)).await?;
        self.client.parse_json(response)
    }

    /// GET /v1/feeds/:feed_id/entries
    pub async fn get_feed_entries(&self, feed_id: i64, filter: Option<&Filter>) -> Result<EntryList, ApiError> {
        let response = self.send(self.client.build_get_feed_entries(feed_id, filter)).await?;
        self.client.parse_json(response)
    }

    /// GET /v1/entries
    pub async fn get_entries(&self, filter: Option<&Filter>) -> Result<EntryList, ApiError> {
        let response = self.send(self.client.build_get_entries(filter)).await?;
        self.client.parse_json(response)
    }

    /// PUT /v1/entries
    pub async fn update_entries(&self, entry_ids: &[i64], status: EntryStatus) -> Result<(), ApiError> {
        let request = self.client.build_update_entries(entry_ids, status)?;
        self.client.parse_empty(self.send(request).await?)
    }

    /// PUT /v1/entries/:entry_id/bookmark
    pub async fn toggle_bookmark(&self, entry_id: i64) -> Result<(), ApiError> {
        let response = self.send(self.client.build_toggle_bookmark(entry_id)).await?;
        self.client.parse_empty(response)
    }

    /// GET /v1/categories
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let response = self.send(self.client.build_categories()).await?;
        self.client.parse_json(response)
    }

    /// POST /v1/categories
    pub async fn create_category(&self, title: &str) -> Result<Category, ApiError> {
        let request = self.client.build_create_category(title)?;
        self.client.parse_json(self.send(request).await?)
    }

    /// PUT /v1/categories/:category_id
    pub async fn update_category(&self, category_id: i64, title: &str) -> Result<Category, ApiError> {
        let request = self.client.build_update_category(category_id, title)?;
        self.client.parse_json(self.send(request).await?)
    }

    /// DELETE /v1/categories/:category_id
    pub async fn delete_category(&self, category_id: i64) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete_category(category_id)).await?;
        self.client.parse_empty(response)
    }

    /// GET /v1/export, returned as OPML text.
    pub async fn opml_export(&self) -> Result<String, ApiError> {
        let response = self.send(self.client.build_opml_export()).await?;
        self.client.parse_text(response)
    }

    /// POST /v1/users
    pub async fn create_user(&self, username: &str, password: &str, is_admin: bool) -> Result<User, ApiError> {
        let request = self.client.build_create_user(username, password, is_admin)?;
        self.client.parse_json(self.send(request).await?)
    }

    /// PUT /v1/users/:user_id
    pub async fn update_user(&self, user_id: i64, settings: &UserSettings) -> Result<User, ApiError> {
        let request = self.client.build_update_user(user_id, settings)?;
        self.client.parse_json(self.send(request).await?)
    }

    /// GET /v1/users
    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        let response = self.send(self.client.build_users()).await?;
        self.client.parse_json(response)
    }

    /// GET /v1/users/:user, by id or username.
    pub async fn get_user(&self, user: impl Into<UserRef>) -> Result<User, ApiError> {
        let response = self.send(self.client.build_get_user(user)).await?;
        self.client.parse_json(response)
    }

    /// DELETE /v1/users/:user_id
    pub async fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete_user(user_id)).await?;
        self.client.parse_empty(response)
    }
}
