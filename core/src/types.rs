//! Domain DTOs for the Miniflux API.
//!
//! # Design
//! Response records mirror the server's JSON. String fields the server may
//! leave out default to empty so older or trimmed-down servers still decode.
//! Request payloads are separate structs so every body goes through serde
//! rather than hand-assembled strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Read state of an entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Read,
    Unread,
    Removed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Read => "read",
            EntryStatus::Unread => "unread",
            EntryStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort key for entry listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrder {
    Id,
    Status,
    PublishedAt,
    CategoryTitle,
    CategoryId,
}

impl EntryOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryOrder::Id => "id",
            EntryOrder::Status => "status",
            EntryOrder::PublishedAt => "published_at",
            EntryOrder::CategoryTitle => "category_title",
            EntryOrder::CategoryId => "category_id",
        }
    }
}

impl fmt::Display for EntryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for entry listings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntryDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl EntryDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryDirection::Ascending => "asc",
            EntryDirection::Descending => "desc",
        }
    }
}

impl fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters for entry listings. Unset fields are omitted from the
/// query string entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<EntryOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<EntryDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: EntryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn order(mut self, order: EntryOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn direction(mut self, direction: EntryDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render as `key=value` pairs joined by `&`, in the order status,
    /// offset, limit, direction, order. Empty when no field is set.
    pub fn to_query_string(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(status) = self.status {
            query.append_pair("status", status.as_str());
        }
        if let Some(offset) = self.offset {
            query.append_pair("offset", &offset.to_string());
        }
        if let Some(limit) = self.limit {
            query.append_pair("limit", &limit.to_string());
        }
        if let Some(direction) = self.direction {
            query.append_pair("direction", direction.as_str());
        }
        if let Some(order) = self.order {
            query.append_pair("order", order.as_str());
        }
        query.finish()
    }
}

/// Server error payload carried by every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error_message: String,
}

/// A subscription candidate returned by `discover`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedLink {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedFeed {
    pub feed_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IconReference {
    pub feed_id: i64,
    pub icon_id: i64,
}

/// A subscribed RSS/Atom source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feed {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    #[serde(default)]
    pub site_url: String,
    pub feed_url: String,
    #[serde(default)]
    pub rewrite_rules: String,
    #[serde(default)]
    pub scraper_rules: String,
    #[serde(default)]
    pub crawler: bool,
    #[serde(default)]
    pub checked_at: String,
    #[serde(default)]
    pub etag_header: String,
    #[serde(default)]
    pub last_modified_header: String,
    #[serde(default)]
    pub parsing_error_count: i64,
    #[serde(default)]
    pub parsing_error_message: String,
    pub category: Category,
    /// `null` when the feed has no favicon.
    #[serde(default)]
    pub icon: Option<IconReference>,
}

/// Feed favicon; `data` is base64 and may carry a `mime;base64,` prefix
/// depending on the server version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Icon {
    pub id: i64,
    pub data: String,
    pub mime_type: String,
}

/// A single feed item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub comments_url: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub published_at: String,
    pub status: EntryStatus,
    #[serde(default)]
    pub starred: bool,
    pub feed: Feed,
}

/// One page of entries plus the total matching the filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryList {
    pub total: i64,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub entry_sorting_direction: EntryDirection,
}

/// Partial user update. Only fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Path segment for `get_user`, which accepts an id or a username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(i64),
    Username(String),
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Id(id) => write!(f, "{id}"),
            UserRef::Username(name) => f.write_str(name),
        }
    }
}

impl From<i64> for UserRef {
    fn from(id: i64) -> Self {
        UserRef::Id(id)
    }
}

impl From<&str> for UserRef {
    fn from(name: &str) -> Self {
        UserRef::Username(name.to_string())
    }
}

impl From<String> for UserRef {
    fn from(name: String) -> Self {
        UserRef::Username(name)
    }
}

// Request payloads.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoverRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateFeedRequest {
    pub feed_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryId {
    pub id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateFeedRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateEntriesRequest {
    pub entry_ids: Vec<i64>,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub is_admin: bool,
}
