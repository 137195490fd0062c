//! In-memory Miniflux server used by the client's integration tests.
//!
//! Implements the `/v1` endpoints the client speaks with the status codes a
//! real Miniflux instance returns: 201 for creations, 204 for empty
//! successes, and `{"error_message": ...}` bodies for failures. Every route
//! requires either the configured API token or a user's Basic credentials.
//!
//! Everything belongs to the seeded admin user (id 1). The store starts with
//! that user and an `All` category. Creating a feed also creates its icon and
//! one unread entry so the entry endpoints have something to return.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use opml::{Head, Outline, OPML};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const ADMIN_ID: i64 = 1;
const TIMESTAMP: &str = "2024-10-21T07:28:00Z";
const ICON_DATA: &str = "image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error_message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IconReference {
    pub feed_id: i64,
    pub icon_id: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub site_url: String,
    pub feed_url: String,
    pub rewrite_rules: String,
    pub scraper_rules: String,
    pub crawler: bool,
    pub checked_at: String,
    pub etag_header: String,
    pub last_modified_header: String,
    pub parsing_error_count: i64,
    pub parsing_error_message: String,
    pub category: Category,
    pub icon: Option<IconReference>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Icon {
    pub id: i64,
    pub data: String,
    pub mime_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub comments_url: String,
    pub author: String,
    pub content: String,
    pub hash: String,
    pub published_at: String,
    pub status: String,
    pub starred: bool,
    pub feed: Feed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntryList {
    pub total: i64,
    pub entries: Vec<Entry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub language: String,
    pub timezone: String,
    pub theme: String,
    pub entry_sorting_direction: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedLink {
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Deserialize)]
pub struct DiscoverRequest {
    pub url: String,
}

#[derive(Deserialize)]
pub struct CreateFeed {
    pub feed_url: String,
    pub category_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CategoryRef {
    pub id: i64,
}

#[derive(Deserialize)]
pub struct UpdateFeed {
    pub title: Option<String>,
    pub category: Option<CategoryRef>,
}

#[derive(Deserialize)]
pub struct UpdateEntries {
    pub entry_ids: Vec<i64>,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CategoryTitle {
    pub title: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
    pub theme: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
}

/// Entry listing query. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct EntryQuery {
    pub status: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub direction: Option<String>,
    pub order: Option<String>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Credentials the server accepts besides stored user logins.
#[derive(Clone, Debug)]
pub struct MockConfig {
    pub token: String,
    pub username: String,
    pub password: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            token: "test-token".to_string(),
            username: "admin".to_string(),
            password: "password".to_string(),
        }
    }
}

impl MockConfig {
    /// Defaults overridden by `MINIFLUX_API_KEY`, `MINIFLUX_USERNAME` and
    /// `MINIFLUX_PASSWORD` when set.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, fallback: String| std::env::var(key).unwrap_or(fallback);
        Self {
            token: var("MINIFLUX_API_KEY", defaults.token),
            username: var("MINIFLUX_USERNAME", defaults.username),
            password: var("MINIFLUX_PASSWORD", defaults.password),
        }
    }
}

struct StoredEntry {
    id: i64,
    feed_id: i64,
    title: String,
    url: String,
    content: String,
    status: String,
    starred: bool,
}

struct StoredUser {
    user: User,
    password: String,
}

pub struct Store {
    users: BTreeMap<i64, StoredUser>,
    categories: BTreeMap<i64, Category>,
    feeds: BTreeMap<i64, Feed>,
    icons: BTreeMap<i64, Icon>,
    entries: BTreeMap<i64, StoredEntry>,
    next_id: i64,
}

impl Store {
    fn seeded(config: &MockConfig) -> Self {
        let mut users = BTreeMap::new();
        users.insert(
            ADMIN_ID,
            StoredUser {
                user: new_user(ADMIN_ID, &config.username, true),
                password: config.password.clone(),
            },
        );
        let mut categories = BTreeMap::new();
        categories.insert(
            1,
            Category {
                id: 1,
                user_id: ADMIN_ID,
                title: "All".to_string(),
            },
        );
        Self {
            users,
            categories,
            feeds: BTreeMap::new(),
            icons: BTreeMap::new(),
            entries: BTreeMap::new(),
            next_id: 2,
        }
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn render_entry(&self, entry: &StoredEntry) -> Option<Entry> {
        let feed = self.feeds.get(&entry.feed_id)?;
        Some(Entry {
            id: entry.id,
            user_id: ADMIN_ID,
            feed_id: entry.feed_id,
            title: entry.title.clone(),
            url: entry.url.clone(),
            comments_url: String::new(),
            author: "mock".to_string(),
            content: entry.content.clone(),
            hash: format!("{:016x}", entry.id),
            published_at: TIMESTAMP.to_string(),
            status: entry.status.clone(),
            starred: entry.starred,
            feed: feed.clone(),
        })
    }

    fn remove_feed(&mut self, feed_id: i64) -> bool {
        let Some(feed) = self.feeds.remove(&feed_id) else {
            return false;
        };
        if let Some(icon) = feed.icon {
            self.icons.remove(&icon.icon_id);
        }
        self.entries.retain(|_, entry| entry.feed_id != feed_id);
        true
    }
}

fn new_user(id: i64, username: &str, is_admin: bool) -> User {
    User {
        id,
        username: username.to_string(),
        is_admin,
        language: "en_US".to_string(),
        timezone: "UTC".to_string(),
        theme: "light_serif".to_string(),
        entry_sorting_direction: "asc".to_string(),
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    config: Arc<MockConfig>,
}

type ApiError = (StatusCode, Json<ErrorBody>);
type ApiResult<T> = Result<T, ApiError>;

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error_message: message.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::seeded(&config))),
        config: Arc::new(config),
    };
    Router::new()
        .route("/v1/discover", post(discover))
        .route("/v1/feeds", get(list_feeds).post(create_feed))
        .route("/v1/feeds/{id}", get(get_feed).put(update_feed).delete(remove_feed))
        .route("/v1/feeds/{id}/icon", get(get_feed_icon))
        .route("/v1/feeds/{id}/refresh", put(refresh_feed))
        .route("/v1/feeds/{id}/entries", get(list_feed_entries))
        .route("/v1/feeds/{id}/entries/{entry_id}", get(get_feed_entry))
        .route("/v1/entries", get(list_entries).put(update_entries))
        .route("/v1/entries/{id}", get(get_entry))
        .route("/v1/entries/{id}/bookmark", put(toggle_bookmark))
        .route("/v1/categories", get(list_categories).post(create_category))
        .route("/v1/categories/{id}", put(update_category).delete(delete_category))
        .route("/v1/export", get(export_opml))
        .route("/v1/users", get(list_users).post(create_user))
        .route("/v1/users/{user}", get(get_user).put(update_user).delete(delete_user))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if is_authorized(&state, request.headers()).await {
        next.run(request).await
    } else {
        debug!(uri = %request.uri(), "rejecting unauthenticated request");
        api_error(StatusCode::UNAUTHORIZED, "Access Unauthorized").into_response()
    }
}

async fn is_authorized(state: &AppState, headers: &HeaderMap) -> bool {
    if let Some(token) = headers.get("x-auth-token").and_then(|v| v.to_str().ok()) {
        return token == state.config.token;
    }
    let Some((username, password)) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .and_then(|pair| pair.split_once(':').map(|(u, p)| (u.to_string(), p.to_string())))
    else {
        return false;
    };
    let db = state.db.read().await;
    db.users
        .values()
        .any(|stored| stored.user.username == username && stored.password == password)
}

// ---------------------------------------------------------------------------
// Feeds
// ---------------------------------------------------------------------------

async fn discover(Json(input): Json<DiscoverRequest>) -> ApiResult<Json<Vec<FeedLink>>> {
    if !(input.url.starts_with("http://") || input.url.starts_with("https://")) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid URL"));
    }
    Ok(Json(vec![FeedLink {
        url: format!("{}/feed.xml", input.url.trim_end_matches('/')),
        title: "Discovered feed".to_string(),
        kind: "rss".to_string(),
    }]))
}

async fn list_feeds(State(state): State<AppState>) -> Json<Vec<Feed>> {
    let db = state.db.read().await;
    Json(db.feeds.values().cloned().collect())
}

async fn get_feed(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Feed>> {
    let db = state.db.read().await;
    db.feeds
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Feed not found"))
}

async fn get_feed_icon(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Icon>> {
    let db = state.db.read().await;
    let feed = db
        .feeds
        .get(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Feed not found"))?;
    feed.icon
        .as_ref()
        .and_then(|icon| db.icons.get(&icon.icon_id))
        .cloned()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "This feed doesn't have any icon"))
}

async fn create_feed(
    State(state): State<AppState>,
    Json(input): Json<CreateFeed>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    if input.feed_url.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "The feed URL is required"));
    }
    let mut db = state.db.write().await;
    if db.feeds.values().any(|feed| feed.feed_url == input.feed_url) {
        return Err(api_error(StatusCode::BAD_REQUEST, "This feed already exists"));
    }
    let category = match input.category_id {
        Some(id) => db.categories.get(&id).cloned(),
        None => db.categories.values().next().cloned(),
    }
    .ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            "This category does not exist or does not belong to this user",
        )
    })?;

    let feed_id = db.next_id();
    let icon_id = db.next_id();
    let entry_id = db.next_id();
    let site_url = input
        .feed_url
        .rsplit_once('/')
        .map(|(site, _)| site.to_string())
        .unwrap_or_else(|| input.feed_url.clone());

    db.icons.insert(
        icon_id,
        Icon {
            id: icon_id,
            data: ICON_DATA.to_string(),
            mime_type: "image/png".to_string(),
        },
    );
    db.feeds.insert(
        feed_id,
        Feed {
            id: feed_id,
            user_id: ADMIN_ID,
            title: input.feed_url.clone(),
            site_url: site_url.clone(),
            feed_url: input.feed_url,
            rewrite_rules: String::new(),
            scraper_rules: String::new(),
            crawler: false,
            checked_at: TIMESTAMP.to_string(),
            etag_header: String::new(),
            last_modified_header: String::new(),
            parsing_error_count: 0,
            parsing_error_message: String::new(),
            category,
            icon: Some(IconReference { feed_id, icon_id }),
        },
    );
    db.entries.insert(
        entry_id,
        StoredEntry {
            id: entry_id,
            feed_id,
            title: "Welcome".to_string(),
            url: format!("{site_url}/welcome"),
            content: "<p>First entry</p>".to_string(),
            status: "unread".to_string(),
            starred: false,
        },
    );
    info!(feed_id, "feed created");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "feed_id": feed_id }))))
}

async fn update_feed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateFeed>,
) -> ApiResult<(StatusCode, Json<Feed>)> {
    let mut db = state.db.write().await;
    if !db.feeds.contains_key(&id) {
        return Err(api_error(StatusCode::NOT_FOUND, "Feed not found"));
    }
    let category = match input.category {
        Some(CategoryRef { id: category_id }) => Some(
            db.categories
                .get(&category_id)
                .cloned()
                .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "This category does not exist"))?,
        ),
        None => None,
    };
    let feed = db
        .feeds
        .get_mut(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Feed not found"))?;
    if let Some(title) = input.title {
        feed.title = title;
    }
    if let Some(category) = category {
        feed.category = category;
    }
    Ok((StatusCode::CREATED, Json(feed.clone())))
}

async fn refresh_feed(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let db = state.db.read().await;
    if db.feeds.contains_key(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "Feed not found"))
    }
}

async fn remove_feed(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let mut db = state.db.write().await;
    if db.remove_feed(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "Feed not found"))
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

fn list_matching(db: &Store, feed_id: Option<i64>, query: &EntryQuery) -> EntryList {
    let mut matching: Vec<Entry> = db
        .entries
        .values()
        .filter(|entry| feed_id.map_or(true, |id| entry.feed_id == id))
        .filter(|entry| query.status.as_deref().map_or(true, |status| entry.status == status))
        .filter_map(|entry| db.render_entry(entry))
        .collect();
    if query.order.as_deref() == Some("status") {
        matching.sort_by(|a, b| a.status.cmp(&b.status).then(a.id.cmp(&b.id)));
    }
    if query.direction.as_deref() == Some("desc") {
        matching.reverse();
    }
    let total = matching.len() as i64;
    let entries = matching
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();
    EntryList { total, entries }
}

async fn list_entries(State(state): State<AppState>, Query(query): Query<EntryQuery>) -> Json<EntryList> {
    let db = state.db.read().await;
    Json(list_matching(&db, None, &query))
}

async fn list_feed_entries(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<EntryQuery>,
) -> ApiResult<Json<EntryList>> {
    let db = state.db.read().await;
    if !db.feeds.contains_key(&id) {
        return Err(api_error(StatusCode::NOT_FOUND, "Feed not found"));
    }
    Ok(Json(list_matching(&db, Some(id), &query)))
}

async fn get_entry(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Entry>> {
    let db = state.db.read().await;
    db.entries
        .get(&id)
        .and_then(|entry| db.render_entry(entry))
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Entry not found"))
}

async fn get_feed_entry(
    State(state): State<AppState>,
    Path((feed_id, entry_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Entry>> {
    let db = state.db.read().await;
    db.entries
        .get(&entry_id)
        .filter(|entry| entry.feed_id == feed_id)
        .and_then(|entry| db.render_entry(entry))
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Entry not found"))
}

async fn update_entries(
    State(state): State<AppState>,
    Json(input): Json<UpdateEntries>,
) -> ApiResult<StatusCode> {
    if input.entry_ids.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "The list of entry IDs is empty"));
    }
    if !matches!(input.status.as_str(), "read" | "unread" | "removed") {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid entry status"));
    }
    let mut db = state.db.write().await;
    for id in &input.entry_ids {
        if let Some(entry) = db.entries.get_mut(id) {
            entry.status = input.status.clone();
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_bookmark(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let mut db = state.db.write().await;
    let entry = db
        .entries
        .get_mut(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Entry not found"))?;
    entry.starred = !entry.starred;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    let db = state.db.read().await;
    Json(db.categories.values().cloned().collect())
}

async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryTitle>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    if input.title.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "The title is mandatory"));
    }
    let mut db = state.db.write().await;
    if db.categories.values().any(|c| c.title == input.title) {
        return Err(api_error(StatusCode::BAD_REQUEST, "This category already exists"));
    }
    let category = Category {
        id: db.next_id(),
        user_id: ADMIN_ID,
        title: input.title,
    };
    db.categories.insert(category.id, category.clone());
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CategoryTitle>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    if input.title.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "The title is mandatory"));
    }
    let mut db = state.db.write().await;
    let category = db
        .categories
        .get_mut(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Category not found"))?;
    category.title = input.title;
    let category = category.clone();
    for feed in db.feeds.values_mut().filter(|feed| feed.category.id == id) {
        feed.category = category.clone();
    }
    Ok((StatusCode::CREATED, Json(category)))
}

async fn delete_category(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let mut db = state.db.write().await;
    if db.categories.remove(&id).is_none() {
        return Err(api_error(StatusCode::NOT_FOUND, "Category not found"));
    }
    let orphaned: Vec<i64> = db
        .feeds
        .values()
        .filter(|feed| feed.category.id == id)
        .map(|feed| feed.id)
        .collect();
    for feed_id in orphaned {
        db.remove_feed(feed_id);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn export_opml(State(state): State<AppState>) -> ApiResult<Response> {
    let db = state.db.read().await;
    let mut document = OPML {
        version: "2.0".to_string(),
        head: Some(Head {
            title: Some("Miniflux".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    for category in db.categories.values() {
        let outlines: Vec<Outline> = db
            .feeds
            .values()
            .filter(|feed| feed.category.id == category.id)
            .map(|feed| Outline {
                text: feed.title.clone(),
                title: Some(feed.title.clone()),
                xml_url: Some(feed.feed_url.clone()),
                html_url: Some(feed.site_url.clone()),
                ..Default::default()
            })
            .collect();
        if outlines.is_empty() {
            continue;
        }
        document.body.outlines.push(Outline {
            text: category.title.clone(),
            title: Some(category.title.clone()),
            outlines,
            ..Default::default()
        });
    }
    let xml = document
        .to_string()
        .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "Unable to export feeds"))?;
    let body = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{xml}");
    Ok(([(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response())
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    let db = state.db.read().await;
    Json(db.users.values().map(|stored| stored.user.clone()).collect())
}

async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if input.username.is_empty() || input.password.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "The username and password are mandatory"));
    }
    let mut db = state.db.write().await;
    if db.users.values().any(|stored| stored.user.username == input.username) {
        return Err(api_error(StatusCode::BAD_REQUEST, "The user already exists"));
    }
    let id = db.next_id();
    let user = new_user(id, &input.username, input.is_admin);
    db.users.insert(
        id,
        StoredUser {
            user: user.clone(),
            password: input.password,
        },
    );
    Ok((StatusCode::CREATED, Json(user)))
}

fn parse_user_id(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid user ID"))
}

async fn update_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(input): Json<UpdateUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let id = parse_user_id(&user)?;
    let mut db = state.db.write().await;
    if let Some(username) = &input.username {
        if db
            .users
            .values()
            .any(|stored| stored.user.id != id && &stored.user.username == username)
        {
            return Err(api_error(StatusCode::BAD_REQUEST, "This user already exists"));
        }
    }
    let stored = db
        .users
        .get_mut(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "User not found"))?;
    if let Some(username) = input.username {
        stored.user.username = username;
    }
    if let Some(password) = input.password {
        stored.password = password;
    }
    if let Some(is_admin) = input.is_admin {
        stored.user.is_admin = is_admin;
    }
    if let Some(theme) = input.theme {
        stored.user.theme = theme;
    }
    if let Some(language) = input.language {
        stored.user.language = language;
    }
    if let Some(timezone) = input.timezone {
        stored.user.timezone = timezone;
    }
    Ok((StatusCode::CREATED, Json(stored.user.clone())))
}

/// Accepts a numeric id or a username.
async fn get_user(State(state): State<AppState>, Path(user): Path<String>) -> ApiResult<Json<User>> {
    let db = state.db.read().await;
    let found = match user.parse::<i64>() {
        Ok(id) => db.users.get(&id),
        Err(_) => db.users.values().find(|stored| stored.user.username == user),
    };
    found
        .map(|stored| Json(stored.user.clone()))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "User not found"))
}

async fn delete_user(State(state): State<AppState>, Path(user): Path<String>) -> ApiResult<StatusCode> {
    let id = parse_user_id(&user)?;
    if id == ADMIN_ID {
        return Err(api_error(StatusCode::BAD_REQUEST, "You cannot remove yourself"));
    }
    let mut db = state.db.write().await;
    db.users
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "User not found"))
}
