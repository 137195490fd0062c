//! Wire-level checks with wiremock: exact verbs, paths, queries, headers and
//! bodies, plus response interpretation for each status class.

use miniflux_core::{ApiError, Auth, EntryStatus, Filter, Miniflux};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entry_list_json() -> serde_json::Value {
    json!({
        "total": 1,
        "entries": [{
            "id": 9, "user_id": 1, "feed_id": 4, "title": "Hello", "url": "http://example.com/hello",
            "comments_url": "", "author": "me", "content": "<p>hi</p>", "hash": "abc",
            "published_at": "2024-10-21T07:28:00Z", "status": "unread", "starred": false,
            "feed": {
                "id": 4, "user_id": 1, "title": "Example", "site_url": "http://example.com",
                "feed_url": "http://example.com/feed.xml", "rewrite_rules": "", "scraper_rules": "",
                "crawler": false, "checked_at": "2024-10-21T07:28:00Z", "etag_header": "",
                "last_modified_header": "", "parsing_error_count": 0, "parsing_error_message": "",
                "category": {"id": 1, "user_id": 1, "title": "All"},
                "icon": {"feed_id": 4, "icon_id": 2}
            }
        }]
    })
}

#[tokio::test]
async fn create_feed_sends_structured_body_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/feeds"))
        .and(header("content-type", "application/json"))
        .and(header("x-auth-token", "secret"))
        .and(body_json(json!({"feed_url": "http://example.com/feed.xml", "category_id": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feed_id": 12})))
        .expect(1)
        .mount(&server)
        .await;

    let client = Miniflux::new(&server.uri(), Auth::token("secret")).unwrap();
    let created = client
        .create_feed("http://example.com/feed.xml", Some(3))
        .await
        .unwrap();
    assert_eq!(created.feed_id, 12);
}

#[tokio::test]
async fn basic_auth_never_sends_token_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/categories"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = Miniflux::new(&server.uri(), Auth::basic("admin", "secret")).unwrap();
    assert!(client.categories().await.unwrap().is_empty());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("x-auth-token").is_none());
}

#[tokio::test]
async fn entry_filter_becomes_ordered_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/entries"))
        .and(query_param("status", "unread"))
        .and(query_param("limit", "10"))
        .and(query_param_is_missing("offset"))
        .and(query_param_is_missing("order"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entry_list_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = Miniflux::new(&server.uri(), Auth::token("secret")).unwrap();
    let filter = Filter::new().status(EntryStatus::Unread).limit(10);
    let list = client.get_entries(Some(&filter)).await.unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.entries[0].feed.category.title, "All");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].url.query(), Some("status=unread&limit=10"));
}

#[tokio::test]
async fn feed_entries_without_filter_have_no_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/feeds/4/entries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entry_list_json()))
        .mount(&server)
        .await;

    let client = Miniflux::new(&server.uri(), Auth::token("secret")).unwrap();
    client.get_feed_entries(4, None).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].url.query(), None);
}

#[tokio::test]
async fn no_content_resolves_to_unit() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/feeds/7/refresh"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = Miniflux::new(&server.uri(), Auth::token("secret")).unwrap();
    client.refresh_feed(7).await.unwrap();
}

#[tokio::test]
async fn update_entries_sends_ids_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/entries"))
        .and(body_json(json!({"entry_ids": [1, 2], "status": "removed"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = Miniflux::new(&server.uri(), Auth::token("secret")).unwrap();
    client.update_entries(&[1, 2], EntryStatus::Removed).await.unwrap();
}

#[tokio::test]
async fn error_message_is_surfaced_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/feeds/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error_message": "not found"})))
        .mount(&server)
        .await;

    let client = Miniflux::new(&server.uri(), Auth::token("secret")).unwrap();
    let err = client.get_feed(99).await.unwrap_err();
    match err {
        ApiError::Api { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body.error_message, "not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn update_feed_without_changes_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = Miniflux::new(&server.uri(), Auth::token("secret")).unwrap();
    let err = client.update_feed(3, None, None).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn opml_export_returns_text_body() {
    let xml = "<?xml version=\"1.0\"?><opml version=\"2.0\"><body/></opml>";
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/export"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(xml, "text/xml"))
        .mount(&server)
        .await;

    let client = Miniflux::new(&server.uri(), Auth::token("secret")).unwrap();
    assert_eq!(client.opml_export().await.unwrap(), xml);
}

#[tokio::test]
async fn get_user_by_name_hits_username_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "username": "admin", "is_admin": true, "language": "en_US",
            "timezone": "UTC", "theme": "light_serif", "entry_sorting_direction": "desc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Miniflux::new(&server.uri(), Auth::token("secret")).unwrap();
    let user = client.get_user("admin").await.unwrap();
    assert_eq!(user.id, 1);
    assert_eq!(user.entry_sorting_direction, miniflux_core::EntryDirection::Descending);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Miniflux::new(&format!("http://{addr}"), Auth::token("secret")).unwrap();
    let err = client.feeds().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
