//! Full lifecycle tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port inside the test runtime, then
//! exercises every async `Miniflux` method over real HTTP. Validates that
//! request building, execution and response parsing agree with the server.

use miniflux_core::{
    ApiError, Auth, Credentials, EntryDirection, EntryStatus, Filter, Miniflux, UserSettings,
};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}")
}

#[tokio::test]
async fn feed_and_entry_lifecycle() {
    let url = start_server().await;
    let client = Miniflux::new(&url, Auth::token("test-token")).unwrap();

    // Step 1: nothing subscribed yet.
    assert!(client.feeds().await.unwrap().is_empty());

    // Step 2: discover and subscribe.
    let links = client.discover("http://example.com").await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].url, "http://example.com/feed.xml");

    let category = client.create_category("Tech").await.unwrap();
    assert_eq!(category.title, "Tech");

    let created = client.create_feed(&links[0].url, Some(category.id)).await.unwrap();
    let feed_id = created.feed_id;

    // Step 3: read it back, with its icon.
    let feed = client.get_feed(feed_id).await.unwrap();
    assert_eq!(feed.feed_url, "http://example.com/feed.xml");
    assert_eq!(feed.category.id, category.id);
    let icon = client.get_feed_icon(feed_id).await.unwrap();
    assert_eq!(icon.mime_type, "image/png");

    // Step 4: rename, then move back to the default category.
    let renamed = client.update_feed(feed_id, Some("Example \"blog\""), None).await.unwrap();
    assert_eq!(renamed.title, "Example \"blog\"");
    let moved = client.update_feed(feed_id, None, Some(1)).await.unwrap();
    assert_eq!(moved.category.title, "All");
    assert_eq!(moved.title, "Example \"blog\"");

    // Step 5: refresh answers 204.
    client.refresh_feed(feed_id).await.unwrap();

    // Step 6: entries.
    let unread = Filter::new().status(EntryStatus::Unread).limit(10);
    let list = client.get_feed_entries(feed_id, Some(&unread)).await.unwrap();
    assert_eq!(list.total, 1);
    let entry_id = list.entries[0].id;
    assert_eq!(list.entries[0].status, EntryStatus::Unread);

    let entry = client.get_feed_entry(feed_id, entry_id).await.unwrap();
    assert_eq!(entry.feed_id, feed_id);
    assert!(!entry.starred);

    client.toggle_bookmark(entry_id).await.unwrap();
    assert!(client.get_entry(entry_id).await.unwrap().starred);

    client.update_entries(&[entry_id], EntryStatus::Read).await.unwrap();
    let list = client.get_entries(Some(&unread)).await.unwrap();
    assert_eq!(list.total, 0);
    let all = client
        .get_entries(Some(&Filter::new().direction(EntryDirection::Descending)))
        .await
        .unwrap();
    assert_eq!(all.entries[0].status, EntryStatus::Read);

    // Step 7: export lists the feed as OPML.
    let opml = client.opml_export().await.unwrap();
    assert!(opml.contains("xmlUrl=\"http://example.com/feed.xml\""));

    // Step 8: remove; the feed and its entries are gone.
    client.remove_feed(feed_id).await.unwrap();
    let err = client.get_feed(feed_id).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.error_body().unwrap().error_message, "Feed not found");
    let err = client.get_entry(entry_id).await.unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 404, .. }));

    // Step 9: category cleanup.
    let renamed = client.update_category(category.id, "Technology").await.unwrap();
    assert_eq!(renamed.title, "Technology");
    client.delete_category(category.id).await.unwrap();
    let categories = client.categories().await.unwrap();
    assert_eq!(categories.len(), 1);
}

#[tokio::test]
async fn user_lifecycle_with_basic_auth() {
    let url = start_server().await;
    let client = Miniflux::new(&url, Credentials::login("admin", "password")).unwrap();

    let users = client.users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].is_admin);

    let bob = client.create_user("bob", "p\"a'ss", false).await.unwrap();
    assert_eq!(bob.username, "bob");
    assert!(!bob.is_admin);

    // The new user can log in with the exact password that was sent.
    let as_bob = Miniflux::new(&url, Auth::basic("bob", "p\"a'ss")).unwrap();
    assert_eq!(as_bob.get_user("bob").await.unwrap().id, bob.id);

    let settings = UserSettings {
        theme: Some("dark_serif".to_string()),
        language: Some("fr_FR".to_string()),
        ..UserSettings::default()
    };
    let updated = client.update_user(bob.id, &settings).await.unwrap();
    assert_eq!(updated.theme, "dark_serif");
    assert_eq!(updated.language, "fr_FR");
    assert_eq!(updated.username, "bob");

    assert_eq!(client.get_user(bob.id).await.unwrap().theme, "dark_serif");

    client.delete_user(bob.id).await.unwrap();
    let err = client.get_user("bob").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn missing_credentials_are_rejected_by_server() {
    let url = start_server().await;
    let client = Miniflux::new(&url, Credentials::default()).unwrap();

    let err = client.feeds().await.unwrap_err();
    match err {
        ApiError::Api { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body.error_message, "Access Unauthorized");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_feed_surfaces_server_message() {
    let url = start_server().await;
    let client = Miniflux::new(&url, Auth::token("test-token")).unwrap();

    client.create_feed("http://example.com/feed.xml", None).await.unwrap();
    let err = client
        .create_feed("http://example.com/feed.xml", None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.error_body().unwrap().error_message, "This feed already exists");
}

#[tokio::test]
async fn concurrent_calls_resolve_independently() {
    let url = start_server().await;
    let client = Miniflux::new(&url, Auth::token("test-token")).unwrap();

    let (feeds, categories, users) =
        tokio::join!(client.feeds(), client.categories(), client.users());
    assert!(feeds.unwrap().is_empty());
    assert_eq!(categories.unwrap().len(), 1);
    assert_eq!(users.unwrap().len(), 1);
}
