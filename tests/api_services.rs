//! Endpoint services over a mock backend: cached reads and the
//! invalidation that writes trigger.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use marquee::api::events::{EventDraft, EventPatch, EventsApi, PosterUpload};
use marquee::api::users::{RegisterData, UserPatch, UsersApi};
use marquee::prelude::*;

fn event_body(id: &str, title: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "title": title,
        "slug": title.to_lowercase(),
        "description": "desc",
        "date": "2026-09-01",
        "venue": "Arena",
        "category": "music",
        "capacity": 500,
        "ticketPrice": 25.0,
        "organizer": "u1",
    })
}

fn envelope(data: serde_json::Value) -> serde_json::Value {
    json!({ "success": true, "data": data })
}

async fn events_against(server: &MockServer) -> EventsApi {
    let config = ClientConfig::with_base_url(server.uri().parse().expect("mock uri parses"));
    let transport = Arc::new(Transport::new(&config).expect("client should build"));
    EventsApi::new(transport, QueryClient::new())
}

#[tokio::test]
async fn event_lists_are_cached_between_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(json!([event_body("e1", "A")]))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let events = events_against(&server).await;
    let first = events.list(&[]).await.expect("list should succeed");
    let second = events.list(&[]).await.expect("cached list should succeed");

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn filtered_lists_are_cached_under_separate_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("category", "music"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(json!([event_body("e1", "A")]))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("category", "tech"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let events = events_against(&server).await;
    let music = events
        .list(&[("category", "music")])
        .await
        .expect("list should succeed");
    let tech = events
        .list(&[("category", "tech")])
        .await
        .expect("list should succeed");

    assert_eq!(music.len(), 1);
    assert!(tech.is_empty());
}

#[tokio::test]
async fn detail_is_fetched_by_slug() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/rustconf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(event_body("e1", "RustConf"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let events = events_against(&server).await;
    let event = events
        .by_slug("rustconf")
        .await
        .expect("detail should succeed");
    assert_eq!(event.id, "e1");

    // Second read is a cache hit; the mock's expect(1) enforces it.
    events
        .by_slug("rustconf")
        .await
        .expect("cached detail should succeed");
}

#[tokio::test]
async fn event_detail_by_id_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/e1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(event_body("e1", "RustConf"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let events = events_against(&server).await;
    let event = events.by_id("e1").await.expect("detail should succeed");
    assert_eq!(event.slug, "rustconf");

    // Second read is a cache hit; the mock's expect(1) enforces it.
    events.by_id("e1").await.expect("cached detail should succeed");
}

#[tokio::test]
async fn organizer_scoped_lists_have_their_own_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events/organizer/u1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(json!([event_body("e1", "A")]))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events/my-events"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!([event_body("e1", "A"), event_body("e2", "B")]))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let events = events_against(&server).await;
    let theirs = events
        .by_organizer("u1")
        .await
        .expect("organizer list should succeed");
    let mine = events.mine().await.expect("own list should succeed");
    assert_eq!(theirs.len(), 1);
    assert_eq!(mine.len(), 2);

    // Both are cache hits now; the mocks' expect(1) enforces it.
    events
        .by_organizer("u1")
        .await
        .expect("cached organizer list should succeed");
    events.mine().await.expect("cached own list should succeed");
}

#[tokio::test]
async fn creating_an_event_invalidates_cached_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(json!([event_body("e1", "A")]))),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/events"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(envelope(event_body("e2", "B"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let events = events_against(&server).await;
    events.list(&[]).await.expect("seed list should succeed");

    let draft = EventDraft {
        title: "B".to_string(),
        description: "desc".to_string(),
        venue: "Arena".to_string(),
        category: "music".to_string(),
        ticket_price: 25.0,
        date: "2026-09-01".to_string(),
        time: "19:00".to_string(),
        capacity: 500,
        poster: Some(PosterUpload {
            file_name: "poster.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }),
    };
    let created = events.create(draft).await.expect("create should succeed");
    assert_eq!(created.id, "e2");

    // The cached list went stale, so this read goes back to the network.
    events.list(&[]).await.expect("refetched list should succeed");
}

#[tokio::test]
async fn failed_create_leaves_the_cache_fresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/events"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "organizers only" })),
        )
        .mount(&server)
        .await;

    let events = events_against(&server).await;
    events.list(&[]).await.expect("seed list should succeed");

    let draft = EventDraft {
        title: "B".to_string(),
        description: String::new(),
        venue: String::new(),
        category: String::new(),
        ticket_price: 0.0,
        date: String::new(),
        time: String::new(),
        capacity: 0,
        poster: None,
    };
    let err = events.create(draft).await.expect_err("create should fail");
    assert_eq!(err.status(), Some(403));

    // Still a cache hit; the GET mock's expect(1) enforces it.
    events.list(&[]).await.expect("cached list should succeed");
}

#[tokio::test]
async fn update_sends_only_set_fields_and_invalidates() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/events/e1"))
        .and(body_json(json!({ "title": "New title" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(event_body("e1", "New title"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events/rustconf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(event_body("e1", "RustConf"))),
        )
        .expect(2)
        .mount(&server)
        .await;

    let events = events_against(&server).await;
    events
        .by_slug("rustconf")
        .await
        .expect("seed detail should succeed");

    let patch = EventPatch {
        title: Some("New title".to_string()),
        ..EventPatch::default()
    };
    let updated = events
        .update("e1", &patch)
        .await
        .expect("update should succeed");
    assert_eq!(updated.title, "New title");

    // The detail key shares the invalidated prefix.
    events
        .by_slug("rustconf")
        .await
        .expect("refetched detail should succeed");
}

#[tokio::test]
async fn delete_accepts_an_empty_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/events/e1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": null })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let events = events_against(&server).await;
    events.delete("e1").await.expect("delete should succeed");
}

#[tokio::test]
async fn current_user_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "_id": "1",
            "email": "a@b.com",
            "name": "Ada",
            "role": "attendee",
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::with_base_url(server.uri().parse().expect("mock uri parses"));
    let transport = Arc::new(Transport::new(&config).expect("client should build"));
    let users = UsersApi::new(transport, QueryClient::new());

    let first = users.current_user().await.expect("fetch should succeed");
    let second = users.current_user().await.expect("cache hit should succeed");
    assert_eq!(first, second);
    assert_eq!(first.name, "Ada");
}

#[tokio::test]
async fn updating_a_user_invalidates_cached_user_queries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "_id": "1",
            "email": "a@b.com",
            "name": "Ada",
            "role": "attendee",
        }))))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/users/1"))
        .and(body_json(json!({ "name": "Grace" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "_id": "1",
            "email": "a@b.com",
            "name": "Grace",
            "role": "attendee",
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::with_base_url(server.uri().parse().expect("mock uri parses"));
    let transport = Arc::new(Transport::new(&config).expect("client should build"));
    let users = UsersApi::new(transport, QueryClient::new());

    users.by_id("1").await.expect("seed fetch should succeed");

    let patch = UserPatch {
        name: Some("Grace".to_string()),
        ..UserPatch::default()
    };
    let updated = users.update("1", &patch).await.expect("update should succeed");
    assert_eq!(updated.name, "Grace");

    // The detail key shares the invalidated prefix.
    users
        .by_id("1")
        .await
        .expect("refetched detail should succeed");
}

#[tokio::test]
async fn deleting_a_user_accepts_an_empty_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": null })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::with_base_url(server.uri().parse().expect("mock uri parses"));
    let transport = Arc::new(Transport::new(&config).expect("client should build"));
    let users = UsersApi::new(transport, QueryClient::new());

    users.delete("1").await.expect("delete should succeed");
}

#[tokio::test]
async fn register_posts_json_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/register"))
        .and(body_json(json!({
            "name": "Ada",
            "email": "a@b.com",
            "password": "secret1",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(envelope(json!({
            "_id": "1",
            "email": "a@b.com",
            "name": "Ada",
            "role": "attendee",
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::with_base_url(server.uri().parse().expect("mock uri parses"));
    let transport = Arc::new(Transport::new(&config).expect("client should build"));
    let users = UsersApi::new(transport, QueryClient::new());

    let user = users
        .register(&RegisterData {
            name: "Ada".to_string(),
            email: "a@b.com".to_string(),
            password: "secret1".to_string(),
        })
        .await
        .expect("register should succeed");
    assert_eq!(user.id, "1");
}
