// End-to-end router tests over the in-memory store.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use convite_server::config::{Config, ResolverKind};
use convite_server::models::{Attendee, Event, Host};
use convite_server::routes::create_routes;
use convite_server::services::{
    AddressInput, AddressResolver, Notifier, ResolvedAddress, RsvpChange,
};
use convite_server::state::AppState;
use convite_server::store::{MemoryStore, Store};

struct StubResolver(ResolvedAddress);

#[async_trait::async_trait]
impl AddressResolver for StubResolver {
    async fn resolve(&self, _input: &AddressInput) -> ResolvedAddress {
        self.0.clone()
    }
}

#[derive(Default)]
struct RecordingNotifier {
    changes: Mutex<Vec<RsvpChange>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        change: RsvpChange,
        _event: &Event,
        _host: &Host,
        _attendee: &Attendee,
        _reason: Option<&str>,
    ) -> anyhow::Result<()> {
        self.changes.lock().unwrap().push(change);
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait::async_trait]
impl Notifier for FailingNotifier {
    async fn notify(
        &self,
        _change: RsvpChange,
        _event: &Event,
        _host: &Host,
        _attendee: &Attendee,
        _reason: Option<&str>,
    ) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("smtp relay down"))
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

fn geocoded() -> ResolvedAddress {
    ResolvedAddress {
        address_full: None,
        latitude: Some(-22.9068),
        longitude: Some(-43.1729),
    }
}

fn build_app(resolver: ResolvedAddress, config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState {
        store: store.clone(),
        resolver: Arc::new(StubResolver(resolver)),
        notifier: notifier.clone(),
        config: Arc::new(config),
    };
    TestApp {
        router: create_routes(state),
        store,
        notifier,
    }
}

fn test_app() -> TestApp {
    build_app(geocoded(), Config::test_config())
}

async fn send(
    router: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn signup(router: &Router, email: &str) -> String {
    let (status, body) = send(
        router,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "email": email,
            "password": "pw123",
            "name": "Jane",
            "whatsapp_number": "5521988887777",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn create_event(router: &Router, token: &str, extra: Value) -> (String, String) {
    let mut payload = json!({
        "title": "Birthday",
        "event_date": "2025-12-25",
        "start_time": "18:00",
        "address_full": "Rua X, 10, Bairro, City - ST",
    });
    if let (Some(base), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    let (status, body) = send(
        router,
        "POST",
        "/api/events/create",
        Some(token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create event failed: {body}");
    (
        body["data"]["id"].as_str().unwrap().to_string(),
        body["data"]["slug"].as_str().unwrap().to_string(),
    )
}

async fn rsvp(router: &Router, slug: &str, contact: &str, adults: i64) -> (StatusCode, Value) {
    send(
        router,
        "POST",
        "/api/attendees/rsvp",
        None,
        Some(json!({
            "event_slug": slug,
            "whatsapp_number": contact,
            "name": "Bob",
            "num_adults": adults,
        })),
    )
    .await
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = test_app();
    let (status, body) = send(&app.router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn signup_rejects_missing_fields_and_bad_email() {
    let app = test_app();

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"email": "a@b.com", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "email": "not-an-email",
            "password": "pw",
            "name": "Jane",
            "whatsapp_number": "55219",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn duplicate_signup_conflicts_even_with_different_case() {
    let app = test_app();
    signup(&app.router, "host@x.com").await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({
            "email": "Host@X.com",
            "password": "other",
            "name": "Janet",
            "whatsapp_number": "5521977776666",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn login_rejects_bad_credentials_uniformly() {
    let app = test_app();
    signup(&app.router, "host@x.com").await;

    let (status, wrong_pw) = send(
        &app.router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "host@x.com", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = send(
        &app.router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "ghost@x.com", "password": "pw123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // No account-existence leak
    assert_eq!(wrong_pw["error"]["message"], unknown["error"]["message"]);
}

#[tokio::test]
async fn login_returns_a_fresh_usable_session() {
    let app = test_app();
    signup(&app.router, "host@x.com").await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "host@x.com", "password": "pw123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app.router, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "host@x.com");
    assert!(body["data"]["password_hash"].is_null());
}

#[tokio::test]
async fn logout_invalidates_the_session_and_is_idempotent() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;

    let (status, _) = send(&app.router, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A second logout, and one with no session at all, still succeed
    let (status, _) = send(&app.router, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app.router, "POST", "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn stale_session_for_deleted_host_is_not_found() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;

    let host = app
        .store
        .host_by_email("host@x.com")
        .await
        .unwrap()
        .unwrap();
    app.store.delete_host(host.id).await.unwrap();

    // delete_host clears sessions too, so re-insert one pointing nowhere
    app.store
        .create_session(&convite_server::models::Session {
            token: token.clone(),
            host_id: host.id,
            created_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    let (status, _) = send(&app.router, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn event_creation_requires_auth_and_valid_input() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;

    let (status, _) = send(&app.router, "POST", "/api/events/create", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/events/create",
        Some(&token),
        Some(json!({"title": "Birthday"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/events/create",
        Some(&token),
        Some(json!({
            "title": "Birthday",
            "event_date": "25/12/2025",
            "start_time": "18:00",
            "address_full": "Rua X, 10, Bairro, City - ST",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/events/create",
        Some(&token),
        Some(json!({
            "title": "Birthday",
            "event_date": "2025-12-25",
            "start_time": "6pm",
            "address_full": "Rua X, 10, Bairro, City - ST",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn created_event_is_publicly_visible_by_slug() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;
    let (_, slug) = create_event(&app.router, &token, json!({})).await;
    assert_eq!(slug.len(), 8);

    let (status, body) = send(&app.router, "GET", &format!("/api/events/{slug}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Birthday");
    assert_eq!(body["data"]["event_date"], "2025-12-25");
    assert_eq!(body["data"]["start_time"], "18:00");
    assert_eq!(body["data"]["latitude"], json!(-22.9068));
    assert_eq!(body["data"]["host"]["name"], "Jane");
    assert!(body["data"]["host"]["email"].is_null());

    let (status, _) = send(&app.router, "GET", "/api/events/zzzzzzzz", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn enrichment_failure_leaves_coordinates_unset() {
    let app = build_app(ResolvedAddress::default(), Config::test_config());
    let token = signup(&app.router, "host@x.com").await;
    let (_, slug) = create_event(&app.router, &token, json!({})).await;

    let (status, body) = send(&app.router, "GET", &format!("/api/events/{slug}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["latitude"].is_null());
    assert!(body["data"]["longitude"].is_null());
}

#[tokio::test]
async fn cep_variant_resolves_address_or_rejects_creation() {
    let mut config = Config::test_config();
    config.resolver = ResolverKind::Cep;
    let app = build_app(
        ResolvedAddress {
            address_full: Some("Praça da Sé, Sé, São Paulo - SP, 01000-000".to_string()),
            latitude: None,
            longitude: None,
        },
        config,
    );
    let token = signup(&app.router, "host@x.com").await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/events/create",
        Some(&token),
        Some(json!({
            "title": "Birthday",
            "event_date": "2025-12-25",
            "start_time": "18:00",
            "address_cep": "01000-000",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let slug = body["data"]["slug"].as_str().unwrap();
    let (_, body) = send(&app.router, "GET", &format!("/api/events/{slug}"), None, None).await;
    assert_eq!(
        body["data"]["address_full"],
        "Praça da Sé, Sé, São Paulo - SP, 01000-000"
    );

    // Lookup failure with no other address input is a hard 400
    let mut config = Config::test_config();
    config.resolver = ResolverKind::Cep;
    let failing = build_app(ResolvedAddress::default(), config);
    let token = signup(&failing.router, "host2@x.com").await;
    let (status, _) = send(
        &failing.router,
        "POST",
        "/api/events/create",
        Some(&token),
        Some(json!({
            "title": "Birthday",
            "event_date": "2025-12-25",
            "start_time": "18:00",
            "address_cep": "99999-999",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rsvp_scenario_covers_duplicate_modify_cancel_and_reactivation() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;
    let (event_id, slug) = create_event(&app.router, &token, json!({})).await;

    // First RSVP succeeds
    let (status, body) = rsvp(&app.router, &slug, "55219999", 2).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["attendee_id"].is_string());

    // Second RSVP from the same contact is rejected as a duplicate
    let (status, body) = rsvp(&app.router, &slug, "55219999", 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "ALREADY_RSVPD");

    // Unknown slug is 404
    let (status, _) = rsvp(&app.router, "zzzzzzzz", "55210000", 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Guest bumps the head count
    let (status, _) = send(
        &app.router,
        "PUT",
        "/api/attendees/modify",
        None,
        Some(json!({
            "event_slug": slug,
            "whatsapp_number": "55219999",
            "num_adults": 3,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app.router,
        "GET",
        &format!("/api/events/{event_id}/attendees"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"][0]["num_adults"], 3);
    assert_eq!(body["data"][0]["status"], "confirmed");

    let (_, body) = send(&app.router, "GET", "/api/events/my-events", Some(&token), None).await;
    assert_eq!(body["data"][0]["total_adults"], 3);
    assert_eq!(body["data"][0]["attendee_count"], 1);

    // Cancelling keeps the row but zeroes the aggregates
    let (status, _) = send(
        &app.router,
        "POST",
        "/api/attendees/cancel",
        None,
        Some(json!({
            "event_slug": slug,
            "whatsapp_number": "55219999",
            "reason": "travel plans changed",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app.router, "GET", "/api/events/my-events", Some(&token), None).await;
    assert_eq!(body["data"][0]["total_adults"], 0);
    assert_eq!(body["data"][0]["attendee_count"], 0);

    let (_, body) = send(
        &app.router,
        "GET",
        &format!("/api/events/{event_id}/attendees"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"][0]["status"], "cancelled");

    // Any modification reactivates the RSVP
    let (status, body) = send(
        &app.router,
        "PUT",
        "/api/attendees/modify",
        None,
        Some(json!({
            "event_slug": slug,
            "whatsapp_number": "55219999",
            "comments": "back on!",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");

    let (_, body) = send(&app.router, "GET", "/api/events/my-events", Some(&token), None).await;
    assert_eq!(body["data"][0]["total_adults"], 3);

    assert_eq!(
        *app.notifier.changes.lock().unwrap(),
        vec![
            RsvpChange::Created,
            RsvpChange::Modified,
            RsvpChange::Cancelled,
            RsvpChange::Modified,
        ]
    );
}

#[tokio::test]
async fn policy_flags_block_guest_self_service() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;
    let (_, slug) = create_event(
        &app.router,
        &token,
        json!({"allow_modifications": false, "allow_cancellations": false}),
    )
    .await;

    let (status, _) = rsvp(&app.router, &slug, "55219999", 2).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app.router,
        "PUT",
        "/api/attendees/modify",
        None,
        Some(json!({
            "event_slug": slug,
            "whatsapp_number": "55219999",
            "num_adults": 3,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/attendees/cancel",
        None,
        Some(json!({
            "event_slug": slug,
            "whatsapp_number": "55219999",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn find_attendee_round_trips_the_rsvp() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;
    let (_, slug) = create_event(&app.router, &token, json!({})).await;
    rsvp(&app.router, &slug, "55219999", 2).await;

    let (status, body) = send(
        &app.router,
        "GET",
        &format!("/api/attendees/find?event_slug={slug}&whatsapp_number=55219999"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Bob");
    assert_eq!(body["data"]["num_adults"], 2);

    let (status, _) = send(
        &app.router,
        "GET",
        &format!("/api/attendees/find?event_slug={slug}&whatsapp_number=000"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn partial_update_touches_only_present_fields() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;
    let (event_id, slug) = create_event(&app.router, &token, json!({})).await;

    let (status, _) = send(
        &app.router,
        "PUT",
        &format!("/api/events/{event_id}"),
        Some(&token),
        Some(json!({"title": "New Title"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app.router, "GET", &format!("/api/events/{slug}"), None, None).await;
    assert_eq!(body["data"]["title"], "New Title");
    assert_eq!(body["data"]["event_date"], "2025-12-25");
    assert_eq!(body["data"]["start_time"], "18:00");
    assert_eq!(body["data"]["address_full"], "Rua X, 10, Bairro, City - ST");
    assert_eq!(body["data"]["allow_modifications"], true);
}

#[tokio::test]
async fn ownership_is_enforced_on_host_endpoints() {
    let app = test_app();
    let owner = signup(&app.router, "host@x.com").await;
    let intruder = signup(&app.router, "other@x.com").await;
    let (event_id, _) = create_event(&app.router, &owner, json!({})).await;

    for (method, path) in [
        ("PUT", format!("/api/events/{event_id}")),
        ("DELETE", format!("/api/events/{event_id}")),
        ("POST", format!("/api/events/{event_id}/duplicate")),
        ("GET", format!("/api/events/{event_id}/attendees")),
        ("GET", format!("/api/events/{event_id}/export-csv")),
    ] {
        let body = (method != "GET").then(|| json!({}));
        let (status, _) = send(&app.router, method, &path, Some(&intruder), body).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {path}");
    }

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(
        &app.router,
        "PUT",
        &format!("/api/events/{missing}"),
        Some(&owner),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_event_copies_fields_but_not_attendees() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;
    let (event_id, slug) = create_event(&app.router, &token, json!({})).await;
    rsvp(&app.router, &slug, "55219999", 2).await;

    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/api/events/{event_id}/duplicate"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let copy_slug = body["data"]["slug"].as_str().unwrap().to_string();
    let copy_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_ne!(copy_slug, slug);

    let (_, body) = send(&app.router, "GET", &format!("/api/events/{copy_slug}"), None, None).await;
    assert_eq!(body["data"]["title"], "Birthday (copy)");
    assert_eq!(body["data"]["event_date"], "2025-12-25");

    let (_, body) = send(
        &app.router,
        "GET",
        &format!("/api/events/{copy_id}/attendees"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn host_can_edit_and_delete_attendees() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;
    let (event_id, slug) = create_event(&app.router, &token, json!({})).await;
    let (_, body) = rsvp(&app.router, &slug, "55219999", 2).await;
    let attendee_id = body["data"]["attendee_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app.router,
        "PUT",
        &format!("/api/events/{event_id}/attendees/{attendee_id}"),
        Some(&token),
        Some(json!({"num_children": 2, "comments": "bringing cake"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app.router,
        "GET",
        &format!("/api/events/{event_id}/attendees"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"][0]["num_children"], 2);
    assert_eq!(body["data"][0]["comments"], "bringing cake");
    assert_eq!(body["data"][0]["num_adults"], 2);

    // Attendee id under a different event of the same host is 404
    let (other_event, _) = create_event(&app.router, &token, json!({"title": "Other"})).await;
    let (status, _) = send(
        &app.router,
        "DELETE",
        &format!("/api/events/{other_event}/attendees/{attendee_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        "DELETE",
        &format!("/api/events/{event_id}/attendees/{attendee_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app.router,
        "GET",
        &format!("/api/events/{event_id}/attendees"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn deleting_an_event_removes_it_and_its_attendees() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;
    let (event_id, slug) = create_event(&app.router, &token, json!({})).await;
    rsvp(&app.router, &slug, "55219999", 2).await;

    let (status, _) = send(
        &app.router,
        "DELETE",
        &format!("/api/events/{event_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, "GET", &format!("/api/events/{slug}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let event_uuid: uuid::Uuid = event_id.parse().unwrap();
    assert!(app
        .store
        .attendees_for_event(event_uuid)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn csv_export_has_fixed_columns_and_attachment_disposition() {
    let app = test_app();
    let token = signup(&app.router, "host@x.com").await;
    let (event_id, slug) = create_event(&app.router, &token, json!({})).await;
    let (_, body) = send(
        &app.router,
        "POST",
        "/api/attendees/rsvp",
        None,
        Some(json!({
            "event_slug": slug,
            "whatsapp_number": "55219999",
            "name": "Bob",
            "num_adults": 2,
            "num_children": 1,
            "family_member_names": ["Ana", "Luiz"],
            "comments": "no peanuts, please",
        })),
    )
    .await;
    assert!(body["data"]["attendee_id"].is_string());

    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/events/{event_id}/export-csv"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap(),
        format!("attachment; filename=event_{event_id}_attendees.csv")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Name,WhatsApp,Adults,Children,Family Members,Comments,Status,RSVP Date"
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("Bob,55219999,2,1,\"Ana, Luiz\","));
    assert!(row.contains("\"no peanuts, please\""));
    assert!(row.contains("confirmed"));
}

#[tokio::test]
async fn notifier_failure_does_not_fail_the_rsvp() {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        resolver: Arc::new(StubResolver(geocoded())),
        notifier: Arc::new(FailingNotifier),
        config: Arc::new(Config::test_config()),
    };
    let router = create_routes(state);

    let token = signup(&router, "host@x.com").await;
    let (_, slug) = create_event(&router, &token, json!({})).await;

    let (status, _) = rsvp(&router, &slug, "55219999", 2).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn rsvp_endpoint_is_rate_limited_per_client() {
    let mut config = Config::test_config();
    config.rate_limit_enabled = true;
    config.rsvp_rate_per_second = 1;
    config.rsvp_burst = 2;
    let app = build_app(geocoded(), config);

    let client = SocketAddr::from(([127, 0, 0, 1], 9000));
    let mut last_status = StatusCode::OK;
    for _ in 0..3 {
        let mut request = Request::builder()
            .method("POST")
            .uri("/api/attendees/rsvp")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(client));
        let response = app.router.clone().oneshot(request).await.unwrap();
        last_status = response.status();
    }
    assert_eq!(last_status, StatusCode::TOO_MANY_REQUESTS);

    // The quota is per client; other routes stay unthrottled
    let (status, _) = send(&app.router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
