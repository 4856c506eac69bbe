use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDateTime;
use tower::ServiceExt;

use bookingdesk::clock::{Clock, FixedClock};
use bookingdesk::config::AppConfig;
use bookingdesk::db::SqliteSnapshots;
use bookingdesk::errors::BookingError;
use bookingdesk::handlers;
use bookingdesk::models::{BookingDraft, BookingFilter, BookingStatus};
use bookingdesk::services::catalog::Catalog;
use bookingdesk::services::events::BookingEvent;
use bookingdesk::services::store::BookingStore;
use bookingdesk::state::AppState;

// ── Helpers ──

fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

fn test_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(dt("2029-06-01 08:00")))
}

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        catalog_path: None,
    }
}

fn test_state() -> Arc<AppState> {
    let store = BookingStore::new(Arc::new(Catalog::demo()), test_clock());
    Arc::new(AppState::new(Arc::new(store), test_config()))
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn amy_json() -> serde_json::Value {
    serde_json::json!({
        "customerName": "Amy",
        "customerEmail": "a@x.com",
        "customerPhone": "555",
        "serviceId": 1,
        "staffId": 1,
        "scheduledAt": "2030-01-10T09:00",
        "notes": ""
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn authed(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer test-token");
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = test_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

async fn send_text(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, String) {
    let res = test_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn status_body(status: &str) -> Option<serde_json::Value> {
    Some(serde_json::json!({ "status": status }))
}

// ── Catalog & Availability ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, json) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_list_services_and_staff() {
    let state = test_state();

    let (status, services) = send(&state, get("/api/services")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(services.as_array().unwrap().len(), 5);
    assert_eq!(services[0]["name"], "Haircut & Styling");
    assert_eq!(services[0]["durationMinutes"], 60);

    let (_, staff) = send(&state, get("/api/staff")).await;
    assert_eq!(staff.as_array().unwrap().len(), 5);

    let (_, staff) = send(&state, get("/api/staff?serviceId=2")).await;
    let staff = staff.as_array().unwrap();
    assert_eq!(staff.len(), 1);
    assert_eq!(staff[0]["name"], "Sarah Wilson");
}

#[tokio::test]
async fn test_availability() {
    let state = test_state();

    let (status, slots) = send(&state, get("/api/availability?date=2030-01-10&staffId=1")).await;
    assert_eq!(status, StatusCode::OK);
    let slots = slots.as_array().unwrap();
    assert_eq!(slots.len(), 17);
    assert_eq!(slots[0]["time"], "09:00");
    assert_eq!(slots[16]["time"], "17:00");
    assert!(slots.iter().all(|s| s["available"] == true));

    let (status, _) = send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, slots) = send(&state, get("/api/availability?date=2030-01-10&staffId=1")).await;
    assert_eq!(slots[0]["available"], false);
    assert_eq!(slots[1]["available"], true);

    // Other staff are unaffected
    let (_, slots) = send(&state, get("/api/availability?date=2030-01-10&staffId=2")).await;
    assert_eq!(slots[0]["available"], true);
}

#[tokio::test]
async fn test_availability_is_deterministic() {
    let state = test_state();
    send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;

    let (_, first) = send(&state, get("/api/availability?date=2030-01-10&staffId=1")).await;
    for _ in 0..5 {
        let (_, again) = send(&state, get("/api/availability?date=2030-01-10&staffId=1")).await;
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn test_availability_unknown_staff() {
    let state = test_state();
    let (status, _) = send(&state, get("/api/availability?date=2030-01-10&staffId=99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Bookings API ──

#[tokio::test]
async fn test_create_requires_auth() {
    let state = test_state();
    let req = Request::builder()
        .method("POST")
        .uri("/api/bookings")
        .header("Content-Type", "application/json")
        .body(Body::from(amy_json().to_string()))
        .unwrap();
    let (status, _) = send(&state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(state.store.list(&BookingFilter::default()).is_empty());
}

#[tokio::test]
async fn test_end_to_end_booking_flow() {
    let state = test_state();

    let (status, booking) = send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["id"], 1);
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["scheduledAt"], "2030-01-10T09:00");

    let (status, err) = send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "conflict");
    assert_eq!(err["alternatives"].as_array().unwrap().len(), 16);

    let (status, booking) = send(
        &state,
        authed("POST", "/api/bookings/1/status", status_body("confirmed")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "confirmed");

    let (status, _) = send(
        &state,
        authed("POST", "/api/bookings/1/status", status_body("completed")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = send(
        &state,
        authed("POST", "/api/bookings/1/status", status_body("pending")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "invalid_transition");
    assert_eq!(err["from"], "completed");
}

#[tokio::test]
async fn test_cancelled_booking_frees_slot() {
    let state = test_state();
    send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;

    let (status, _) = send(
        &state,
        authed("POST", "/api/bookings/1/status", status_body("cancelled")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, booking) = send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["id"], 2);
}

#[tokio::test]
async fn test_create_with_ineligible_staff() {
    let state = test_state();
    let mut draft = amy_json();
    draft["staffId"] = serde_json::json!(2);

    let (status, err) = send(&state, authed("POST", "/api/bookings", Some(draft))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["kind"], "validation");
    assert!(err["fields"]["staffId"].is_string());
}

#[tokio::test]
async fn test_validate_endpoint_reports_only_bad_email() {
    let state = test_state();
    let mut draft = amy_json();
    draft["customerEmail"] = serde_json::json!("not-an-email");

    let (status, errors) = send(&state, authed("POST", "/api/bookings/validate", Some(draft))).await;
    assert_eq!(status, StatusCode::OK);
    let errors = errors.as_object().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors.contains_key("customerEmail"));

    let (_, errors) = send(
        &state,
        authed("POST", "/api/bookings/validate", Some(amy_json())),
    )
    .await;
    assert!(errors.as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_transition_status_is_bad_request() {
    let state = test_state();
    send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;
    let (status, _) = send(
        &state,
        authed("POST", "/api/bookings/1/status", status_body("archived")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transition_missing_booking() {
    let state = test_state();
    let (status, err) = send(
        &state,
        authed("POST", "/api/bookings/42/status", status_body("confirmed")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "not_found");
}

#[tokio::test]
async fn test_update_booking() {
    let state = test_state();
    send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;

    let mut edit = amy_json();
    edit["customerName"] = serde_json::json!("Amy Pond");
    edit["scheduledAt"] = serde_json::json!("2030-01-10T11:30");
    let (status, booking) = send(&state, authed("PUT", "/api/bookings/1", Some(edit))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["id"], 1);
    assert_eq!(booking["customerName"], "Amy Pond");
    assert_eq!(booking["scheduledAt"], "2030-01-10T11:30");

    // Re-saving unchanged data does not conflict with itself
    let (_, current) = send(&state, get("/api/bookings/1")).await;
    let (status, _) = send(&state, authed("PUT", "/api/bookings/1", Some(current))).await;
    assert_eq!(status, StatusCode::OK);

    let mut skip = amy_json();
    skip["status"] = serde_json::json!("completed");
    let (status, err) = send(&state, authed("PUT", "/api/bookings/1", Some(skip))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "invalid_transition");

    let (status, _) = send(&state, authed("PUT", "/api/bookings/9", Some(amy_json()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_booking_twice() {
    let state = test_state();
    send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;

    let (status, _) = send(&state, authed("DELETE", "/api/bookings/1", None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&state, authed("DELETE", "/api/bookings/1", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&state, get("/api/bookings/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_bookings_search_and_status() {
    let state = test_state();
    let people = [
        ("Jane Cooper", "jane@example.com", 1, "2030-01-10T09:00"),
        ("Esther Howard", "esther@example.com", 2, "2030-01-10T09:00"),
        ("Robert Fox", "robert@example.com", 3, "2030-01-10T10:00"),
        ("Kristin Watson", "kristin@janeway.org", 4, "2030-01-10T11:00"),
    ];
    for (name, email, id, at) in people {
        let draft = serde_json::json!({
            "customerName": name,
            "customerEmail": email,
            "customerPhone": "555-000-0000",
            "serviceId": id,
            "staffId": id,
            "scheduledAt": at,
        });
        let (status, _) = send(&state, authed("POST", "/api/bookings", Some(draft))).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    send(
        &state,
        authed("POST", "/api/bookings/2/status", status_body("confirmed")),
    )
    .await;

    let (_, all) = send(&state, get("/api/bookings")).await;
    let ids: Vec<i64> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);

    let (_, found) = send(&state, get("/api/bookings?search=jane")).await;
    let names: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["customerName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Jane Cooper", "Kristin Watson"]);

    let (_, found) = send(&state, get("/api/bookings?search=DENTAL")).await;
    assert_eq!(found[0]["customerName"], "Robert Fox");

    let (_, confirmed) = send(&state, get("/api/bookings?status=confirmed")).await;
    assert_eq!(confirmed.as_array().unwrap().len(), 1);
    assert_eq!(confirmed[0]["customerName"], "Esther Howard");
}

// ── Calendar Export ──

#[tokio::test]
async fn test_calendar_download() {
    let state = test_state();
    send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;

    let res = test_app(state.clone())
        .oneshot(get("/calendar/1.ics"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/calendar; charset=utf-8"
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let ics = String::from_utf8(body.to_vec()).unwrap();
    assert!(ics.contains("DTSTART:20300110T090000"));
    assert!(ics.contains("DTEND:20300110T100000"));
    assert!(ics.contains("UID:booking-1@bookingdesk"));
}

#[tokio::test]
async fn test_calendar_not_found() {
    let state = test_state();
    let (status, _) = send(&state, get("/calendar/7.ics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&state, get("/calendar/abc.ics")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_calendar_feed_lists_active_bookings() {
    let state = test_state();
    send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;
    let mut second = amy_json();
    second["scheduledAt"] = serde_json::json!("2030-01-10T10:00");
    send(&state, authed("POST", "/api/bookings", Some(second))).await;
    send(
        &state,
        authed("POST", "/api/bookings/2/status", status_body("cancelled")),
    )
    .await;

    let (status, feed) = send_text(&state, get("/calendar/feed.ics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed.matches("BEGIN:VEVENT").count(), 1);
}

// ── Events ──

#[tokio::test]
async fn test_mutations_publish_events() {
    let state = test_state();
    let mut rx = state.events_tx.subscribe();

    send(&state, authed("POST", "/api/bookings", Some(amy_json()))).await;
    send(
        &state,
        authed("POST", "/api/bookings/1/status", status_body("confirmed")),
    )
    .await;
    send(&state, authed("DELETE", "/api/bookings/1", None)).await;

    assert!(matches!(rx.recv().await.unwrap(), BookingEvent::Created { .. }));
    assert!(matches!(
        rx.recv().await.unwrap(),
        BookingEvent::StatusChanged { .. }
    ));
    assert!(matches!(rx.recv().await.unwrap(), BookingEvent::Deleted { id: 1 }));
}

#[tokio::test]
async fn test_rejected_mutation_publishes_nothing() {
    let state = test_state();
    let mut rx = state.events_tx.subscribe();

    let mut draft = amy_json();
    draft["customerPhone"] = serde_json::json!("");
    send(&state, authed("POST", "/api/bookings", Some(draft))).await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_events_stream_requires_token() {
    let state = test_state();
    let (status, _) = send(&state, get("/api/events")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let res = test_app(state)
        .oneshot(get("/api/events?token=test-token"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Store ──

fn draft_at(name: &str, staff_id: u64, at: &str) -> BookingDraft {
    BookingDraft {
        customer_name: name.to_string(),
        customer_email: format!("{}@example.com", name.to_lowercase()),
        customer_phone: "555".to_string(),
        service_id: staff_id,
        staff_id,
        scheduled_at: dt(at),
        status: None,
        notes: String::new(),
    }
}

#[test]
fn test_concurrent_creates_get_distinct_ids() {
    let store = Arc::new(BookingStore::new(Arc::new(Catalog::demo()), test_clock()));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..10)
                    .map(|i| {
                        let at = format!("2030-02-{:02} {:02}:00", i + 1, 9 + worker);
                        store
                            .create(draft_at(&format!("Worker{worker}"), 1, &at))
                            .unwrap()
                            .id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let unique: HashSet<u64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 80);
    assert_eq!(unique.iter().max(), Some(&80));
    assert_eq!(store.list(&BookingFilter::default()).len(), 80);
}

#[test]
fn test_concurrent_creates_for_same_slot_admit_one() {
    let store = Arc::new(BookingStore::new(Arc::new(Catalog::demo()), test_clock()));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.create(draft_at(&format!("W{worker}"), 1, "2030-01-10 09:00")))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, BookingError::Conflict { .. })));
}

#[test]
fn test_sqlite_snapshots_survive_restart() {
    let path = std::env::temp_dir().join(format!(
        "bookingdesk-test-{}-{}.db",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let path_str = path.to_str().unwrap().to_string();

    {
        let store = BookingStore::with_snapshots(
            Arc::new(Catalog::demo()),
            test_clock(),
            Box::new(SqliteSnapshots::open(&path_str).unwrap()),
        )
        .unwrap();
        store.create(draft_at("Amy", 1, "2030-01-10 09:00")).unwrap();
        let bob = store.create(draft_at("Bob", 2, "2030-01-10 09:00")).unwrap();
        store.transition(1, BookingStatus::Confirmed).unwrap();
        store.delete(bob.id).unwrap();
    }

    let store = BookingStore::with_snapshots(
        Arc::new(Catalog::demo()),
        test_clock(),
        Box::new(SqliteSnapshots::open(&path_str).unwrap()),
    )
    .unwrap();
    let bookings = store.list(&BookingFilter::default());
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].status, BookingStatus::Confirmed);
    assert_eq!(store.create(draft_at("Cal", 3, "2030-01-10 09:00")).unwrap().id, 3);

    drop(store);
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{path_str}{suffix}"));
    }
}
