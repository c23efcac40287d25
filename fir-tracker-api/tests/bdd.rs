//! BDD Test Harness for the FIR Tracker API
//!
//! Run with: cargo test --test bdd
//!
//! Scenarios drive the router in-process against the in-memory store, a
//! fixed clock and the recording gateway.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use cucumber::{given, then, when, World};
use fir_tracker_alerts::AlertConfig;
use fir_tracker_api::{create_router, AppState};
use fir_tracker_core::FixedClock;
use fir_tracker_notify::RecordingGateway;
use fir_tracker_storage::InMemoryStorage;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tower::ServiceExt;

/// World state shared across steps
#[derive(World)]
#[world(init = Self::new)]
pub struct FirTrackerWorld {
    router: Router,
    gateway: Arc<RecordingGateway>,
    clock: Arc<FixedClock>,

    /// Last HTTP response status
    last_status: Option<StatusCode>,

    /// Last response body as JSON
    last_response: Option<Value>,

    /// FIR number -> case id
    case_ids: HashMap<String, String>,
}

impl fmt::Debug for FirTrackerWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirTrackerWorld")
            .field("now", &fir_tracker_core::Clock::now(self.clock.as_ref()))
            .field("last_status", &self.last_status)
            .field("case_ids", &self.case_ids)
            .finish()
    }
}

impl FirTrackerWorld {
    fn new() -> Self {
        let gateway = Arc::new(RecordingGateway::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let state = AppState::new(
            Arc::new(InMemoryStorage::new()),
            gateway.clone(),
            clock.clone(),
            AlertConfig::default(),
        )
        .expect("default alert config is valid");

        Self {
            router: create_router(Arc::new(state)),
            gateway,
            clock,
            last_status: None,
            last_response: None,
            case_ids: HashMap::new(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        fir_tracker_core::Clock::now(self.clock.as_ref())
    }

    async fn request(&mut self, method: &str, uri: &str, body: Option<Value>) -> Value {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("valid request"),
            None => builder.body(Body::empty()).expect("valid request"),
        };

        let resp = self.router.clone().oneshot(req).await.expect("router never fails");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        self.last_status = Some(status);
        self.last_response = Some(json.clone());
        json
    }

    fn case_id(&self, fir_number: &str) -> String {
        self.case_ids
            .get(fir_number)
            .cloned()
            .unwrap_or_else(|| panic!("Case '{}' not registered. Create it first.", fir_number))
    }

    fn summary(&self) -> &Value {
        self.last_response.as_ref().expect("No sweep has run")
    }
}

// ==================== GIVEN Steps ====================

#[given(expr = "today is {string}")]
async fn today_is(world: &mut FirTrackerWorld, date: String) {
    let day = NaiveDate::parse_from_str(&date, "%Y-%m-%d").expect("date as YYYY-MM-DD");
    let instant = day.and_hms_opt(10, 0, 0).expect("valid time").and_utc();
    world.clock.set(instant);
}

#[given(expr = "an open case {string} filed {int} days ago with officer phone {string}")]
async fn open_case(world: &mut FirTrackerWorld, fir_number: String, days: i64, phone: String) {
    let fir_date = world.now() - Duration::days(days);
    let body = json!({
        "fir_number": fir_number,
        "fir_date": fir_date.to_rfc3339(),
        "police_station": "Kotwali",
        "sub_division": "Central",
        "io_name": "SI Verma",
        "io_phone": phone,
        "sections": "379 IPC",
        "crime_brief": "Theft"
    });

    let resp = world.request("POST", "/api/cases", Some(body)).await;
    assert_eq!(world.last_status, Some(StatusCode::CREATED), "Failed to create case: {}", resp);
    let id = resp["id"].as_str().expect("No id in response").to_string();
    world.case_ids.insert(fir_number, id);
}

#[given(expr = "case {string} was completed {int} days after filing")]
async fn completed_case(world: &mut FirTrackerWorld, fir_number: String, days: i64) {
    let id = world.case_id(&fir_number);
    let case = world.request("GET", &format!("/api/cases/{}", id), None).await;
    let fir_date: DateTime<Utc> =
        serde_json::from_value(case["fir_date"].clone()).expect("FIR date");
    let cc_date = fir_date + Duration::days(days);

    world
        .request(
            "POST",
            &format!("/api/cases/{}/complete", id),
            Some(json!({ "cc_number": "CC-1/2025", "cc_date": cc_date.to_rfc3339() })),
        )
        .await;
    assert_eq!(world.last_status, Some(StatusCode::OK));
}

#[given(expr = "the provider rejects messages to {string}")]
async fn provider_rejects(world: &mut FirTrackerWorld, recipient: String) {
    world.gateway.fail_for(recipient);
}

#[given(expr = "{int} day(s) pass(es)")]
async fn days_pass(world: &mut FirTrackerWorld, days: i64) {
    world.clock.advance(Duration::days(days));
}

// ==================== WHEN Steps ====================

#[when("the alert sweep runs")]
async fn sweep_runs(world: &mut FirTrackerWorld) {
    world.request("POST", "/api/alerts/sweep", None).await;
}

// ==================== THEN Steps ====================

#[then(expr = "the response status should be {int}")]
async fn response_status(world: &mut FirTrackerWorld, expected: u16) {
    let status = world.last_status.expect("No response received");
    assert_eq!(status.as_u16(), expected, "Unexpected status code");
}

#[then(expr = "{int} alert(s) should be sent")]
async fn alerts_sent(world: &mut FirTrackerWorld, expected: usize) {
    assert_eq!(world.summary()["succeeded"].as_u64(), Some(expected as u64), "{}", world.summary());
    assert_eq!(world.gateway.sent().len(), expected);
}

#[then("no alerts should be sent")]
async fn no_alerts(world: &mut FirTrackerWorld) {
    assert_eq!(world.summary()["attempted"], 0);
    assert!(world.gateway.sent().is_empty());
}

#[then(expr = "{int} alert(s) should succeed and {int} should fail")]
async fn alerts_mixed(world: &mut FirTrackerWorld, succeeded: u64, failed: u64) {
    let summary = world.summary();
    assert_eq!(summary["succeeded"].as_u64(), Some(succeeded), "{}", summary);
    assert_eq!(summary["failed"].as_u64(), Some(failed), "{}", summary);
}

#[then(expr = "{int} case(s) should be skipped")]
async fn cases_skipped(world: &mut FirTrackerWorld, expected: u64) {
    assert_eq!(world.summary()["skipped"].as_u64(), Some(expected));
}

#[then(expr = "{string} should receive template {string} with parameters {string}")]
async fn received_template(
    world: &mut FirTrackerWorld,
    recipient: String,
    template: String,
    params: String,
) {
    let expected: Vec<String> = params.split(',').map(|p| p.trim().to_string()).collect();
    let received = world.gateway.sent_to(&recipient);
    assert!(
        received
            .iter()
            .any(|m| m.template_id == template && m.parameters == expected),
        "{} did not receive {} {:?}; got {:?}",
        recipient,
        template,
        expected,
        received
    );
}

#[then(expr = "case {string} should have status {string} after {int} days")]
async fn case_status(world: &mut FirTrackerWorld, fir_number: String, status: String, days: u64) {
    let id = world.case_id(&fir_number);
    let case = world.request("GET", &format!("/api/cases/{}", id), None).await;
    assert_eq!(case["status"], status.as_str(), "{}", case);
    assert_eq!(case["days_elapsed"].as_u64(), Some(days), "{}", case);
}

#[then(expr = "case {string} should have quality {string}")]
async fn case_quality(world: &mut FirTrackerWorld, fir_number: String, quality: String) {
    let id = world.case_id(&fir_number);
    let case = world.request("GET", &format!("/api/cases/{}", id), None).await;
    assert_eq!(case["quality"], quality.as_str(), "{}", case);
}

// ==================== Main ====================

#[tokio::main]
async fn main() {
    FirTrackerWorld::run("tests/features").await;
}
