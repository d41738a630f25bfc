use std::time::Duration;

use actix_web::{test, web, App};

use pixtap::{signature, ReleaseCondition, TapController};
use pixtap_server::routes;
use pixtap_server::state::AppState;

const SECRET: &str = "account-token";
const DEVICE_KEY: &str = "device-key";

/// Fresh AppState for one test: required = 800 cents PAID PIX, 10 s pour,
/// no actuator and no order client configured.
fn make_state() -> web::Data<AppState> {
    web::Data::new(AppState {
        controller: TapController::new(
            ReleaseCondition {
                amount_cents: 800,
                method: "PIX".to_string(),
                status: "PAID".to_string(),
            },
            Duration::from_secs(10),
        ),
        webhook_secret: SECRET.to_string(),
        device_key: DEVICE_KEY.to_string(),
        pour_duration: Duration::from_secs(10),
        actuator: None,
        http_client: reqwest::Client::new(),
        orders: None,
        metrics_token: Some(b"metrics-token".to_vec()),
        public_metrics: false,
    })
}

async fn make_app(
    state: web::Data<AppState>,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(state)
            .service(routes::health)
            .service(routes::metrics_endpoint)
            .service(routes::pagbank_webhook)
            .service(routes::pour)
            .service(routes::tap_test)
            .service(routes::create_order),
    )
    .await
}

fn paid_body(event_id: &str, amount: i64) -> String {
    serde_json::json!({
        "id": event_id,
        "reference_id": "chope-1",
        "charges": [{
            "id": format!("CHAR_{event_id}"),
            "status": "PAID",
            "amount": { "value": amount },
            "payment_method": {
                "type": "PIX",
                "pix": { "end_to_end_id": "E2E1" }
            }
        }]
    })
    .to_string()
}

fn signed_webhook(body: &str) -> actix_http::Request {
    let sig = signature::compute_signature(SECRET, body.as_bytes());
    test::TestRequest::post()
        .uri("/pagbank/webhook")
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("x-authenticity-token", sig))
        .set_payload(body.to_string())
        .to_request()
}

#[actix_rt::test]
async fn webhook_without_signature_is_rejected() {
    let app = make_app(make_state()).await;

    let req = test::TestRequest::post()
        .uri("/pagbank/webhook")
        .set_payload(paid_body("ORDE_1", 800))
        .insert_header(("Content-Type", "application/json"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "missing signature");
}

#[actix_rt::test]
async fn webhook_with_bad_signature_is_rejected() {
    let state = make_state();
    let app = make_app(state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/pagbank/webhook")
        .set_payload(paid_body("ORDE_1", 800))
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("x-authenticity-token", "deadbeef"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 401);
    // No state mutation on rejection.
    assert_eq!(state.controller.ledger_len(), 0);
    assert_eq!(state.controller.poll(), Duration::ZERO);
}

#[actix_rt::test]
async fn signed_matching_payment_releases_and_pour_reports_window() {
    let state = make_state();
    let app = make_app(state.clone()).await;

    let resp = test::call_service(&app, signed_webhook(&paid_body("ORDE_1", 800))).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);
    assert!(body.get("ignored").is_none());

    let req = test::TestRequest::get()
        .uri(&format!("/pour?key={DEVICE_KEY}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["open"], true);
    let remaining = body["remaining_ms"].as_u64().unwrap();
    assert!(remaining > 9_000 && remaining <= 10_000);
}

#[actix_rt::test]
async fn redelivered_event_is_acknowledged_as_duplicate() {
    let state = make_state();
    let app = make_app(state.clone()).await;

    let resp = test::call_service(&app, signed_webhook(&paid_body("ORDE_1", 800))).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, signed_webhook(&paid_body("ORDE_1", 800))).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["duplicated"], true);
    assert_eq!(state.controller.ledger_len(), 1);
}

#[actix_rt::test]
async fn amount_mismatch_is_acknowledged_but_ignored() {
    let state = make_state();
    let app = make_app(state.clone()).await;

    let resp = test::call_service(&app, signed_webhook(&paid_body("ORDE_2", 500))).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["ignored"], true);
    assert_eq!(state.controller.poll(), Duration::ZERO);
}

#[actix_rt::test]
async fn signed_non_json_body_is_acknowledged() {
    let state = make_state();
    let app = make_app(state.clone()).await;

    let body = "not json at all";
    let sig = signature::compute_signature(SECRET, body.as_bytes());
    let req = test::TestRequest::post()
        .uri("/pagbank/webhook")
        .insert_header(("x-authenticity-token", sig))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["ignored"], true);
    assert_eq!(state.controller.ledger_len(), 0);
}

#[actix_rt::test]
async fn payload_without_event_id_is_acknowledged_and_not_recorded() {
    let state = make_state();
    let app = make_app(state.clone()).await;

    let body = serde_json::json!({ "charges": [] }).to_string();
    let resp = test::call_service(&app, signed_webhook(&body)).await;

    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["ignored"], true);
    assert_eq!(state.controller.ledger_len(), 0);
}

#[actix_rt::test]
async fn pour_requires_device_key() {
    let app = make_app(make_state()).await;

    let req = test::TestRequest::get().uri("/pour").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::get()
        .uri("/pour?key=wrong-key")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = test::read_body_json(resp).await;
    // Rejection reveals nothing about the window.
    assert!(body.get("open").is_none());
    assert!(body.get("remaining_ms").is_none());
}

#[actix_rt::test]
async fn pour_reports_closed_window_when_idle() {
    let app = make_app(make_state()).await;

    let req = test::TestRequest::get()
        .uri(&format!("/pour?key={DEVICE_KEY}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["open"], false);
    assert_eq!(body["remaining_ms"], 0);
}

#[actix_rt::test]
async fn tap_test_requires_device_key() {
    let state = make_state();
    let app = make_app(state.clone()).await;

    let req = test::TestRequest::post().uri("/tap/test").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(state.controller.poll(), Duration::ZERO);
}

#[actix_rt::test]
async fn tap_test_opens_window_for_requested_duration() {
    let state = make_state();
    let app = make_app(state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/tap/test")
        .insert_header(("x-device-key", DEVICE_KEY))
        .set_json(serde_json::json!({ "duration_secs": 3 }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["remaining_ms"], 3_000);
    assert!(state.controller.poll() > Duration::from_secs(2));
    // Override bypasses the ledger entirely.
    assert_eq!(state.controller.ledger_len(), 0);
}

#[actix_rt::test]
async fn tap_test_clamps_absurd_duration() {
    let state = make_state();
    let app = make_app(state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/tap/test")
        .insert_header(("x-device-key", DEVICE_KEY))
        .set_json(serde_json::json!({ "duration_secs": u64::MAX }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(
        body["remaining_ms"].as_u64().unwrap(),
        pixtap::MAX_WINDOW.as_millis() as u64
    );
    assert!(state.controller.poll() <= pixtap::MAX_WINDOW);
}

#[actix_rt::test]
async fn orders_endpoint_reports_unconfigured() {
    let app = make_app(make_state()).await;

    let req = test::TestRequest::post()
        .uri("/orders")
        .insert_header(("x-device-key", DEVICE_KEY))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);
}

#[actix_rt::test]
async fn metrics_requires_bearer_token() {
    let app = make_app(make_state()).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("authorization", "Bearer metrics-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_rt::test]
async fn health_is_public() {
    let app = make_app(make_state()).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}
