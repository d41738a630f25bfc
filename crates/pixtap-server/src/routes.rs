use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use pixtap::{event, security, signature, Decision, IgnoreReason};

use crate::actuator::{self, OpenTapCommand};
use crate::metrics;
use crate::state::AppState;

/// Validate the device key passed in the `x-device-key` header.
/// Gates the manual-override and order endpoints — never the webhook, which
/// has its own signature check.
fn validate_device_key(req: &HttpRequest, state: &AppState) -> Result<(), HttpResponse> {
    let provided = req
        .headers()
        .get("x-device-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if security::constant_time_eq(provided.as_bytes(), state.device_key.as_bytes()) {
        Ok(())
    } else {
        Err(HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "unauthorized"
        })))
    }
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "pixtap-server",
    }))
}

/// Payment-confirmation webhook.
///
/// The body is taken as raw bytes and the signature is checked over exactly
/// those bytes before any parsing. Once the signature holds, every
/// structurally odd payload is still acknowledged with 200 — an
/// un-actionable notification must not trigger the provider's redelivery
/// loop.
#[post("/pagbank/webhook")]
pub async fn pagbank_webhook(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    let provided_sig = req
        .headers()
        .get("x-authenticity-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided_sig.is_empty() {
        metrics::SIGNATURE_FAILURES
            .with_label_values(&["missing"])
            .inc();
        tracing::warn!("webhook without x-authenticity-token header");
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "missing signature"
        }));
    }

    if !signature::verify(&body, &state.webhook_secret, provided_sig) {
        metrics::SIGNATURE_FAILURES
            .with_label_values(&["invalid"])
            .inc();
        tracing::warn!("webhook signature mismatch");
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "invalid signature"
        }));
    }

    let parsed: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            metrics::WEBHOOK_EVENTS
                .with_label_values(&["malformed"])
                .inc();
            tracing::warn!(error = %e, "signed webhook body is not JSON — acknowledging");
            return HttpResponse::Ok().json(serde_json::json!({
                "ok": true,
                "ignored": true
            }));
        }
    };

    let event = event::extract(&parsed);
    let decision = state.controller.on_event(&event);
    metrics::WEBHOOK_EVENTS
        .with_label_values(&[decision.label()])
        .inc();

    match decision {
        Decision::Released => {
            tracing::info!(
                event_id = event.event_id.as_deref().unwrap_or("-"),
                reference = event.reference_id.as_deref().unwrap_or("-"),
                amount_cents = event.amount_cents.unwrap_or(0),
                "payment matched — tap released"
            );

            // Outside the controller's lock and never awaited: a slow or
            // offline board must not delay the acknowledgment.
            if let Some(ref actuator) = state.actuator {
                actuator::fire_open_tap(
                    &state.http_client,
                    actuator,
                    OpenTapCommand::open(
                        actuator,
                        event.reference_id.clone(),
                        event.amount_cents,
                        event.end_to_end_id.clone(),
                        state.pour_duration.as_millis() as u64,
                    ),
                );
            }

            HttpResponse::Ok().json(serde_json::json!({ "ok": true }))
        }
        Decision::Duplicate => {
            tracing::info!(
                event_id = event.event_id.as_deref().unwrap_or("-"),
                "duplicate delivery — no-op"
            );
            HttpResponse::Ok().json(serde_json::json!({ "ok": true, "duplicated": true }))
        }
        Decision::Ignored(IgnoreReason::MissingEventId) => {
            tracing::warn!("webhook payload has no resolvable event id — ignoring");
            HttpResponse::Ok().json(serde_json::json!({ "ok": true, "ignored": true }))
        }
        Decision::Ignored(IgnoreReason::ConditionNotMet) => {
            let required = state.controller.condition();
            tracing::info!(
                event_id = event.event_id.as_deref().unwrap_or("-"),
                status = %event.status,
                method = %event.payment_method,
                amount_cents = event.amount_cents.unwrap_or(-1),
                required_status = %required.status,
                required_method = %required.method,
                required_amount_cents = required.amount_cents,
                "payment did not match release condition"
            );
            HttpResponse::Ok().json(serde_json::json!({ "ok": true, "ignored": true }))
        }
    }
}

#[derive(Deserialize)]
pub struct PourQuery {
    key: Option<String>,
}

/// Actuator poll: how long should the tap consider itself authorized?
///
/// Keyed by the static device key as a query parameter; an unauthorized
/// caller learns nothing about the window state.
#[get("/pour")]
pub async fn pour(query: web::Query<PourQuery>, state: web::Data<AppState>) -> HttpResponse {
    let provided = query.key.as_deref().unwrap_or("");
    if !security::constant_time_eq(provided.as_bytes(), state.device_key.as_bytes()) {
        metrics::POUR_POLLS
            .with_label_values(&["unauthorized"])
            .inc();
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "unauthorized"
        }));
    }

    metrics::POUR_POLLS.with_label_values(&["authorized"]).inc();
    let remaining = state.controller.poll();
    HttpResponse::Ok().json(serde_json::json!({
        "open": !remaining.is_zero(),
        "remaining_ms": remaining.as_millis() as u64,
    }))
}

#[derive(Deserialize)]
pub struct TapTestRequest {
    duration_secs: Option<u64>,
}

/// Operator-triggered pour, bypassing payment verification.
/// Gated by the device key, not the webhook signature.
#[post("/tap/test")]
pub async fn tap_test(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Option<web::Json<TapTestRequest>>,
) -> HttpResponse {
    if let Err(resp) = validate_device_key(&req, &state) {
        return resp;
    }

    // Clamp before reporting so remaining_ms matches what the controller
    // actually opens.
    let duration = body
        .and_then(|b| b.duration_secs)
        .map(std::time::Duration::from_secs)
        .unwrap_or(state.pour_duration)
        .min(pixtap::MAX_WINDOW);

    state.controller.manual_override(duration);
    tracing::info!(duration_secs = duration.as_secs(), "manual override — tap released");

    if let Some(ref actuator) = state.actuator {
        actuator::fire_open_tap(
            &state.http_client,
            actuator,
            OpenTapCommand::open(
                actuator,
                Some("TAP_TEST".to_string()),
                None,
                None,
                duration.as_millis() as u64,
            ),
        );
    }

    HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "remaining_ms": duration.as_millis() as u64,
    }))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    amount_cents: Option<i64>,
}

/// Create a PIX QR order for the configured (or an explicit) amount.
#[post("/orders")]
pub async fn create_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Option<web::Json<CreateOrderRequest>>,
) -> HttpResponse {
    if let Err(resp) = validate_device_key(&req, &state) {
        return resp;
    }

    let Some(ref orders) = state.orders else {
        return HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "error": "order creation not configured"
        }));
    };

    let amount_cents = body
        .and_then(|b| b.amount_cents)
        .unwrap_or(state.controller.condition().amount_cents);

    match orders.create_pix_order(amount_cents).await {
        Ok(order) => {
            tracing::info!(
                order_id = %order.order_id,
                reference = %order.reference_id,
                amount_cents,
                "order created"
            );
            HttpResponse::Ok().json(order)
        }
        Err(e) => {
            tracing::error!(error = %e, "order creation failed");
            HttpResponse::BadGateway().json(serde_json::json!({
                "error": "order creation failed"
            }))
        }
    }
}

#[get("/metrics")]
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match &state.metrics_token {
        Some(token) => {
            let authorized = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| security::constant_time_eq(t.as_bytes(), token))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None => {
            // No token configured — metrics stay protected unless the
            // operator explicitly opted in.
            if !state.public_metrics {
                return HttpResponse::Forbidden().json(serde_json::json!({
                    "error": "forbidden",
                    "message": "Set METRICS_TOKEN or PIXTAP_PUBLIC_METRICS=true to access /metrics"
                }));
            }
        }
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}
