//! Normalization of provider webhook payloads.
//!
//! PagBank order notifications nest the charge of interest at
//! `charges[0]`. Every field is optional on the wire; extraction is total
//! and defaults each missing field to a value that can never satisfy the
//! release condition.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A provider notification, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Provider idempotency key for this notification. `None` means the
    /// payload carried no usable identity and the event cannot be safely
    /// deduplicated.
    pub event_id: Option<String>,
    /// Charge status, e.g. `"PAID"`. Empty when absent.
    pub status: String,
    /// Payment method, uppercased, e.g. `"PIX"`. Empty when absent.
    pub payment_method: String,
    /// Charge value in the smallest currency unit. `None` when absent or
    /// non-numeric.
    pub amount_cents: Option<i64>,
    /// Merchant reference, forwarded to the actuator for display/audit.
    pub reference_id: Option<String>,
    /// PIX end-to-end transaction id, forwarded to the actuator.
    pub end_to_end_id: Option<String>,
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Extract a [`PaymentEvent`] from a parsed notification body.
///
/// The event id is resolved by trying, in order: the top-level `id`, the
/// first charge's `id`, the top-level `reference_id`. The first non-empty
/// candidate wins.
pub fn extract(body: &Value) -> PaymentEvent {
    let charge = body.get("charges").and_then(|c| c.get(0));

    let event_id = non_empty_str(&body["id"])
        .or_else(|| charge.and_then(|c| non_empty_str(&c["id"])))
        .or_else(|| non_empty_str(&body["reference_id"]));

    let status = charge
        .and_then(|c| c["status"].as_str())
        .unwrap_or_default()
        .to_string();

    let payment_method = charge
        .and_then(|c| c["payment_method"]["type"].as_str())
        .unwrap_or_default()
        .to_uppercase();

    let amount_cents = charge.and_then(|c| c["amount"]["value"].as_i64());

    let reference_id = non_empty_str(&body["reference_id"])
        .or_else(|| charge.and_then(|c| non_empty_str(&c["reference_id"])))
        .or_else(|| non_empty_str(&body["id"]));

    let end_to_end_id =
        charge.and_then(|c| non_empty_str(&c["payment_method"]["pix"]["end_to_end_id"]));

    PaymentEvent {
        event_id,
        status,
        payment_method,
        amount_cents,
        reference_id,
        end_to_end_id,
    }
}
