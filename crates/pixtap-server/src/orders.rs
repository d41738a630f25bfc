//! PIX QR order creation against the provider REST API.
//!
//! Builds an order with a single item and a QR code that expires after a
//! configured number of minutes, registered to notify this service's
//! webhook URL. Correctness of the order lifecycle is the provider's
//! contract; this client only shapes the request and picks the QR fields
//! out of the response.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use pixtap::TapError;

use crate::config::OrdersConfig;

/// The fields an operator needs to put a QR code in front of a customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrOrder {
    pub order_id: String,
    pub reference_id: String,
    /// Copy-and-paste PIX payload.
    pub qr_text: Option<String>,
    /// Rendered QR image hosted by the provider.
    pub qr_png_url: Option<String>,
    pub expires_at: String,
}

pub struct OrderClient {
    http: reqwest::Client,
    config: OrdersConfig,
}

impl OrderClient {
    pub fn new(http: reqwest::Client, config: OrdersConfig) -> Self {
        Self { http, config }
    }

    /// Create a PIX order for `amount_cents` and return its QR details.
    pub async fn create_pix_order(&self, amount_cents: i64) -> Result<QrOrder, TapError> {
        if amount_cents <= 0 {
            return Err(TapError::ConfigError(format!(
                "order amount must be positive, got {amount_cents}"
            )));
        }

        let reference_id = format!("chope-{}", uuid::Uuid::new_v4());
        let expires_at = (Utc::now() + chrono::Duration::minutes(self.config.qr_expire_minutes))
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let body = json!({
            "reference_id": reference_id,
            "items": [{
                "name": self.config.item_name,
                "quantity": 1,
                "unit_amount": amount_cents,
            }],
            "qr_codes": [{
                "amount": { "value": amount_cents },
                "expiration_date": expires_at,
            }],
            "notification_urls": [self.config.notification_url],
        });

        let resp = self
            .http
            .post(format!("{}/orders", self.config.api_url))
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TapError::HttpError(e.to_string()))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| TapError::HttpError(e.to_string()))?;
        let data: Value = serde_json::from_slice(&bytes)?;

        if !status.is_success() {
            return Err(TapError::ProviderError(format!(
                "order creation failed with {status}: {data}"
            )));
        }

        let order_id = data["id"]
            .as_str()
            .ok_or_else(|| TapError::ProviderError("order response missing id".to_string()))?
            .to_string();

        let qr = &data["qr_codes"][0];
        let qr_png_url = qr["links"]
            .as_array()
            .and_then(|links| {
                links
                    .iter()
                    .find(|l| l["rel"].as_str() == Some("QRCODE.PNG"))
            })
            .and_then(|l| l["href"].as_str())
            .map(ToString::to_string);

        Ok(QrOrder {
            order_id,
            reference_id: data["reference_id"]
                .as_str()
                .unwrap_or(&reference_id)
                .to_string(),
            qr_text: qr["text"].as_str().map(ToString::to_string),
            qr_png_url,
            expires_at,
        })
    }
}
