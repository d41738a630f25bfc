use std::time::Duration;

use pixtap::TapController;

use crate::actuator::ActuatorConfig;
use crate::orders::OrderClient;

/// Shared application state, injected into every route via `web::Data`.
///
/// The controller owns the dedup ledger and release window; nothing here is
/// process-global, so the routes are testable against a fresh state.
pub struct AppState {
    pub controller: TapController,
    /// Account token the provider signs webhook bodies with.
    pub webhook_secret: String,
    /// Static key for the actuator poll and manual-override endpoints.
    pub device_key: String,
    pub pour_duration: Duration,
    pub actuator: Option<ActuatorConfig>,
    pub http_client: reqwest::Client,
    pub orders: Option<OrderClient>,
    /// Separate bearer token for /metrics (not the webhook secret).
    pub metrics_token: Option<Vec<u8>>,
    pub public_metrics: bool,
}
