//! Environment-driven configuration.
//!
//! All env access happens here, once, at startup; the core library and the
//! route handlers only see resolved values. Required secrets refuse to
//! start the process rather than fall back to insecure defaults.

use std::time::Duration;

use pixtap::ReleaseCondition;

/// Everything needed to create a PIX QR order against the provider API.
#[derive(Debug, Clone)]
pub struct OrdersConfig {
    pub api_url: String,
    pub access_token: String,
    /// Webhook URL the provider should notify on payment.
    pub notification_url: String,
    pub qr_expire_minutes: i64,
    pub item_name: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Account token the provider uses to sign webhook bodies.
    pub webhook_secret: String,
    /// Static key for the actuator poll and manual-override endpoints.
    pub device_key: String,
    pub condition: ReleaseCondition,
    pub pour_duration: Duration,
    pub actuator_url: Option<String>,
    pub actuator_token: Option<String>,
    pub orders: Option<OrdersConfig>,
    pub port: u16,
    pub rate_limit_rpm: u64,
    pub allowed_origins: Vec<String>,
    /// Separate bearer token for /metrics (not the webhook secret).
    pub metrics_token: Option<Vec<u8>>,
    pub public_metrics: bool,
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Resolve configuration from the environment, exiting on missing
    /// required secrets.
    pub fn from_env() -> Self {
        let webhook_secret = match env_non_empty("PAGBANK_TOKEN") {
            Some(s) => s,
            None => {
                tracing::error!(
                    "PAGBANK_TOKEN is required — it is the account token the \
                     provider signs webhook bodies with. Without it every \
                     notification would be rejected."
                );
                std::process::exit(1);
            }
        };

        let device_key = match env_non_empty("DEVICE_KEY") {
            Some(s) => s,
            None => {
                tracing::error!(
                    "DEVICE_KEY is required — it gates the actuator poll and \
                     manual-override endpoints. Use `openssl rand -hex 32` \
                     to generate one."
                );
                std::process::exit(1);
            }
        };

        let condition = ReleaseCondition {
            amount_cents: env_parse("REQUIRED_AMOUNT_CENTS", 800),
            method: env_non_empty("REQUIRED_METHOD")
                .unwrap_or_else(|| "PIX".to_string())
                .to_uppercase(),
            status: env_non_empty("REQUIRED_STATUS").unwrap_or_else(|| "PAID".to_string()),
        };

        let pour_duration = Duration::from_secs(env_parse("POUR_DURATION_SECS", 10));

        let actuator_url = env_non_empty("ACTUATOR_URL");
        if let Some(ref raw) = actuator_url {
            match url::Url::parse(raw) {
                Ok(url) if url.scheme() == "http" => {
                    // Common on a LAN-only solenoid board; worth a note.
                    tracing::warn!(url = %raw, "actuator URL is plain HTTP");
                }
                Ok(url) if url.scheme() == "https" => {}
                _ => {
                    tracing::error!(url = %raw, "ACTUATOR_URL is not a valid http(s) URL");
                    std::process::exit(1);
                }
            }
        }

        let orders = match (env_non_empty("PAGBANK_ACCESS_TOKEN"), env_non_empty("WEBHOOK_URL")) {
            (Some(access_token), Some(notification_url)) => Some(OrdersConfig {
                api_url: env_non_empty("PAGBANK_API_URL")
                    .unwrap_or_else(|| "https://sandbox.api.pagseguro.com".to_string()),
                access_token,
                notification_url,
                qr_expire_minutes: env_parse("QR_EXPIRE_MIN", 10),
                item_name: env_non_empty("ORDER_ITEM_NAME")
                    .unwrap_or_else(|| "Chope Pilsen 300ml".to_string()),
            }),
            _ => {
                tracing::info!(
                    "PAGBANK_ACCESS_TOKEN / WEBHOOK_URL not set — POST /orders disabled"
                );
                None
            }
        };

        let allowed_origins: Vec<String> = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let metrics_token = env_non_empty("METRICS_TOKEN").map(String::into_bytes);
        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set — /metrics requires PIXTAP_PUBLIC_METRICS=true");
        }

        let public_metrics = std::env::var("PIXTAP_PUBLIC_METRICS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            webhook_secret,
            device_key,
            condition,
            pour_duration,
            actuator_url,
            actuator_token: env_non_empty("ACTUATOR_TOKEN"),
            orders,
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
            rate_limit_rpm: env_parse("RATE_LIMIT_RPM", 120),
            allowed_origins,
            metrics_token,
            public_metrics,
        }
    }
}
