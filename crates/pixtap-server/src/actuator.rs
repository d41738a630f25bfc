//! Fire-and-forget notification to the tap solenoid board.
//!
//! The webhook response is decided before this runs and never waits on it.
//! A slow or offline board is logged and counted, nothing more — surfacing
//! it to the payment provider would only trigger its redelivery storm.

use serde::Serialize;

use crate::metrics;

#[derive(Debug, Clone)]
pub struct ActuatorConfig {
    pub url: String,
    /// Shared token the board checks before opening the valve.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTapCommand {
    pub action: String,
    pub reference_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub end_to_end_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub pour_ms: u64,
}

impl OpenTapCommand {
    pub fn open(
        config: &ActuatorConfig,
        reference_id: Option<String>,
        amount_cents: Option<i64>,
        end_to_end_id: Option<String>,
        pour_ms: u64,
    ) -> Self {
        Self {
            action: "OPEN_TAP".to_string(),
            reference_id,
            amount_cents,
            end_to_end_id,
            token: config.token.clone(),
            pour_ms,
        }
    }
}

/// HTTP client for actuator calls: short timeouts, no redirects — the board
/// is a single LAN device, not a general web endpoint.
pub fn actuator_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(2))
        .timeout(std::time::Duration::from_secs(5))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_default()
}

/// POST the command to the board without blocking the caller.
pub fn fire_open_tap(client: &reqwest::Client, config: &ActuatorConfig, command: OpenTapCommand) {
    let client = client.clone();
    let url = config.url.clone();

    tokio::spawn(async move {
        let result = client.post(&url).json(&command).send().await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                metrics::ACTUATOR_CALLS.with_label_values(&["ok"]).inc();
                tracing::info!(
                    url = %url,
                    reference = command.reference_id.as_deref().unwrap_or("-"),
                    "tap opened"
                );
            }
            Ok(resp) => {
                metrics::ACTUATOR_CALLS
                    .with_label_values(&["rejected"])
                    .inc();
                tracing::warn!(url = %url, status = %resp.status(), "actuator rejected command");
            }
            Err(e) => {
                metrics::ACTUATOR_CALLS.with_label_values(&["error"]).inc();
                tracing::warn!(url = %url, error = %e, "actuator unreachable");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_serializes_camel_case_and_skips_absent_token() {
        let config = ActuatorConfig {
            url: "http://192.168.0.50/unlock".to_string(),
            token: None,
        };
        let cmd = OpenTapCommand::open(
            &config,
            Some("chope-1".to_string()),
            Some(800),
            Some("E2E1".to_string()),
            10_000,
        );
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["action"], "OPEN_TAP");
        assert_eq!(json["referenceId"], "chope-1");
        assert_eq!(json["amountCents"], 800);
        assert_eq!(json["endToEndId"], "E2E1");
        assert_eq!(json["pourMs"], 10_000);
        assert!(json.get("token").is_none());
    }

    #[test]
    fn command_carries_configured_token() {
        let config = ActuatorConfig {
            url: "http://192.168.0.50/unlock".to_string(),
            token: Some("board-secret".to_string()),
        };
        let cmd = OpenTapCommand::open(&config, None, None, None, 3_000);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["token"], "board-secret");
    }
}
