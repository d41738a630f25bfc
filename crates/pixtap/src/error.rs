use thiserror::Error;

/// Errors surfaced by the outbound clients (provider REST API, actuator).
///
/// The webhook decision path never returns these — it is total and degrades
/// malformed input to an ignored decision instead.
#[derive(Debug, Error)]
pub enum TapError {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("http error: {0}")]
    HttpError(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}
