//! HTTP surface for the PIX tap service.
//!
//! Thin glue around the [`pixtap`] core: actix-web routes, env-resolved
//! configuration, prometheus metrics, and the outbound clients (tap
//! actuator, provider order API). All payment decisions happen in
//! [`pixtap::TapController`]; this crate only moves bytes in and out.
//!
//! # Modules
//!
//! - [`routes`] — HTTP endpoints (webhook, pour poll, manual test, orders,
//!   health, metrics)
//! - [`state`] — shared [`AppState`](state::AppState)
//! - [`config`] — environment-driven [`ServerConfig`](config::ServerConfig)
//! - [`actuator`] — fire-and-forget solenoid notification
//! - [`orders`] — PIX QR order creation against the provider REST API
//! - [`metrics`] — prometheus counters for webhook outcomes

pub mod actuator;
pub mod config;
pub mod metrics;
pub mod orders;
pub mod routes;
pub mod state;
