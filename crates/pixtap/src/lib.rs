//! Webhook verification and tap authorization for a PIX-paid beverage tap.
//!
//! The payment provider delivers signed, at-least-once webhook notifications.
//! This crate owns the part with real invariants:
//!
//! - [`signature`] — authenticates a notification against the shared secret
//!   and the raw (unparsed) request body
//! - [`event`] — normalizes the provider payload into a [`PaymentEvent`]
//! - [`controller`] — deduplicates events and drives the time-bounded
//!   release window the actuator polls against
//!
//! No HTTP, no environment access, no I/O — the server crate
//! (`pixtap-server`) wires these into actix-web routes and injects resolved
//! configuration.

pub mod controller;
pub mod error;
pub mod event;
pub mod security;
pub mod signature;

pub use controller::{Decision, IgnoreReason, ReleaseCondition, TapController, MAX_WINDOW};
pub use error::TapError;
pub use event::PaymentEvent;
