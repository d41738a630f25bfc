//! Tap authorization state machine.
//!
//! Webhooks are delivered at least once, so a notification may arrive
//! several times; the actuator must fire exactly once per underlying payment
//! event. The controller owns the dedup ledger and the release window behind
//! a single mutex, so the check-then-act sequence over both is one atomic
//! unit even under a multi-threaded actix runtime. The window is lazily
//! evaluated on read — there is no timer; `poll` simply reports how much of
//! the window remains.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::event::PaymentEvent;

/// Upper bound on any single release window. A window is one pour, not a
/// lease; anything longer is a configuration mistake, and clamping here
/// keeps `now + duration` from overflowing the platform `Instant`.
pub const MAX_WINDOW: Duration = Duration::from_secs(60 * 60 * 24);

/// The exact-equality condition a charge must satisfy to open the tap.
/// Fixed at startup; there is no tolerance band on the amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCondition {
    pub amount_cents: i64,
    pub method: String,
    pub status: String,
}

impl ReleaseCondition {
    fn is_satisfied_by(&self, event: &PaymentEvent) -> bool {
        event.status == self.status
            && event.payment_method == self.method
            && event.amount_cents == Some(self.amount_cents)
    }
}

/// Outcome of processing one webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Condition satisfied; the release window was opened/extended.
    Released,
    /// Event id already in the ledger; nothing was mutated.
    Duplicate,
    /// Event evaluated but did not open the window.
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No resolvable event id — the event cannot be safely deduplicated, so
    /// neither the ledger nor the window is touched (fail-safe).
    MissingEventId,
    /// Status, method, or amount did not match the configured condition.
    ConditionNotMet,
}

impl Decision {
    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Released => "released",
            Decision::Duplicate => "duplicate",
            Decision::Ignored(IgnoreReason::MissingEventId) => "missing_event_id",
            Decision::Ignored(IgnoreReason::ConditionNotMet) => "condition_not_met",
        }
    }
}

struct WindowState {
    /// Event ids already evaluated. Grows monotonically, never pruned —
    /// acceptable for an ephemeral, low-volume device process.
    processed: HashSet<String>,
    /// End of the current release window. `None` means no window was ever
    /// opened; an elapsed instant means the window has closed.
    unlock_until: Option<Instant>,
}

/// Dedup ledger plus release window behind one exclusion domain.
///
/// All three operations (`on_event`, `poll`, `manual_override`) lock the
/// same mutex, so a poll never observes a torn window update and two
/// concurrent deliveries of the same event id cannot both pass the dedup
/// check. No I/O happens inside the critical section.
pub struct TapController {
    condition: ReleaseCondition,
    pour_duration: Duration,
    state: Mutex<WindowState>,
}

impl TapController {
    pub fn new(condition: ReleaseCondition, pour_duration: Duration) -> Self {
        Self {
            condition,
            pour_duration: pour_duration.min(MAX_WINDOW),
            state: Mutex::new(WindowState {
                processed: HashSet::new(),
                unlock_until: None,
            }),
        }
    }

    pub fn condition(&self) -> &ReleaseCondition {
        &self.condition
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WindowState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("tap controller mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Process a verified webhook event.
    pub fn on_event(&self, event: &PaymentEvent) -> Decision {
        self.on_event_at(event, Instant::now())
    }

    /// Deterministic variant of [`on_event`](Self::on_event) with an
    /// explicit clock, used by tests.
    pub fn on_event_at(&self, event: &PaymentEvent, now: Instant) -> Decision {
        let Some(event_id) = event.event_id.as_deref() else {
            return Decision::Ignored(IgnoreReason::MissingEventId);
        };

        let mut state = self.lock();

        if state.processed.contains(event_id) {
            return Decision::Duplicate;
        }

        // Mark the event as seen regardless of the condition outcome, so a
        // redelivery of a non-qualifying notification is a no-op too.
        state.processed.insert(event_id.to_string());

        if self.condition.is_satisfied_by(event) {
            // Last-write-wins: a qualifying event always resets the window
            // to now + pour_duration, it never stacks onto a prior window.
            state.unlock_until = Some(now + self.pour_duration);
            Decision::Released
        } else {
            Decision::Ignored(IgnoreReason::ConditionNotMet)
        }
    }

    /// Remaining authorized duration. Zero when the window is closed.
    /// Side-effect free; safe to call at arbitrary frequency.
    pub fn poll(&self) -> Duration {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&self, now: Instant) -> Duration {
        self.lock()
            .unlock_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Unconditionally open the window for `duration`, bypassing payment
    /// verification. Operator/debug path only; the caller must gate access
    /// separately from the production webhook. Durations beyond
    /// [`MAX_WINDOW`] are clamped rather than rejected.
    pub fn manual_override(&self, duration: Duration) {
        self.manual_override_at(duration, Instant::now());
    }

    pub fn manual_override_at(&self, duration: Duration, now: Instant) {
        self.lock().unlock_until = Some(now + duration.min(MAX_WINDOW));
    }

    /// Number of event ids recorded so far.
    pub fn ledger_len(&self) -> usize {
        self.lock().processed.len()
    }
}
