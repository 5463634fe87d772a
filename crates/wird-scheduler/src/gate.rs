//! Delivery gate: which of a tenant's prayer times are due right now and
//! not yet delivered.
//!
//! Detection runs on a coarse tick, so a trigger is due for a short window
//! after its instant rather than at the exact second. Idempotency comes from
//! `last_fired_at`: an instant within `dedup_margin` of the last delivered
//! one counts as already delivered.

use chrono::{Duration, NaiveDateTime};

use wird_core::config::SchedulerConfig;
use wird_core::tenant::{TenantRecord, TriggerName};

/// Gate tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    pub window: Duration,
    pub dedup_margin: Duration,
}

impl GateConfig {
    pub fn from_scheduler(config: &SchedulerConfig) -> Self {
        Self {
            window: Duration::minutes(config.fire_window_mins as i64),
            dedup_margin: Duration::minutes(config.dedup_margin_mins as i64),
        }
    }

    /// Past this age an undelivered trigger is dropped for the day.
    fn eligibility(&self) -> Duration {
        self.window.min(self.dedup_margin)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::from_scheduler(&SchedulerConfig::default())
    }
}

/// A trigger that should produce a release now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTrigger {
    pub name: TriggerName,
    pub instant: NaiveDateTime,
}

/// Outcome of evaluating one tenant at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// No trigger set for `now`'s date; never fire on a stale set.
    NeedsResolution,
    /// Due and undelivered triggers, oldest first. May be empty.
    Due(Vec<DueTrigger>),
}

/// Whether `instant` was already delivered according to `last_fired_at`.
pub fn already_delivered(
    last_fired_at: Option<NaiveDateTime>,
    instant: NaiveDateTime,
    dedup_margin: Duration,
) -> bool {
    last_fired_at.is_some_and(|last| (last - instant).abs() < dedup_margin)
}

/// Evaluate the gate for `record` at `now`.
pub fn evaluate(record: &TenantRecord, now: NaiveDateTime, config: &GateConfig) -> GateDecision {
    let Some(set) = record
        .trigger_set
        .as_ref()
        .filter(|set| set.is_valid_on(now.date()))
    else {
        return GateDecision::NeedsResolution;
    };

    let eligible_for = config.eligibility();
    let mut due: Vec<DueTrigger> = set
        .instants()
        .into_iter()
        .filter(|(_, instant)| *instant <= now && now < *instant + eligible_for)
        .filter(|(_, instant)| !already_delivered(record.last_fired_at, *instant, config.dedup_margin))
        .map(|(name, instant)| DueTrigger { name, instant })
        .collect();
    due.sort_by_key(|t| t.instant);
    GateDecision::Due(due)
}
