//! # WirdBot Scheduler
//!
//! Prayer-time paced delivery engine.
//!
//! ## Architecture
//! ```text
//! SchedulerEngine (tokio interval, one tick per minute)
//!   ├── refresh phase: stale trigger set → TriggerResolver → TenantStore
//!   └── fire phase:    gate::evaluate → cycler::advance → content::compose
//!                        → Transport (album, then follow-ups)
//!                        → commit position / last_fired_at on success
//! ```
//!
//! The store is a single JSON document rewritten on every mutation, so a
//! restart resumes exactly where the last successful delivery left off.

pub mod content;
pub mod cycler;
pub mod engine;
pub mod gate;
pub mod store;

pub use cycler::{Release, advance};
pub use engine::{SchedulerEngine, TickReport, spawn_scheduler, with_rate_limit_retry};
pub use gate::{DueTrigger, GateConfig, GateDecision};
pub use store::{SharedStore, TenantStore};
