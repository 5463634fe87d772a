//! # WirdBot Core
//! Shared types, configuration, errors and the collaborator traits
//! (prayer-time lookup, outbound transport) every other crate builds on.

pub mod config;
pub mod error;
pub mod tenant;
pub mod traits;

pub use config::WirdConfig;
pub use error::{ResolveError, Result, TransportError, WirdError};
pub use tenant::{Location, TenantId, TenantMetadata, TenantRecord, TriggerName, TriggerSet};
pub use traits::{Transport, TriggerResolver};
