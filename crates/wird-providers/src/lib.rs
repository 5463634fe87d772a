//! # WirdBot Providers
//! Prayer-time lookup services implementing [`wird_core::TriggerResolver`].

pub mod aladhan;

pub use aladhan::AladhanResolver;
