//! Pipeline Layer
//!
//! Drives the collect → export → clear cycle.
//!
//! # Components
//!
//! - [`Batch`] / [`BatchSet`]: per-kind ordered, duplicate-free record stores
//! - [`Collector`]: fetches configured objects and stamps provenance
//! - [`Scheduler`]: runs the cycle on a fixed period until cancelled

mod batch;
mod collector;
mod scheduler;

pub use batch::{Batch, BatchSet};
pub use collector::{CollectStats, Collector};
pub use scheduler::Scheduler;
