#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

//! Cultural signal resolution engine.
//!
//! Turns a validated set of demographic/interest signals into a complete,
//! multi-category set of cultural constraints sourced from a rate-limited
//! taste API, keeping latency and cost bounded through caching, request
//! deduplication, bounded concurrency, adaptive TTLs, and fallback
//! injection.

pub mod config;
pub mod core;
pub mod error;

pub use crate::core::constraints::{Category, CulturalConstraints};
pub use crate::core::fetch::{FetchCapability, FetchContext};
pub use crate::core::metrics::{AggregateSnapshot, MetricsCollector};
pub use crate::core::resolver::{SignalResolver, create_resolver};
pub use crate::core::signals::{RawSignals, Signals, validate};
pub use config::EngineConfig;
pub use error::{EngineError, FetchError, ResolutionError, Result, ValidationError};
