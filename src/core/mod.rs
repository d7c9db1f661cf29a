// Resolution core. Leaves first: signals and constraints are plain value
// types, cache/fallback/metrics are shared services, batch and resolver sit
// on top.

pub mod batch;
pub mod cache;
pub mod constraints;
pub mod fallback;
pub mod fetch;
pub mod metrics;
pub mod resolver;
pub mod signals;
