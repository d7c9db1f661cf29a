// Upstream fetch capability — the seam between the resolution core and the
// taste API. The core only ever sees this trait; retries, backoff, and
// HTTP-level details live behind it.

pub mod qloo;

use crate::core::constraints::Category;
use crate::core::signals::Signals;
use crate::error::FetchError;
use std::future::Future;
use std::pin::Pin;

pub use qloo::QlooClient;

/// Demographic/interest context handed to the upstream per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchContext {
    pub age: u32,
    pub location: String,
    pub interests: Vec<String>,
    pub occupation: Option<String>,
}

impl FetchContext {
    /// Collapse validated signals into the single-age shape the upstream
    /// takes. The range midpoint stands in for the audience.
    #[must_use]
    pub fn from_signals(signals: &Signals) -> Self {
        Self {
            age: signals.demographics.age.midpoint(),
            location: signals.demographics.location.clone(),
            interests: signals.interests.clone(),
            occupation: signals.demographics.occupation.clone(),
        }
    }
}

/// Pluggable capability producing already-validated item names for one
/// category. Implementations own their retry/backoff policy; callers only
/// see success or a taxonomized error.
pub trait FetchCapability: Send + Sync {
    fn fetch<'a>(
        &'a self,
        category: Category,
        ctx: &'a FetchContext,
        take: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, FetchError>> + Send + 'a>>;
}
