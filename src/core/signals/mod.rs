// Signal input model — untrusted `RawSignals` in, validated `Signals` out.

pub mod types;
pub mod validator;

pub use types::{AgeRange, CulturalContext, Demographics, Language, RawSignals, Signals};
pub use validator::validate;
