//! Client-side API quota enforcement
//!
//! This module tracks calls made against external services over a sliding
//! one-hour window so the CLI never burns through a provider's free tier.
//! Only the weather/geocoding service is throttled; the alert generation
//! service is exempt by policy.

mod quota;

pub use quota::{ApiService, QuotaLimits, QuotaTracker, EXEMPT_REMAINING};
