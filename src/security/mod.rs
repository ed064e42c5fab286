//! Submission-time security primitives.
//!
//! # Data Flow
//! ```text
//! Form submission:
//!     → token.rs (anti-replay token must round-trip)
//!     → rate_limit.rs (per-form attempt window)
//!     → sanitize.rs (denylist over every field, escaping for output)
//!     → validation.rs (declared field rules)
//!     → Accept or reject (see gate)
//! ```
//!
//! # Design Decisions
//! - Each primitive is independently constructible and testable
//! - Fail closed: a token that cannot be checked is invalid
//! - No trust in client input; nothing here is a server-side boundary

pub mod rate_limit;
pub mod sanitize;
pub mod token;
pub mod validation;

pub use rate_limit::RateLimiter;
pub use sanitize::{contains_malicious_content, detect_threat, sanitize, ThreatKind};
pub use token::TokenIssuer;
pub use validation::{InputValidator, RuleSpec, ValidationResult, ValidationRule};
