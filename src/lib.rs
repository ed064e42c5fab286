//! Client-side trust and abuse-mitigation layer.
//!
//! Raises the cost of casual abuse of form submissions and keeps a forensic
//! trail for an operator. It is not a server-side security boundary.

pub mod admin;
pub mod audit;
pub mod config;
pub mod gate;
pub mod http;
pub mod layer;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod security;
pub mod session;
pub mod storage;

pub use audit::{AuditEntry, AuditEvent, AuditLog};
pub use config::GuardConfig;
pub use gate::{GatePolicy, GateState, Submission, SubmissionGate, Verdict};
pub use http::GuardServer;
pub use layer::TrustLayer;
pub use lifecycle::Shutdown;
