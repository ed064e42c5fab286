//! HTTP surface of the sidecar.
//!
//! # Data Flow
//! ```text
//! Embedded shell (loopback)
//!     → server.rs (Axum setup, layers)
//!     → request.rs (request ID, span)
//!     → forms.rs (mount / submit / state / unmount, page reports)
//!     → admin (operator surface, role-gated)
//! ```

pub mod forms;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, GuardServer};
