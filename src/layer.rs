//! Composition root for the trust layer.
//!
//! One `TrustLayer` per session. Tests build as many isolated instances as
//! they like; nothing here is a global.

use std::sync::Arc;

use crate::audit::AuditLog;
use crate::gate::{GatePolicy, SubmissionGate};
use crate::security::{InputValidator, RateLimiter, TokenIssuer};
use crate::session::{PageContext, Session};
use crate::storage::KeyValueStore;

/// The shared services every form gate composes.
#[derive(Clone)]
pub struct TrustLayer {
    pub session: Session,
    pub tokens: TokenIssuer,
    pub limiter: Arc<RateLimiter>,
    pub audit: AuditLog,
    pub validator: InputValidator,
    persistent: Arc<dyn KeyValueStore>,
}

impl TrustLayer {
    pub fn new(
        session_store: Arc<dyn KeyValueStore>,
        persistent: Arc<dyn KeyValueStore>,
        page: PageContext,
        audit_capacity: usize,
    ) -> Self {
        let session = Session::new(session_store.clone());
        let audit = AuditLog::new(persistent.clone(), session.clone(), page, audit_capacity);

        Self {
            tokens: TokenIssuer::new(session_store),
            limiter: Arc::new(RateLimiter::new()),
            validator: InputValidator::new(audit.clone()),
            audit,
            session,
            persistent,
        }
    }

    /// The persistent store the audit trail lives in.
    pub fn persistent(&self) -> &Arc<dyn KeyValueStore> {
        &self.persistent
    }

    /// Mount a gate for `form_id`.
    pub fn gate(&self, form_id: impl Into<String>, policy: GatePolicy) -> SubmissionGate {
        SubmissionGate::new(form_id, policy, self)
    }
}
