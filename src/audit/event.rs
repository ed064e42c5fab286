//! Audit entry types.

use serde::{Deserialize, Serialize};

use crate::security::ThreatKind;

/// What happened, with a payload specific to each kind of event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "details", rename_all = "snake_case")]
pub enum AuditEvent {
    InvalidCsrfToken {
        form_id: String,
    },
    RateLimitExceeded {
        form_id: String,
        key: String,
        retry_after_secs: u64,
    },
    MaliciousContentDetected {
        form_id: Option<String>,
        field: String,
        threat: ThreatKind,
        excerpt: String,
    },
    SuspiciousDomModification {
        tag: String,
        reason: String,
        attributes: Vec<String>,
    },
    DevtoolsSuspected {
        width_delta: u32,
        height_delta: u32,
    },
    DevtoolsShortcut {
        combo: String,
    },
    StorageSizeExceeded {
        bytes: usize,
        limit: usize,
    },
    StorageIntegrity {
        key: String,
        error: String,
    },
}

impl AuditEvent {
    /// Stable tag for the event kind.
    pub fn action(&self) -> &'static str {
        match self {
            AuditEvent::InvalidCsrfToken { .. } => "invalid_csrf_token",
            AuditEvent::RateLimitExceeded { .. } => "rate_limit_exceeded",
            AuditEvent::MaliciousContentDetected { .. } => "malicious_content_detected",
            AuditEvent::SuspiciousDomModification { .. } => "suspicious_dom_modification",
            AuditEvent::DevtoolsSuspected { .. } => "devtools_suspected",
            AuditEvent::DevtoolsShortcut { .. } => "devtools_shortcut",
            AuditEvent::StorageSizeExceeded { .. } => "storage_size_exceeded",
            AuditEvent::StorageIntegrity { .. } => "storage_integrity",
        }
    }
}

/// One immutable record in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub event: AuditEvent,
    pub agent: String,
    pub page_url: String,
    pub session_id: String,
}
