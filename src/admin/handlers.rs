use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::auth::Role;
use crate::audit::AuditEntry;
use crate::http::server::AppState;

const DEFAULT_AUDIT_LIMIT: usize = 50;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub active_forms: usize,
    pub blocked_forms: usize,
    pub rate_limited_keys: usize,
    pub suspicious_events: u64,
    pub audit_entries: usize,
    pub audit_capacity: usize,
}

#[derive(Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let inner = &state.inner;
    let blocked_forms = inner
        .gates
        .iter()
        .filter(|r| r.value().state().blocked)
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: inner.started_at.elapsed().as_secs(),
        active_forms: inner.gates.len(),
        blocked_forms,
        rate_limited_keys: inner.layer.limiter.tracked_keys(),
        suspicious_events: inner.monitor.suspicious_count(),
        audit_entries: inner.layer.audit.count(),
        audit_capacity: inner.layer.audit.capacity(),
    })
}

/// Most recent entries, oldest first.
pub async fn get_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<AuditEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    Json(state.inner.layer.audit.read_recent(limit))
}

pub async fn clear_audit(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
) -> StatusCode {
    if !role.can_clear() {
        tracing::warn!(role = ?role, "Audit clear refused for insufficient role");
        return StatusCode::FORBIDDEN;
    }
    state.inner.layer.audit.clear();
    StatusCode::NO_CONTENT
}
