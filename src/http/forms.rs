//! Form and page-reporter handlers.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::gate::{GateState, Rejection, Submission, Verdict};
use crate::http::server::AppState;
use crate::monitor::MonitorEvent;
use crate::security::validation::{compile_rules, RuleSpec};

const MAX_FORM_ID_LEN: usize = 64;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub token: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSpec>,
    /// Where the form lives, if the page moved since the last report.
    #[serde(default)]
    pub page_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    pub message: Option<String>,
    pub errors: Vec<String>,
    pub fields: BTreeMap<String, String>,
    pub state: GateState,
}

#[derive(Debug, Serialize)]
pub struct MountResponse {
    pub form_id: String,
    pub token: String,
    pub state: GateState,
}

#[derive(Debug, Deserialize)]
pub struct NavigationReport {
    pub url: String,
}

fn valid_form_id(form_id: &str) -> bool {
    !form_id.is_empty()
        && form_id.len() <= MAX_FORM_ID_LEN
        && form_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn report_navigation(
    State(state): State<AppState>,
    Json(report): Json<NavigationReport>,
) -> StatusCode {
    state.inner.layer.audit.page().set_url(report.url);
    StatusCode::NO_CONTENT
}

pub async fn mount_form(State(state): State<AppState>, Path(form_id): Path<String>) -> Response {
    if !valid_form_id(&form_id) {
        return (StatusCode::BAD_REQUEST, "Invalid form id").into_response();
    }

    let gate = state.mount_gate(&form_id);
    let token = gate.issue_token();

    Json(MountResponse {
        form_id,
        token,
        state: gate.state(),
    })
    .into_response()
}

pub async fn submit_form(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    let Some(gate) = state.gate(&form_id) else {
        return (StatusCode::NOT_FOUND, "Form not mounted").into_response();
    };

    let rules = match compile_rules(request.rules) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::warn!(form_id = %form_id, error = %e, "Form supplied an unusable rule");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    if let Some(url) = request.page_url {
        state.inner.layer.audit.page().set_url(url);
    }

    let submission = Submission {
        token: request.token,
        fields: request.fields,
        rules,
    };

    let verdict = gate.validate_submission(&submission);
    let status = match verdict.rejection() {
        None => StatusCode::OK,
        Some(Rejection::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
        Some(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let body = match verdict {
        Verdict::Accepted { fields } => SubmitResponse {
            accepted: true,
            message: None,
            errors: Vec::new(),
            fields,
            state: gate.state(),
        },
        Verdict::Rejected(rejection) => SubmitResponse {
            accepted: false,
            message: Some(rejection.message()),
            errors: match rejection {
                Rejection::Invalid { errors } => errors,
                _ => Vec::new(),
            },
            fields: BTreeMap::new(),
            state: gate.state(),
        },
    };

    (status, Json(body)).into_response()
}

pub async fn form_state(State(state): State<AppState>, Path(form_id): Path<String>) -> Response {
    match state.gate(&form_id) {
        Some(gate) => Json(gate.state()).into_response(),
        None => (StatusCode::NOT_FOUND, "Form not mounted").into_response(),
    }
}

pub async fn unmount_form(State(state): State<AppState>, Path(form_id): Path<String>) -> StatusCode {
    if state.unmount_gate(&form_id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn monitor_event(
    State(state): State<AppState>,
    Json(event): Json<MonitorEvent>,
) -> StatusCode {
    match state.inner.monitor_tx.try_send(event) {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::warn!(error = %e, "Monitor event dropped");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_id_validation() {
        assert!(valid_form_id("contact"));
        assert!(valid_form_id("listing-42_booking"));
        assert!(!valid_form_id(""));
        assert!(!valid_form_id("a b"));
        assert!(!valid_form_id("<script>"));
        assert!(!valid_form_id(&"x".repeat(65)));
    }
}
