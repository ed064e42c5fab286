//! Submission gate: the unit forms talk to.
//!
//! # State Machine
//! ```text
//! Idle --valid token, allowed, clean content--> Idle (accepted)
//! Idle --rate limiter rejects--> Blocked(T), T = seconds left in window
//! Blocked(T) --one second--> Blocked(T-1) ... Blocked(1) --> Idle
//! any --invalid token / malicious content / rule violations--> unchanged (rejected)
//! ```
//!
//! # Design Decisions
//! - `validate_submission` is synchronous and never panics
//! - Every abuse rejection is recorded before the verdict is returned
//! - The countdown is a tokio task; it stops itself at zero and is aborted
//!   on dispose or drop, so no timer outlives its form

pub mod state;

pub use state::{GatePolicy, GateState, Rejection, Submission, Verdict};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::audit::{AuditEvent, AuditLog};
use crate::layer::TrustLayer;
use crate::observability::metrics;
use crate::security::sanitize::excerpt;
use crate::security::{detect_threat, sanitize, InputValidator, RateLimiter, TokenIssuer};
use crate::session::Session;

const TICK: Duration = Duration::from_secs(1);

/// Per-form gate combining token, rate limit and content checks.
pub struct SubmissionGate {
    form_id: String,
    policy: GatePolicy,
    session: Session,
    tokens: TokenIssuer,
    limiter: Arc<RateLimiter>,
    validator: InputValidator,
    audit: AuditLog,
    state: Arc<watch::Sender<GateState>>,
    countdown: Mutex<Option<JoinHandle<()>>>,
}

impl SubmissionGate {
    pub fn new(form_id: impl Into<String>, policy: GatePolicy, layer: &TrustLayer) -> Self {
        let (state, _) = watch::channel(GateState::IDLE);
        Self {
            form_id: form_id.into(),
            policy,
            session: layer.session.clone(),
            tokens: layer.tokens.clone(),
            limiter: layer.limiter.clone(),
            validator: layer.validator.clone(),
            audit: layer.audit.clone(),
            state: Arc::new(state),
            countdown: Mutex::new(None),
        }
    }

    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Observe state changes, including every countdown tick.
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    /// Issue a fresh token for this form to render with.
    pub fn issue_token(&self) -> String {
        self.tokens.issue()
    }

    /// Rate limiter key for this form in the current session.
    pub fn limiter_key(&self) -> String {
        format!("{}:{}", self.form_id, self.session.id())
    }

    /// Decide on a submission.
    pub fn validate_submission(&self, submission: &Submission) -> Verdict {
        let verdict = self.evaluate(submission);
        match &verdict {
            Verdict::Accepted { .. } => {
                metrics::record_submission("accepted");
                tracing::debug!(form_id = %self.form_id, "Submission accepted");
            }
            Verdict::Rejected(rejection) => {
                metrics::record_submission(rejection.outcome());
                tracing::info!(
                    form_id = %self.form_id,
                    outcome = rejection.outcome(),
                    "Submission rejected"
                );
            }
        }
        verdict
    }

    fn evaluate(&self, submission: &Submission) -> Verdict {
        if !self.tokens.validate(&submission.token) {
            self.audit.record(AuditEvent::InvalidCsrfToken {
                form_id: self.form_id.clone(),
            });
            return Verdict::Rejected(Rejection::InvalidToken);
        }

        let key = self.limiter_key();
        if !self
            .limiter
            .is_allowed(&key, self.policy.max_attempts, self.policy.window)
        {
            let retry_after_secs = self.limiter.remaining_time(&key);
            self.audit.record(AuditEvent::RateLimitExceeded {
                form_id: self.form_id.clone(),
                key,
                retry_after_secs,
            });
            self.start_countdown(retry_after_secs);
            return Verdict::Rejected(Rejection::RateLimited { retry_after_secs });
        }

        for (field, value) in &submission.fields {
            if let Some(threat) = detect_threat(value) {
                self.audit.record(AuditEvent::MaliciousContentDetected {
                    form_id: Some(self.form_id.clone()),
                    field: field.clone(),
                    threat,
                    excerpt: excerpt(value, 64),
                });
                return Verdict::Rejected(Rejection::MaliciousContent {
                    field: field.clone(),
                });
            }
        }

        if !submission.rules.is_empty() {
            let result = self.validator.validate(&submission.fields, &submission.rules);
            if !result.is_valid {
                return Verdict::Rejected(Rejection::Invalid {
                    errors: result.errors,
                });
            }
        }

        Verdict::Accepted {
            fields: submission
                .fields
                .iter()
                .map(|(name, value)| (name.clone(), sanitize(value)))
                .collect(),
        }
    }

    fn start_countdown(&self, seconds: u64) {
        let mut countdown = self.countdown.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = countdown.take() {
            previous.abort();
        }

        self.state.send_replace(GateState::blocked_for(seconds));
        if seconds == 0 {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(form_id = %self.form_id, "No runtime for countdown; gate stays blocked until next submission");
            return;
        };

        let state = self.state.clone();
        let form_id = self.form_id.clone();
        *countdown = Some(runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
            let mut remaining = seconds;
            while remaining > 0 {
                ticker.tick().await;
                remaining -= 1;
                state.send_replace(GateState::blocked_for(remaining));
            }
            tracing::debug!(form_id = %form_id, "Gate unblocked");
        }));
    }

    /// Cancel any pending countdown. Called when the form unmounts.
    pub fn dispose(&self) {
        let mut countdown = self.countdown.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = countdown.take() {
            handle.abort();
            tracing::debug!(form_id = %self.form_id, "Countdown cancelled");
        }
    }
}

impl Drop for SubmissionGate {
    fn drop(&mut self) {
        self.dispose();
    }
}
