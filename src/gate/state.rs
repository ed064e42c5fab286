//! Gate state and verdict types.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::config::GateConfig;
use crate::security::ValidationRule;

/// Observable gate state: `Idle`, or `Blocked` with a countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateState {
    pub blocked: bool,
    pub remaining_seconds: u64,
}

impl GateState {
    pub const IDLE: GateState = GateState {
        blocked: false,
        remaining_seconds: 0,
    };

    pub fn blocked_for(seconds: u64) -> Self {
        if seconds == 0 {
            Self::IDLE
        } else {
            Self {
                blocked: true,
                remaining_seconds: seconds,
            }
        }
    }
}

/// Attempt budget for one form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for GatePolicy {
    fn default() -> Self {
        GatePolicy::from(&GateConfig::default())
    }
}

impl From<&GateConfig> for GatePolicy {
    fn from(config: &GateConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            window: Duration::from_secs(config.window_secs),
        }
    }
}

/// What a form hands to the gate.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// The anti-replay token the form was rendered with.
    pub token: String,
    /// Raw field values, by field name.
    pub fields: BTreeMap<String, String>,
    /// Declared rules, by field name.
    pub rules: BTreeMap<String, ValidationRule>,
}

impl Submission {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn rule(mut self, name: impl Into<String>, rule: ValidationRule) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }
}

/// Why a submission was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    InvalidToken,
    RateLimited { retry_after_secs: u64 },
    MaliciousContent { field: String },
    Invalid { errors: Vec<String> },
}

impl Rejection {
    /// Text suitable for a toast.
    pub fn message(&self) -> String {
        match self {
            Rejection::InvalidToken => {
                "Your session has expired. Please refresh the page and try again.".to_string()
            }
            Rejection::RateLimited { retry_after_secs } => format!(
                "Too many attempts. Please wait {} seconds before trying again.",
                retry_after_secs
            ),
            Rejection::MaliciousContent { .. } => {
                "Your input contains content that is not allowed.".to_string()
            }
            Rejection::Invalid { .. } => "Please correct the highlighted fields.".to_string(),
        }
    }

    /// Metric label.
    pub fn outcome(&self) -> &'static str {
        match self {
            Rejection::InvalidToken => "invalid_token",
            Rejection::RateLimited { .. } => "rate_limited",
            Rejection::MaliciousContent { .. } => "malicious_content",
            Rejection::Invalid { .. } => "invalid",
        }
    }
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Accepted; carries the sanitized field values.
    Accepted { fields: BTreeMap<String, String> },
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Accepted { .. } => None,
            Verdict::Rejected(rejection) => Some(rejection),
        }
    }
}
