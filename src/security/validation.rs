//! Declarative field validation.
//!
//! Rules are supplied by the form; this module only interprets them. For each
//! declared field the checks run in order: required, length, pattern, custom.
//! A missing required value skips the remaining checks for that field only.
//! Independently, every submitted field goes through the denylist.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::{AuditEvent, AuditLog};
use crate::security::sanitize::{detect_threat, excerpt};

/// Predicate for rules a regex cannot express.
pub type CustomCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Constraints on one field.
#[derive(Clone, Default)]
pub struct ValidationRule {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub custom: Option<CustomCheck>,
    pub custom_message: Option<String>,
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .field("custom", &self.custom.is_some())
            .field("custom_message", &self.custom_message)
            .finish()
    }
}

impl ValidationRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn custom(mut self, check: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.custom = Some(Arc::new(check));
        self
    }

    /// Message reported when the pattern or custom check fails.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.custom_message = Some(message.into());
        self
    }

    fn check(&self, field: &str, value: &str, errors: &mut Vec<String>) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            if self.required {
                errors.push(format!("{} is required", field));
            }
            // Optional and empty: nothing else applies.
            return;
        }

        let len = value.chars().count();
        if let Some(min) = self.min_length {
            if len < min {
                errors.push(format!("{} must be at least {} characters", field, min));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                errors.push(format!("{} must be at most {} characters", field, max));
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                errors.push(
                    self.custom_message
                        .clone()
                        .unwrap_or_else(|| format!("{} has an invalid format", field)),
                );
            }
        }
        if let Some(custom) = &self.custom {
            if !custom(value) {
                errors.push(
                    self.custom_message
                        .clone()
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                );
            }
        }
    }
}

/// Serializable form of a rule, as sent by a form over the wire.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleSpec {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl TryFrom<RuleSpec> for ValidationRule {
    type Error = RuleError;

    fn try_from(spec: RuleSpec) -> Result<Self, Self::Error> {
        let pattern = match spec.pattern {
            Some(p) => Some(Regex::new(&p).map_err(|source| RuleError::Pattern { pattern: p, source })?),
            None => None,
        };
        Ok(Self {
            required: spec.required,
            min_length: spec.min_length,
            max_length: spec.max_length,
            pattern,
            custom: None,
            custom_message: spec.message,
        })
    }
}

/// Convert a whole rule map, failing on the first bad pattern.
pub fn compile_rules(
    specs: BTreeMap<String, RuleSpec>,
) -> Result<BTreeMap<String, ValidationRule>, RuleError> {
    specs
        .into_iter()
        .map(|(field, spec)| Ok((field, ValidationRule::try_from(spec)?)))
        .collect()
}

/// Every violation found, across all fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Runs declared rules plus the denylist, reporting hits to the audit log.
#[derive(Clone)]
pub struct InputValidator {
    audit: AuditLog,
}

impl InputValidator {
    pub fn new(audit: AuditLog) -> Self {
        Self { audit }
    }

    pub fn validate(
        &self,
        input: &BTreeMap<String, String>,
        rules: &BTreeMap<String, ValidationRule>,
    ) -> ValidationResult {
        let mut errors = Vec::new();

        for (field, rule) in rules {
            let value = input.get(field).map(String::as_str).unwrap_or("");
            rule.check(field, value, &mut errors);
        }

        for (field, value) in input {
            if let Some(threat) = detect_threat(value) {
                errors.push(format!("{} contains invalid content", field));
                self.audit.record(AuditEvent::MaliciousContentDetected {
                    form_id: None,
                    field: field.clone(),
                    threat,
                    excerpt: excerpt(value, 64),
                });
            }
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}
