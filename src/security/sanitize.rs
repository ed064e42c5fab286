//! Markup escaping and injection detection.
//!
//! `contains_malicious_content` is a denylist of common injection idioms, not
//! a parser-based sanitizer. It catches the usual script-tag, scheme, handler
//! and data-URI payloads; it is not a complete XSS defense and does not try
//! to be. Escaping with `sanitize` is what keeps rendered values inert.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Family of injection idiom matched by the denylist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    ScriptTag,
    ScriptScheme,
    EventHandler,
    Eval,
    Iframe,
    Base64Payload,
}

impl ThreatKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreatKind::ScriptTag => "script_tag",
            ThreatKind::ScriptScheme => "script_scheme",
            ThreatKind::EventHandler => "event_handler",
            ThreatKind::Eval => "eval",
            ThreatKind::Iframe => "iframe",
            ThreatKind::Base64Payload => "base64_payload",
        }
    }
}

lazy_static! {
    static ref DENYLIST: Vec<(ThreatKind, Regex)> = [
        (ThreatKind::ScriptTag, r"(?i)<\s*/?\s*script\b"),
        (ThreatKind::ScriptScheme, r"(?i)\b(?:java|vb)script\s*:"),
        (ThreatKind::EventHandler, r"(?i)\bon[a-z]+\s*="),
        (ThreatKind::Eval, r"(?i)\beval\s*\("),
        (ThreatKind::Iframe, r"(?i)<\s*/?\s*iframe\b"),
        // data: URIs carrying markup or script, or base64 of "<script".
        (ThreatKind::Base64Payload, r"(?i)data:\s*(?:text/html|text/javascript|application/javascript)\s*;\s*base64"),
        (ThreatKind::Base64Payload, r"PHNjcmlwd"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("denylist pattern is valid")))
    .collect();
}

/// Escape markup-significant characters to their entity form.
///
/// Apply exactly once to each raw input. `&` is left alone, so escaping an
/// already escaped value is not a no-op.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            other => out.push(other),
        }
    }
    out
}

/// First denylisted idiom found in `text`, if any.
pub fn detect_threat(text: &str) -> Option<ThreatKind> {
    DENYLIST
        .iter()
        .find(|(_, regex)| regex.is_match(text))
        .map(|(kind, _)| *kind)
}

pub fn contains_malicious_content(text: &str) -> bool {
    detect_threat(text).is_some()
}

/// Shorten untrusted text before it goes into a log or audit entry.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_escapes_markup() {
        let escaped = sanitize("<script>x</script>");
        assert!(!escaped.contains("<script>"));
        assert_eq!(escaped, "&lt;script&gt;x&lt;&#x2F;script&gt;");

        assert_eq!(sanitize("a=\"b\" 'c' `d`"), "a&#x3D;&quot;b&quot; &#x27;c&#x27; &#x60;d&#x60;");
    }

    #[test]
    fn test_sanitize_leaves_plain_text() {
        assert_eq!(sanitize("Hello World"), "Hello World");
        assert_eq!(sanitize("Tom & Jerry"), "Tom & Jerry");
    }

    #[test]
    fn test_sanitize_is_not_idempotent_on_entities() {
        let once = sanitize("<");
        assert_eq!(sanitize(&once), "&lt;");
        assert_eq!(sanitize("&lt;/"), "&lt;&#x2F;");
    }

    #[test]
    fn test_detects_denylisted_idioms() {
        assert_eq!(detect_threat("<img onerror=alert(1)>"), Some(ThreatKind::EventHandler));
        assert_eq!(detect_threat("<SCRIPT src=x>"), Some(ThreatKind::ScriptTag));
        assert_eq!(detect_threat("JavaScript:alert(1)"), Some(ThreatKind::ScriptScheme));
        assert_eq!(detect_threat("vbscript:msgbox"), Some(ThreatKind::ScriptScheme));
        assert_eq!(detect_threat("eval (atob(x))"), Some(ThreatKind::Eval));
        assert_eq!(detect_threat("<iframe src=//evil>"), Some(ThreatKind::Iframe));
        assert_eq!(
            detect_threat("data:text/html;base64,AAAA"),
            Some(ThreatKind::Base64Payload)
        );
        assert_eq!(detect_threat("x PHNjcmlwdD5 y"), Some(ThreatKind::Base64Payload));
    }

    #[test]
    fn test_benign_text_passes() {
        assert!(!contains_malicious_content("I love <3 learning"));
        assert!(!contains_malicious_content("Hello World"));
        assert!(!contains_malicious_content("Evaluation of the apartment: great"));
        assert!(!contains_malicious_content("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("héllo", 2), "hé…");
        assert_eq!(excerpt("hi", 5), "hi");
    }
}
