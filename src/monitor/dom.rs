//! Inspection of element subtrees attached to the live document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Nesting beyond this is not inspected.
const MAX_DEPTH: usize = 64;

/// A newly attached element as reported by the page, with its subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<ElementSnapshot>,
}

impl ElementSnapshot {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: ElementSnapshot) -> Self {
        self.children.push(child);
        self
    }
}

/// Why an element was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspicionReason {
    ScriptElement,
    IframeElement,
    InlineHandler,
}

impl SuspicionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SuspicionReason::ScriptElement => "script_element",
            SuspicionReason::IframeElement => "iframe_element",
            SuspicionReason::InlineHandler => "inline_handler",
        }
    }
}

/// A flagged element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspiciousNode {
    pub tag: String,
    pub reason: SuspicionReason,
    pub attributes: Vec<String>,
}

/// Walk `root` and its descendants, collecting every suspicious element.
pub fn inspect(root: &ElementSnapshot) -> Vec<SuspiciousNode> {
    let mut found = Vec::new();
    walk(root, 0, &mut found);
    found
}

fn walk(node: &ElementSnapshot, depth: usize, found: &mut Vec<SuspiciousNode>) {
    if depth > MAX_DEPTH {
        tracing::debug!(tag = %node.tag, "Subtree too deep, inspection truncated");
        return;
    }

    let tag = node.tag.to_ascii_lowercase();
    let reason = match tag.as_str() {
        "script" => Some(SuspicionReason::ScriptElement),
        "iframe" => Some(SuspicionReason::IframeElement),
        _ if node.attributes.keys().any(|name| is_event_handler(name)) => {
            Some(SuspicionReason::InlineHandler)
        }
        _ => None,
    };

    if let Some(reason) = reason {
        found.push(SuspiciousNode {
            tag,
            reason,
            attributes: node.attributes.keys().cloned().collect(),
        });
    }

    for child in &node.children {
        walk(child, depth + 1, found);
    }
}

fn is_event_handler(attribute: &str) -> bool {
    let lower = attribute.to_ascii_lowercase();
    lower.len() > 2 && lower.starts_with("on")
}
