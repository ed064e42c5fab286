//! Developer-tooling heuristics. Observational only.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outer and inner window sizes in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDimensions {
    pub outer_width: u32,
    pub outer_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
}

impl WindowDimensions {
    /// (width, height) taken up by browser chrome and docked panels.
    pub fn deltas(&self) -> (u32, u32) {
        (
            self.outer_width.saturating_sub(self.inner_width),
            self.outer_height.saturating_sub(self.inner_height),
        )
    }

    /// A docked tools panel makes the outer window notably larger than the
    /// viewport along one axis.
    pub fn suggests_devtools(&self, threshold_px: u32) -> bool {
        let (w, h) = self.deltas();
        w > threshold_px || h > threshold_px
    }
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyCombo {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyCombo {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// F12, Ctrl+Shift+I/J/C, Ctrl+U and the macOS Cmd+Opt+I/J/C variants.
    pub fn is_devtools_shortcut(&self) -> bool {
        let key = self.key.to_ascii_uppercase();
        match key.as_str() {
            "F12" => true,
            "I" | "J" | "C" => (self.ctrl && self.shift) || (self.meta && self.alt),
            "U" => self.ctrl && !self.shift && !self.alt,
            _ => false,
        }
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.meta {
            write!(f, "Meta+")?;
        }
        if self.alt {
            write!(f, "Alt+")?;
        }
        if self.shift {
            write!(f, "Shift+")?;
        }
        write!(f, "{}", self.key.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_divergence() {
        let docked = WindowDimensions {
            outer_width: 1440,
            outer_height: 900,
            inner_width: 1000,
            inner_height: 780,
        };
        assert_eq!(docked.deltas(), (440, 120));
        assert!(docked.suggests_devtools(160));

        let normal = WindowDimensions {
            outer_width: 1440,
            outer_height: 900,
            inner_width: 1440,
            inner_height: 800,
        };
        assert!(!normal.suggests_devtools(160));

        // Inner larger than outer (zoomed) never underflows.
        let zoomed = WindowDimensions {
            outer_width: 800,
            outer_height: 600,
            inner_width: 1600,
            inner_height: 1200,
        };
        assert_eq!(zoomed.deltas(), (0, 0));
    }

    #[test]
    fn test_shortcuts() {
        assert!(KeyCombo::new("F12").is_devtools_shortcut());
        assert!(KeyCombo::new("i").ctrl().shift().is_devtools_shortcut());
        assert!(KeyCombo::new("J").meta().alt().is_devtools_shortcut());
        assert!(KeyCombo::new("u").ctrl().is_devtools_shortcut());

        assert!(!KeyCombo::new("c").ctrl().is_devtools_shortcut());
        assert!(!KeyCombo::new("i").shift().is_devtools_shortcut());
        assert!(!KeyCombo::new("Enter").is_devtools_shortcut());
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyCombo::new("i").ctrl().shift().to_string(), "Ctrl+Shift+I");
        assert_eq!(KeyCombo::new("F12").to_string(), "F12");
    }
}
