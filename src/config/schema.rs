//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sidecar.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Where persistent state lives.
    pub storage: StorageConfig,

    /// Identity reported in audit entries.
    pub page: PageConfig,

    /// Submission gate policy.
    pub gate: GateConfig,

    /// Audit trail settings.
    pub audit: AuditConfig,

    /// Document mutation monitor settings.
    pub monitor: MonitorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operator surface settings.
    pub admin: AdminConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address. Loopback only in normal deployments.
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:7878".to_string(),
            request_timeout_secs: 10,
            max_body_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the persistent store.
    pub persistent_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persistent_path: "trustgate-store.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PageConfig {
    /// Fixed agent descriptor stamped on every audit entry.
    pub agent: String,

    /// Page URL until the shell reports a navigation.
    pub initial_url: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            agent: concat!("trustgate/", env!("CARGO_PKG_VERSION")).to_string(),
            initial_url: "app://local/".to_string(),
        }
    }
}

/// Rate limit policy applied per form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GateConfig {
    /// Accepted attempts per window.
    pub max_attempts: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Entries kept before the oldest are dropped.
    pub capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: crate::audit::DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Run the monitor at all.
    pub enabled: bool,

    /// Viewport comparison interval in milliseconds.
    pub viewport_interval_ms: u64,

    /// Outer/inner size difference that suggests docked devtools.
    pub devtools_threshold_px: u32,

    /// Storage size check interval in seconds.
    pub storage_interval_secs: u64,

    /// Persistent store size that triggers a warning.
    pub storage_limit_bytes: usize,

    /// Capacity of the page event channel.
    pub event_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            viewport_interval_ms: 2000,
            devtools_threshold_px: 160,
            storage_interval_secs: 60,
            storage_limit_bytes: 1024 * 1024,
            event_buffer: 256,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Key shipped in sample configs. Never accepted as a real key.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Operator surface configuration.
///
/// Off by default: the routes only mount once an operator sets a key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the `/admin` routes.
    pub enabled: bool,

    /// Bearer key granting the admin role (read and clear).
    pub api_key: String,

    /// Bearer key granting the viewer role (read only). Empty disables it.
    pub viewer_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            viewer_key: String::new(),
        }
    }
}
