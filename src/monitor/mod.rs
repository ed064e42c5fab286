//! Background observation of the rendered document.
//!
//! # Data Flow
//! ```text
//! Page reporter:
//!     nodes_added / viewport / key_down
//!     → mpsc channel → MutationMonitor::handle
//!
//! Timers:
//!     viewport interval → check_viewport
//!     storage interval  → check_storage
//!
//! Every finding → AuditLog::record
//! ```
//!
//! # Design Decisions
//! - Log, never block: nothing here can reject a user action
//! - Devtools divergence is recorded once per open/close transition
//! - Suspends only at channel receives and timer ticks

pub mod devtools;
pub mod dom;

pub use devtools::{KeyCombo, WindowDimensions};
pub use dom::ElementSnapshot;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};

use crate::audit::{AuditEvent, AuditLog};
use crate::config::MonitorConfig;
use crate::observability::metrics;
use crate::storage::KeyValueStore;

/// Something the page observed and reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    NodesAdded { nodes: Vec<ElementSnapshot> },
    Viewport(WindowDimensions),
    KeyDown(KeyCombo),
}

/// Feeds observations into the audit log.
pub struct MutationMonitor {
    audit: AuditLog,
    persistent: Arc<dyn KeyValueStore>,
    config: MonitorConfig,
    suspicious: AtomicU64,
    viewport: Mutex<Option<WindowDimensions>>,
    devtools_open: AtomicBool,
}

impl MutationMonitor {
    pub fn new(audit: AuditLog, persistent: Arc<dyn KeyValueStore>, config: MonitorConfig) -> Self {
        Self {
            audit,
            persistent,
            config,
            suspicious: AtomicU64::new(0),
            viewport: Mutex::new(None),
            devtools_open: AtomicBool::new(false),
        }
    }

    /// Suspicious elements seen since start.
    pub fn suspicious_count(&self) -> u64 {
        self.suspicious.load(Ordering::Relaxed)
    }

    pub fn handle(&self, event: MonitorEvent) {
        match event {
            MonitorEvent::NodesAdded { nodes } => {
                for node in &nodes {
                    self.inspect_node(node);
                }
            }
            MonitorEvent::Viewport(dimensions) => {
                *self.viewport.lock().unwrap_or_else(PoisonError::into_inner) = Some(dimensions);
            }
            MonitorEvent::KeyDown(combo) => {
                if combo.is_devtools_shortcut() {
                    self.audit.record(AuditEvent::DevtoolsShortcut {
                        combo: combo.to_string(),
                    });
                }
            }
        }
    }

    fn inspect_node(&self, node: &ElementSnapshot) {
        for finding in dom::inspect(node) {
            self.suspicious.fetch_add(1, Ordering::Relaxed);
            metrics::record_suspicious_event();
            self.audit.record(AuditEvent::SuspiciousDomModification {
                tag: finding.tag,
                reason: finding.reason.as_str().to_string(),
                attributes: finding.attributes,
            });
        }
    }

    /// Compare the last reported window sizes against the threshold.
    pub fn check_viewport(&self) {
        let latest = *self.viewport.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(dimensions) = latest else {
            return;
        };

        let open = dimensions.suggests_devtools(self.config.devtools_threshold_px);
        let was_open = self.devtools_open.swap(open, Ordering::Relaxed);
        if open && !was_open {
            let (width_delta, height_delta) = dimensions.deltas();
            self.audit.record(AuditEvent::DevtoolsSuspected {
                width_delta,
                height_delta,
            });
        } else if !open && was_open {
            tracing::debug!("Viewport back within threshold");
        }
    }

    /// Warn when the persistent store grows past its budget.
    pub fn check_storage(&self) {
        match self.persistent.size_bytes() {
            Ok(bytes) if bytes > self.config.storage_limit_bytes => {
                self.audit.record(AuditEvent::StorageSizeExceeded {
                    bytes,
                    limit: self.config.storage_limit_bytes,
                });
            }
            Ok(bytes) => tracing::trace!(bytes, "Storage size within limit"),
            Err(e) => {
                metrics::record_storage_failure("size_check");
                tracing::warn!(error = %e, "Storage size check failed");
            }
        }
    }

    /// Consume events and run the periodic checks until shutdown.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<MonitorEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        if !self.config.enabled {
            tracing::info!("Mutation monitor disabled");
            return;
        }

        tracing::info!(
            viewport_interval_ms = self.config.viewport_interval_ms,
            storage_interval_secs = self.config.storage_interval_secs,
            "Mutation monitor starting"
        );

        let mut viewport_ticker = time::interval(Duration::from_millis(self.config.viewport_interval_ms));
        viewport_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut storage_ticker = time::interval(Duration::from_secs(self.config.storage_interval_secs));
        storage_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                Some(event) = events.recv() => {
                    self.handle(event);
                }
                _ = viewport_ticker.tick() => {
                    self.check_viewport();
                }
                _ = storage_ticker.tick() => {
                    self.check_storage();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Mutation monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
