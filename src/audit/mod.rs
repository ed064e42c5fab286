//! Bounded audit trail of anomalous events.
//!
//! # Data Flow
//! ```text
//! gate / validator / monitor
//!     → AuditLog::record(event)
//!     → tracing event (operator console)
//!     → persisted JSON sequence, oldest dropped beyond capacity
//!
//! Operator surface:
//!     → read_recent(limit) / clear()
//! ```
//!
//! # Design Decisions
//! - `record` never fails: storage faults degrade to a log line
//! - Read-modify-write is serialized behind one lock per trail
//! - Access control for `clear` belongs to the caller

pub mod event;

pub use event::{AuditEntry, AuditEvent};

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::observability::metrics;
use crate::session::{PageContext, Session};
use crate::storage::{KeyValueStore, AUDIT_LOG_KEY};

/// Default number of entries kept.
pub const DEFAULT_CAPACITY: usize = 100;

enum Loaded {
    Entries(Vec<AuditEntry>),
    Malformed(String),
    Unavailable,
}

/// Append-only, capacity-bounded audit trail.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn KeyValueStore>,
    session: Session,
    page: PageContext,
    capacity: usize,
    write_lock: Arc<Mutex<()>>,
}

impl AuditLog {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        session: Session,
        page: PageContext,
        capacity: usize,
    ) -> Self {
        Self {
            store,
            session,
            page,
            capacity: capacity.max(1),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    /// Append an event. Never fails; storage problems are logged.
    pub fn record(&self, event: AuditEvent) {
        let entry = self.entry(event);
        let action = entry.event.action();

        metrics::record_audit_event(action);
        tracing::warn!(
            action,
            session_id = %entry.session_id,
            page_url = %entry.page_url,
            details = ?entry.event,
            "Security event"
        );

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entries = match self.load() {
            Loaded::Entries(entries) => entries,
            Loaded::Malformed(error) => {
                tracing::error!(key = AUDIT_LOG_KEY, error = %error, "Audit log is malformed, starting over");
                metrics::record_audit_event("storage_integrity");
                vec![self.entry(AuditEvent::StorageIntegrity {
                    key: AUDIT_LOG_KEY.to_string(),
                    error,
                })]
            }
            Loaded::Unavailable => return,
        };

        entries.push(entry);
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }
        self.save(&entries);
    }

    /// Up to `limit` most recent entries, oldest first.
    pub fn read_recent(&self, limit: usize) -> Vec<AuditEntry> {
        match self.load() {
            Loaded::Entries(mut entries) => {
                if entries.len() > limit {
                    entries.drain(..entries.len() - limit);
                }
                entries
            }
            Loaded::Malformed(error) => {
                tracing::error!(key = AUDIT_LOG_KEY, error = %error, "Audit log is malformed");
                Vec::new()
            }
            Loaded::Unavailable => Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        match self.load() {
            Loaded::Entries(entries) => entries.len(),
            _ => 0,
        }
    }

    /// Empty the trail.
    pub fn clear(&self) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.save(&[]);
        tracing::info!("Audit log cleared");
    }

    fn entry(&self, event: AuditEvent) -> AuditEntry {
        AuditEntry {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            event,
            agent: self.page.agent().to_string(),
            page_url: self.page.url(),
            session_id: self.session.id(),
        }
    }

    fn load(&self) -> Loaded {
        match self.store.get(AUDIT_LOG_KEY) {
            Ok(None) => Loaded::Entries(Vec::new()),
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entries) => Loaded::Entries(entries),
                Err(e) => Loaded::Malformed(e.to_string()),
            },
            Err(e) => {
                metrics::record_storage_failure("audit_read");
                tracing::error!(error = %e, "Audit log storage unavailable");
                Loaded::Unavailable
            }
        }
    }

    fn save(&self, entries: &[AuditEntry]) {
        let raw = match serde_json::to_string(entries) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode audit log");
                return;
            }
        };
        if let Err(e) = self.store.set(AUDIT_LOG_KEY, &raw) {
            metrics::record_storage_failure("audit_write");
            tracing::error!(error = %e, entries = entries.len(), "Failed to persist audit log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn audit_log(store: MemoryStore) -> AuditLog {
        AuditLog::new(
            Arc::new(store),
            Session::new(Arc::new(MemoryStore::new())),
            PageContext::new("app://local/checkout", "trustgate-test/1.0"),
            DEFAULT_CAPACITY,
        )
    }

    fn shortcut(n: usize) -> AuditEvent {
        AuditEvent::DevtoolsShortcut {
            combo: format!("combo-{}", n),
        }
    }

    #[test]
    fn test_entry_carries_context() {
        let log = audit_log(MemoryStore::new());
        log.record(shortcut(1));

        let entries = log.read_recent(10);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.page_url, "app://local/checkout");
        assert_eq!(entry.agent, "trustgate-test/1.0");
        assert!(entry.session_id.starts_with("sess_"));
        assert!(entry.timestamp_ms > 0);
    }

    #[test]
    fn test_capacity_keeps_most_recent() {
        let log = audit_log(MemoryStore::new());
        for n in 0..150 {
            log.record(shortcut(n));
        }

        let entries = log.read_recent(200);
        assert_eq!(entries.len(), 100);
        assert_eq!(entries[0].event, shortcut(50));
        assert_eq!(entries[99].event, shortcut(149));
    }

    #[test]
    fn test_read_recent_limit_and_clear() {
        let log = audit_log(MemoryStore::new());
        for n in 0..5 {
            log.record(shortcut(n));
        }

        let recent = log.read_recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].event, shortcut(4));

        log.clear();
        assert_eq!(log.count(), 0);
        assert!(log.read_recent(10).is_empty());
    }

    #[test]
    fn test_malformed_store_is_replaced_with_integrity_entry() {
        let store = MemoryStore::new();
        store.set(AUDIT_LOG_KEY, "[{broken").unwrap();
        let log = audit_log(store);

        assert!(log.read_recent(10).is_empty());

        log.record(shortcut(1));
        let entries = log.read_recent(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event.action(), "storage_integrity");
        assert_eq!(entries[1].event, shortcut(1));
    }

    #[test]
    fn test_write_failure_does_not_escape() {
        // Room for roughly one entry only.
        let store = MemoryStore::with_quota(600);
        let log = audit_log(store.clone());

        for n in 0..10 {
            log.record(shortcut(n));
        }
        // Writes past the quota are dropped; what was persisted stays intact.
        let survived = log.read_recent(100);
        assert!((1..=2).contains(&survived.len()), "persisted {}", survived.len());
        for (n, entry) in survived.iter().enumerate() {
            assert_eq!(entry.event, shortcut(n));
        }

        store.disable();
        log.record(shortcut(99));
        assert!(log.read_recent(100).is_empty());
        assert_eq!(log.count(), 0);

        store.enable();
        assert_eq!(log.read_recent(100), survived);
    }
}
