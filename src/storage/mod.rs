//! Key-value storage subsystem.
//!
//! # Data Flow
//! ```text
//! Session-scoped state (token, session id):
//!     → memory.rs (dies with the process)
//!
//! Persistent state (audit trail):
//!     → file.rs (write-through JSON file)
//! ```
//!
//! # Design Decisions
//! - Every store speaks plain strings; callers own the encoding
//! - Every operation is fallible; callers degrade to defaults on error
//! - Stores are shared via Arc and safe to use from any task

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Session store key holding the live anti-replay token.
pub const TOKEN_KEY: &str = "trustgate.csrf_token";

/// Session store key holding the session identifier.
pub const SESSION_ID_KEY: &str = "trustgate.session_id";

/// Persistent store key holding the JSON-encoded audit trail.
pub const AUDIT_LOG_KEY: &str = "trustgate.audit_log";

/// Failure modes shared by every store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota exceeded ({needed} bytes needed, {quota} allowed)")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("storage unavailable")]
    Unavailable,

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A string-to-string store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Serialized size of everything held, in bytes (keys plus values).
    fn size_bytes(&self) -> Result<usize, StorageError>;
}
