// Library interface for testing

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

// Declare all modules
pub mod attachments;
pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod oembed;
pub mod queries;
pub mod schema;
pub mod serve;
pub mod store;

// Re-export the expected database version for convenience
pub use constants::EXPECTED_DB_VERSION;

/// Per-session locks serializing a marker overlap check with its write.
/// Without this, two concurrent overlapping range creates could both pass
/// the check before either lands.
pub type MarkerLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Get or create the lock for one session
pub fn get_marker_lock(locks: &MarkerLocks, session_id: &str) -> Arc<Mutex<()>> {
    locks
        .entry(session_id.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}
