// Bidirectional synchronization
//
// History-based reconciliation of two replicas, one directory level at a time.

pub mod engine;
pub mod history;
pub mod resolver;
pub mod store;

pub use engine::{ReconciliationEngine, Replica};
