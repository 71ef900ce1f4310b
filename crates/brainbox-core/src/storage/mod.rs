//! Storage module
//!
//! SQLite-backed persistence for the neuron/synapse graph: versioned schema
//! migrations plus the `Store` that owns the connection, the co-access
//! window, and session bookkeeping.

mod migrations;
mod sqlite;

pub use migrations::{Migration, MIGRATIONS};
pub use sqlite::{Result, Store, StoreError};
