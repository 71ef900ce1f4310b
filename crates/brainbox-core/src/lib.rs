//! # BrainBox Core
//!
//! Hebbian memory engine for coding-assistant plugins. Maintains a
//! persistent, self-organizing graph of *neurons* — files, tools, errors, or
//! free-text facts — connected by weighted *synapses* that strengthen when
//! entities are accessed in temporal proximity and decay without use.
//!
//! ## Model
//!
//! - **Neuron**: a remembered entity with short-term `activation` and
//!   long-term `myelination` signals, plus a bounded window of recent
//!   contexts it was accessed under.
//! - **Synapse**: a directed, weighted edge between two neurons, strengthened
//!   by the co-access window on every `record` call (Hebbian learning: cells
//!   that fire together, wire together).
//! - **Recall**: keyword-seeded spreading activation — direct matches, then a
//!   1-hop spread along strong synapses, then a myelinated fallback when
//!   nothing matches — each phase gated by a confidence threshold.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use brainbox_core::{Engine, NeuronType};
//!
//! let engine = Engine::open("brainbox.db").unwrap();
//! engine.record("/src/main.rs", NeuronType::File, Some("fix parser bug")).unwrap();
//! let results = engine.recall("parser", NeuronType::File, 5);
//! for r in results {
//!     println!("{} (confidence {:.2}, via {:?})", r.neuron.path, r.confidence, r.activation_path);
//! }
//! ```
//!
//! ## Non-goals
//!
//! No vector embeddings or semantic similarity, no distributed or replicated
//! storage, no multi-process concurrent writers, no natural-language
//! understanding beyond whitespace keyword extraction. The host plugin owns
//! hook dispatch, tool-call parsing, and subprocess orchestration; this crate
//! owns the graph.

#![warn(rustdoc::missing_crate_level_docs)]

pub mod memory;
pub mod recall;
pub mod storage;
pub mod window;

pub use memory::{
    ActivationPath, BrainBoxStats, DecayReport, Neuron, NeuronType, RecallResult, Synapse,
    MAX_CONTEXTS, MYELIN_MAX, MYELIN_RATE,
};
pub use storage::{Store, StoreError};
pub use window::CO_ACCESS_WINDOW_SIZE;

use std::path::PathBuf;

/// Crate version, exposed for hosts that want to report it alongside their own.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// ENGINE
// ============================================================================

/// The public-facing handle a host plugin holds: `Store` plus the session
/// tracker, co-access window, recorder, and recall engine behind a single
/// surface.
pub struct Engine {
    store: Store,
}

impl Engine {
    /// Open or create the engine's backing store at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>) -> storage::Result<Self> {
        Ok(Self { store: Store::open(db_path)? })
    }

    /// Record an access to `path` of kind `neuron_type`, optionally tagged
    /// with a query/context string. Upserts the neuron, strengthens synapses
    /// against the co-access window, and logs the access.
    pub fn record(&self, path: &str, neuron_type: NeuronType, context: Option<&str>) -> storage::Result<()> {
        self.store.record(path, neuron_type, context)
    }

    /// Record a free-text fact: `record(text, NeuronType::Semantic, context)`.
    pub fn record_semantic(&self, text: &str, context: Option<&str>) -> storage::Result<()> {
        self.store.record_semantic(text, context)
    }

    /// Three-phase spreading-activation recall. Never errors — a failed
    /// lookup returns an empty list rather than propagating.
    pub fn recall(&self, query: &str, neuron_type: NeuronType, limit: usize) -> Vec<RecallResult> {
        self.store.recall(query, neuron_type, limit)
    }

    /// Apply one decay/prune pass. Never scheduled automatically; callers
    /// choose their own cadence.
    pub fn decay(&self) -> storage::Result<DecayReport> {
        self.store.decay()
    }

    /// Graph-wide counts and averages.
    pub fn stats(&self) -> storage::Result<BrainBoxStats> {
        self.store.stats()
    }

    /// Close the underlying store idempotently. A later `record`/`recall`
    /// reopens it lazily.
    pub fn close(&self) {
        self.store.close()
    }
}

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        ActivationPath, BrainBoxStats, DecayReport, Engine, Neuron, NeuronType, RecallResult,
        StoreError, Synapse,
    };
}
