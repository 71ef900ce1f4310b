//! Memory module — the graph's core data types
//!
//! A neuron (`node`) is a persistent vertex; a synapse is a directed weighted
//! edge between two neurons, strengthened by co-access and decayed over time.

mod node;

pub use node::{Neuron, NeuronType, MAX_CONTEXTS, MYELIN_MAX, MYELIN_RATE};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// SYNAPSE
// ============================================================================

/// A directed weighted edge between two neurons.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Synapse {
    /// The neuron this edge fires from.
    pub source_id: String,
    /// The neuron this edge fires to.
    pub target_id: String,
    /// Edge strength in `[0, 1]`, strengthened on co-access.
    pub weight: f64,
    /// Monotonic count of co-access events that touched this edge.
    pub co_access_count: i64,
    /// Timestamp of the most recent strengthening.
    pub last_fired: DateTime<Utc>,
    /// Timestamp this synapse was first created.
    pub created_at: DateTime<Utc>,
}

impl Synapse {
    /// Apply one Hebbian strengthening step: `w <- min(w + delta*(1-w), 1)`.
    pub fn strengthen(&mut self, delta: f64, now: DateTime<Utc>) {
        self.weight = (self.weight + delta * (1.0 - self.weight)).min(1.0);
        self.co_access_count += 1;
        self.last_fired = now;
    }
}

// ============================================================================
// RECALL RESULT
// ============================================================================

/// Which phase of the recall algorithm produced a given result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivationPath {
    /// Phase 1: the query's keywords matched the neuron's stored contexts or path directly.
    Direct,
    /// Phase 2: reached by a 1-hop synapse from a Phase-1 frontier neuron.
    Spread,
    /// Phase 3: no keyword match; surfaced purely on accumulated myelination.
    Myelinated,
}

/// One ranked candidate returned by `recall`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallResult {
    /// The matched neuron.
    pub neuron: Neuron,
    /// Confidence score in `[0, 1]` (gate thresholds vary by phase; see recall module).
    pub confidence: f64,
    /// How this result was reached.
    pub activation_path: ActivationPath,
}

// ============================================================================
// STATS & DECAY REPORT
// ============================================================================

/// Snapshot of graph-wide statistics, returned by `Engine::stats`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainBoxStats {
    /// Total number of neurons currently stored.
    pub neuron_count: i64,
    /// Total number of synapses currently stored.
    pub synapse_count: i64,
    /// Neurons whose myelination exceeds 0.5.
    pub superhighways: i64,
    /// Total rows ever appended to the access log.
    pub total_accesses: i64,
    /// Mean myelination across all neurons (0.0 if the graph is empty).
    pub avg_myelination: f64,
}

/// Result of a `decay()` pass: how much of the graph was pruned.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayReport {
    /// Synapses deleted for falling below `SYNAPSE_PRUNE_THRESHOLD`.
    pub pruned_synapses: i64,
    /// Neurons deleted for being simultaneously cold, untrusted, and rarely used.
    pub pruned_neurons: i64,
}
