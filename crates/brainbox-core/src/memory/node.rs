//! Neuron — the fundamental unit of the Hebbian memory graph
//!
//! Each neuron represents a discrete entity the host has seen during a tool
//! call: a file path, a tool name, an error signature, or a free-text fact.
//! Neurons carry two independent signals — short-term `activation` and
//! long-term `myelination` — plus a bounded window of recent query contexts
//! used by the recall engine's direct-match phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Long-term myelination never exceeds this ceiling.
pub const MYELIN_MAX: f64 = 0.95;

/// Per-access myelination growth rate (asymptotic approach to [`MYELIN_MAX`]).
pub const MYELIN_RATE: f64 = 0.02;

/// Maximum number of distinct context strings retained per neuron.
pub const MAX_CONTEXTS: usize = 20;

// ============================================================================
// NEURON TYPES
// ============================================================================

/// The kind of entity a neuron represents.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NeuronType {
    /// A filesystem path.
    #[default]
    File,
    /// A tool name.
    Tool,
    /// An error signature.
    Error,
    /// A free-text fact captured via `record_semantic`.
    Semantic,
}

impl NeuronType {
    /// Convert to the string form used in composite neuron ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            NeuronType::File => "file",
            NeuronType::Tool => "tool",
            NeuronType::Error => "error",
            NeuronType::Semantic => "semantic",
        }
    }

    /// Parse from a string name. Unknown names fall back to `File` — the
    /// store's error policy treats an unrecognized type as `InvalidInput`
    /// only at the public `Engine` boundary, never inside stored data.
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "file" => NeuronType::File,
            "tool" => NeuronType::Tool,
            "error" => NeuronType::Error,
            "semantic" => NeuronType::Semantic,
            _ => NeuronType::File,
        }
    }
}

impl std::fmt::Display for NeuronType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// NEURON
// ============================================================================

/// A persistent node in the memory graph.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Neuron {
    /// Stable composite identifier `"<type>:<path>"`.
    pub id: String,
    /// The kind of entity this neuron represents.
    pub neuron_type: NeuronType,
    /// The natural key: filesystem path, tool name, error signature, or fact text.
    pub path: String,
    /// Short-term excitement, set to 1.0 on access, decays multiplicatively. In `[0, 1]`.
    pub activation: f64,
    /// Long-term trust, asymptotically approaches [`MYELIN_MAX`]. In `[0, MYELIN_MAX]`.
    pub myelination: f64,
    /// Monotonically increasing access count.
    pub access_count: i64,
    /// Timestamp of the most recent access, if any.
    pub last_accessed: Option<DateTime<Utc>>,
    /// Timestamp this neuron was first recorded.
    pub created_at: DateTime<Utc>,
    /// Ordered, duplicate-free recent context strings (capped at [`MAX_CONTEXTS`]).
    pub contexts: Vec<String>,
}

impl Neuron {
    /// Build the composite id `"<type>:<path>"` used as the neuron's primary key.
    pub fn make_id(neuron_type: NeuronType, path: &str) -> String {
        format!("{}:{}", neuron_type.as_str(), path)
    }

    /// A fresh neuron as it exists immediately after its first `record`.
    pub fn new(neuron_type: NeuronType, path: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Self::make_id(neuron_type, path),
            neuron_type,
            path: path.to_string(),
            activation: 1.0,
            myelination: 0.0,
            access_count: 0,
            last_accessed: None,
            created_at: now,
            contexts: Vec::new(),
        }
    }

    /// Push a new context string onto the bounded, duplicate-free context list.
    ///
    /// No-op if `context` is already present. When the list would exceed
    /// [`MAX_CONTEXTS`] after the push, the oldest entries are dropped first.
    pub fn push_context(&mut self, context: &str) {
        if self.contexts.iter().any(|c| c == context) {
            return;
        }
        self.contexts.push(context.to_string());
        if self.contexts.len() > MAX_CONTEXTS {
            let overflow = self.contexts.len() - MAX_CONTEXTS;
            self.contexts.drain(0..overflow);
        }
    }

    /// Advance myelination one step via `m <- min(m + MYELIN_RATE*(1-m), MYELIN_MAX)`.
    pub fn strengthen_myelination(&mut self) {
        self.myelination = (self.myelination + MYELIN_RATE * (1.0 - self.myelination)).min(MYELIN_MAX);
    }

    /// The joined context text searched by recall's direct-match phase.
    pub fn context_text(&self) -> String {
        self.contexts.join(" ")
    }

    /// Whether this neuron is eligible for pruning during `decay()` (spec §3 lifecycle).
    pub fn is_prunable(&self) -> bool {
        self.activation < 0.01 && self.myelination < 0.01 && self.access_count < 2
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neuron_type_roundtrip() {
        for t in [NeuronType::File, NeuronType::Tool, NeuronType::Error, NeuronType::Semantic] {
            assert_eq!(NeuronType::parse_name(t.as_str()), t);
        }
    }

    #[test]
    fn test_make_id() {
        assert_eq!(Neuron::make_id(NeuronType::File, "/src/main.rs"), "file:/src/main.rs");
        assert_eq!(Neuron::make_id(NeuronType::Tool, "grep"), "tool:grep");
    }

    #[test]
    fn test_push_context_dedup_and_bound() {
        let mut n = Neuron::new(NeuronType::File, "/x");
        for i in 0..25 {
            n.push_context(&format!("ctx{i}"));
        }
        assert_eq!(n.contexts.len(), MAX_CONTEXTS);
        assert_eq!(n.contexts.last().unwrap(), "ctx24");
        assert_eq!(n.contexts.first().unwrap(), "ctx5");

        let before = n.contexts.clone();
        n.push_context("ctx24");
        assert_eq!(n.contexts, before);
    }

    #[test]
    fn test_strengthen_myelination_saturates() {
        let mut n = Neuron::new(NeuronType::File, "/x");
        for _ in 0..100_000 {
            n.strengthen_myelination();
        }
        assert!(n.myelination <= MYELIN_MAX);
        assert!((n.myelination - MYELIN_MAX).abs() < 1e-6);
    }

    #[test]
    fn test_is_prunable() {
        let mut n = Neuron::new(NeuronType::File, "/x");
        n.activation = 0.0;
        n.myelination = 0.0;
        n.access_count = 1;
        assert!(n.is_prunable());
        n.access_count = 2;
        assert!(!n.is_prunable());
    }
}
