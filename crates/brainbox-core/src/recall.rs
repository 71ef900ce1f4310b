//! Recall scoring — pure functions behind the three-phase recall algorithm
//!
//! The phases themselves need database access (`Store::recall` in
//! `storage/sqlite.rs` orchestrates them), but the scoring math is pure and
//! lives here so it can be unit tested without a connection.

use crate::memory::Neuron;
use chrono::{DateTime, Utc};

/// Minimum confidence to emit a Phase 1 (direct) or Phase 2 (spread) result.
pub const CONFIDENCE_GATE: f64 = 0.4;

/// Minimum confidence to emit a Phase 3 (myelinated fallback) result.
pub const MYELINATED_GATE: f64 = 0.15;

/// Minimum synapse weight to traverse during Phase 2 spread.
pub const SPREAD_WEIGHT_MIN: f64 = 0.3;

/// Per-keyword cap on Phase 1 candidates fetched from `neurons`.
pub const PHASE1_KEYWORD_LIMIT: usize = 10;

/// Per-frontier-neuron cap on Phase 2 outgoing synapses fetched.
pub const PHASE2_FRONTIER_LIMIT: usize = 10;

/// Half-window for the recency term: a neuron accessed exactly this long ago
/// contributes zero recency score.
const RECENCY_HALF_WINDOW_MS: i64 = 168 * 3_600_000; // 1 week

/// Lower-case `query`, split on whitespace, drop tokens of length <= 2.
pub fn extract_keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|tok| tok.len() > 2)
        .map(|tok| tok.to_string())
        .collect()
}

fn token_overlap_fraction(haystack: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let haystack = haystack.to_lowercase();
    let hits = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
    hits as f64 / keywords.len() as f64
}

/// Fraction of `query`'s keywords found in `neuron`'s joined context strings.
pub fn ctx_match(neuron: &Neuron, keywords: &[String]) -> f64 {
    token_overlap_fraction(&neuron.context_text(), keywords)
}

/// Fraction of `query`'s keywords found in `neuron`'s natural-key path.
pub fn path_match(neuron: &Neuron, keywords: &[String]) -> f64 {
    token_overlap_fraction(&neuron.path, keywords)
}

/// Recency term: `max(0, 1 - age_ms / RECENCY_HALF_WINDOW_MS)`, 0 if never accessed.
pub fn recency(neuron: &Neuron, now: DateTime<Utc>) -> f64 {
    match neuron.last_accessed {
        Some(last) => {
            let age_ms = (now - last).num_milliseconds().max(0) as f64;
            (1.0 - age_ms / RECENCY_HALF_WINDOW_MS as f64).max(0.0)
        }
        None => 0.0,
    }
}

/// Confidence score for a Phase 1 direct-match candidate:
/// `0.4*ctx_match + 0.3*myelination + 0.2*recency + 0.1*path_match`, clamped to <= 1.
pub fn direct_confidence(neuron: &Neuron, keywords: &[String], now: DateTime<Utc>) -> f64 {
    let score = 0.4 * ctx_match(neuron, keywords)
        + 0.3 * neuron.myelination
        + 0.2 * recency(neuron, now)
        + 0.1 * path_match(neuron, keywords);
    score.min(1.0)
}

/// Confidence score for a Phase 2 spread candidate reached via a synapse of
/// the given `weight` from a seed with `seed_confidence`:
/// `seed_confidence * weight * (1 + target_myelination)`, clamped to <= 0.99.
pub fn spread_confidence(seed_confidence: f64, synapse_weight: f64, target_myelination: f64) -> f64 {
    (seed_confidence * synapse_weight * (1.0 + target_myelination)).min(0.99)
}

/// Confidence score for a Phase 3 myelinated-fallback candidate: `myelination * 0.5`.
pub fn myelinated_confidence(neuron: &Neuron) -> f64 {
    neuron.myelination * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::NeuronType;

    fn neuron_with(path: &str, contexts: &[&str], myelination: f64) -> Neuron {
        let mut n = Neuron::new(NeuronType::File, path);
        n.myelination = myelination;
        for c in contexts {
            n.push_context(c);
        }
        n
    }

    #[test]
    fn test_extract_keywords_drops_short_tokens() {
        let kws = extract_keywords("grep foo in the src dir");
        assert_eq!(kws, vec!["grep", "foo", "the", "src", "dir"]);
    }

    #[test]
    fn test_direct_confidence_weighted_sum() {
        let n = neuron_with("/x", &["grep foo"], 0.5);
        let kws = extract_keywords("grep foo");
        let conf = direct_confidence(&n, &kws, Utc::now());
        // ctx_match=1.0, myelination=0.5, recency=0 (never accessed), path_match=0
        assert!((conf - (0.4 * 1.0 + 0.3 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_spread_confidence_below_gate_example() {
        // seed confidence 0.6, weight 0.4, target myelination 0.
        let conf = spread_confidence(0.6, 0.4, 0.0);
        assert!((conf - 0.24).abs() < 1e-9);
        assert!(conf < CONFIDENCE_GATE);
    }

    #[test]
    fn test_myelinated_confidence_gate() {
        let n = neuron_with("/hot", &[], 0.3);
        let conf = myelinated_confidence(&n);
        assert!((conf - 0.15).abs() < 1e-9);
        assert!(conf >= MYELINATED_GATE);
    }
}
