//! End-to-end scenario tests for the Hebbian memory engine.
//!
//! Each test opens a fresh engine against a temp-directory database: a
//! `TempDir` that outlives the engine and is cleaned up on drop.

use brainbox_core::{ActivationPath, Engine, NeuronType};
use tempfile::TempDir;

struct TestHarness {
    engine: Engine,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("brainbox.db");
        let engine = Engine::open(db_path).expect("failed to open engine");
        Self { engine, _temp_dir: temp_dir }
    }
}

#[test]
fn hebbian_pair_forms_bidirectional_synapses() {
    let harness = TestHarness::new();
    harness.engine.record("/x", NeuronType::File, Some("grep foo")).unwrap();
    harness.engine.record("/y", NeuronType::File, Some("grep foo")).unwrap();

    let stats = harness.engine.stats().unwrap();
    assert_eq!(stats.neuron_count, 2);
    assert_eq!(stats.synapse_count, 2); // x->y and y->x

    let results = harness.engine.recall("foo", NeuronType::File, 5);
    assert!(results.len() >= 1);
    let paths: Vec<&str> = results.iter().map(|r| r.neuron.path.as_str()).collect();
    assert!(paths.contains(&"/x") || paths.contains(&"/y"));
    let direct = results.iter().find(|r| r.activation_path == ActivationPath::Direct);
    assert!(direct.is_some());
    assert!(direct.unwrap().confidence >= 0.4);
}

#[test]
fn myelinated_fallback_surfaces_hot_neuron_without_keyword_match() {
    let harness = TestHarness::new();
    for _ in 0..20 {
        harness.engine.record("/hot", NeuronType::File, Some("unrelated")).unwrap();
    }

    let results = harness.engine.recall("nothing-matches-at-all", NeuronType::File, 3);
    let hot = results.iter().find(|r| r.neuron.path == "/hot");
    assert!(hot.is_some(), "expected /hot to surface via myelinated fallback");
    let hot = hot.unwrap();
    assert_eq!(hot.activation_path, ActivationPath::Myelinated);
    assert!(hot.confidence >= 0.15);
}

#[test]
fn decay_prunes_weak_synapses_over_many_passes() {
    let harness = TestHarness::new();
    harness.engine.record("/a", NeuronType::File, Some("ctx")).unwrap();
    harness.engine.record("/b", NeuronType::File, Some("ctx")).unwrap();

    let before = harness.engine.stats().unwrap();
    assert_eq!(before.synapse_count, 2);

    for _ in 0..200 {
        harness.engine.decay().unwrap();
    }

    let after = harness.engine.stats().unwrap();
    assert_eq!(after.synapse_count, 0, "weight 0.1 should have decayed below the prune threshold");
}

#[test]
fn window_seeding_reconstructs_synapses_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("brainbox.db");

    {
        let engine = Engine::open(&db_path).unwrap();
        engine.record("/a", NeuronType::File, None).unwrap();
        engine.record("/b", NeuronType::File, None).unwrap();
        engine.close();
    }

    let engine = Engine::open(&db_path).unwrap();
    engine.record("/c", NeuronType::File, None).unwrap();

    let stats = engine.stats().unwrap();
    // a<->c, b<->c, plus the original a<->b pair: 6 directed synapses total.
    assert_eq!(stats.synapse_count, 6);
}

#[test]
fn recall_filters_by_neuron_type() {
    let harness = TestHarness::new();
    harness.engine.record("file1", NeuronType::File, Some("deploy")).unwrap();
    harness.engine.record("tool1", NeuronType::Tool, Some("deploy")).unwrap();

    let results = harness.engine.recall("deploy", NeuronType::Tool, 5);
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.neuron.path == "tool1"));
}

#[test]
fn close_then_record_reopens_lazily() {
    let harness = TestHarness::new();
    harness.engine.record("/a", NeuronType::File, None).unwrap();
    harness.engine.close();
    harness.engine.close(); // idempotent
    harness.engine.record("/b", NeuronType::File, None).unwrap();

    let stats = harness.engine.stats().unwrap();
    assert_eq!(stats.neuron_count, 2);
}

#[test]
fn repeated_record_increments_access_count_and_myelination() {
    let harness = TestHarness::new();
    harness.engine.record("/x", NeuronType::File, None).unwrap();
    harness.engine.record("/x", NeuronType::File, None).unwrap();

    let stats = harness.engine.stats().unwrap();
    assert_eq!(stats.neuron_count, 1);
    assert_eq!(stats.total_accesses, 2);
    assert!(stats.avg_myelination > 0.0);
}

#[test]
fn record_semantic_uses_semantic_neuron_type() {
    let harness = TestHarness::new();
    harness.engine.record_semantic("the build pipeline uses cargo", Some("pipeline question")).unwrap();

    let results = harness.engine.recall("pipeline", NeuronType::Semantic, 5);
    assert!(results.iter().any(|r| r.neuron.neuron_type == NeuronType::Semantic));
}

#[test]
fn record_rejects_empty_path() {
    let harness = TestHarness::new();
    let result = harness.engine.record("", NeuronType::File, None);
    assert!(result.is_err());
}
