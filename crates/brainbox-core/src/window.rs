//! Co-access window — bounded FIFO of recently touched neuron ids
//!
//! Drives the Hebbian strengthening step in `record`: whatever is already in
//! the window when a neuron is recorded gets a synapse strengthened against
//! it, weighted by recency of the other endpoint within the window.

use crate::storage::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::collections::HashMap;

/// Number of recent neuron ids retained for Hebbian strengthening.
pub const CO_ACCESS_WINDOW_SIZE: usize = 10;

/// Only access-log rows within this span of `open()` are replayed to seed
/// the window, giving cross-session continuity without persisting it directly.
pub const WINDOW_SEED_LOOKBACK_SECONDS: i64 = 3600;

/// In-memory bounded queue of the most recently recorded neuron ids.
#[derive(Debug, Default, Clone)]
pub struct CoAccessWindow {
    entries: Vec<String>,
}

impl CoAccessWindow {
    pub fn new() -> Self {
        Self { entries: Vec::with_capacity(CO_ACCESS_WINDOW_SIZE) }
    }

    /// Current contents, oldest first. Index `i` is the `(i+1)`-th oldest entry.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Remove any prior occurrence of `id`, push it at the tail, then trim
    /// the head down to [`CO_ACCESS_WINDOW_SIZE`] if the window overflowed.
    pub fn push(&mut self, id: &str) {
        self.entries.retain(|e| e != id);
        self.entries.push(id.to_string());
        if self.entries.len() > CO_ACCESS_WINDOW_SIZE {
            let overflow = self.entries.len() - CO_ACCESS_WINDOW_SIZE;
            self.entries.drain(0..overflow);
        }
    }

    /// Rebuild the window from the last hour of `access_log`, deduplicating
    /// by keeping each id's most recent position, then truncating to the
    /// trailing `CO_ACCESS_WINDOW_SIZE` entries.
    pub fn seed_from_log(conn: &Connection) -> Result<Self> {
        let cutoff = Utc::now() - chrono::Duration::seconds(WINDOW_SEED_LOOKBACK_SECONDS);
        let mut stmt = conn.prepare(
            "SELECT neuron_id, timestamp, access_order FROM access_log \
             WHERE timestamp >= ?1 ORDER BY timestamp ASC, access_order ASC",
        )?;
        let rows = stmt.query_map(rusqlite::params![cutoff.to_rfc3339()], |row| {
            let neuron_id: String = row.get(0)?;
            let timestamp: String = row.get(1)?;
            Ok((neuron_id, timestamp))
        })?;

        // Deduplicate keeping the most recent occurrence's position, preserving
        // ascending chronological order for everything else.
        let mut last_seen: HashMap<String, usize> = HashMap::new();
        let mut ordered: Vec<(String, DateTime<Utc>)> = Vec::new();
        for row in rows {
            let (neuron_id, timestamp) = row?;
            let ts = DateTime::parse_from_rfc3339(&timestamp)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            if let Some(&prev_idx) = last_seen.get(&neuron_id) {
                ordered[prev_idx].1 = ts;
            } else {
                last_seen.insert(neuron_id.clone(), ordered.len());
                ordered.push((neuron_id, ts));
            }
        }
        ordered.sort_by_key(|(_, ts)| *ts);

        let mut entries: Vec<String> = ordered.into_iter().map(|(id, _)| id).collect();
        if entries.len() > CO_ACCESS_WINDOW_SIZE {
            let start = entries.len() - CO_ACCESS_WINDOW_SIZE;
            entries = entries.split_off(start);
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_dedup_moves_to_tail() {
        let mut w = CoAccessWindow::new();
        w.push("a");
        w.push("b");
        w.push("a");
        assert_eq!(w.entries(), &["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_push_bounds_size() {
        let mut w = CoAccessWindow::new();
        for i in 0..(CO_ACCESS_WINDOW_SIZE + 5) {
            w.push(&format!("n{i}"));
        }
        assert_eq!(w.entries().len(), CO_ACCESS_WINDOW_SIZE);
        assert_eq!(w.entries().last().unwrap(), &format!("n{}", CO_ACCESS_WINDOW_SIZE + 4));
    }
}
