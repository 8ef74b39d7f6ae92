use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// In-memory running totals for one sequencer mount.
///
/// Rebuilt from zero every time the sequencer (re)starts: only position and
/// timing survive a reload, never score history. Scored games report a
/// cumulative score, so each stage's contribution is recorded as the delta
/// against the previous running total.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionAccumulator {
    /// Per-stage score deltas, keyed by stage id.
    pub segment_results: BTreeMap<String, i64>,
    pub total_score: i64,
    pub total_time_ms: u64,
    pub total_stages_completed: u32,
}

impl SessionAccumulator {
    /// Fold a scored game's reported cumulative score, returning the delta
    /// contributed by this stage.
    pub fn record_game_score(&mut self, stage_id: &str, reported_score: i64) -> i64 {
        let delta = reported_score - self.total_score;
        self.total_score = reported_score;
        self.segment_results.insert(stage_id.to_string(), delta);
        delta
    }

    /// Fold a completed stage's fixed duration. Every duration-bearing stage
    /// counts here, games and breaks alike.
    pub fn record_completion(&mut self, duration_ms: u64) {
        self.total_time_ms = self.total_time_ms.saturating_add(duration_ms);
        self.total_stages_completed += 1;
    }

    pub fn totals(&self) -> SessionTotals {
        SessionTotals {
            total_score: self.total_score,
            total_time_ms: self.total_time_ms,
            total_stages_completed: self.total_stages_completed,
        }
    }
}

/// Final totals handed off when a session completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub total_score: i64,
    pub total_time_ms: u64,
    pub total_stages_completed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_scores_fold_as_deltas() {
        let mut acc = SessionAccumulator::default();
        assert_eq!(acc.record_game_score("game_1", 50), 50);
        assert_eq!(acc.record_game_score("game_2", 120), 70);
        assert_eq!(acc.record_game_score("game_3", 300), 180);
        assert_eq!(acc.total_score, 300);
        assert_eq!(acc.segment_results["game_1"], 50);
        assert_eq!(acc.segment_results["game_2"], 70);
        assert_eq!(acc.segment_results["game_3"], 180);
    }

    #[test]
    fn completions_count_every_stage() {
        let mut acc = SessionAccumulator::default();
        for duration in [300_000u64, 420_000, 120_000] {
            acc.record_completion(duration);
        }
        assert_eq!(acc.total_stages_completed, 3);
        assert_eq!(acc.total_time_ms, 840_000);
    }

    #[test]
    fn totals_snapshot_matches_fields() {
        let mut acc = SessionAccumulator::default();
        acc.record_game_score("game_1", 40);
        acc.record_completion(420_000);
        let totals = acc.totals();
        assert_eq!(totals.total_score, 40);
        assert_eq!(totals.total_time_ms, 420_000);
        assert_eq!(totals.total_stages_completed, 1);
    }
}
