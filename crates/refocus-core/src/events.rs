use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{SequencerPhase, SessionTotals, StageKind};

/// Every sequencer state change produces an Event.
/// The CLI prints them as JSON; embedders can subscribe to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A fresh session record was created and the first stage entered.
    SessionStarted {
        game: String,
        stage_index: usize,
        stage_id: String,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    /// An existing record was picked up and re-anchored to the located stage.
    SessionResumed {
        game: String,
        stage_index: usize,
        offset_ms: u64,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// Elapsed time exceeded the whole pipeline while away; the record was
    /// cleared without entering any stage.
    SessionExpired {
        game: String,
        elapsed_ms: i64,
        at: DateTime<Utc>,
    },
    /// A stage completed and the next one was entered.
    StageAdvanced {
        game: String,
        stage_index: usize,
        stage_id: String,
        kind: StageKind,
        duration_ms: Option<u64>,
        at: DateTime<Utc>,
    },
    /// Local state was reconciled against a record written by another
    /// execution context.
    SessionSynced {
        game: String,
        stage_index: usize,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// The session reached its end; the record is cleared and final totals
    /// handed off.
    SessionFinished {
        game: String,
        totals: SessionTotals,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: SequencerPhase,
        game: String,
        stage_index: usize,
        stage_id: String,
        stage_label: String,
        kind: StageKind,
        remaining_ms: u64,
        total_ms: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}
