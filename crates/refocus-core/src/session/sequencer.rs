//! Session sequencer implementation.
//!
//! The sequencer is a wall-clock-based state machine over a stage plan. It
//! does not use internal threads or timers - the caller drives it by
//! passing `now` into every command, and polls `tick()` to reconcile
//! against writes from other execution contexts.
//!
//! ## State Transitions
//!
//! ```text
//! Initializing -> Running(stage 0) -> Running(stage 1) -> ... -> Terminal
//! ```
//!
//! The persisted record is the single source of truth for position in
//! time; the sequencer's own fields are a cache re-derived from it on
//! every `start`. Elapsed time is wall-clock: it keeps running while the
//! user is away, and a resume lands wherever `now - start_at` falls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::events::Event;
use crate::storage::store::queue_subscriber;
use crate::storage::{session_key, SessionRecord, SessionStore, StorageEvent, Subscription};

use super::accumulator::{SessionAccumulator, SessionTotals};
use super::component::StageResult;
use super::locate::locate_stage;
use super::plan::{StageDescriptor, StageKind, StagePlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequencerPhase {
    Initializing,
    Running,
    Terminal,
}

/// Core session sequencer.
///
/// Owns the current-stage state for one game variant, reconciles against
/// the session store on `start` and on change notifications, advances on
/// completion signals from stage components, and accumulates per-stage
/// results until the terminal hand-off.
pub struct Sequencer {
    plan: StagePlan,
    store: SessionStore,
    phase: SequencerPhase,
    stage_index: usize,
    start_at_ms: i64,
    stage_started_at_ms: i64,
    accumulator: SessionAccumulator,
    last_game_state: Option<serde_json::Value>,
    inbox: Arc<Mutex<VecDeque<StorageEvent>>>,
    _subscription: Subscription,
}

impl Sequencer {
    /// Create a sequencer over the given plan and store handle.
    ///
    /// Starts in `Initializing`; nothing is read or written until
    /// [`start`](Self::start) is called.
    pub fn new(plan: StagePlan, store: SessionStore) -> Self {
        let inbox: Arc<Mutex<VecDeque<StorageEvent>>> = Arc::default();
        let subscription = store.subscribe(queue_subscriber(
            Arc::clone(&inbox),
            session_key(&plan.name),
        ));
        Self {
            plan,
            store,
            phase: SequencerPhase::Initializing,
            stage_index: 0,
            start_at_ms: 0,
            stage_started_at_ms: 0,
            accumulator: SessionAccumulator::default(),
            last_game_state: None,
            inbox,
            _subscription: subscription,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SequencerPhase {
        self.phase
    }

    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    pub fn current_stage(&self) -> Option<&StageDescriptor> {
        self.plan.get(self.stage_index)
    }

    pub fn accumulator(&self) -> &SessionAccumulator {
        &self.accumulator
    }

    pub fn totals(&self) -> SessionTotals {
        self.accumulator.totals()
    }

    /// Game state reported by the most recently completed scored stage,
    /// handed to the next scored game as its initial state.
    pub fn initial_state(&self) -> Option<&serde_json::Value> {
        self.last_game_state.as_ref()
    }

    /// Milliseconds left in the current stage at `now`. Zero once terminal.
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        match self.phase {
            SequencerPhase::Initializing => self
                .plan
                .get(0)
                .and_then(|s| s.duration_ms)
                .unwrap_or(0),
            SequencerPhase::Terminal => 0,
            SequencerPhase::Running => {
                let duration = self
                    .current_stage()
                    .and_then(|s| s.duration_ms)
                    .unwrap_or(0);
                let elapsed = (now.timestamp_millis() - self.stage_started_at_ms).max(0) as u64;
                duration.saturating_sub(elapsed)
            }
        }
    }

    /// 0.0 .. 100.0 progress across the timed pipeline.
    pub fn progress_pct(&self, now: DateTime<Utc>) -> f64 {
        let total = self.plan.total_timed_ms() as f64;
        if total == 0.0 {
            return 0.0;
        }
        match self.phase {
            SequencerPhase::Initializing => 0.0,
            SequencerPhase::Terminal => 100.0,
            SequencerPhase::Running => {
                let completed = self.plan.cumulative_ms(self.stage_index) as f64;
                let duration = self
                    .current_stage()
                    .and_then(|s| s.duration_ms)
                    .unwrap_or(0);
                let stage_elapsed = duration.saturating_sub(self.remaining_ms(now)) as f64;
                ((completed + stage_elapsed) / total * 100.0).min(100.0)
            }
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        let stage = self.current_stage();
        Event::StateSnapshot {
            phase: self.phase,
            game: self.plan.name.clone(),
            stage_index: self.stage_index,
            stage_id: stage.map(|s| s.id.clone()).unwrap_or_default(),
            stage_label: stage.map(|s| s.label.clone()).unwrap_or_default(),
            kind: stage.map(|s| s.kind).unwrap_or(StageKind::Timed),
            remaining_ms: self.remaining_ms(now),
            total_ms: stage.and_then(|s| s.duration_ms).unwrap_or(0),
            progress_pct: self.progress_pct(now),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Mount, or re-mount, the sequencer: resume the persisted session if
    /// one exists, clear it if it expired while away, or create a fresh one.
    ///
    /// Idempotent for a fixed `now`. Resets the accumulator: score history
    /// never survives a remount, only position and timing do.
    ///
    /// # Errors
    /// Returns an error if persisting the session record fails.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Event, CoreError> {
        self.accumulator = SessionAccumulator::default();
        self.last_game_state = None;
        if let Ok(mut inbox) = self.inbox.lock() {
            inbox.clear();
        }

        let now_ms = now.timestamp_millis();
        let game = self.plan.name.clone();

        if let Some(record) = self.store.load(&game) {
            // A persisted anchor can be any i64; saturate rather than trust it.
            let elapsed = now_ms.saturating_sub(record.start_at);
            if elapsed >= 0 && elapsed as u64 >= self.plan.total_timed_ms() {
                self.store.clear(&game)?;
                self.phase = SequencerPhase::Terminal;
                self.stage_index = self.plan.last_index();
                info!(game = %game, elapsed_ms = elapsed, "session expired while away");
                return Ok(Event::SessionExpired {
                    game,
                    elapsed_ms: elapsed,
                    at: now,
                });
            }

            let position = locate_stage(elapsed, &self.plan.durations());
            self.start_at_ms = record.start_at;
            self.stage_index = position.index;
            // Re-anchor the stage start so future reads stay consistent.
            self.stage_started_at_ms = now_ms - position.offset_ms as i64;
            self.store.save(&self.local_record())?;
            self.phase = SequencerPhase::Running;
            debug!(game = %game, stage = position.index, offset_ms = position.offset_ms, "session resumed");
            return Ok(Event::SessionResumed {
                game,
                stage_index: position.index,
                offset_ms: position.offset_ms,
                remaining_ms: self.remaining_ms(now),
                at: now,
            });
        }

        self.start_at_ms = now_ms;
        self.stage_index = 0;
        self.stage_started_at_ms = now_ms;
        self.store.save(&self.local_record())?;
        self.phase = SequencerPhase::Running;
        let stage = self.current_stage();
        info!(game = %game, "session started");
        Ok(Event::SessionStarted {
            game,
            stage_index: 0,
            stage_id: stage.map(|s| s.id.clone()).unwrap_or_default(),
            duration_ms: stage.and_then(|s| s.duration_ms).unwrap_or(0),
            at: now,
        })
    }

    /// Complete the current stage.
    ///
    /// Scored game stages fold their result's cumulative score into the
    /// accumulator as a delta; every duration-bearing stage adds its fixed
    /// duration to the running time and bumps the completed counter. At a
    /// non-last index this enters the next stage with a fresh stage start;
    /// at the last index it finishes the session. No-op outside `Running`.
    ///
    /// # Errors
    /// Returns an error if persisting or clearing the session record fails.
    pub fn advance(
        &mut self,
        result: Option<StageResult>,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, CoreError> {
        if self.phase != SequencerPhase::Running {
            return Ok(None);
        }
        let Some(stage) = self.current_stage().cloned() else {
            return Ok(None);
        };

        if stage.kind == StageKind::ScoredGame {
            if let Some(result) = result {
                let delta = self.accumulator.record_game_score(&stage.id, result.score);
                debug!(stage = %stage.id, delta, total = self.accumulator.total_score, "game score folded");
                self.last_game_state = Some(result.state);
            }
        }
        if let Some(duration_ms) = stage.duration_ms {
            self.accumulator.record_completion(duration_ms);
        }

        if self.stage_index < self.plan.last_index() {
            self.stage_index += 1;
            self.stage_started_at_ms = now.timestamp_millis();
            self.store.save(&self.local_record())?;
            let entered = self.current_stage();
            debug!(game = %self.plan.name, stage = self.stage_index, "stage advanced");
            return Ok(Some(Event::StageAdvanced {
                game: self.plan.name.clone(),
                stage_index: self.stage_index,
                stage_id: entered.map(|s| s.id.clone()).unwrap_or_default(),
                kind: entered.map(|s| s.kind).unwrap_or(StageKind::Timed),
                duration_ms: entered.and_then(|s| s.duration_ms),
                at: now,
            }));
        }

        self.complete(now).map(Some)
    }

    /// Explicit exit from the non-timed terminal stage. Valid only while
    /// `Running` at the last index; otherwise a no-op.
    ///
    /// # Errors
    /// Returns an error if clearing the session record fails.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<Option<Event>, CoreError> {
        if self.phase != SequencerPhase::Running || self.stage_index != self.plan.last_index() {
            return Ok(None);
        }
        self.complete(now).map(Some)
    }

    /// Drain change notifications from other execution contexts and
    /// reconcile against the most recent differing record.
    ///
    /// Position truth stays wall-clock: the located stage is recomputed
    /// from the new record's `start_at`, so a notification moves this
    /// sequencer only as far as elapsed time justifies. Cleared-elsewhere
    /// notifications (empty payload) are ignored; the next `start` begins
    /// fresh. Call periodically, like a timer tick.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let drained: Vec<StorageEvent> = match self.inbox.lock() {
            Ok(mut inbox) => inbox.drain(..).collect(),
            Err(_) => return None,
        };
        if self.phase != SequencerPhase::Running {
            return None;
        }

        let mut synced = None;
        for event in drained {
            let Some(payload) = event.value else {
                continue;
            };
            let Ok(record) = serde_json::from_str::<SessionRecord>(&payload) else {
                continue;
            };
            if record.game != self.plan.name || record == self.local_record() {
                continue;
            }
            let elapsed = now.timestamp_millis().saturating_sub(record.start_at);
            let position = locate_stage(elapsed, &self.plan.durations());
            self.start_at_ms = record.start_at;
            self.stage_index = position.index;
            self.stage_started_at_ms = now.timestamp_millis() - position.offset_ms as i64;
            debug!(game = %self.plan.name, stage = position.index, "reconciled against external write");
            synced = Some(Event::SessionSynced {
                game: self.plan.name.clone(),
                stage_index: position.index,
                remaining_ms: self.remaining_ms(now),
                at: now,
            });
        }
        synced
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self, now: DateTime<Utc>) -> Result<Event, CoreError> {
        self.store.clear(&self.plan.name)?;
        self.phase = SequencerPhase::Terminal;
        let totals = self.accumulator.totals();
        info!(
            game = %self.plan.name,
            score = totals.total_score,
            stages = totals.total_stages_completed,
            "session finished"
        );
        Ok(Event::SessionFinished {
            game: self.plan.name.clone(),
            totals,
            at: now,
        })
    }

    fn local_record(&self) -> SessionRecord {
        SessionRecord {
            game: self.plan.name.clone(),
            start_at: self.start_at_ms,
            current_stage_index: self.stage_index,
            stage_started_at: self.stage_started_at_ms,
        }
    }
}
