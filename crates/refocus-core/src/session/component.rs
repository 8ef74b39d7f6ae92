//! Stage component contract.
//!
//! Stage components drive the sequencer from the outside: the caller polls
//! them on its own cadence (once per second is enough for countdowns) and
//! feeds an `Advance` result into [`Sequencer::advance`]. A component that
//! never advances stalls the session; recovery is a fresh `start`, which is
//! idempotent.
//!
//! [`Sequencer::advance`]: super::Sequencer::advance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result payload produced by a scored game stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Cumulative score as reported by the game.
    pub score: i64,
    /// Opaque game state carried into the next scored stage.
    #[serde(default)]
    pub state: serde_json::Value,
}

/// Outcome of polling a stage component.
#[derive(Debug, Clone, PartialEq)]
pub enum StagePoll {
    /// Still running; poll again later.
    Pending,
    /// Stage finished. Timer-only stages advance with no payload, scored
    /// games with a result. Emitted at most once per component.
    Advance(Option<StageResult>),
}

/// A replaceable unit occupying one stage of the pipeline.
pub trait StageComponent {
    fn poll(&mut self, now: DateTime<Utc>) -> StagePoll;
}

/// Built-in timer-only component for meditation and break stages.
///
/// Counts down against a wall-clock deadline and fires `Advance(None)`
/// exactly once when it passes.
#[derive(Debug, Clone)]
pub struct CountdownStage {
    deadline_ms: i64,
    fired: bool,
}

impl CountdownStage {
    pub fn new(now: DateTime<Utc>, remaining_ms: u64) -> Self {
        let remaining = remaining_ms.min(i64::MAX as u64) as i64;
        Self {
            deadline_ms: now.timestamp_millis().saturating_add(remaining),
            fired: false,
        }
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        self.deadline_ms.saturating_sub(now.timestamp_millis()).max(0) as u64
    }
}

impl StageComponent for CountdownStage {
    fn poll(&mut self, now: DateTime<Utc>) -> StagePoll {
        if self.fired {
            return StagePoll::Pending;
        }
        if now.timestamp_millis() >= self.deadline_ms {
            self.fired = true;
            StagePoll::Advance(None)
        } else {
            StagePoll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn countdown_pends_before_deadline() {
        let now = at(1_000_000);
        let mut stage = CountdownStage::new(now, 5_000);
        assert_eq!(stage.poll(now), StagePoll::Pending);
        assert_eq!(stage.poll(now + Duration::milliseconds(4_999)), StagePoll::Pending);
        assert_eq!(stage.remaining_ms(now + Duration::milliseconds(2_000)), 3_000);
    }

    #[test]
    fn countdown_advances_at_deadline() {
        let now = at(1_000_000);
        let mut stage = CountdownStage::new(now, 5_000);
        assert_eq!(
            stage.poll(now + Duration::milliseconds(5_000)),
            StagePoll::Advance(None)
        );
    }

    #[test]
    fn countdown_fires_at_most_once() {
        let now = at(1_000_000);
        let mut stage = CountdownStage::new(now, 1_000);
        let later = now + Duration::milliseconds(2_000);
        assert_eq!(stage.poll(later), StagePoll::Advance(None));
        assert_eq!(stage.poll(later), StagePoll::Pending);
        assert_eq!(stage.poll(later + Duration::milliseconds(60_000)), StagePoll::Pending);
    }

    #[test]
    fn remaining_clamps_past_deadline() {
        let now = at(1_000_000);
        let stage = CountdownStage::new(now, 1_000);
        assert_eq!(stage.remaining_ms(now + Duration::milliseconds(10_000)), 0);
    }
}
