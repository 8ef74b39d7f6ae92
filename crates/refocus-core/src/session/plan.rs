use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Behavioral kind of a stage.
///
/// Stages are classified by an explicit variant rather than by inspecting
/// their id strings: timer-only stages just count down, scored games carry
/// a result payload, and the terminal score stage has no timer at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Timed,
    ScoredGame,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// Stable identifier, unique within a plan.
    pub id: String,
    pub label: String,
    pub kind: StageKind,
    /// Fixed duration in milliseconds. `None` only for the terminal stage,
    /// which is exited by explicit user action rather than a timer.
    pub duration_ms: Option<u64>,
}

impl StageDescriptor {
    pub fn timed(id: impl Into<String>, label: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: StageKind::Timed,
            duration_ms: Some(duration_ms),
        }
    }

    pub fn scored(id: impl Into<String>, label: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: StageKind::ScoredGame,
            duration_ms: Some(duration_ms),
        }
    }

    pub fn terminal(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: StageKind::Terminal,
            duration_ms: None,
        }
    }
}

/// Ordered, immutable stage table for one game variant.
///
/// The plan is fixed at session start; the sequencer walks it front to
/// back and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    /// Game variant name, also the persistence key prefix.
    pub name: String,
    pub stages: Vec<StageDescriptor>,
}

impl StagePlan {
    /// Build a validated plan.
    ///
    /// # Errors
    /// Returns an error if the stage list is empty, a terminal stage is not
    /// in last position, a terminal stage carries a duration, or a timed
    /// stage is missing one.
    pub fn new(
        name: impl Into<String>,
        stages: Vec<StageDescriptor>,
    ) -> Result<Self, ValidationError> {
        if stages.is_empty() {
            return Err(ValidationError::EmptyCollection("stages".into()));
        }
        for (index, stage) in stages.iter().enumerate() {
            let is_last = index + 1 == stages.len();
            match stage.kind {
                StageKind::Terminal => {
                    if !is_last {
                        return Err(ValidationError::InvalidValue {
                            field: format!("stages[{index}]"),
                            message: "terminal stage must be the last stage".into(),
                        });
                    }
                    if stage.duration_ms.is_some() {
                        return Err(ValidationError::InvalidValue {
                            field: format!("stages[{index}]"),
                            message: "terminal stage cannot have a duration".into(),
                        });
                    }
                }
                StageKind::Timed | StageKind::ScoredGame => {
                    if stage.duration_ms.is_none() {
                        return Err(ValidationError::InvalidValue {
                            field: format!("stages[{index}]"),
                            message: "timed stage requires a duration".into(),
                        });
                    }
                }
            }
        }
        Ok(Self {
            name: name.into(),
            stages,
        })
    }

    /// The standard recovery pipeline: meditation, three scored game rounds
    /// separated by short breaks, then the terminal score screen.
    pub fn standard(name: &str, meditation_ms: u64, game_ms: u64, break_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            stages: vec![
                StageDescriptor::timed("meditation", "Meditation", meditation_ms),
                StageDescriptor::scored("game_1", "Round 1", game_ms),
                StageDescriptor::timed("hydration_break", "Hydration Break", break_ms),
                StageDescriptor::scored("game_2", "Round 2", game_ms),
                StageDescriptor::timed("movement_break", "Movement Break", break_ms),
                StageDescriptor::scored("game_3", "Round 3", game_ms),
                StageDescriptor::terminal("score", "Score"),
            ],
        }
    }

    /// Built-in plan for the money-stack game variant.
    pub fn money_stack() -> Self {
        Self::standard("money_stack", 300_000, 420_000, 120_000)
    }

    /// Built-in plan for the ping-money game variant.
    pub fn ping_money() -> Self {
        Self::standard("ping_money", 300_000, 420_000, 120_000)
    }

    /// Per-stage durations for the time locator. The terminal stage maps to 0.
    pub fn durations(&self) -> Vec<u64> {
        self.stages
            .iter()
            .map(|s| s.duration_ms.unwrap_or(0))
            .collect()
    }

    /// Sum of all timed durations; elapsed time past this means the session
    /// has expired.
    pub fn total_timed_ms(&self) -> u64 {
        self.stages
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.duration_ms.unwrap_or(0)))
    }

    /// Cumulative milliseconds completed up to (but not including) `stage_index`.
    pub fn cumulative_ms(&self, stage_index: usize) -> u64 {
        self.stages
            .iter()
            .take(stage_index)
            .fold(0u64, |acc, s| acc.saturating_add(s.duration_ms.unwrap_or(0)))
    }

    pub fn get(&self, index: usize) -> Option<&StageDescriptor> {
        self.stages.get(index)
    }

    pub fn last_index(&self) -> usize {
        self.stages.len().saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_plan_has_7_stages() {
        let plan = StagePlan::money_stack();
        assert_eq!(plan.len(), 7);
        assert_eq!(
            plan.durations(),
            vec![300_000, 420_000, 120_000, 420_000, 120_000, 420_000, 0]
        );
        assert_eq!(plan.total_timed_ms(), 1_800_000);
    }

    #[test]
    fn standard_plan_stage_kinds() {
        let plan = StagePlan::ping_money();
        let kinds: Vec<StageKind> = plan.stages.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StageKind::Timed,
                StageKind::ScoredGame,
                StageKind::Timed,
                StageKind::ScoredGame,
                StageKind::Timed,
                StageKind::ScoredGame,
                StageKind::Terminal,
            ]
        );
        assert!(plan.stages[6].duration_ms.is_none());
    }

    #[test]
    fn cumulative_ms_sums_prior_stages() {
        let plan = StagePlan::money_stack();
        assert_eq!(plan.cumulative_ms(0), 0);
        assert_eq!(plan.cumulative_ms(1), 300_000);
        assert_eq!(plan.cumulative_ms(2), 720_000);
        assert_eq!(plan.cumulative_ms(7), 1_800_000);
    }

    #[test]
    fn new_rejects_empty_plan() {
        assert!(matches!(
            StagePlan::new("empty", vec![]),
            Err(ValidationError::EmptyCollection(_))
        ));
    }

    #[test]
    fn new_rejects_terminal_before_last() {
        let stages = vec![
            StageDescriptor::terminal("score", "Score"),
            StageDescriptor::timed("meditation", "Meditation", 1000),
        ];
        assert!(StagePlan::new("bad", stages).is_err());
    }

    #[test]
    fn new_rejects_timed_stage_without_duration() {
        let stages = vec![StageDescriptor {
            id: "meditation".into(),
            label: "Meditation".into(),
            kind: StageKind::Timed,
            duration_ms: None,
        }];
        assert!(StagePlan::new("bad", stages).is_err());
    }

    #[test]
    fn new_rejects_terminal_with_duration() {
        let stages = vec![StageDescriptor {
            id: "score".into(),
            label: "Score".into(),
            kind: StageKind::Terminal,
            duration_ms: Some(1000),
        }];
        assert!(StagePlan::new("bad", stages).is_err());
    }

    #[test]
    fn new_accepts_plan_without_terminal() {
        let stages = vec![
            StageDescriptor::timed("warmup", "Warm Up", 1000),
            StageDescriptor::scored("game_1", "Round 1", 2000),
        ];
        let plan = StagePlan::new("short", stages).unwrap();
        assert_eq!(plan.last_index(), 1);
        assert_eq!(plan.total_timed_ms(), 3000);
    }
}
