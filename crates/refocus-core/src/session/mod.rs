//! Resumable staged-session pipeline.
//!
//! A session is a fixed, ordered sequence of stages (meditation, scored
//! game rounds, breaks, a terminal score screen) anchored to a wall-clock
//! start time. Position in the pipeline is always derived from elapsed
//! time, which is what makes sessions resumable across restarts.

mod accumulator;
pub mod component;
mod locate;
mod plan;
mod sequencer;

pub use accumulator::{SessionAccumulator, SessionTotals};
pub use component::{CountdownStage, StageComponent, StagePoll, StageResult};
pub use locate::{locate_stage, StagePosition};
pub use plan::{StageDescriptor, StageKind, StagePlan};
pub use sequencer::{Sequencer, SequencerPhase};
