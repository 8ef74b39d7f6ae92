//! # Refocus Core Library
//!
//! Core logic for Refocus, a resumable multi-stage recovery-session
//! sequencer. The pipeline alternates meditation, scored game rounds and
//! short breaks, ending on a score screen. All operations are available
//! through a standalone CLI binary; any GUI is a thin layer over this
//! same library.
//!
//! ## Architecture
//!
//! - **Session**: Stage plans, a wall-clock time locator, and a sequencer
//!   state machine the caller drives by passing `now` into every command
//! - **Storage**: SQLite-backed session records with cross-context change
//!   notification, plus TOML configuration
//! - **Assessment**: Pure scoring for the intake questionnaire
//! - **Profile**: Boundary trait for cross-session user totals
//!
//! ## Key Components
//!
//! - [`Sequencer`]: Core session state machine
//! - [`StagePlan`]: Ordered stage table for one game variant
//! - [`SessionStore`]: Persisted session record storage
//! - [`Config`]: Application configuration management

pub mod assessment;
pub mod error;
pub mod events;
pub mod profile;
pub mod session;
pub mod storage;

pub use assessment::{compute_report, AssessmentBand, AssessmentReport};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use events::Event;
pub use profile::{commit_session, MemoryProfileStore, ProfileStore, ProgressProfile, ProgressUpdate};
pub use session::{
    locate_stage, CountdownStage, Sequencer, SequencerPhase, SessionAccumulator, SessionTotals,
    StageComponent, StageDescriptor, StageKind, StagePlan, StagePoll, StagePosition, StageResult,
};
pub use storage::{session_key, Config, PlanConfig, SessionRecord, SessionStore};
