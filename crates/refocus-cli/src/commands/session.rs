use chrono::{DateTime, Utc};
use clap::Subcommand;
use refocus_core::{Config, Event, Sequencer, SessionStore, SessionTotals, StageResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session, or resume one left behind
    Start {
        /// Game variant
        #[arg(long, default_value = "money_stack")]
        game: String,
        /// Override the wall-clock time (ms since epoch)
        #[arg(long)]
        at: Option<i64>,
    },
    /// Print the current session state as JSON
    Status {
        /// Game variant
        #[arg(long, default_value = "money_stack")]
        game: String,
        /// Override the wall-clock time (ms since epoch)
        #[arg(long)]
        at: Option<i64>,
    },
    /// Complete the current stage and enter the next one
    Advance {
        /// Game variant
        #[arg(long, default_value = "money_stack")]
        game: String,
        /// Cumulative score reported by a scored game stage
        #[arg(long)]
        score: Option<i64>,
        /// Opaque game state JSON carried into the next scored stage
        #[arg(long)]
        state: Option<String>,
        /// Override the wall-clock time (ms since epoch)
        #[arg(long)]
        at: Option<i64>,
    },
    /// Exit the score screen and close the session
    Finish {
        /// Game variant
        #[arg(long, default_value = "money_stack")]
        game: String,
        /// Override the wall-clock time (ms since epoch)
        #[arg(long)]
        at: Option<i64>,
    },
    /// Drop the persisted session record
    Clear {
        /// Game variant
        #[arg(long, default_value = "money_stack")]
        game: String,
    },
}

fn now_from(at: Option<i64>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match at {
        Some(ms) => DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| format!("--at value {ms} is out of range").into()),
        None => Ok(Utc::now()),
    }
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Start { game, at } => {
            let now = now_from(at)?;
            let store = SessionStore::open()?;
            let plan = Config::load_or_default().plan_for(&game);
            let mut seq = Sequencer::new(plan, store);
            let event = seq.start(now)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        SessionAction::Status { game, at } => {
            let now = now_from(at)?;
            let store = SessionStore::open()?;
            let plan = Config::load_or_default().plan_for(&game);
            // Resume only if a record exists; status alone never creates one.
            let has_session = store.load(&game).is_some();
            let mut seq = Sequencer::new(plan, store);
            if has_session {
                seq.start(now)?;
            }
            println!("{}", serde_json::to_string_pretty(&seq.snapshot(now))?);
        }
        SessionAction::Advance {
            game,
            score,
            state,
            at,
        } => {
            let now = now_from(at)?;
            let store = SessionStore::open()?;
            if store.load(&game).is_none() {
                return Err(format!("no active session for '{game}'").into());
            }
            let plan = Config::load_or_default().plan_for(&game);
            let mut seq = Sequencer::new(plan, store);
            let resumed = seq.start(now)?;
            if let Event::SessionExpired { .. } = resumed {
                println!("{}", serde_json::to_string_pretty(&resumed)?);
                return Ok(());
            }
            let result = match (score, state) {
                (None, None) => None,
                (score, state) => Some(StageResult {
                    score: score.unwrap_or(0),
                    state: state
                        .map(|s| serde_json::from_str(&s))
                        .transpose()?
                        .unwrap_or(serde_json::Value::Null),
                }),
            };
            match seq.advance(result, now)? {
                Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
                None => println!("{}", serde_json::to_string_pretty(&seq.snapshot(now))?),
            }
        }
        SessionAction::Finish { game, at } => {
            let now = now_from(at)?;
            let store = SessionStore::open()?;
            let plan = Config::load_or_default().plan_for(&game);
            let Some(record) = store.load(&game) else {
                return Err(format!("no active session for '{game}'").into());
            };
            if record.current_stage_index != plan.last_index() {
                return Err(format!("session for '{game}' is not at the score stage").into());
            }
            // Totals reflect this process's accumulator only; completed-stage
            // score history does not survive across invocations.
            store.clear(&game)?;
            let event = Event::SessionFinished {
                game,
                totals: SessionTotals::default(),
                at: now,
            };
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        SessionAction::Clear { game } => {
            let store = SessionStore::open()?;
            store.clear(&game)?;
            let cleared = serde_json::json!({ "type": "SessionCleared", "game": game });
            println!("{}", serde_json::to_string_pretty(&cleared)?);
        }
    }
    Ok(())
}
