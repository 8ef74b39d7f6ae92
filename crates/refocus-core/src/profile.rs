//! Per-user progress profile boundary.
//!
//! The sequencer itself never touches the profile; only the score screen
//! does, after a `SessionFinished` hand-off. The durable backend lives
//! upstream, so this module specifies the boundary and ships an in-memory
//! implementation for tests and embedding.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::SessionTotals;

/// Cross-session totals for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressProfile {
    pub lifetime_points: i64,
    pub lifetime_sessions: u32,
    /// Consecutive days with at least one finished session.
    pub streak_days: u32,
    pub last_session_at: Option<DateTime<Utc>>,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub lifetime_points: Option<i64>,
    pub lifetime_sessions: Option<u32>,
    pub streak_days: Option<u32>,
    pub last_session_at: Option<DateTime<Utc>>,
}

impl ProgressProfile {
    fn apply(&mut self, update: &ProgressUpdate) {
        if let Some(points) = update.lifetime_points {
            self.lifetime_points = points;
        }
        if let Some(sessions) = update.lifetime_sessions {
            self.lifetime_sessions = sessions;
        }
        if let Some(streak) = update.streak_days {
            self.streak_days = streak;
        }
        if let Some(at) = update.last_session_at {
            self.last_session_at = Some(at);
        }
    }
}

/// Durable per-user profile storage.
/// The production backend is owned upstream; implementations here only
/// need read-modify-write consistency per user.
pub trait ProfileStore: Send + Sync {
    /// Read a user's profile. Unknown users get a default profile.
    fn read(&self, user_id: &str) -> Result<ProgressProfile, Box<dyn std::error::Error>>;

    /// Patch a user's profile with the supplied fields.
    fn update(
        &self,
        user_id: &str,
        update: &ProgressUpdate,
    ) -> Result<(), Box<dyn std::error::Error>>;
}

/// Fold a finished session's totals into a user's profile.
///
/// The streak advances by one on the first finished session of a calendar
/// day following a day with one, holds within the same day, and resets to
/// one after a gap.
///
/// # Errors
/// Propagates any read or update failure from the backing store.
pub fn commit_session(
    store: &dyn ProfileStore,
    user_id: &str,
    totals: &SessionTotals,
    now: DateTime<Utc>,
) -> Result<ProgressProfile, Box<dyn std::error::Error>> {
    let mut profile = store.read(user_id)?;

    let streak = match profile.last_session_at {
        Some(last) if same_day(last, now) => profile.streak_days.max(1),
        Some(last) if same_day(last + chrono::Duration::days(1), now) => {
            profile.streak_days + 1
        }
        _ => 1,
    };

    let update = ProgressUpdate {
        lifetime_points: Some(profile.lifetime_points + totals.total_score),
        lifetime_sessions: Some(profile.lifetime_sessions + 1),
        streak_days: Some(streak),
        last_session_at: Some(now),
    };
    store.update(user_id, &update)?;
    profile.apply(&update);
    debug!(
        user = %user_id,
        points = profile.lifetime_points,
        streak = profile.streak_days,
        "session committed to profile"
    );
    Ok(profile)
}

fn same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.ordinal() == b.ordinal()
}

/// In-memory profile store.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<String, ProgressProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn read(&self, user_id: &str) -> Result<ProgressProfile, Box<dyn std::error::Error>> {
        let profiles = self.profiles.lock().map_err(|_| "profile store poisoned")?;
        Ok(profiles.get(user_id).cloned().unwrap_or_default())
    }

    fn update(
        &self,
        user_id: &str,
        update: &ProgressUpdate,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut profiles = self.profiles.lock().map_err(|_| "profile store poisoned")?;
        profiles.entry(user_id.to_string()).or_default().apply(update);
        Ok(())
    }
}
