//! Named sessions: save, select, delete, and continuous sync of the
//! current session while one is active.
//!
//! A session is a snapshot of the navigation coordinates, not of fetched
//! data; loading one replays the coordinates against the live backend.
//! While a restore replay is in flight, [`SessionManager`] refuses state
//! pushes so the replay's own intermediate states never overwrite the
//! saved snapshot being restored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trbrowse_core::error::Result;
use trbrowse_core::traits::StateStore;
use trbrowse_core::types::{DatasetRef, Mode};

pub const SESSIONS_KEY: &str = "sessions";
pub const CURRENT_SESSION_KEY: &str = "current_session";

/// The replayable coordinates a session captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cohort_folder: Option<DatasetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_region: Option<String>,
    #[serde(default)]
    pub selected_genotypes: Vec<String>,
    pub mode: Mode,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            dataset: None,
            cohort_folder: None,
            selected_region: None,
            selected_genotypes: Vec::new(),
            mode: Mode::Individual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: SessionState,
}

/// Whether a session replay is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    Idle,
    Restoring,
}

pub struct SessionManager<S: StateStore> {
    store: Arc<S>,
    current: Option<String>,
    phase: RestorePhase,
}

impl<S: StateStore> SessionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        let current = store.get(CURRENT_SESSION_KEY).filter(|id| !id.is_empty());
        Self {
            store,
            current,
            phase: RestorePhase::Idle,
        }
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.store.get_json(SESSIONS_KEY).unwrap_or_default()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn phase(&self) -> RestorePhase {
        self.phase
    }

    pub fn find(&self, id: &str) -> Option<Session> {
        self.sessions().into_iter().find(|s| s.id == id)
    }

    /// Saves `state` under `name`, replacing any session of the same name,
    /// and makes it the current session. The list stays newest-first.
    pub fn save(&mut self, name: &str, state: SessionState) -> Result<Session> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
            state,
        };
        let mut sessions = self.sessions();
        sessions.retain(|s| s.name != session.name);
        sessions.push(session.clone());
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.store.set_json(SESSIONS_KEY, &sessions)?;
        self.set_current(Some(session.id.clone()))?;
        Ok(session)
    }

    /// Marks an existing session as current, returning its snapshot.
    pub fn select(&mut self, id: &str) -> Result<Option<Session>> {
        let session = match self.find(id) {
            Some(s) => s,
            None => return Ok(None),
        };
        self.set_current(Some(session.id.clone()))?;
        Ok(Some(session))
    }

    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        if sessions.len() == before {
            return Ok(false);
        }
        self.store.set_json(SESSIONS_KEY, &sessions)?;
        if self.current.as_deref() == Some(id) {
            self.set_current(None)?;
        }
        Ok(true)
    }

    pub fn clear_current(&mut self) -> Result<()> {
        self.set_current(None)
    }

    /// Syncs the current session's snapshot with the live state. A no-op
    /// when no session is current, when the state is unchanged, or while
    /// a restore replay is in flight.
    pub fn push_update(&mut self, state: &SessionState) -> Result<()> {
        if self.phase == RestorePhase::Restoring {
            return Ok(());
        }
        let Some(current) = self.current.clone() else {
            return Ok(());
        };
        let mut sessions = self.sessions();
        let Some(slot) = sessions.iter_mut().find(|s| s.id == current) else {
            // Current id points at a deleted session; drop the pointer.
            return self.set_current(None);
        };
        if slot.state == *state {
            return Ok(());
        }
        slot.state = state.clone();
        self.store.set_json(SESSIONS_KEY, &sessions)
    }

    /// Enters the restoring phase. Returns `false` (and changes nothing)
    /// if a restore is already in flight.
    pub fn begin_restore(&mut self) -> bool {
        if self.phase == RestorePhase::Restoring {
            return false;
        }
        self.phase = RestorePhase::Restoring;
        true
    }

    pub fn end_restore(&mut self) {
        self.phase = RestorePhase::Idle;
    }

    fn set_current(&mut self, id: Option<String>) -> Result<()> {
        match &id {
            Some(id) => self.store.set(CURRENT_SESSION_KEY, id)?,
            None => self.store.remove(CURRENT_SESSION_KEY)?,
        }
        self.current = id;
        Ok(())
    }
}
