//! Conversation checkpoints: where each session resumes on its next turn.
//!
//! Two backends:
//! - `MemoryCheckpointStore`: process-local, lost on restart (default)
//! - `SqliteCheckpointStore`: JSON rows in `conversation_checkpoints`

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use rusqlite::Connection;

use super::state::ConversationState;
use super::DialogueError;
use crate::db;

/// Persistence for conversation state, keyed by session id.
pub trait CheckpointStore: Send + Sync {
    fn load(&self, session_id: &str) -> Result<Option<ConversationState>, DialogueError>;
    fn save(&self, session_id: &str, state: &ConversationState) -> Result<(), DialogueError>;
    /// Returns true if a checkpoint existed.
    fn delete(&self, session_id: &str) -> Result<bool, DialogueError>;
}

// ═══════════════════════════════════════════════════════════
// In-memory
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
pub struct MemoryCheckpointStore {
    states: RwLock<HashMap<String, ConversationState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> DialogueError {
    DialogueError::Checkpoint("lock poisoned".into())
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self, session_id: &str) -> Result<Option<ConversationState>, DialogueError> {
        let states = self.states.read().map_err(poisoned)?;
        Ok(states.get(session_id).cloned())
    }

    fn save(&self, session_id: &str, state: &ConversationState) -> Result<(), DialogueError> {
        let mut states = self.states.write().map_err(poisoned)?;
        states.insert(session_id.to_string(), state.clone());
        Ok(())
    }

    fn delete(&self, session_id: &str) -> Result<bool, DialogueError> {
        let mut states = self.states.write().map_err(poisoned)?;
        Ok(states.remove(session_id).is_some())
    }
}

// ═══════════════════════════════════════════════════════════
// SQLite
// ═══════════════════════════════════════════════════════════

/// Checkpoints that survive restarts. Owns a dedicated connection.
pub struct SqliteCheckpointStore {
    conn: Mutex<Connection>,
}

impl SqliteCheckpointStore {
    /// `conn` must have migrations applied (see `db::open_database`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn load(&self, session_id: &str) -> Result<Option<ConversationState>, DialogueError> {
        let conn = self.conn.lock().map_err(poisoned)?;
        match db::load_checkpoint(&conn, session_id)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, session_id: &str, state: &ConversationState) -> Result<(), DialogueError> {
        let json = serde_json::to_string(state)?;
        let conn = self.conn.lock().map_err(poisoned)?;
        db::save_checkpoint(&conn, session_id, &json)?;
        Ok(())
    }

    fn delete(&self, session_id: &str) -> Result<bool, DialogueError> {
        let conn = self.conn.lock().map_err(poisoned)?;
        Ok(db::delete_checkpoint(&conn, session_id)?)
    }
}
