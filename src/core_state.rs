//! Transport-agnostic application state.
//!
//! `CoreState` is shared by the HTTP API and the CLI. It owns the dialogue
//! graph and the checkpoint store; each call opens its own database
//! connection so blocking work can run on any thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::{AppConfig, CheckpointBackend};
use crate::db;
use crate::dialogue::{
    CheckpointStore, ConversationState, DialogueError, DialogueGraph, MemoryCheckpointStore,
    SqliteCheckpointStore, TurnOutcome,
};
use crate::extraction::{Extractor, OllamaClient, DEFAULT_TIMEOUT_SECS};
use crate::notify::{ConfirmationSender, Mailer, SmtpMailer};
use crate::report::{self, ReportError, ReportSummary};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    pub config: AppConfig,
    graph: DialogueGraph,
    checkpoints: Box<dyn CheckpointStore>,
    /// One turn at a time per session.
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CoreState {
    pub fn new(config: AppConfig, graph: DialogueGraph, checkpoints: Box<dyn CheckpointStore>) -> Self {
        Self {
            config,
            graph,
            checkpoints,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wire up Ollama, SMTP and the configured checkpoint backend.
    pub fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        config
            .ensure_data_dir()
            .map_err(|e| CoreError::Setup(format!("data directory: {e}")))?;

        let client = OllamaClient::new(&config.ollama_url, DEFAULT_TIMEOUT_SECS)
            .map_err(|e| CoreError::Setup(e.to_string()))?;
        let extractor = Extractor::new(Box::new(client), &config.extraction_model);

        let mailer: Option<Box<dyn Mailer + Send + Sync>> = match &config.smtp {
            Some(settings) => Some(Box::new(
                SmtpMailer::from_settings(settings).map_err(|e| CoreError::Setup(e.to_string()))?,
            )),
            None => {
                tracing::warn!("EMAIL_* not set, confirmation emails are disabled");
                None
            }
        };
        let confirmations = ConfirmationSender::new(mailer, config.intake_form_path.clone());

        let checkpoints: Box<dyn CheckpointStore> = match config.checkpoints {
            CheckpointBackend::Memory => Box::new(MemoryCheckpointStore::new()),
            CheckpointBackend::Sqlite => Box::new(SqliteCheckpointStore::new(db::open_database(
                &config.database_path,
            )?)),
        };

        Ok(Self::new(
            config,
            DialogueGraph::new(extractor, confirmations),
            checkpoints,
        ))
    }

    /// Open a connection to the clinic database (migrations applied).
    pub fn open_db(&self) -> Result<Connection, CoreError> {
        db::open_database(&self.config.database_path).map_err(CoreError::Database)
    }

    // ── Conversation lifecycle ──────────────────────────────

    /// Start a new conversation and run its greeting turn.
    pub fn start_session(&self) -> Result<(String, ConversationState, TurnOutcome), CoreError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let conn = self.open_db()?;
        let mut state = ConversationState::new();
        let outcome = self.graph.run_turn(&conn, &mut state, None)?;
        self.checkpoints.save(&session_id, &state)?;
        tracing::info!(session_id = %session_id, "Conversation started");
        Ok((session_id, state, outcome))
    }

    /// Run one turn for an existing conversation and checkpoint the result.
    pub fn send_message(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<(ConversationState, TurnOutcome), CoreError> {
        // Unknown ids never get a lock entry.
        self.load_session(session_id)?;
        let lock = self.turn_lock(session_id)?;
        let _guard = lock.lock().map_err(|_| CoreError::LockPoisoned)?;

        let mut state = self.load_session(session_id)?;
        let conn = self.open_db()?;
        let outcome = self.graph.run_turn(&conn, &mut state, Some(message))?;
        self.checkpoints.save(session_id, &state)?;
        tracing::debug!(
            session_id,
            path = ?outcome.path,
            "Turn complete"
        );
        Ok((state, outcome))
    }

    pub fn load_session(&self, session_id: &str) -> Result<ConversationState, CoreError> {
        self.checkpoints
            .load(session_id)?
            .ok_or_else(|| DialogueError::SessionNotFound(session_id.to_string()).into())
    }

    /// Forget a conversation. Returns false if it did not exist.
    pub fn reset_session(&self, session_id: &str) -> Result<bool, CoreError> {
        let removed = self.checkpoints.delete(session_id)?;
        if let Ok(mut locks) = self.turn_locks.lock() {
            locks.remove(session_id);
        }
        Ok(removed)
    }

    // ── Admin ───────────────────────────────────────────────

    /// Whether the extraction model is pulled and Ollama answers. Blocking.
    pub fn extraction_model_ready(&self) -> bool {
        let extractor = self.graph.extractor();
        match extractor.client().is_model_available(extractor.model()) {
            Ok(ready) => ready,
            Err(e) => {
                tracing::warn!(error = %e, "Ollama unreachable");
                false
            }
        }
    }

    pub fn generate_report(&self) -> Result<ReportSummary, CoreError> {
        let conn = self.open_db()?;
        Ok(report::generate_admin_report(&conn, &self.config.report_path)?)
    }

    fn turn_lock(&self, session_id: &str) -> Result<Arc<Mutex<()>>, CoreError> {
        let mut locks = self.turn_locks.lock().map_err(|_| CoreError::LockPoisoned)?;
        Ok(locks.entry(session_id.to_string()).or_default().clone())
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Setup failed: {0}")]
    Setup(String),
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("{0}")]
    Dialogue(#[from] DialogueError),
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    use chrono::NaiveDateTime;

    use crate::extraction::MockLlmClient;
    use crate::models::DB_TIME_FORMAT;
    use crate::notify::RecordingMailer;

    /// CoreState over a file database in `dir` with two open slots and a mock LLM.
    pub(crate) fn test_core(dir: &std::path::Path, responses: &[&str]) -> CoreState {
        test_core_with(dir, responses, Box::new(MemoryCheckpointStore::new()))
    }

    pub(crate) fn test_core_with(
        dir: &std::path::Path,
        responses: &[&str],
        checkpoints: Box<dyn CheckpointStore>,
    ) -> CoreState {
        let config = AppConfig::from_lookup(|key| match key {
            "AURA_DATA_DIR" => Some(dir.display().to_string()),
            _ => None,
        })
        .unwrap();
        let conn = db::open_database(&config.database_path).unwrap();
        let start = NaiveDateTime::parse_from_str("2024-05-06 09:00", DB_TIME_FORMAT).unwrap();
        db::insert_slots(
            &conn,
            &[
                ("Dr. Smith".into(), start, start + chrono::Duration::minutes(30)),
                ("Dr. Adams".into(), start, start + chrono::Duration::minutes(30)),
            ],
        )
        .unwrap();

        let graph = DialogueGraph::new(
            Extractor::new(Box::new(MockLlmClient::with_sequence(responses)), "phi3:mini"),
            ConfirmationSender::new(
                Some(Box::new(RecordingMailer::new())),
                PathBuf::from("/nonexistent/intake.pdf"),
            ),
        )
        .with_clock(|| NaiveDateTime::parse_from_str("2024-05-01 08:00", DB_TIME_FORMAT).unwrap());
        CoreState::new(config, graph, checkpoints)
    }

    #[test]
    fn session_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let core = test_core(dir.path(), &[r#"{"full_name": "Jane Doe"}"#]);

        let (id, state, outcome) = core.start_session().unwrap();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(outcome.replies.len(), 1);

        let (state, _) = core.send_message(&id, "I'm Jane").unwrap();
        assert_eq!(state.messages.len(), 3);
        assert_eq!(core.load_session(&id).unwrap(), state);

        assert!(core.reset_session(&id).unwrap());
        assert!(matches!(
            core.load_session(&id),
            Err(CoreError::Dialogue(DialogueError::SessionNotFound(_)))
        ));
    }

    #[test]
    fn unknown_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let core = test_core(dir.path(), &["{}"]);
        assert!(matches!(
            core.send_message("nope", "hello"),
            Err(CoreError::Dialogue(DialogueError::SessionNotFound(_)))
        ));
    }

    #[test]
    fn unknown_sessions_leave_no_turn_locks() {
        let dir = tempfile::tempdir().unwrap();
        let core = test_core(dir.path(), &["{}"]);
        for i in 0..100 {
            assert!(core.send_message(&format!("bogus-{i}"), "hi").is_err());
        }
        assert!(core.turn_locks.lock().unwrap().is_empty());

        let (id, _, _) = core.start_session().unwrap();
        core.send_message(&id, "hello").unwrap();
        assert_eq!(core.turn_locks.lock().unwrap().len(), 1);
        core.reset_session(&id).unwrap();
        assert!(core.turn_locks.lock().unwrap().is_empty());
    }

    #[test]
    fn report_lands_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let core = test_core(dir.path(), &["{}"]);
        let summary = core.generate_report().unwrap();
        assert_eq!(summary.rows, 0);
        assert!(summary.path.starts_with(dir.path()));
    }
}
