//! Shared types for the API layer.

use std::sync::Arc;

use serde::Serialize;

use crate::core_state::CoreState;
use crate::dashboard::{build_dashboard, Dashboard};
use crate::dialogue::{pending_slots, ChatMessage, ConversationState, Node, TurnOutcome};

/// Longest chat message accepted from a client.
pub const MAX_MESSAGE_CHARS: usize = 2000;

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Session payloads
// ═══════════════════════════════════════════════════════════

/// Full view of a conversation after a turn, or on fetch.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    /// Replies produced by the turn that just ran. Empty on fetch.
    pub replies: Vec<String>,
    pub path: Vec<Node>,
    pub slots: Vec<String>,
    pub final_confirmation: Option<String>,
    pub email_status: Option<String>,
    pub dashboard: Dashboard,
}

impl SessionResponse {
    pub fn from_turn(session_id: String, state: ConversationState, outcome: TurnOutcome) -> Self {
        Self {
            dashboard: build_dashboard(&state),
            session_id,
            messages: state.messages,
            replies: outcome.replies,
            path: outcome.path,
            slots: outcome.slots,
            final_confirmation: outcome.final_confirmation,
            email_status: outcome.email_status,
        }
    }

    pub fn from_state(session_id: String, state: ConversationState) -> Self {
        Self {
            dashboard: build_dashboard(&state),
            session_id,
            slots: pending_slots(&state).to_vec(),
            final_confirmation: state.final_confirmation.clone(),
            email_status: state.email_status.clone(),
            messages: state.messages,
            replies: Vec::new(),
            path: Vec::new(),
        }
    }
}
