use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use serde::Serialize;

use super::nodes::{run_node, NodeContext};
use super::routing::{entry_node, next_node, Node};
use super::state::{ChatMessage, ConversationState};
use super::DialogueError;
use crate::extraction::Extractor;
use crate::models::enums::MessageRole;
use crate::notify::ConfirmationSender;

pub const INTERNAL_ERROR_REPLY: &str =
    "I'm sorry, something went wrong on our side. Please try again in a moment.";

/// What a single turn produced, for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Nodes visited in order.
    pub path: Vec<Node>,
    /// Assistant messages added during this turn.
    pub replies: Vec<String>,
    /// Slot labels the patient can pick from right now.
    pub slots: Vec<String>,
    pub final_confirmation: Option<String>,
    pub email_status: Option<String>,
}

/// Runs conversation turns. Holds no per-session data, so one graph serves every session.
pub struct DialogueGraph {
    extractor: Extractor,
    confirmations: ConfirmationSender,
    clock: Box<dyn Fn() -> NaiveDateTime + Send + Sync>,
}

impl DialogueGraph {
    pub fn new(extractor: Extractor, confirmations: ConfirmationSender) -> Self {
        Self {
            extractor,
            confirmations,
            clock: Box::new(|| Local::now().naive_local()),
        }
    }

    /// Replace the wall clock used for slot searches.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Run one turn. `input` is the patient's message; `None` starts the conversation.
    pub fn run_turn(
        &self,
        conn: &Connection,
        state: &mut ConversationState,
        input: Option<&str>,
    ) -> Result<TurnOutcome, DialogueError> {
        if let Some(text) = input {
            let text = text.trim();
            if text.is_empty() {
                return Err(DialogueError::EmptyMessage);
            }
            state.messages.push(ChatMessage::user(text));
        }

        let before = state.messages.len();
        let ctx = NodeContext {
            conn,
            extractor: &self.extractor,
            confirmations: &self.confirmations,
            now: (self.clock)(),
        };

        let mut path = Vec::new();
        let mut node = entry_node(state);
        loop {
            path.push(node);
            tracing::debug!(node = node.as_str(), "Running dialogue node");
            if let Err(e) = run_node(node, &ctx, state) {
                tracing::error!(node = node.as_str(), error = %e, "Dialogue node failed");
                state.say(INTERNAL_ERROR_REPLY);
                break;
            }
            match next_node(node, state) {
                Some(next) => node = next,
                None => break,
            }
        }

        let replies = state.messages[before..]
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.clone())
            .collect();

        Ok(TurnOutcome {
            path,
            replies,
            slots: pending_slots(state).to_vec(),
            final_confirmation: state.final_confirmation.clone(),
            email_status: state.email_status.clone(),
        })
    }
}

/// Slots still awaiting a choice: offered, none picked, nothing booked.
pub fn pending_slots(state: &ConversationState) -> &[String] {
    if state.is_booked() || state.booking_info.appointment_time.is_some() {
        &[]
    } else {
        &state.booking_info.slots
    }
}
