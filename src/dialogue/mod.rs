//! Booking conversation as a small directed graph of nodes over a shared state.
//!
//! Each turn picks an entry node from the state, runs it, and follows
//! conditional edges until a node ends the turn.

pub mod state;
pub mod routing;
pub mod nodes;
pub mod graph;
pub mod checkpoint;

pub use state::*;
pub use routing::*;
pub use graph::*;
pub use checkpoint::*;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::scheduling::SchedulingError;

#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Checkpoint store unavailable: {0}")]
    Checkpoint(String),
}
