//! API endpoint handlers.
//!
//! Dialogue turns call Ollama and SQLite synchronously, so handlers hand
//! that work to `spawn_blocking`.

pub mod admin;
pub mod health;
pub mod sessions;
