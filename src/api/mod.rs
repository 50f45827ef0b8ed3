//! HTTP JSON API for the booking assistant.
//!
//! `api_router()` returns a composable `Router` with every route under
//! `/api/`; `start_api_server()` binds it and serves in the background.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
