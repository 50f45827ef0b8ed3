pub mod email;
pub mod intake_form;

pub use email::*;
pub use intake_form::*;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid email address: {0}")]
    Address(String),

    #[error("Could not build message: {0}")]
    Message(String),

    #[error("SMTP error: {0}")]
    Transport(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
