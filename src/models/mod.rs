pub mod enums;
pub mod patient;
pub mod schedule;
pub mod appointment;

pub use patient::*;
pub use schedule::*;
pub use appointment::*;

/// Storage format for slot and appointment timestamps.
pub const DB_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Patient-facing format used in slot labels and messages.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %I:%M %p";

/// Storage format for dates of birth.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
