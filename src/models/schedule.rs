use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::SlotStatus;

/// A half-hour interval in a doctor's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorSlot {
    pub id: i64,
    pub doctor_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: SlotStatus,
}
