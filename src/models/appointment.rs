use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_name: String,
    pub appointment_time: NaiveDateTime,
    pub duration_minutes: u32,
    pub insurance_carrier: Option<String>,
    pub member_id: Option<String>,
    pub status: AppointmentStatus,
    pub forms_filled: bool,
}

/// Appointment request ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_name: String,
    pub appointment_time: NaiveDateTime,
    pub duration_minutes: u32,
    pub insurance_carrier: String,
    pub member_id: String,
}
