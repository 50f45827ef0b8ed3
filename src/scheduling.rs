//! Patient lookup, slot search and booking over the clinic database.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{self, DatabaseError};
use crate::extraction::PatientDetails;
use crate::models::*;

/// Prefix sent by the slot-selection buttons.
pub const SLOT_SELECTION_PREFIX: &str = "I'll take the slot:";

pub const RETURNING_PATIENT_MINUTES: u32 = 30;
pub const NEW_PATIENT_MINUTES: u32 = 60;

pub const DEFAULT_INSURANCE_CARRIER: &str = "Self-Pay";
pub const DEFAULT_MEMBER_ID: &str = "N/A";

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unrecognized appointment time: {0}")]
    InvalidTime(String),

    #[error("Slot with {doctor} at {time} is no longer available")]
    SlotUnavailable { doctor: String, time: String },
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(e))
    }
}

/// A bookable slot as offered to the patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOffer {
    pub doctor_name: String,
    pub start_time: NaiveDateTime,
}

impl SlotOffer {
    /// `"{doctor} at {YYYY-MM-DD hh:mm AM}"`
    pub fn label(&self) -> String {
        format_slot_label(&self.doctor_name, &self.start_time)
    }
}

/// A confirmed booking request. `appointment_time` uses the display format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub patient_id: i64,
    pub doctor_name: String,
    pub appointment_time: String,
    pub duration_minutes: u32,
    pub insurance_carrier: String,
    pub member_id: String,
}

pub fn search_patient(
    conn: &Connection,
    full_name: &str,
    date_of_birth: &str,
) -> Result<Option<Patient>, SchedulingError> {
    let patient = db::find_patient(conn, full_name, date_of_birth)?;
    tracing::debug!(found = patient.is_some(), "Patient search");
    Ok(patient)
}

/// Create a patient record. Name and birth date are mandatory.
pub fn add_patient(conn: &Connection, details: &PatientDetails) -> Result<Patient, SchedulingError> {
    let full_name = details
        .full_name
        .clone()
        .ok_or(SchedulingError::MissingField("full_name"))?;
    let date_of_birth = details
        .date_of_birth
        .clone()
        .ok_or(SchedulingError::MissingField("date_of_birth"))?;

    let patient = db::insert_patient(
        conn,
        &NewPatient {
            full_name,
            date_of_birth,
            email: details.email.clone(),
            phone_number: details.phone_number.clone(),
        },
    )?;
    tracing::info!(patient_id = patient.id, "New patient added");
    Ok(patient)
}

/// Number of slots offered for an appointment length.
pub fn slot_limit(duration_minutes: u32) -> u32 {
    if duration_minutes == RETURNING_PATIENT_MINUTES {
        10
    } else {
        5
    }
}

/// Available slots starting after `now`, earliest first.
pub fn find_slots(
    conn: &Connection,
    duration_minutes: u32,
    now: NaiveDateTime,
) -> Result<Vec<SlotOffer>, SchedulingError> {
    let slots = db::available_slots_after(conn, &now, slot_limit(duration_minutes))?;
    tracing::debug!(duration_minutes, count = slots.len(), "Slot search");
    Ok(slots
        .into_iter()
        .map(|s| SlotOffer {
            doctor_name: s.doctor_name,
            start_time: s.start_time,
        })
        .collect())
}

/// Book a slot: flip it to `Booked` and insert a `Confirmed` appointment atomically.
/// Returns the new appointment id.
pub fn book_appointment(conn: &Connection, request: &BookingRequest) -> Result<i64, SchedulingError> {
    let start = parse_display_time(&request.appointment_time)?;

    let tx = conn.unchecked_transaction()?;
    if !db::mark_slot_booked(&tx, &request.doctor_name, &start)? {
        return Err(SchedulingError::SlotUnavailable {
            doctor: request.doctor_name.clone(),
            time: request.appointment_time.clone(),
        });
    }
    let id = db::insert_appointment(
        &tx,
        &NewAppointment {
            patient_id: request.patient_id,
            doctor_name: request.doctor_name.clone(),
            appointment_time: start,
            duration_minutes: request.duration_minutes,
            insurance_carrier: request.insurance_carrier.clone(),
            member_id: request.member_id.clone(),
        },
    )?;
    tx.commit()?;

    tracing::info!(
        appointment_id = id,
        patient_id = request.patient_id,
        doctor = %request.doctor_name,
        duration = request.duration_minutes,
        "Appointment booked"
    );
    Ok(id)
}

pub fn format_slot_label(doctor_name: &str, start: &NaiveDateTime) -> String {
    format!("{} at {}", doctor_name, start.format(DISPLAY_TIME_FORMAT))
}

/// Parse a patient-facing time (`2024-05-06 09:00 AM`). Storage format is accepted too.
pub fn parse_display_time(raw: &str) -> Result<NaiveDateTime, SchedulingError> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, DISPLAY_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, DB_TIME_FORMAT))
        .map_err(|_| SchedulingError::InvalidTime(trimmed.to_string()))
}

pub fn is_slot_selection(message: &str) -> bool {
    message.contains(SLOT_SELECTION_PREFIX)
}

/// Split `"I'll take the slot: {doctor} at {time}"` into doctor and display time.
pub fn parse_slot_selection(message: &str) -> Option<(String, String)> {
    static SELECTION: OnceLock<Option<Regex>> = OnceLock::new();
    let re = SELECTION
        .get_or_init(|| Regex::new(r"I'll take the slot:\s*(.+?)\s+at\s+(.+?)\s*$").ok())
        .as_ref()?;
    let caps = re.captures(message)?;
    let doctor = caps.get(1)?.as_str().trim().to_string();
    let time = parse_display_time(caps.get(2)?.as_str()).ok()?;
    Some((doctor, time.format(DISPLAY_TIME_FORMAT).to_string()))
}

/// Group slot labels by doctor in order of first appearance, keeping time order per doctor.
pub fn group_slots_by_doctor(slots: &[String]) -> Vec<(String, Vec<String>)> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for label in slots {
        let doctor = label
            .split_once(" at ")
            .map(|(doctor, _)| doctor)
            .unwrap_or(label.as_str());
        match grouped.iter_mut().find(|(d, _)| d == doctor) {
            Some((_, labels)) => labels.push(label.clone()),
            None => grouped.push((doctor.to_string(), vec![label.clone()])),
        }
    }
    grouped
}
