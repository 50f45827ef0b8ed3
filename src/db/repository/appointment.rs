use rusqlite::{params, Connection, OptionalExtension, Row};

use super::parse_db_time;
use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::*;

/// Insert a new appointment with status `Confirmed`. Returns its id.
pub fn insert_appointment(conn: &Connection, appt: &NewAppointment) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO Appointments
         (PatientID, DoctorName, AppointmentTime, Duration, InsuranceCarrier, MemberID, Status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            appt.patient_id,
            appt.doctor_name,
            appt.appointment_time.format(DB_TIME_FORMAT).to_string(),
            appt.duration_minutes,
            appt.insurance_carrier,
            appt.member_id,
            AppointmentStatus::Confirmed.as_str(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<Option<Appointment>, DatabaseError> {
    let appt = conn
        .query_row(
            "SELECT AppointmentID, PatientID, DoctorName, AppointmentTime, Duration,
                    InsuranceCarrier, MemberID, Status, FormsFilled
             FROM Appointments WHERE AppointmentID = ?1",
            params![id],
            appointment_from_row,
        )
        .optional()?;
    Ok(appt)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: i64,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE Appointments SET Status = ?1 WHERE AppointmentID = ?2",
        params![status.as_str(), id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Record that the patient returned their intake forms.
pub fn mark_forms_filled(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE Appointments SET FormsFilled = 1 WHERE AppointmentID = ?1",
        params![id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let status: String = row.get(7)?;
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_name: row.get(2)?,
        appointment_time: parse_db_time(3, &row.get::<_, String>(3)?)?,
        duration_minutes: row.get(4)?,
        insurance_carrier: row.get(5)?,
        member_id: row.get(6)?,
        status: status.parse().map_err(|e: DatabaseError| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?,
        forms_filled: row.get::<_, i64>(8)? != 0,
    })
}
