use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "PatientID, FullName, DateOfBirth, Email, PhoneNumber";

pub fn insert_patient(conn: &Connection, patient: &NewPatient) -> Result<Patient, DatabaseError> {
    conn.execute(
        "INSERT INTO Patients (FullName, DateOfBirth, Email, PhoneNumber) VALUES (?1, ?2, ?3, ?4)",
        params![
            patient.full_name,
            patient.date_of_birth,
            patient.email,
            patient.phone_number,
        ],
    )?;
    Ok(Patient {
        id: conn.last_insert_rowid(),
        full_name: patient.full_name.clone(),
        date_of_birth: patient.date_of_birth.clone(),
        email: patient.email.clone(),
        phone_number: patient.phone_number.clone(),
    })
}

/// Look up a patient by (partial) name and exact date of birth.
/// The oldest matching record wins when several share a birth date.
pub fn find_patient(
    conn: &Connection,
    full_name: &str,
    date_of_birth: &str,
) -> Result<Option<Patient>, DatabaseError> {
    let pattern = format!("%{}%", escape_like(full_name.trim()));
    let patient = conn
        .query_row(
            &format!(
                "SELECT {PATIENT_COLUMNS} FROM Patients
                 WHERE FullName LIKE ?1 ESCAPE '\\' AND DateOfBirth = ?2
                 ORDER BY PatientID ASC LIMIT 1"
            ),
            params![pattern, date_of_birth.trim()],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM Patients WHERE PatientID = ?1"),
            params![id],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM Patients", [], |row| row.get(0))?)
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        date_of_birth: row.get(2)?,
        email: row.get(3)?,
        phone_number: row.get(4)?,
    })
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
