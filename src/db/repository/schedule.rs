use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::parse_db_time;
use crate::db::DatabaseError;
use crate::models::enums::SlotStatus;
use crate::models::*;

/// Bulk-insert available slots. Returns the number of rows written.
pub fn insert_slots(
    conn: &Connection,
    slots: &[(String, NaiveDateTime, NaiveDateTime)],
) -> Result<usize, DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO DoctorSchedules (DoctorName, StartTime, EndTime, Status)
         VALUES (?1, ?2, ?3, 'Available')",
    )?;
    let mut written = 0;
    for (doctor, start, end) in slots {
        written += stmt.execute(params![
            doctor,
            start.format(DB_TIME_FORMAT).to_string(),
            end.format(DB_TIME_FORMAT).to_string(),
        ])?;
    }
    Ok(written)
}

/// Available slots starting strictly after `after`, earliest first.
pub fn available_slots_after(
    conn: &Connection,
    after: &NaiveDateTime,
    limit: u32,
) -> Result<Vec<DoctorSlot>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT ScheduleID, DoctorName, StartTime, EndTime, Status
         FROM DoctorSchedules
         WHERE Status = 'Available' AND StartTime > ?1
         ORDER BY StartTime ASC, DoctorName ASC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(
        params![after.format(DB_TIME_FORMAT).to_string(), limit],
        slot_from_row,
    )?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn find_slot(
    conn: &Connection,
    doctor_name: &str,
    start_time: &NaiveDateTime,
) -> Result<Option<DoctorSlot>, DatabaseError> {
    let slot = conn
        .query_row(
            "SELECT ScheduleID, DoctorName, StartTime, EndTime, Status
             FROM DoctorSchedules WHERE DoctorName = ?1 AND StartTime = ?2
             ORDER BY ScheduleID ASC LIMIT 1",
            params![doctor_name, start_time.format(DB_TIME_FORMAT).to_string()],
            slot_from_row,
        )
        .optional()?;
    Ok(slot)
}

/// Flip an available slot to booked. Returns false when no available slot matched.
pub fn mark_slot_booked(
    conn: &Connection,
    doctor_name: &str,
    start_time: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE DoctorSchedules SET Status = 'Booked'
         WHERE DoctorName = ?1 AND StartTime = ?2 AND Status = 'Available'",
        params![doctor_name, start_time.format(DB_TIME_FORMAT).to_string()],
    )?;
    Ok(changed > 0)
}

pub fn count_slots(conn: &Connection, status: SlotStatus) -> Result<i64, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM DoctorSchedules WHERE Status = ?1",
        params![status.as_str()],
        |row| row.get(0),
    )?)
}

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<DoctorSlot> {
    let status: String = row.get(4)?;
    Ok(DoctorSlot {
        id: row.get(0)?,
        doctor_name: row.get(1)?,
        start_time: parse_db_time(2, &row.get::<_, String>(2)?)?,
        end_time: parse_db_time(3, &row.get::<_, String>(3)?)?,
        status: status.parse().map_err(|e: DatabaseError| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}
