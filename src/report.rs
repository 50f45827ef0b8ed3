//! Admin export of all appointments to an Excel workbook.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use thiserror::Error;

use crate::db::DatabaseError;

const HEADERS: [&str; 4] = ["AppointmentID", "FullName", "DoctorName", "AppointmentTime"];

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] XlsxError),
}

impl From<rusqlite::Error> for ReportError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub appointment_id: i64,
    pub full_name: String,
    pub doctor_name: String,
    pub appointment_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub path: PathBuf,
    pub rows: usize,
}

/// Appointments joined with patient names, in booking order.
pub fn appointment_rows(conn: &Connection) -> Result<Vec<ReportRow>, ReportError> {
    let mut stmt = conn.prepare(
        "SELECT a.AppointmentID, p.FullName, a.DoctorName, a.AppointmentTime
         FROM Appointments a
         JOIN Patients p ON a.PatientID = p.PatientID
         ORDER BY a.AppointmentID ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ReportRow {
            appointment_id: row.get(0)?,
            full_name: row.get(1)?,
            doctor_name: row.get(2)?,
            appointment_time: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Write the appointment report to `path`, overwriting any previous export.
pub fn generate_admin_report(conn: &Connection, path: &Path) -> Result<ReportSummary, ReportError> {
    let rows = appointment_rows(conn)?;

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Appointments")?;

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_number(r, 0, row.appointment_id as f64)?;
        sheet.write_string(r, 1, &row.full_name)?;
        sheet.write_string(r, 2, &row.doctor_name)?;
        sheet.write_string(r, 3, &row.appointment_time)?;
    }

    workbook.save(path)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Admin report written");
    Ok(ReportSummary {
        path: path.to_path_buf(),
        rows: rows.len(),
    })
}
