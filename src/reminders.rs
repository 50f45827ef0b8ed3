//! Reminder sweep: advances appointments through three timed reminders.
//!
//! Run once per invocation (cron, systemd timer). All three stages share a
//! transaction; a database error rolls the whole sweep back. Reminders are
//! queued while the transaction is open and delivered only after it commits,
//! so a rolled-back sweep sends nothing and the next run retries it.

use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::{self, DatabaseError};
use crate::models::enums::AppointmentStatus;
use crate::models::DB_TIME_FORMAT;

pub const FIRST_REMINDER_SUBJECT: &str = "Appointment Reminder";
pub const SECOND_REMINDER_SUBJECT: &str = "Action Required: Confirm Your Appointment Tomorrow";
pub const FINAL_REMINDER_SUBJECT: &str = "See You Soon! Your Appointment is Today";

const FORMS_DONE: &str = "We see you've already completed your intake forms - thank you!";
const FORMS_PENDING: &str = "Please remember to fill out your patient intake forms sent to your \
email to ensure a quick check-in.";
const CONFIRM_PROMPT: &str = "Please reply YES to confirm your visit, or call us to reschedule.";
const FORMS_PS: &str = "PS: To speed up your check-in, please complete your intake forms before you arrive.";

/// Delivery channel for reminders (allows mocking)
pub trait Notifier {
    fn send_sms(&self, phone: Option<&str>, body: &str);
    fn send_email(&self, email: Option<&str>, subject: &str, body: &str);
}

/// Logs each reminder instead of delivering it.
pub struct SimulatedNotifier;

impl Notifier for SimulatedNotifier {
    fn send_sms(&self, phone: Option<&str>, body: &str) {
        tracing::info!(to = phone.unwrap_or("-"), body, "Simulated SMS");
    }

    fn send_email(&self, email: Option<&str>, subject: &str, body: &str) {
        tracing::info!(to = email.unwrap_or("-"), subject, body, "Simulated email");
    }
}

/// Reminders sent per stage in one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub first: usize,
    pub second: usize,
    pub third: usize,
}

impl ReminderReport {
    pub fn total(&self) -> usize {
        self.first + self.second + self.third
    }
}

struct DueAppointment {
    id: i64,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    time: String,
    forms_filled: bool,
}

/// A reminder whose status change is written but not yet delivered.
struct OutgoingReminder {
    phone: Option<String>,
    email: Option<String>,
    subject: &'static str,
    body: String,
}

impl OutgoingReminder {
    fn deliver(&self, notifier: &dyn Notifier) {
        notifier.send_sms(self.phone.as_deref(), &self.body);
        notifier.send_email(self.email.as_deref(), self.subject, &self.body);
    }
}

/// Run all three stages as of `now`.
pub fn run_sweep(
    conn: &Connection,
    notifier: &dyn Notifier,
    now: NaiveDateTime,
) -> Result<ReminderReport, DatabaseError> {
    tracing::info!(now = %now.format(DB_TIME_FORMAT), "Running reminder sweep");
    let tx = conn.unchecked_transaction()?;

    let first = first_reminders(&tx, now)?;
    let second = second_reminders(&tx, now)?;
    let third = final_reminders(&tx, now)?;
    tx.commit()?;

    for reminder in first.iter().chain(&second).chain(&third) {
        reminder.deliver(notifier);
    }

    let report = ReminderReport {
        first: first.len(),
        second: second.len(),
        third: third.len(),
    };
    if report.total() == 0 {
        tracing::info!("No reminders were sent in this run");
    } else {
        tracing::info!(
            first = report.first,
            second = report.second,
            third = report.third,
            "Reminder sweep complete"
        );
    }
    Ok(report)
}

/// `Confirmed` appointments one to three days out.
fn first_reminders(conn: &Connection, now: NaiveDateTime) -> Result<Vec<OutgoingReminder>, DatabaseError> {
    let due = due_appointments(
        conn,
        AppointmentStatus::Confirmed,
        Some(now + Duration::days(1)),
        now + Duration::days(3),
    )?;
    advance(conn, AppointmentStatus::Confirmed, &due, FIRST_REMINDER_SUBJECT, |appt| {
        format!(
            "Hi {}, this is a friendly reminder for your appointment on {}.",
            appt.name, appt.time
        )
    })
}

/// Appointments within a day that had their first reminder.
fn second_reminders(conn: &Connection, now: NaiveDateTime) -> Result<Vec<OutgoingReminder>, DatabaseError> {
    let due = due_appointments(
        conn,
        AppointmentStatus::Reminder1Sent,
        None,
        now + Duration::days(1),
    )?;
    advance(conn, AppointmentStatus::Reminder1Sent, &due, SECOND_REMINDER_SUBJECT, |appt| {
        let forms = if appt.forms_filled { FORMS_DONE } else { FORMS_PENDING };
        format!(
            "Hi {}, your appointment is tomorrow at {}. {} {}",
            appt.name, appt.time, forms, CONFIRM_PROMPT
        )
    })
}

/// Appointments in the next four hours.
fn final_reminders(conn: &Connection, now: NaiveDateTime) -> Result<Vec<OutgoingReminder>, DatabaseError> {
    let due = due_appointments(
        conn,
        AppointmentStatus::Reminder2Sent,
        Some(now),
        now + Duration::hours(4),
    )?;
    advance(conn, AppointmentStatus::Reminder2Sent, &due, FINAL_REMINDER_SUBJECT, |appt| {
        let ps = if appt.forms_filled { "" } else { FORMS_PS };
        format!(
            "Hi {}, we look forward to seeing you for your appointment in a few hours at {}. {}",
            appt.name, appt.time, ps
        )
        .trim_end()
        .to_string()
    })
}

/// Move each due appointment one step past `status` and queue its reminder.
fn advance(
    conn: &Connection,
    status: AppointmentStatus,
    due: &[DueAppointment],
    subject: &'static str,
    body: impl Fn(&DueAppointment) -> String,
) -> Result<Vec<OutgoingReminder>, DatabaseError> {
    let Some(next) = status.next() else {
        return Ok(Vec::new());
    };
    let mut outgoing = Vec::with_capacity(due.len());
    for appt in due {
        db::update_appointment_status(conn, appt.id, next)?;
        outgoing.push(OutgoingReminder {
            phone: appt.phone.clone(),
            email: appt.email.clone(),
            subject,
            body: body(appt),
        });
    }
    Ok(outgoing)
}

/// Appointments in `status` with a time in `[from, until]` (no lower bound when `from` is `None`).
fn due_appointments(
    conn: &Connection,
    status: AppointmentStatus,
    from: Option<NaiveDateTime>,
    until: NaiveDateTime,
) -> Result<Vec<DueAppointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.AppointmentID, p.FullName, p.PhoneNumber, p.Email, a.AppointmentTime, a.FormsFilled
         FROM Appointments a
         JOIN Patients p ON a.PatientID = p.PatientID
         WHERE a.Status = ?1
           AND (?2 IS NULL OR a.AppointmentTime >= ?2)
           AND a.AppointmentTime <= ?3
         ORDER BY a.AppointmentTime ASC",
    )?;
    let rows = stmt.query_map(
        params![
            status.as_str(),
            from.map(|t| t.format(DB_TIME_FORMAT).to_string()),
            until.format(DB_TIME_FORMAT).to_string(),
        ],
        |row| {
            Ok(DueAppointment {
                id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                email: row.get(3)?,
                time: row.get(4)?,
                forms_filled: row.get::<_, i64>(5)? != 0,
            })
        },
    )?;
    let due = rows.collect::<Result<Vec<_>, _>>()?;
    for appt in &due {
        tracing::debug!(appointment_id = appt.id, stage = %status, "Reminder due");
    }
    Ok(due)
}
