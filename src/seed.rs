//! Demo data: synthetic patients and two weeks of weekday doctor slots.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::{self, DatabaseError};
use crate::models::{NewPatient, DATE_FORMAT};

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Charles", "Karen", "Daniel", "Nancy", "Matthew", "Lisa", "Anthony", "Betty", "Mark", "Sandra",
    "Steven", "Ashley", "Paul", "Emily", "Andrew", "Donna", "Joshua", "Michelle",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Jackson",
    "Martin", "Lee", "Thompson", "White", "Harris", "Clark", "Lewis", "Robinson", "Walker", "Young",
];

/// Morning and afternoon blocks, as `[start_hour, end_hour)`.
const CLINIC_HOURS: &[(u32, u32)] = &[(9, 12), (13, 17)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedConfig {
    pub patients: usize,
    pub doctors: usize,
    pub days: u32,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            patients: 50,
            doctors: 3,
            days: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub patients: usize,
    pub doctors: Vec<String>,
    pub slots: usize,
}

/// Insert synthetic patients and slots starting at `today`. Schema must exist.
pub fn seed_database<R: Rng + ?Sized>(
    conn: &Connection,
    config: &SeedConfig,
    today: NaiveDate,
    rng: &mut R,
) -> Result<SeedReport, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    for patient in synthetic_patients(config.patients, today, rng) {
        db::insert_patient(&tx, &patient)?;
    }
    tracing::info!(count = config.patients, "Inserted synthetic patients");

    let doctors = doctor_names(config.doctors, rng);
    let slots = schedule_slots(&doctors, today, config.days);
    let written = db::insert_slots(&tx, &slots)?;
    tracing::info!(slots = written, doctors = doctors.len(), "Inserted available slots");

    tx.commit()?;
    Ok(SeedReport {
        patients: config.patients,
        doctors,
        slots: written,
    })
}

fn synthetic_patients<R: Rng + ?Sized>(count: usize, today: NaiveDate, rng: &mut R) -> Vec<NewPatient> {
    (0..count)
        .map(|i| {
            let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
            let last = LAST_NAMES.choose(rng).copied().unwrap_or("Morgan");
            let age_days = rng.gen_range(365..=90 * 365);
            let dob = today - Duration::days(age_days);
            NewPatient {
                full_name: format!("{first} {last}"),
                date_of_birth: dob.format(DATE_FORMAT).to_string(),
                email: Some(format!(
                    "{}.{}{}@example.com",
                    first.to_lowercase(),
                    last.to_lowercase(),
                    i + 1
                )),
                phone_number: Some(format!(
                    "555-{:03}-{:04}",
                    rng.gen_range(100..1000),
                    rng.gen_range(0..10000)
                )),
            }
        })
        .collect()
}

/// Distinct `Dr. {last name}` entries.
fn doctor_names<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<String> {
    LAST_NAMES
        .choose_multiple(rng, count.min(LAST_NAMES.len()))
        .map(|last| format!("Dr. {last}"))
        .collect()
}

/// Half-hour slots for every doctor on each weekday in `[today, today + days)`.
pub fn schedule_slots(
    doctors: &[String],
    today: NaiveDate,
    days: u32,
) -> Vec<(String, NaiveDateTime, NaiveDateTime)> {
    let mut slots = Vec::new();
    for offset in 0..days {
        let date = today + Duration::days(i64::from(offset));
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        for doctor in doctors {
            for &(open, close) in CLINIC_HOURS {
                for hour in open..close {
                    for minute in [0, 30] {
                        let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) else {
                            continue;
                        };
                        let start = date.and_time(time);
                        slots.push((doctor.clone(), start, start + Duration::minutes(30)));
                    }
                }
            }
        }
    }
    slots
}
