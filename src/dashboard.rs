//! Booking status panel derived from the conversation state.

use serde::Serialize;

use crate::dialogue::{pending_slots, ConversationState};
use crate::notify::EmailStatus;
use crate::scheduling::{group_slots_by_doctor, SLOT_SELECTION_PREFIX};

const PLACEHOLDER: &str = "...";
pub const SLOT_PROMPT: &str = "Please select one of the available slots below:";
const EMAIL_SENT_FOLLOW_UP: &str =
    "A confirmation email with your intake form is on its way. We look forward to seeing you!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientPanel {
    pub name: String,
    pub date_of_birth: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentPanel {
    pub doctor: String,
    pub time: String,
    pub duration: String,
}

/// One selectable slot. `message` is what the client sends back when it is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotChoice {
    pub time: String,
    pub label: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotGroup {
    pub doctor: String,
    pub slots: Vec<SlotChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub progress: String,
    pub patient: PatientPanel,
    pub appointment: AppointmentPanel,
    pub slot_prompt: Option<String>,
    pub slot_groups: Vec<SlotGroup>,
    pub final_confirmation: Option<String>,
    pub follow_up: Option<String>,
}

fn or_placeholder(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| PLACEHOLDER.to_string())
}

pub fn progress(state: &ConversationState) -> &'static str {
    if state.final_confirmation.is_some() {
        "Step 4 of 4: Confirmed"
    } else if state.booking_info.appointment_time.is_some() {
        "Step 3 of 4: Insurance Details"
    } else if !state.booking_info.slots.is_empty() {
        "Step 2 of 4: Select Slot"
    } else {
        "Step 1 of 4: Patient Info"
    }
}

/// Follow-up line for the confirmation email, once a booking exists.
pub fn email_follow_up(state: &ConversationState) -> Option<String> {
    state.final_confirmation.as_ref()?;
    let status = state.email_status.as_deref()?;
    if status == EmailStatus::Sent.to_string() {
        Some(EMAIL_SENT_FOLLOW_UP.to_string())
    } else {
        Some(format!(
            "Note: I couldn't send a confirmation email due to an issue: {status}"
        ))
    }
}

pub fn build_dashboard(state: &ConversationState) -> Dashboard {
    let patient = &state.patient_info;
    let booking = &state.booking_info;

    let slot_groups: Vec<SlotGroup> = group_slots_by_doctor(pending_slots(state))
        .into_iter()
        .map(|(doctor, labels)| SlotGroup {
            slots: labels
                .into_iter()
                .map(|label| SlotChoice {
                    time: label
                        .split_once(" at ")
                        .map(|(_, time)| time.to_string())
                        .unwrap_or_else(|| label.clone()),
                    message: format!("{SLOT_SELECTION_PREFIX} {label}"),
                    label,
                })
                .collect(),
            doctor,
        })
        .collect();

    Dashboard {
        progress: progress(state).to_string(),
        patient: PatientPanel {
            name: or_placeholder(&patient.full_name),
            date_of_birth: or_placeholder(&patient.date_of_birth),
            email: or_placeholder(&patient.email),
            phone: or_placeholder(&patient.phone_number),
        },
        appointment: AppointmentPanel {
            doctor: or_placeholder(&booking.doctor_name),
            time: or_placeholder(&booking.appointment_time),
            duration: format!(
                "{} mins",
                booking
                    .duration
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| PLACEHOLDER.to_string())
            ),
        },
        slot_prompt: (!slot_groups.is_empty()).then(|| SLOT_PROMPT.to_string()),
        slot_groups,
        final_confirmation: state.final_confirmation.clone(),
        follow_up: email_follow_up(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_conversation_shows_placeholders() {
        let dashboard = build_dashboard(&ConversationState::new());
        assert_eq!(dashboard.progress, "Step 1 of 4: Patient Info");
        assert_eq!(dashboard.patient.name, "...");
        assert_eq!(dashboard.appointment.duration, "... mins");
        assert!(dashboard.slot_groups.is_empty());
        assert!(dashboard.slot_prompt.is_none());
        assert!(dashboard.follow_up.is_none());
    }

    #[test]
    fn offered_slots_are_grouped_with_reply_messages() {
        let mut state = ConversationState::new();
        state.patient_info.full_name = Some("Jane Doe".into());
        state.booking_info.duration = Some(30);
        state.booking_info.slots = vec![
            "Dr. Smith at 2024-05-06 09:00 AM".into(),
            "Dr. Adams at 2024-05-06 09:00 AM".into(),
            "Dr. Smith at 2024-05-06 09:30 AM".into(),
        ];
        let dashboard = build_dashboard(&state);
        assert_eq!(dashboard.progress, "Step 2 of 4: Select Slot");
        assert_eq!(dashboard.patient.name, "Jane Doe");
        assert_eq!(dashboard.appointment.duration, "30 mins");
        assert_eq!(dashboard.slot_prompt.as_deref(), Some(SLOT_PROMPT));
        assert_eq!(dashboard.slot_groups.len(), 2);
        let first = &dashboard.slot_groups[0];
        assert_eq!(first.doctor, "Dr. Smith");
        assert_eq!(first.slots[1].time, "2024-05-06 09:30 AM");
        assert_eq!(
            first.slots[0].message,
            "I'll take the slot: Dr. Smith at 2024-05-06 09:00 AM"
        );
    }

    #[test]
    fn chosen_slot_moves_to_insurance_step() {
        let mut state = ConversationState::new();
        state.booking_info.slots = vec!["Dr. Smith at 2024-05-06 09:00 AM".into()];
        state.booking_info.doctor_name = Some("Dr. Smith".into());
        state.booking_info.appointment_time = Some("2024-05-06 09:00 AM".into());
        let dashboard = build_dashboard(&state);
        assert_eq!(dashboard.progress, "Step 3 of 4: Insurance Details");
        assert!(dashboard.slot_groups.is_empty());
        assert_eq!(dashboard.appointment.doctor, "Dr. Smith");
    }

    #[test]
    fn confirmed_booking_reports_email_outcome() {
        let mut state = ConversationState::new();
        state.final_confirmation = Some("### Appointment Confirmed!".into());
        state.booked_appointment_id = Some(1);
        state.email_status = Some("Sent".into());
        let dashboard = build_dashboard(&state);
        assert_eq!(dashboard.progress, "Step 4 of 4: Confirmed");
        assert_eq!(dashboard.follow_up.as_deref(), Some(EMAIL_SENT_FOLLOW_UP));

        state.email_status = Some("Failed: No email on file".into());
        assert_eq!(
            email_follow_up(&state).as_deref(),
            Some("Note: I couldn't send a confirmation email due to an issue: Failed: No email on file")
        );
    }
}
