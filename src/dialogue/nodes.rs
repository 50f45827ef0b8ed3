use chrono::NaiveDateTime;
use rusqlite::Connection;

use super::routing::Node;
use super::state::ConversationState;
use super::DialogueError;
use crate::extraction::Extractor;
use crate::notify::ConfirmationSender;
use crate::scheduling::{self, BookingRequest, SchedulingError};

pub const GREETING: &str = "Hello! To book an appointment, please provide your **full name** and \
**date of birth** (YYYY-MM-DD). You can also include your email and phone number to speed things up.";
pub const ASK_FOR_DETAILS: &str = "I'm sorry, I need at least a **full name** and **date of birth** \
(YYYY-MM-DD) to proceed. Could you please provide them?";
pub const REQUEST_MISSING_INFO: &str =
    "Could you also please provide your **email** and **phone number** to complete your profile?";
pub const NEW_PROFILE_COMPLETE: &str =
    "Thank you, your profile is complete. New patient appointments are **60 minutes**.";
pub const RETURNING_DURATION: &str = "Returning patient appointments are **30 minutes**.";
pub const FINDING_SLOTS: &str = "Let me find available slots for you...";
pub const NO_SLOTS: &str = "No slots available in the near future.";
pub const ASK_FOR_INSURANCE: &str = "Great! To finalize, could you please provide your **insurance \
carrier** and **member ID**? (If you are a self-payer, you can just say so).";
pub const UNREADABLE_SLOT: &str =
    "I couldn't read that slot selection. Please choose one of the available slots.";
pub const BOOKING_FAILED: &str = "There was an issue confirming your booking. Please try again.";
pub const ALREADY_BOOKED: &str = "Your appointment is already booked. \
To make another booking, please start a new conversation.";

/// Collaborators a node may call during one turn.
pub struct NodeContext<'a> {
    pub conn: &'a Connection,
    pub extractor: &'a Extractor,
    pub confirmations: &'a ConfirmationSender,
    pub now: NaiveDateTime,
}

/// Run one node against the state.
pub fn run_node(
    node: Node,
    ctx: &NodeContext<'_>,
    state: &mut ConversationState,
) -> Result<(), DialogueError> {
    match node {
        Node::GreetPatient => {
            state.say(GREETING);
            Ok(())
        }
        Node::ExtractPatientDetails => {
            extract_patient_details(ctx, state);
            Ok(())
        }
        Node::AskForDetails => {
            state.say(ASK_FOR_DETAILS);
            Ok(())
        }
        Node::CheckPatientRecord => check_patient_record(ctx, state),
        Node::RequestMissingInfo => {
            state.say(REQUEST_MISSING_INFO);
            Ok(())
        }
        Node::CreateNewPatient => create_new_patient(ctx, state),
        Node::FindSlotsReturning => find_slots_returning(ctx, state),
        Node::ProcessSlotSelection => {
            process_slot_selection(state);
            Ok(())
        }
        Node::BookAppointment => book_appointment(ctx, state),
        Node::BookingComplete => {
            state.say(ALREADY_BOOKED);
            Ok(())
        }
    }
}

fn extract_patient_details(ctx: &NodeContext<'_>, state: &mut ConversationState) {
    let details = ctx.extractor.extract_patient_details(state.last_content());
    state.patient_info.merge(&details);
}

fn check_patient_record(
    ctx: &NodeContext<'_>,
    state: &mut ConversationState,
) -> Result<(), DialogueError> {
    let name = state.patient_info.full_name.clone().unwrap_or_default();
    let dob = state.patient_info.date_of_birth.clone().unwrap_or_default();

    match scheduling::search_patient(ctx.conn, &name, &dob)? {
        Some(patient) => {
            state.say(format!("Welcome back, {}!", patient.full_name));
            state.patient_info = patient.into();
            state.is_new_patient = Some(false);
        }
        None => {
            state.say(format!(
                "I couldn't find a record for {name}. We'll need to create a new one."
            ));
            state.is_new_patient = Some(true);
        }
    }
    Ok(())
}

fn create_new_patient(
    ctx: &NodeContext<'_>,
    state: &mut ConversationState,
) -> Result<(), DialogueError> {
    if !state.patient_info.has_contact() {
        let details = ctx.extractor.extract_patient_details(state.last_content());
        state.patient_info.merge(&details);
    }
    if !state.patient_info.has_identity() {
        state.say(ASK_FOR_DETAILS);
        return Ok(());
    }

    // A profile created earlier in the conversation is reused instead of duplicated.
    if state.patient_info.patient_id.is_none() {
        let patient = scheduling::add_patient(ctx.conn, &state.patient_info.as_details())?;
        state.patient_info = patient.into();
    }

    state.say(NEW_PROFILE_COMPLETE);
    state.say(FINDING_SLOTS);
    offer_slots(ctx, state, scheduling::NEW_PATIENT_MINUTES)
}

fn find_slots_returning(
    ctx: &NodeContext<'_>,
    state: &mut ConversationState,
) -> Result<(), DialogueError> {
    state.say(RETURNING_DURATION);
    state.say(FINDING_SLOTS);
    offer_slots(ctx, state, scheduling::RETURNING_PATIENT_MINUTES)
}

fn offer_slots(
    ctx: &NodeContext<'_>,
    state: &mut ConversationState,
    duration: u32,
) -> Result<(), DialogueError> {
    let slots = scheduling::find_slots(ctx.conn, duration, ctx.now)?;
    if slots.is_empty() {
        state.say(NO_SLOTS);
    }
    state.booking_info.duration = Some(duration);
    state.booking_info.slots = slots.iter().map(|s| s.label()).collect();
    Ok(())
}

fn process_slot_selection(state: &mut ConversationState) {
    if state.is_booked() {
        state.say(ALREADY_BOOKED);
        return;
    }
    match scheduling::parse_slot_selection(state.last_content()) {
        Some((doctor, time)) => {
            state.booking_info.doctor_name = Some(doctor);
            state.booking_info.appointment_time = Some(time);
            state.say(ASK_FOR_INSURANCE);
        }
        None => {
            tracing::debug!("Unparseable slot selection");
            state.say(UNREADABLE_SLOT);
        }
    }
}

fn book_appointment(
    ctx: &NodeContext<'_>,
    state: &mut ConversationState,
) -> Result<(), DialogueError> {
    let insurance = ctx.extractor.extract_insurance_details(state.last_content());
    let carrier = insurance
        .insurance_carrier
        .unwrap_or_else(|| scheduling::DEFAULT_INSURANCE_CARRIER.to_string());
    let member_id = insurance
        .member_id
        .unwrap_or_else(|| scheduling::DEFAULT_MEMBER_ID.to_string());

    let duration = state
        .booking_info
        .duration
        .unwrap_or(scheduling::RETURNING_PATIENT_MINUTES);
    let (Some(patient_id), Some(doctor), Some(time)) = (
        state.patient_info.patient_id,
        state.booking_info.doctor_name.clone(),
        state.booking_info.appointment_time.clone(),
    ) else {
        tracing::warn!("Booking attempted without patient or slot");
        return reoffer_slots(ctx, state, duration);
    };

    let request = BookingRequest {
        patient_id,
        doctor_name: doctor.clone(),
        appointment_time: time.clone(),
        duration_minutes: duration,
        insurance_carrier: carrier,
        member_id,
    };

    let appointment_id = match scheduling::book_appointment(ctx.conn, &request) {
        Ok(id) => id,
        Err(e @ (SchedulingError::SlotUnavailable { .. } | SchedulingError::InvalidTime(_))) => {
            tracing::warn!(error = %e, "Booking rejected");
            return reoffer_slots(ctx, state, duration);
        }
        Err(e) => return Err(e.into()),
    };

    let email_status = ctx.confirmations.send_confirmation(ctx.conn, patient_id, &time);
    let name = state.patient_info.full_name.clone().unwrap_or_default();

    state.booked_appointment_id = Some(appointment_id);
    state.final_confirmation = Some(format!(
        "### ✅ Appointment Confirmed!\nYour appointment is successfully booked.\n\
         - **Patient:** {name}\n- **With:** {doctor}\n- **At:** {time}"
    ));
    state.email_status = Some(email_status.to_string());
    Ok(())
}

/// Drop a selection that could not be booked and offer a fresh slot list.
fn reoffer_slots(
    ctx: &NodeContext<'_>,
    state: &mut ConversationState,
    duration: u32,
) -> Result<(), DialogueError> {
    state.booking_info.doctor_name = None;
    state.booking_info.appointment_time = None;
    state.say(BOOKING_FAILED);
    offer_slots(ctx, state, duration)
}
