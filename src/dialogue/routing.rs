use serde::{Deserialize, Serialize};

use super::state::ConversationState;
use crate::scheduling::is_slot_selection;

/// Dialogue nodes. Each runs once per visit and either hands off or ends the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    GreetPatient,
    ExtractPatientDetails,
    AskForDetails,
    CheckPatientRecord,
    RequestMissingInfo,
    CreateNewPatient,
    FindSlotsReturning,
    ProcessSlotSelection,
    BookAppointment,
    BookingComplete,
}

impl Node {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreetPatient => "greet_patient",
            Self::ExtractPatientDetails => "extract_patient_details",
            Self::AskForDetails => "ask_for_details",
            Self::CheckPatientRecord => "check_patient_record",
            Self::RequestMissingInfo => "request_missing_info",
            Self::CreateNewPatient => "create_new_patient",
            Self::FindSlotsReturning => "find_slots_returning",
            Self::ProcessSlotSelection => "process_slot_selection",
            Self::BookAppointment => "book_appointment",
            Self::BookingComplete => "booking_complete",
        }
    }
}

/// Pick the node a turn starts at. First match wins.
pub fn entry_node(state: &ConversationState) -> Node {
    let Some(last) = state.last_message() else {
        return Node::GreetPatient;
    };
    if is_slot_selection(&last.content) {
        return Node::ProcessSlotSelection;
    }
    if state.is_booked() {
        return Node::BookingComplete;
    }
    if state.booking_info.appointment_time.is_some() {
        return Node::BookAppointment;
    }
    if state.is_new_patient == Some(true) && state.messages.len() > 3 {
        return Node::CreateNewPatient;
    }
    Node::ExtractPatientDetails
}

/// After extraction: without a name and birth date there is nothing to look up.
pub fn details_are_sufficient(state: &ConversationState) -> Node {
    if state.patient_info.has_identity() {
        Node::CheckPatientRecord
    } else {
        Node::AskForDetails
    }
}

/// After the record check: new patients need contact details before a profile is created.
pub fn decide_after_check(state: &ConversationState) -> Node {
    if state.is_new_patient == Some(true) {
        if state.patient_info.has_contact() {
            Node::CreateNewPatient
        } else {
            Node::RequestMissingInfo
        }
    } else {
        Node::FindSlotsReturning
    }
}

/// Outgoing edge of `node`, or `None` when the turn ends there.
pub fn next_node(node: Node, state: &ConversationState) -> Option<Node> {
    match node {
        Node::ExtractPatientDetails => Some(details_are_sufficient(state)),
        Node::CheckPatientRecord => Some(decide_after_check(state)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::state::ChatMessage;

    fn with_messages(n: usize) -> ConversationState {
        let mut state = ConversationState::new();
        for i in 0..n {
            state.messages.push(ChatMessage::user(format!("message {i}")));
        }
        state
    }

    #[test]
    fn empty_conversation_greets() {
        assert_eq!(entry_node(&ConversationState::new()), Node::GreetPatient);
    }

    #[test]
    fn slot_selection_wins_over_everything_else() {
        let mut state = with_messages(5);
        state.booking_info.appointment_time = Some("2024-05-06 09:00 AM".into());
        state.booked_appointment_id = Some(1);
        state
            .messages
            .push(ChatMessage::user("I'll take the slot: Dr. Smith at 2024-05-06 09:00 AM"));
        assert_eq!(entry_node(&state), Node::ProcessSlotSelection);
    }

    #[test]
    fn booked_conversation_is_complete() {
        let mut state = with_messages(8);
        state.booking_info.appointment_time = Some("2024-05-06 09:00 AM".into());
        state.booked_appointment_id = Some(3);
        assert_eq!(entry_node(&state), Node::BookingComplete);
    }

    #[test]
    fn chosen_time_routes_to_booking() {
        let mut state = with_messages(6);
        state.booking_info.appointment_time = Some("2024-05-06 09:00 AM".into());
        assert_eq!(entry_node(&state), Node::BookAppointment);
    }

    #[test]
    fn new_patient_follow_up_creates_profile() {
        let mut state = with_messages(4);
        state.is_new_patient = Some(true);
        assert_eq!(entry_node(&state), Node::CreateNewPatient);

        let mut short = with_messages(3);
        short.is_new_patient = Some(true);
        assert_eq!(entry_node(&short), Node::ExtractPatientDetails);
    }

    #[test]
    fn default_is_extraction() {
        assert_eq!(entry_node(&with_messages(2)), Node::ExtractPatientDetails);
    }

    #[test]
    fn sufficiency_requires_name_and_dob() {
        let mut state = ConversationState::new();
        state.patient_info.full_name = Some("Jane".into());
        assert_eq!(details_are_sufficient(&state), Node::AskForDetails);
        state.patient_info.date_of_birth = Some("1990-04-12".into());
        assert_eq!(details_are_sufficient(&state), Node::CheckPatientRecord);
    }

    #[test]
    fn after_check_branches() {
        let mut state = ConversationState::new();
        state.is_new_patient = Some(false);
        assert_eq!(decide_after_check(&state), Node::FindSlotsReturning);

        state.is_new_patient = Some(true);
        state.patient_info.email = Some("a@b.c".into());
        assert_eq!(decide_after_check(&state), Node::RequestMissingInfo);

        state.patient_info.phone_number = Some("555".into());
        assert_eq!(decide_after_check(&state), Node::CreateNewPatient);
    }

    #[test]
    fn terminal_nodes_end_the_turn() {
        let state = ConversationState::new();
        for node in [
            Node::GreetPatient,
            Node::AskForDetails,
            Node::RequestMissingInfo,
            Node::CreateNewPatient,
            Node::FindSlotsReturning,
            Node::ProcessSlotSelection,
            Node::BookAppointment,
            Node::BookingComplete,
        ] {
            assert_eq!(next_node(node, &state), None, "{}", node.as_str());
        }
    }
}
