use serde::{Deserialize, Serialize};

use crate::extraction::PatientDetails;
use crate::models::enums::MessageRole;
use crate::models::Patient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Patient fields gathered so far. `patient_id` is set once a record exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub patient_id: Option<i64>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl PatientInfo {
    /// Overwrite fields with whatever the extraction found; empty fields are left alone.
    pub fn merge(&mut self, details: &PatientDetails) {
        fn take(slot: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                *slot = Some(v.to_string());
            }
        }
        take(&mut self.full_name, &details.full_name);
        take(&mut self.date_of_birth, &details.date_of_birth);
        take(&mut self.email, &details.email);
        take(&mut self.phone_number, &details.phone_number);
    }

    pub fn has_identity(&self) -> bool {
        self.full_name.is_some() && self.date_of_birth.is_some()
    }

    pub fn has_contact(&self) -> bool {
        self.email.is_some() && self.phone_number.is_some()
    }

    pub fn as_details(&self) -> PatientDetails {
        PatientDetails {
            full_name: self.full_name.clone(),
            date_of_birth: self.date_of_birth.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
        }
    }
}

impl From<Patient> for PatientInfo {
    fn from(p: Patient) -> Self {
        Self {
            patient_id: Some(p.id),
            full_name: Some(p.full_name),
            date_of_birth: Some(p.date_of_birth),
            email: p.email,
            phone_number: p.phone_number,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingInfo {
    pub duration: Option<u32>,
    /// Slot labels offered in the last search.
    pub slots: Vec<String>,
    pub doctor_name: Option<String>,
    /// Display format, e.g. `2024-05-06 09:00 AM`.
    pub appointment_time: Option<String>,
}

/// Everything the dialogue knows about one conversation. Checkpointed after every turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
    pub patient_info: PatientInfo,
    pub booking_info: BookingInfo,
    pub is_new_patient: Option<bool>,
    pub final_confirmation: Option<String>,
    pub email_status: Option<String>,
    pub booked_appointment_id: Option<i64>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Content of the most recent message, or empty if there is none.
    pub fn last_content(&self) -> &str {
        self.last_message().map(|m| m.content.as_str()).unwrap_or("")
    }

    pub fn say(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    pub fn is_booked(&self) -> bool {
        self.booked_appointment_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_existing_fields_when_extraction_is_empty() {
        let mut info = PatientInfo {
            full_name: Some("Jane Doe".into()),
            ..Default::default()
        };
        info.merge(&PatientDetails {
            full_name: Some("  ".into()),
            email: Some("jane@example.com".into()),
            ..Default::default()
        });
        assert_eq!(info.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(info.email.as_deref(), Some("jane@example.com"));
        assert!(!info.has_contact());
        assert!(!info.has_identity());
    }

    #[test]
    fn state_serializes_roles_in_lowercase() {
        let mut state = ConversationState::new();
        state.messages.push(ChatMessage::user("hi"));
        state.say("hello");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["role"], "assistant");
        let back: ConversationState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.last_content(), "hello");
    }

    #[test]
    fn patient_record_becomes_info() {
        let info = PatientInfo::from(Patient {
            id: 7,
            full_name: "Jane Doe".into(),
            date_of_birth: "1990-04-12".into(),
            email: None,
            phone_number: Some("555".into()),
        });
        assert_eq!(info.patient_id, Some(7));
        assert!(info.has_identity());
    }
}
