/// Shared instruction for every extraction call. The schema is appended per call.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are an expert extraction algorithm. \
Only extract values from the text. Do not guess. \
Your output MUST be a JSON object that adheres to the provided schema below.";

pub const PATIENT_DETAILS_SCHEMA: &str = r#"{
  "full_name": "The patient's full name. (string or null)",
  "date_of_birth": "The patient's date of birth in YYYY-MM-DD format. (string or null)",
  "email": "The patient's email address. (string or null)",
  "phone_number": "The patient's phone number. (string or null)"
}"#;

pub const INSURANCE_DETAILS_SCHEMA: &str = r#"{
  "insurance_carrier": "The name of the insurance company. (string or null)",
  "member_id": "The patient's insurance member ID. (string or null)"
}"#;

/// System prompt with the target schema embedded.
pub fn build_system_prompt(schema: &str) -> String {
    format!("{EXTRACTION_SYSTEM_PROMPT}\n\nSCHEMA:\n{schema}")
}

/// User prompt wrapping the raw message.
pub fn build_user_prompt(message: &str) -> String {
    format!("TEXT:\n{message}")
}
