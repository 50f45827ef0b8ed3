use super::parser::{parse_insurance_details, parse_patient_details};
use super::prompt::{
    build_system_prompt, build_user_prompt, INSURANCE_DETAILS_SCHEMA, PATIENT_DETAILS_SCHEMA,
};
use super::types::{InsuranceDetails, LlmClient, PatientDetails};
use super::ExtractionError;

/// Best-effort structured extraction from free-text chat messages.
///
/// Failures never reach the conversation: they are logged and the caller
/// receives an empty result, so the dialogue simply asks again.
pub struct Extractor {
    client: Box<dyn LlmClient + Send + Sync>,
    model: String,
}

impl Extractor {
    pub fn new(client: Box<dyn LlmClient + Send + Sync>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn client(&self) -> &(dyn LlmClient + Send + Sync) {
        self.client.as_ref()
    }

    pub fn extract_patient_details(&self, message: &str) -> PatientDetails {
        match self.try_patient_details(message) {
            Ok(details) => {
                tracing::debug!(
                    has_name = details.full_name.is_some(),
                    has_dob = details.date_of_birth.is_some(),
                    has_email = details.email.is_some(),
                    has_phone = details.phone_number.is_some(),
                    "Extracted patient details"
                );
                details
            }
            Err(e) => {
                tracing::warn!(error = %e, model = %self.model, "Patient detail extraction failed");
                PatientDetails::default()
            }
        }
    }

    pub fn extract_insurance_details(&self, message: &str) -> InsuranceDetails {
        match self.try_insurance_details(message) {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!(error = %e, model = %self.model, "Insurance extraction failed");
                InsuranceDetails::default()
            }
        }
    }

    pub fn try_patient_details(&self, message: &str) -> Result<PatientDetails, ExtractionError> {
        let raw = self.client.generate(
            &self.model,
            &build_user_prompt(message),
            &build_system_prompt(PATIENT_DETAILS_SCHEMA),
        )?;
        parse_patient_details(&raw)
    }

    pub fn try_insurance_details(&self, message: &str) -> Result<InsuranceDetails, ExtractionError> {
        let raw = self.client.generate(
            &self.model,
            &build_user_prompt(message),
            &build_system_prompt(INSURANCE_DETAILS_SCHEMA),
        )?;
        parse_insurance_details(&raw)
    }
}
