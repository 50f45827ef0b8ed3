use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Identity and contact fields pulled from a patient's message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDetails {
    pub full_name: Option<String>,
    /// Normalized to `YYYY-MM-DD` when the model returns a recognizable date.
    pub date_of_birth: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl PatientDetails {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.date_of_birth.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceDetails {
    pub insurance_carrier: Option<String>,
    pub member_id: Option<String>,
}

/// Ollama LLM client abstraction (allows mocking)
pub trait LlmClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<String, ExtractionError>;

    fn is_model_available(&self, model: &str) -> Result<bool, ExtractionError>;

    fn list_models(&self) -> Result<Vec<String>, ExtractionError>;
}
