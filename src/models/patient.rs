use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub full_name: String,
    pub date_of_birth: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Patient record before insertion (no surrogate id yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub full_name: String,
    pub date_of_birth: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}
