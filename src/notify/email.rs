use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::intake_form::load_intake_form;
use super::NotifyError;
use crate::config::{SmtpSettings, CLINIC_NAME, INTAKE_FORM_FILENAME};
use crate::db;

/// A file attached to an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<EmailAttachment>,
}

/// Outbound mail transport (allows mocking)
pub trait Mailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError>;
}

/// Result of a confirmation email, shown to the patient as `Sent` or `Failed: {reason}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmailStatus {
    Sent,
    Failed(String),
}

impl EmailStatus {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => f.write_str("Sent"),
            Self::Failed(reason) => write!(f, "Failed: {reason}"),
        }
    }
}

/// SMTP delivery with STARTTLS and login, as configured by `EMAIL_*`.
pub struct SmtpMailer {
    from: String,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn from_settings(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let transport = SmtpTransport::starttls_relay(&settings.host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        Ok(Self {
            from: settings.username.clone(),
            transport,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        let message = build_message(&self.from, email)?;
        self.transport
            .send(&message)
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }
}

fn build_message(from: &str, email: &OutgoingEmail) -> Result<Message, NotifyError> {
    let from: Mailbox = from
        .parse()
        .map_err(|e: lettre::address::AddressError| NotifyError::Address(format!("{from}: {e}")))?;
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e: lettre::address::AddressError| NotifyError::Address(format!("{}: {e}", email.to)))?;

    let builder = Message::builder().from(from).to(to).subject(email.subject.clone());
    let text = SinglePart::plain(email.body.clone());

    let message = match &email.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| NotifyError::Message(e.to_string()))?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(text)
                    .singlepart(
                        Attachment::new(attachment.filename.clone())
                            .body(attachment.bytes.clone(), content_type),
                    ),
            )
        }
        None => builder.singlepart(text),
    };
    message.map_err(|e| NotifyError::Message(e.to_string()))
}

/// Test mailer that records every email instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail_with: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails with the given transport error.
    pub fn failing(reason: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        if let Some(reason) = &self.fail_with {
            return Err(NotifyError::Transport(reason.clone()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

impl<M: Mailer + ?Sized> Mailer for std::sync::Arc<M> {
    fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        (**self).send(email)
    }
}

/// Sends the booking confirmation with the intake form attached.
pub struct ConfirmationSender {
    mailer: Option<Box<dyn Mailer + Send + Sync>>,
    intake_form_path: PathBuf,
}

impl ConfirmationSender {
    /// `mailer` is `None` when no mail server is configured.
    pub fn new(mailer: Option<Box<dyn Mailer + Send + Sync>>, intake_form_path: PathBuf) -> Self {
        Self {
            mailer,
            intake_form_path,
        }
    }

    /// Email the patient about their appointment. Never fails: problems become a `Failed` status.
    pub fn send_confirmation(
        &self,
        conn: &Connection,
        patient_id: i64,
        appointment_time: &str,
    ) -> EmailStatus {
        match self.try_send(conn, patient_id, appointment_time) {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(patient_id, error = %e, "Failed to send confirmation email");
                EmailStatus::Failed(e.to_string())
            }
        }
    }

    fn try_send(
        &self,
        conn: &Connection,
        patient_id: i64,
        appointment_time: &str,
    ) -> Result<EmailStatus, NotifyError> {
        let patient = db::get_patient(conn, patient_id)?;
        let Some((name, address)) = patient.and_then(|p| p.email.map(|e| (p.full_name, e))) else {
            tracing::warn!(patient_id, "No email on file, skipping confirmation");
            return Ok(EmailStatus::Failed("No email on file".into()));
        };
        let Some(mailer) = &self.mailer else {
            tracing::warn!(patient_id, "Email server not configured, skipping confirmation");
            return Ok(EmailStatus::Failed("Email server not configured".into()));
        };

        let email = confirmation_email(
            &address,
            &name,
            appointment_time,
            load_intake_form(&self.intake_form_path)?,
        );
        mailer.send(&email)?;
        tracing::info!(patient_id, "Confirmation email sent");
        Ok(EmailStatus::Sent)
    }
}

/// Build the confirmation message body and attachment.
pub fn confirmation_email(
    to: &str,
    patient_name: &str,
    appointment_time: &str,
    intake_form: Vec<u8>,
) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Appointment Confirmed: {appointment_time}"),
        body: format!(
            "Dear {patient_name},\n\nThis confirms your appointment for {appointment_time}.\n\
             Please find your intake form attached.\n\nThank you,\n{CLINIC_NAME}"
        ),
        attachment: Some(EmailAttachment {
            filename: INTAKE_FORM_FILENAME.to_string(),
            content_type: "application/pdf".to_string(),
            bytes: intake_form,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::db::sqlite::open_memory_database;
    use crate::models::NewPatient;

    fn patient(conn: &Connection, email: Option<&str>) -> i64 {
        db::insert_patient(
            conn,
            &NewPatient {
                full_name: "Jane Doe".into(),
                date_of_birth: "1990-04-12".into(),
                email: email.map(String::from),
                phone_number: None,
            },
        )
        .unwrap()
        .id
    }

    fn sender(mailer: Option<Arc<RecordingMailer>>) -> ConfirmationSender {
        ConfirmationSender::new(
            mailer.map(|m| Box::new(m) as Box<dyn Mailer + Send + Sync>),
            PathBuf::from("/nonexistent/intake.pdf"),
        )
    }

    #[test]
    fn status_display() {
        assert_eq!(EmailStatus::Sent.to_string(), "Sent");
        assert_eq!(
            EmailStatus::Failed("No email on file".into()).to_string(),
            "Failed: No email on file"
        );
    }

    #[test]
    fn confirmation_is_sent_with_intake_form() {
        let conn = open_memory_database().unwrap();
        let id = patient(&conn, Some("jane@example.com"));
        let mailer = Arc::new(RecordingMailer::new());

        let status = sender(Some(mailer.clone())).send_confirmation(&conn, id, "2024-05-06 09:00 AM");
        assert_eq!(status, EmailStatus::Sent);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jane@example.com");
        assert_eq!(sent[0].subject, "Appointment Confirmed: 2024-05-06 09:00 AM");
        assert!(sent[0].body.starts_with("Dear Jane Doe,\n\nThis confirms your appointment for 2024-05-06 09:00 AM."));
        assert!(sent[0].body.ends_with("Thank you,\nAura Health"));
        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.filename, "New Patient Intake Form.pdf");
        assert!(attachment.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn missing_email_is_reported() {
        let conn = open_memory_database().unwrap();
        let id = patient(&conn, None);
        let mailer = Arc::new(RecordingMailer::new());
        let status = sender(Some(mailer.clone())).send_confirmation(&conn, id, "t");
        assert_eq!(status.to_string(), "Failed: No email on file");
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn unconfigured_server_is_reported() {
        let conn = open_memory_database().unwrap();
        let id = patient(&conn, Some("jane@example.com"));
        let status = sender(None).send_confirmation(&conn, id, "t");
        assert_eq!(status.to_string(), "Failed: Email server not configured");
    }

    #[test]
    fn transport_failure_becomes_status() {
        let conn = open_memory_database().unwrap();
        let id = patient(&conn, Some("jane@example.com"));
        let mailer = Arc::new(RecordingMailer::failing("connection refused"));
        let status = sender(Some(mailer)).send_confirmation(&conn, id, "t");
        assert!(!status.is_sent());
        assert!(status.to_string().contains("connection refused"));
    }

    #[test]
    fn message_builds_with_attachment() {
        let email = confirmation_email("jane@example.com", "Jane", "t", b"%PDF-1.3".to_vec());
        let message = build_message("clinic@example.com", &email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Appointment Confirmed: t"));
        assert!(raw.contains("New Patient Intake Form.pdf"));
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        let email = confirmation_email("not an address", "Jane", "t", Vec::new());
        assert!(matches!(
            build_message("clinic@example.com", &email),
            Err(NotifyError::Address(_))
        ));
    }
}
