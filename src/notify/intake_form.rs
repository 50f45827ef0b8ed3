//! Intake form attachment: the clinic's PDF when present, otherwise a rendered blank form.

use std::io::BufWriter;
use std::path::Path;

use printpdf::*;

use super::NotifyError;
use crate::config::CLINIC_NAME;

const FORM_TITLE: &str = "New Patient Intake Form";

const SECTIONS: &[(&str, &[&str])] = &[
    (
        "PATIENT INFORMATION",
        &["Full name", "Date of birth (YYYY-MM-DD)", "Email", "Phone number", "Home address"],
    ),
    ("INSURANCE", &["Insurance carrier", "Member ID", "Policy holder"]),
    (
        "MEDICAL HISTORY",
        &["Current medications", "Allergies", "Previous surgeries", "Reason for visit"],
    ),
    ("EMERGENCY CONTACT", &["Name", "Relationship", "Phone number"]),
];

/// Read the intake form at `path`, or render a blank one if the file is missing.
pub fn load_intake_form(path: &Path) -> Result<Vec<u8>, NotifyError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Intake form not found, rendering blank form");
            render_blank_intake_form()
        }
        Err(e) => Err(e.into()),
    }
}

/// Write a blank intake form to `path` unless one already exists. Returns true if written.
pub fn ensure_intake_form(path: &Path) -> Result<bool, NotifyError> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_blank_intake_form()?)?;
    tracing::info!(path = %path.display(), "Wrote blank intake form");
    Ok(true)
}

/// Render the blank intake form. Returns PDF bytes.
pub fn render_blank_intake_form() -> Result<Vec<u8>, NotifyError> {
    let (doc, page1, layer1) = PdfDocument::new(FORM_TITLE, Mm(210.0), Mm(297.0), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| NotifyError::Pdf(format!("font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| NotifyError::Pdf(format!("font error: {e}")))?;

    let mut y = Mm(280.0);

    layer.use_text(CLINIC_NAME, 16.0, Mm(20.0), y, &bold);
    y -= Mm(8.0);
    layer.use_text(FORM_TITLE, 13.0, Mm(20.0), y, &bold);
    y -= Mm(8.0);
    layer.use_text(
        "Please complete this form and bring it to your first visit.",
        9.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(12.0);

    for (heading, fields) in SECTIONS {
        layer.use_text(*heading, 11.0, Mm(20.0), y, &bold);
        y -= Mm(8.0);
        for field in *fields {
            let line = format!("{field}: {}", "_".repeat(60 - field.len().min(40)));
            layer.use_text(&line, 10.0, Mm(25.0), y, &font);
            y -= Mm(9.0);
        }
        y -= Mm(4.0);
    }

    layer.use_text("Signature: ______________________    Date: ____________", 10.0, Mm(20.0), y, &font);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| NotifyError::Pdf(format!("save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| NotifyError::Pdf(format!("buffer error: {e}")))
}
