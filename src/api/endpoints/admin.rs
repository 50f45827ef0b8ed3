//! Admin endpoints.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::report::ReportSummary;

/// `POST /api/admin/report` — write the appointments spreadsheet.
pub async fn report(State(ctx): State<ApiContext>) -> Result<Json<ReportSummary>, ApiError> {
    let core = ctx.core.clone();
    let summary = tokio::task::spawn_blocking(move || core.generate_report()).await??;
    tracing::info!(path = %summary.path.display(), rows = summary.rows, "Admin report generated");
    Ok(Json(summary))
}
