//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/sessions", post(endpoints::sessions::create))
        .route(
            "/sessions/:id",
            get(endpoints::sessions::detail).delete(endpoints::sessions::reset),
        )
        .route("/sessions/:id/messages", post(endpoints::sessions::message))
        .route("/sessions/:id/slots", post(endpoints::sessions::select_slot))
        .route("/admin/report", post(endpoints::admin::report))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use crate::core_state::tests::{test_core, test_core_with};
    use crate::db;
    use crate::dialogue::SqliteCheckpointStore;
    use crate::models::NewPatient;

    const IDENTITY: &str = r#"{"full_name": "Jane Doe", "date_of_birth": "1990-04-12"}"#;
    const INSURANCE: &str = r#"{"insurance_carrier": "Aetna", "member_id": "A-42"}"#;

    fn router_for(dir: &std::path::Path, responses: &[&str]) -> Router {
        let core = test_core(dir, responses);
        let conn = core.open_db().unwrap();
        db::insert_patient(
            &conn,
            &NewPatient {
                full_name: "Jane Doe".into(),
                date_of_birth: "1990-04-12".into(),
                email: Some("jane@example.com".into()),
                phone_number: Some("555-0100".into()),
            },
        )
        .unwrap();
        api_router(Arc::new(core))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn start(app: &Router) -> String {
        let response = app.clone().oneshot(empty("POST", "/api/sessions")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        json["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_model() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_for(dir.path(), &["{}"]);
        let response = app.oneshot(empty("GET", "/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], "phi3:mini");
        assert_eq!(json["model_ready"], true);
    }

    #[tokio::test]
    async fn new_session_greets_with_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_for(dir.path(), &["{}"]);
        let response = app.oneshot(empty("POST", "/api/sessions")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["path"][0], "greet_patient");
        assert_eq!(json["dashboard"]["progress"], "Step 1 of 4: Patient Info");
        assert_eq!(json["dashboard"]["patient"]["name"], "...");
    }

    #[tokio::test]
    async fn returning_patient_books_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_for(dir.path(), &[IDENTITY, INSURANCE]);
        let id = start(&app).await;

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/sessions/{id}/messages"),
                serde_json::json!({"message": "Jane Doe, 1990-04-12"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["replies"][0], "Welcome back, Jane Doe!");
        assert_eq!(json["dashboard"]["progress"], "Step 2 of 4: Select Slot");
        assert_eq!(json["slots"][0], "Dr. Adams at 2024-05-06 09:00 AM");
        let groups = json["dashboard"]["slot_groups"].as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["doctor"], "Dr. Adams");

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/sessions/{id}/slots"),
                serde_json::json!({"slot": "Dr. Smith at 2024-05-06 09:00 AM"}),
            ))
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["dashboard"]["progress"], "Step 3 of 4: Insurance Details");
        assert_eq!(json["dashboard"]["appointment"]["doctor"], "Dr. Smith");
        assert_eq!(json["dashboard"]["appointment"]["duration"], "30 mins");

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/sessions/{id}/messages"),
                serde_json::json!({"message": "Aetna A-42"}),
            ))
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["email_status"], "Sent");
        assert_eq!(json["dashboard"]["progress"], "Step 4 of 4: Confirmed");
        assert!(json["final_confirmation"]
            .as_str()
            .unwrap()
            .contains("**With:** Dr. Smith"));
        assert_eq!(
            json["dashboard"]["follow_up"],
            "A confirmation email with your intake form is on its way. We look forward to seeing you!"
        );

        let response = app
            .oneshot(empty("GET", &format!("/api/sessions/{id}")))
            .await
            .unwrap();
        let json = json_body(response).await;
        assert_eq!(json["messages"].as_array().unwrap().len(), 8);
        assert!(json["replies"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_message_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_for(dir.path(), &["{}"]);
        let id = start(&app).await;
        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{id}/messages"),
                serde_json::json!({"message": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn oversized_message_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_for(dir.path(), &["{}"]);
        let id = start(&app).await;
        let response = app
            .oneshot(post_json(
                &format!("/api/sessions/{id}/messages"),
                serde_json::json!({"message": "a".repeat(2001)}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_for(dir.path(), &["{}"]);

        let response = app
            .clone()
            .oneshot(empty("GET", "/api/sessions/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(post_json(
                "/api/sessions/missing/messages",
                serde_json::json!({"message": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reset_forgets_session() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_for(dir.path(), &["{}"]);
        let id = start(&app).await;

        let response = app
            .clone()
            .oneshot(empty("DELETE", &format!("/api/sessions/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(empty("GET", &format!("/api/sessions/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(empty("DELETE", &format!("/api/sessions/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sqlite_checkpoints_serve_detail_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteCheckpointStore::new(db::open_database(&dir.path().join("checkpoints.db")).unwrap());
        let app = api_router(Arc::new(test_core_with(dir.path(), &["{}"], Box::new(store))));
        let id = start(&app).await;

        let response = app
            .clone()
            .oneshot(empty("GET", &format!("/api/sessions/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["session_id"], id.as_str());

        let response = app
            .clone()
            .oneshot(empty("DELETE", &format!("/api/sessions/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["removed"], true);

        let response = app
            .oneshot(empty("GET", &format!("/api/sessions/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_report_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_for(dir.path(), &["{}"]);
        let response = app.oneshot(empty("POST", "/api/admin/report")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["rows"], 0);
        assert!(dir.path().join("admin_report.xlsx").exists());
    }
}
