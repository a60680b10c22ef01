// HTTP request handlers
//
// Categorization and health check endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use metrics::counter;
use serde_json::json;
use starmap_handlers::Outcome;
use tracing::info;

use crate::{AppError, AppState};

/// GET /v1/categories/:subject - categorize a user's starred repositories
pub(crate) async fn get_categories(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<Outcome>, AppError> {
    let outcome = state.pipeline.categorize(&subject).await?;

    match &outcome {
        Outcome::Categorized(response) => {
            counter!("starmap.http.responses", 1, "outcome" => "categorized");
            info!(
                subject = %subject,
                categories = response.category_count,
                items = response.item_count,
                elapsed_ms = response.elapsed_ms,
                "Categorized starred repositories"
            );
        }
        Outcome::NoItems(_) => {
            counter!("starmap.http.responses", 1, "outcome" => "no_items");
            info!(subject = %subject, "Subject has no starred repositories");
        }
    }

    Ok(Json(outcome))
}

/// GET /health - Basic health check
pub(crate) async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

/// GET /ready - Readiness check
pub(crate) async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "inFlight": state.pipeline.in_flight(),
        })),
    )
}
