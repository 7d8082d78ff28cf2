use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::errors::AppResult;
use sqlx::query_scalar;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_error: Option<String>,
    /// Number of permissions in the catalog; zero usually means the seed has not run
    pub catalog_size: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let catalog = query_scalar::<_, i64>("SELECT COUNT(*) FROM permissions")
        .fetch_one(&state.pool)
        .await;

    match catalog {
        Ok(count) => Ok(Json(HealthResponse {
            status: "ok",
            db_ok: true,
            db_error: None,
            catalog_size: Some(count),
        })),
        Err(e) => Ok(Json(HealthResponse {
            status: "degraded",
            db_ok: false,
            db_error: Some(e.to_string()),
            catalog_size: None,
        })),
    }
}
