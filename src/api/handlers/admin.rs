use crate::api::AppState;
use crate::errors::VerifyError;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Aggregated fraud-monitoring view: per-user risk, recent suspicious
/// activity and the transaction tail.
pub async fn dashboard(state: web::Data<AppState>) -> Result<HttpResponse, VerifyError> {
    Ok(HttpResponse::Ok().json(state.auditor.dashboard()))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "message": "Server is running!",
    }))
}
