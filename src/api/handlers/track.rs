use crate::api::AppState;
use crate::audit::{ActionRequest, LoginUser, TransactionRequest};
use crate::errors::VerifyError;
use crate::models::RiskLevel;
use crate::utils::generate_session_id;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct TrackLoginRequest {
    user: LoginUser,
    risk_score: u32,
    risk_level: RiskLevel,
    #[serde(default)]
    session_id: Option<String>,
}

/// Record a login and open a transaction session for it.
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<TrackLoginRequest>,
) -> Result<HttpResponse, VerifyError> {
    let body = body.into_inner();
    let session_id = body.session_id.unwrap_or_else(generate_session_id);

    state.auditor.track_login(
        body.user,
        body.risk_score,
        body.risk_level,
        session_id.clone(),
        Utc::now(),
    );

    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "session_id": session_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct TrackActionRequest {
    session_id: String,
    action: ActionRequest,
}

pub async fn action(
    state: web::Data<AppState>,
    body: web::Json<TrackActionRequest>,
) -> Result<HttpResponse, VerifyError> {
    let body = body.into_inner();
    state
        .auditor
        .track_action(&body.session_id, body.action, Utc::now())?;
    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct TrackTransactionRequest {
    session_id: String,
    transaction: TransactionRequest,
}

/// Apply a transaction against the session balance; the returned record
/// carries `failed`/`insufficient_balance` when the debit was rejected.
pub async fn transaction(
    state: web::Data<AppState>,
    body: web::Json<TrackTransactionRequest>,
) -> Result<HttpResponse, VerifyError> {
    let body = body.into_inner();
    let record =
        state
            .auditor
            .track_transaction(&body.session_id, body.transaction, Utc::now())?;
    Ok(HttpResponse::Ok().json(record))
}
