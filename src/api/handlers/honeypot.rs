use crate::api::handlers::{client_ip, client_user_agent};
use crate::api::AppState;
use crate::errors::VerifyError;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

/// Enter the decoy environment. Every caller gets a fresh decoy session;
/// nothing here reveals that the environment is fake.
pub async fn enter(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, VerifyError> {
    let session = state
        .honeypots
        .enter(client_ip(&req), client_user_agent(&req), Utc::now());

    warn!(
        "decoy environment entered from {} ({})",
        session.client_ip, session.client_user_agent
    );

    Ok(HttpResponse::Ok().json(json!({
        "session_id": session.session_id,
        "entry_time": session.entry_time,
    })))
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    session_id: String,
    action: String,
    #[serde(default)]
    page: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

/// Append one decoy-environment action and return the updated fraud state.
pub async fn track(
    state: web::Data<AppState>,
    body: web::Json<TrackRequest>,
) -> Result<HttpResponse, VerifyError> {
    let body = body.into_inner();
    let outcome = state.honeypots.track(
        &body.session_id,
        &body.action,
        body.page.as_deref().unwrap_or(""),
        body.details.unwrap_or(Value::Null),
        Utc::now(),
    )?;

    if outcome.fraud_confirmed {
        warn!(
            "fraud confirmed in decoy session {} (score {}, {} actions)",
            body.session_id, outcome.fraud_score, outcome.action_count
        );
    }

    Ok(HttpResponse::Ok().json(json!({
        "status": "logged",
        "fraud_score": outcome.fraud_score,
        "fraud_confirmed": outcome.fraud_confirmed,
        "action_count": outcome.action_count,
    })))
}

#[derive(Debug, Deserialize)]
pub struct FakeTransferRequest {
    session_id: String,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    recipient: Option<String>,
}

/// Accept a transfer in the decoy wallet. The transfer never executes; the
/// attempt is the signal.
pub async fn fake_transfer(
    state: web::Data<AppState>,
    body: web::Json<FakeTransferRequest>,
) -> Result<HttpResponse, VerifyError> {
    let body = body.into_inner();
    let details = json!({
        "amount": body.amount,
        "recipient": body.recipient,
    });
    let outcome = state.honeypots.track(
        &body.session_id,
        "transfer_attempt",
        "fake-wallet",
        details,
        Utc::now(),
    )?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "processing",
        "message": "Transaction is being processed",
        "fraud_score": outcome.fraud_score,
    })))
}

#[derive(Debug, Deserialize)]
pub struct BalanceRequest {
    session_id: String,
}

/// Serve the decoy balance. Each check is itself a tracked action.
pub async fn fake_balance(
    state: web::Data<AppState>,
    body: web::Json<BalanceRequest>,
) -> Result<HttpResponse, VerifyError> {
    let outcome = state.honeypots.track(
        &body.session_id,
        "view_balance",
        "fake-wallet",
        Value::Null,
        Utc::now(),
    )?;

    Ok(HttpResponse::Ok().json(json!({
        "balance": state.settings.decoy_balance,
        "currency": "INR",
        "fraud_score": outcome.fraud_score,
    })))
}

/// Summarize a decoy session for the fraud analyst.
pub async fn report(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, VerifyError> {
    let report = state.honeypots.report(&path.into_inner(), Utc::now())?;
    Ok(HttpResponse::Ok().json(report))
}
