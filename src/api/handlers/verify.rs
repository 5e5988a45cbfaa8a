use crate::api::handlers::{client_ip, client_user_agent};
use crate::api::AppState;
use crate::behavior::{BehaviorEvent, EventOutcome};
use crate::errors::VerifyError;
use crate::models::{DeviceProfile, IdentityClaim};
use crate::ownership::{classify_sim_age, sim_age_days, verify_ownership};
use crate::risk::score_session;
use crate::utils::{
    hash_fingerprint, is_headless_user_agent, is_valid_mobile, mask_mobile, mask_name,
};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mobile: Option<String>,
}

/// Open a verification session for a claimed identity.
pub async fn start_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<StartSessionRequest>,
) -> Result<HttpResponse, VerifyError> {
    let body = body.into_inner();
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VerifyError::InvalidInput("name is required".to_string()))?;
    let mobile = body
        .mobile
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VerifyError::InvalidInput("mobile is required".to_string()))?;

    let claim = IdentityClaim {
        name: name.to_string(),
        mobile: mobile.to_string(),
    };
    let session = state.sessions.create(
        claim,
        client_ip(&req),
        client_user_agent(&req),
        Utc::now(),
    );

    info!(
        "verification session {} opened for {} ({})",
        session.session_id,
        mask_name(name),
        mask_mobile(mobile)
    );

    Ok(HttpResponse::Ok().json(json!({ "session_id": session.session_id })))
}

#[derive(Debug, Deserialize)]
pub struct DeviceRegistration {
    session_id: String,
    fingerprint: String,
    #[serde(rename = "userAgent")]
    user_agent: String,
    platform: String,
    #[serde(rename = "screenResolution", default)]
    screen_resolution: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    vpn_detected: bool,
}

/// Register device signals against a session. The emulator flag is derived
/// from the user agent; newness comes from the process-lifetime fingerprint
/// registry; VPN detection is a declarative client input.
pub async fn register_device(
    state: web::Data<AppState>,
    body: web::Json<DeviceRegistration>,
) -> Result<HttpResponse, VerifyError> {
    let body = body.into_inner();
    let now = Utc::now();

    let fingerprint = hash_fingerprint(&body.fingerprint);
    let device = DeviceProfile {
        is_emulator: is_headless_user_agent(&body.user_agent),
        is_new_device: state.sessions.first_sighting(&fingerprint, now),
        vpn_detected: body.vpn_detected,
        fingerprint,
        user_agent: body.user_agent,
        platform: body.platform,
        screen_resolution: body.screen_resolution,
        language: body.language,
        timezone: body.timezone,
    };

    state
        .sessions
        .attach_device(&body.session_id, device, now)?;

    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

/// Apply one behavioral event. Every event answers `tracked` except a
/// honeypot click, which terminates the flow with an immediate verdict and
/// redirect instruction.
pub async fn behavior_event(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, VerifyError> {
    let body = body.into_inner();
    let session_id = body
        .get("session_id")
        .and_then(Value::as_str)
        .ok_or_else(|| VerifyError::InvalidInput("session_id is required".to_string()))?
        .to_string();

    let event = BehaviorEvent::from_value(&body)?;
    let now = Utc::now();
    let (outcome, session) = state.sessions.apply_event(&session_id, &event, now)?;

    if outcome == EventOutcome::HoneypotTriggered {
        let claim = &session.identity_claim;
        let carrier = state.carrier.lookup(&claim.mobile);
        let verdict = score_session(
            claim,
            carrier.as_ref(),
            session.device.as_ref(),
            &session.behavior,
            &state.settings.trusted_identities,
            state.settings.trusted_identity_score,
            now,
        );

        warn!(
            "honeypot click in session {} by {} ({}); score {}",
            session_id,
            mask_name(&claim.name),
            mask_mobile(&claim.mobile),
            verdict.risk_score
        );

        return Ok(HttpResponse::Ok().json(json!({
            "status": "fraud_detected",
            "redirect_url": "/honeypot",
            "verdict": verdict,
        })));
    }

    Ok(HttpResponse::Ok().json(json!({ "status": "tracked" })))
}

#[derive(Debug, Deserialize)]
pub struct AssessRequest {
    session_id: String,
}

/// Produce a fresh risk verdict (with the ownership breakdown) for a
/// session's current state.
pub async fn assess(
    state: web::Data<AppState>,
    body: web::Json<AssessRequest>,
) -> Result<HttpResponse, VerifyError> {
    let now = Utc::now();
    let session = state.sessions.get(&body.session_id, now)?;

    let claim = &session.identity_claim;
    let carrier = state.carrier.lookup(&claim.mobile);
    let ownership = verify_ownership(claim, carrier.as_ref(), session.device.as_ref(), now);
    let verdict = score_session(
        claim,
        carrier.as_ref(),
        session.device.as_ref(),
        &session.behavior,
        &state.settings.trusted_identities,
        state.settings.trusted_identity_score,
        now,
    );

    Ok(HttpResponse::Ok().json(json!({
        "session_id": session.session_id,
        "verdict": verdict,
        "ownership": ownership,
    })))
}

#[derive(Debug, Deserialize)]
pub struct NameCheckRequest {
    #[serde(default)]
    mobile: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Standalone ownership check, no session required. The mobile number must
/// be exactly ten digits.
pub async fn name_check(
    state: web::Data<AppState>,
    body: web::Json<NameCheckRequest>,
) -> Result<HttpResponse, VerifyError> {
    let body = body.into_inner();
    let mobile = body
        .mobile
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VerifyError::InvalidInput("mobile is required".to_string()))?;
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VerifyError::InvalidInput("name is required".to_string()))?;

    if !is_valid_mobile(mobile) {
        return Err(VerifyError::InvalidInput(
            "mobile must be a 10-digit number".to_string(),
        ));
    }

    let now = Utc::now();
    let claim = IdentityClaim {
        name: name.to_string(),
        mobile: mobile.to_string(),
    };
    let carrier = state.carrier.lookup(mobile);
    let ownership = verify_ownership(&claim, carrier.as_ref(), None, now);
    let sim_age = carrier
        .as_ref()
        .map(|record| classify_sim_age(sim_age_days(record.activation_date, now)));

    Ok(HttpResponse::Ok().json(json!({
        "mobile": mobile,
        "ownership": ownership,
        "sim_age": sim_age,
    })))
}
