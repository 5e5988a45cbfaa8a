use crate::config::TrustedIdentity;
use crate::models::{
    BehaviorState, CarrierRecord, DeviceProfile, IdentityClaim, KycStatus, RiskLevel, RiskVerdict,
};
use crate::ownership::sim_age_days;
use chrono::{DateTime, Utc};
use log::debug;

const FRAUD_THRESHOLD: u32 = 60;
const HONEYPOT_REDIRECT_THRESHOLD: u32 = 50;

/// Aggregate session signals into a risk verdict. Pure over its inputs:
/// identical `(claim, carrier, device, behavior, now)` always yields the same
/// score and factor list. Factor groups run in a fixed order — ownership,
/// device, behavior, honeypot — and their contributions are summed without a
/// cap.
pub fn score_session(
    claim: &IdentityClaim,
    carrier: Option<&CarrierRecord>,
    device: Option<&DeviceProfile>,
    behavior: &BehaviorState,
    allowlist: &[TrustedIdentity],
    allowlist_score: u32,
    now: DateTime<Utc>,
) -> RiskVerdict {
    if let Some(identity) = allowlist_match(claim, allowlist) {
        debug!("allow-listed identity {} short-circuits scoring", identity.mobile);
        let score = allowlist_score;
        return RiskVerdict {
            risk_score: score,
            risk_level: RiskLevel::from_score(score),
            risk_factors: vec!["Pre-vetted test identity".to_string()],
            is_fraud: false,
            needs_honeypot_redirect: false,
            computed_at: now,
        };
    }

    let mut score: u32 = 0;
    let mut factors = Vec::new();

    score += ownership_factor(claim, carrier, now, &mut factors);
    score += device_factor(device, &mut factors);
    score += behavior_factor(behavior, &mut factors);
    score += honeypot_factor(behavior, &mut factors);

    RiskVerdict {
        risk_score: score,
        risk_level: RiskLevel::from_score(score),
        risk_factors: factors,
        is_fraud: score > FRAUD_THRESHOLD,
        // A honeypot click always redirects, even when the rest of the
        // session is clean enough to land exactly on the threshold.
        needs_honeypot_redirect: score > HONEYPOT_REDIRECT_THRESHOLD || behavior.honeypot_clicked,
        computed_at: now,
    }
}

fn allowlist_match<'a>(
    claim: &IdentityClaim,
    allowlist: &'a [TrustedIdentity],
) -> Option<&'a TrustedIdentity> {
    allowlist.iter().find(|identity| {
        identity.mobile == claim.mobile
            && identity.name.trim().eq_ignore_ascii_case(claim.name.trim())
    })
}

/// Ownership/telecom group. A missing carrier record is worth the whole
/// group; otherwise name mismatch, SIM freshness and KYC gaps stack.
fn ownership_factor(
    claim: &IdentityClaim,
    carrier: Option<&CarrierRecord>,
    now: DateTime<Utc>,
    factors: &mut Vec<String>,
) -> u32 {
    let record = match carrier {
        Some(record) => record,
        None => {
            factors.push("Mobile number not found in carrier records".to_string());
            return 40;
        }
    };

    let mut score = 0;

    // Exact compare only; the fuzzy token match belongs to the ownership
    // verifier, not the risk score.
    if !claim
        .name
        .trim()
        .eq_ignore_ascii_case(record.owner_name.trim())
    {
        score += 30;
        factors.push("Claimed name does not match carrier record".to_string());
    }

    let age_days = sim_age_days(record.activation_date, now);
    if age_days < 7 {
        score += 25;
        factors.push("SIM activated within the last 7 days".to_string());
    } else if age_days < 30 {
        score += 15;
        factors.push("SIM activated within the last 30 days".to_string());
    } else if age_days < 90 {
        score += 5;
        factors.push("SIM less than 3 months old".to_string());
    }

    if record.kyc_status != KycStatus::Verified {
        score += 10;
        factors.push("Carrier KYC incomplete".to_string());
    }

    score
}

fn device_factor(device: Option<&DeviceProfile>, factors: &mut Vec<String>) -> u32 {
    let device = match device {
        Some(device) => device,
        None => return 0,
    };

    let mut score = 0;

    if device.is_emulator {
        score += 20;
        factors.push("Emulator or headless browser detected".to_string());
    }
    if device.is_new_device {
        score += 5;
        factors.push("Login from a previously unseen device".to_string());
    }
    if device.vpn_detected {
        score += 15;
        factors.push("VPN or proxy connection detected".to_string());
    }

    score
}

fn behavior_factor(behavior: &BehaviorState, factors: &mut Vec<String>) -> u32 {
    let mut score = 0;

    if let Some(login_ms) = behavior.login_time_ms {
        if login_ms < 1000 {
            score += 25;
            factors.push("Login completed in under one second".to_string());
        } else if login_ms < 2000 {
            score += 15;
            factors.push("Unusually fast login".to_string());
        } else if login_ms < 3000 {
            score += 5;
            factors.push("Fast login".to_string());
        }
    }

    if behavior.mouse_movement_count < 5 {
        score += 15;
        factors.push("Minimal mouse movement recorded".to_string());
    }

    if behavior.copied_pasted {
        score += 5;
        factors.push("Copy-paste used during entry".to_string());
    }

    if behavior.pages_visited.len() > 20 {
        score += 10;
        factors.push("Abnormally high page navigation".to_string());
    }

    score
}

fn honeypot_factor(behavior: &BehaviorState, factors: &mut Vec<String>) -> u32 {
    if behavior.honeypot_clicked {
        factors.push("Honeypot element clicked".to_string());
        50
    } else {
        0
    }
}
