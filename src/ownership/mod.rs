use crate::models::{
    CarrierRecord, DeviceProfile, IdentityClaim, KycStatus, MethodStatus, OwnershipVerification,
    SimAgeAssessment, SimAgeRisk, VerificationMethod,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

/// Confidence at or above this threshold counts as verified ownership.
const VERIFIED_THRESHOLD: u32 = 60;
/// Confidence in `MANUAL_REVIEW_THRESHOLD..VERIFIED_THRESHOLD` goes to a
/// human reviewer.
const MANUAL_REVIEW_THRESHOLD: u32 = 40;

/// Days since the SIM's activation date.
pub fn sim_age_days(activation_date: NaiveDate, now: DateTime<Utc>) -> i64 {
    (now.date_naive() - activation_date).num_days()
}

/// SIM-age classification used for display alongside verification results.
/// Independent of the additive confidence scoring below.
pub fn classify_sim_age(days: i64) -> SimAgeAssessment {
    if days < 30 {
        SimAgeAssessment {
            risk: SimAgeRisk::High,
            score: 40,
            reason: "SIM activated recently".to_string(),
        }
    } else if days < 90 {
        SimAgeAssessment {
            risk: SimAgeRisk::Medium,
            score: 20,
            reason: "SIM less than 3 months old".to_string(),
        }
    } else if days < 365 {
        SimAgeAssessment {
            risk: SimAgeRisk::Low,
            score: 10,
            reason: "SIM less than 1 year old".to_string(),
        }
    } else {
        SimAgeAssessment {
            risk: SimAgeRisk::VeryLow,
            score: 0,
            reason: "Established SIM".to_string(),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn token_overlap(a: &str, b: &str) -> bool {
    let left: HashSet<&str> = a.split_whitespace().collect();
    left.iter().any(|t| b.split_whitespace().any(|u| u == *t))
}

/// Score a claimed identity against the carrier record. Additive methods
/// run in a fixed order so factor lists are deterministic for identical
/// inputs. Missing carrier record short-circuits to zero confidence.
pub fn verify_ownership(
    claim: &IdentityClaim,
    record: Option<&CarrierRecord>,
    device: Option<&DeviceProfile>,
    now: DateTime<Utc>,
) -> OwnershipVerification {
    let record = match record {
        Some(record) => record,
        None => {
            return OwnershipVerification {
                verified: false,
                confidence_score: 0,
                owner_name: None,
                risk_factors: vec!["Mobile number not found in carrier records".to_string()],
                verification_methods: Vec::new(),
                requires_manual_review: false,
            };
        }
    };

    let mut score: u32 = 0;
    let mut risk_factors = Vec::new();
    let mut methods = Vec::new();

    // Name match: exact normalized equality, else token overlap.
    let claimed = normalize(&claim.name);
    let owner = normalize(&record.owner_name);
    if claimed == owner {
        score += 40;
        methods.push(VerificationMethod {
            method: "name_match".to_string(),
            status: MethodStatus::Passed,
            score: 40,
            details: "Claimed name matches the carrier record exactly".to_string(),
        });
    } else if token_overlap(&claimed, &owner) {
        score += 20;
        methods.push(VerificationMethod {
            method: "name_match".to_string(),
            status: MethodStatus::Partial,
            score: 20,
            details: "Claimed name partially matches the carrier record".to_string(),
        });
    } else {
        methods.push(VerificationMethod {
            method: "name_match".to_string(),
            status: MethodStatus::Failed,
            score: 0,
            details: "Claimed name does not match the carrier record".to_string(),
        });
        risk_factors.push(format!(
            "Name mismatch: number is registered to {}",
            record.owner_name
        ));
    }

    // SIM age buckets: <30 days scores nothing and flags high risk.
    let age_days = sim_age_days(record.activation_date, now);
    if age_days < 30 {
        methods.push(VerificationMethod {
            method: "sim_age".to_string(),
            status: MethodStatus::Failed,
            score: 0,
            details: format!("SIM recently activated ({} days ago)", age_days),
        });
        risk_factors.push("SIM card was recently activated".to_string());
    } else if age_days < 90 {
        score += 10;
        methods.push(VerificationMethod {
            method: "sim_age".to_string(),
            status: MethodStatus::Warning,
            score: 10,
            details: format!("SIM active for {} days", age_days),
        });
    } else {
        score += 15;
        methods.push(VerificationMethod {
            method: "sim_age".to_string(),
            status: MethodStatus::Passed,
            score: 15,
            details: format!("SIM well-established ({} days)", age_days),
        });
    }

    // Carrier KYC
    if record.kyc_status == KycStatus::Verified {
        score += 20;
        methods.push(VerificationMethod {
            method: "kyc_status".to_string(),
            status: MethodStatus::Passed,
            score: 20,
            details: "Carrier KYC verified".to_string(),
        });
    } else {
        risk_factors.push("Incomplete KYC with carrier".to_string());
    }

    // Identity linkage: Aadhar and PAN
    match (record.aadhar_linked, record.pan_linked) {
        (true, true) => {
            score += 15;
            methods.push(VerificationMethod {
                method: "identity_linkage".to_string(),
                status: MethodStatus::Passed,
                score: 15,
                details: "Aadhar and PAN linked".to_string(),
            });
        }
        (true, false) | (false, true) => {
            score += 5;
            methods.push(VerificationMethod {
                method: "identity_linkage".to_string(),
                status: MethodStatus::Partial,
                score: 5,
                details: "Only one identity document linked".to_string(),
            });
        }
        (false, false) => {}
    }

    // Device consistency, only when device signals were registered. An
    // emulator zeroes this method regardless of the other flags.
    if let Some(device) = device {
        if device.is_emulator {
            methods.push(VerificationMethod {
                method: "device_consistency".to_string(),
                status: MethodStatus::Failed,
                score: 0,
                details: "Emulator or headless environment detected".to_string(),
            });
        } else {
            let mut device_score = 0;
            if !device.is_new_device {
                device_score += 10;
            }
            if !device.vpn_detected {
                device_score += 5;
            }
            score += device_score;
            methods.push(VerificationMethod {
                method: "device_consistency".to_string(),
                status: if device_score > 0 {
                    MethodStatus::Passed
                } else {
                    MethodStatus::Warning
                },
                score: device_score,
                details: "Device signals evaluated".to_string(),
            });
        }
    }

    OwnershipVerification {
        verified: score >= VERIFIED_THRESHOLD,
        confidence_score: score,
        owner_name: Some(record.owner_name.clone()),
        risk_factors,
        verification_methods: methods,
        requires_manual_review: (MANUAL_REVIEW_THRESHOLD..VERIFIED_THRESHOLD).contains(&score),
    }
}
