use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Define core types
pub type SessionId = String;
pub type Mobile = String;

/// Identity claimed by the client at the start of a verification flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub name: String,
    pub mobile: Mobile,
}

/// Carrier-of-record data for a mobile number, as returned by the
/// telecom directory lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierRecord {
    pub owner_name: String,
    pub activation_date: NaiveDate,
    pub provider: String,
    pub kyc_status: KycStatus,
    pub aadhar_linked: bool,
    pub pan_linked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Verified,
    Pending,
    #[serde(other)]
    Incomplete,
}

/// Device signals registered once per session. The trust flags are
/// declarative inputs or derived at registration; no live probing happens
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub fingerprint: String,
    pub user_agent: String,
    pub platform: String,
    pub screen_resolution: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub is_emulator: bool,
    pub is_new_device: bool,
    pub vpn_detected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageVisit {
    pub page: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-session behavioral accumulator. `honeypot_clicked` is monotonic:
/// once set it never reverts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorState {
    pub login_time_ms: Option<u64>,
    pub pages_visited: Vec<PageVisit>,
    pub pages_visited_per_minute: f64,
    pub honeypot_clicked: bool,
    pub honeypot_element: Option<String>,
    pub mouse_movement_count: u32,
    pub copied_pasted: bool,
    pub login_attempt_count: u32,
    pub tab_switch_count: u32,
    pub dev_tools_opened: bool,
    pub automation_detected: bool,
    pub scroll_count: u32,
}

/// One verification attempt. Mutated only through the session store so
/// concurrent events cannot interleave into a lost update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSession {
    pub session_id: SessionId,
    pub identity_claim: IdentityClaim,
    pub device: Option<DeviceProfile>,
    pub behavior: BehaviorState,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub client_ip: String,
    pub client_user_agent: String,
}

/// Aggregated risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify a raw risk score. Boundaries: <30 LOW, <50 MEDIUM,
    /// <70 HIGH, otherwise CRITICAL.
    pub fn from_score(score: u32) -> Self {
        if score < 30 {
            RiskLevel::Low
        } else if score < 50 {
            RiskLevel::Medium
        } else if score < 70 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

/// SIM-age display classification, independent of the additive ownership
/// score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimAgeRisk {
    High,
    Medium,
    Low,
    VeryLow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimAgeAssessment {
    pub risk: SimAgeRisk,
    pub score: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodStatus {
    Passed,
    Partial,
    Failed,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMethod {
    pub method: String,
    pub status: MethodStatus,
    pub score: u32,
    pub details: String,
}

/// Result of matching a claimed identity against the carrier record.
/// Derived on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipVerification {
    pub verified: bool,
    pub confidence_score: u32,
    pub owner_name: Option<String>,
    pub risk_factors: Vec<String>,
    pub verification_methods: Vec<VerificationMethod>,
    pub requires_manual_review: bool,
}

/// Point-in-time fraud-risk verdict for a session. Produced fresh on each
/// request; the raw score is not clamped and can exceed 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub is_fraud: bool,
    pub needs_honeypot_redirect: bool,
    pub computed_at: DateTime<Utc>,
}
