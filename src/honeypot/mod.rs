use crate::errors::VerifyError;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Actions that count towards the core fraud-confirmation trigger.
const CORE_ACTIONS: &[&str] = &["transfer_attempt", "view_balance", "click_admin_link"];
/// More than this many core actions confirms fraud.
const CORE_ACTION_LIMIT: usize = 3;
/// Automation signature: more than this many actions with a sub-500ms mean
/// inter-action interval.
const AUTOMATION_ACTION_LIMIT: usize = 5;
const AUTOMATION_MEAN_GAP_MS: i64 = 500;

const BLOCK_THRESHOLD: u32 = 70;

#[derive(Debug, Clone, Serialize)]
pub struct HoneypotAction {
    pub action_type: String,
    pub page: String,
    pub timestamp: DateTime<Utc>,
    pub details: Value,
}

/// Decoy-environment session. Created on entry, grows by append; the fraud
/// score is recomputed from the full action log on every track.
#[derive(Debug, Clone, Serialize)]
pub struct HoneypotSession {
    pub session_id: String,
    pub entry_time: DateTime<Utc>,
    pub client_ip: String,
    pub client_user_agent: String,
    pub actions: Vec<HoneypotAction>,
    pub fraud_score: u32,
    #[serde(skip)]
    last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    #[serde(rename = "BLOCK_USER")]
    BlockUser,
    #[serde(rename = "MONITOR")]
    Monitor,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoneypotReport {
    pub session_id: String,
    pub fraud_score: u32,
    pub client_ip: String,
    pub client_user_agent: String,
    pub action_count: usize,
    pub suspicious_patterns: Vec<String>,
    pub recommendation: Recommendation,
    pub entry_time: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackOutcome {
    pub fraud_score: u32,
    pub fraud_confirmed: bool,
    pub action_count: usize,
}

/// Per-action contribution to the fraud score. Unrecognized actions are
/// recorded but score nothing.
pub fn action_score(action_type: &str) -> u32 {
    match action_type {
        "transfer_attempt" => 40,
        "view_balance" => 5,
        "click_admin_link" => 30,
        "multiple_login_attempts" => 25,
        "page_scraping" => 35,
        _ => 0,
    }
}

/// Sum of action scores, clamped to 100.
pub fn compute_fraud_score(actions: &[HoneypotAction]) -> u32 {
    actions
        .iter()
        .map(|a| action_score(&a.action_type))
        .sum::<u32>()
        .min(100)
}

/// Fraud is confirmed once the actor has either taken more than three core
/// actions, or is acting faster than a human plausibly could.
pub fn fraud_confirmed(actions: &[HoneypotAction]) -> bool {
    let core_count = actions
        .iter()
        .filter(|a| CORE_ACTIONS.contains(&a.action_type.as_str()))
        .count();
    if core_count > CORE_ACTION_LIMIT {
        return true;
    }

    if actions.len() > AUTOMATION_ACTION_LIMIT {
        if let Some(mean_gap) = mean_interval_ms(actions) {
            if mean_gap < AUTOMATION_MEAN_GAP_MS {
                return true;
            }
        }
    }

    false
}

fn mean_interval_ms(actions: &[HoneypotAction]) -> Option<i64> {
    if actions.len() < 2 {
        return None;
    }
    let first = actions.first()?.timestamp;
    let last = actions.last()?.timestamp;
    let span_ms = (last - first).num_milliseconds();
    Some(span_ms / (actions.len() as i64 - 1))
}

fn detect_patterns(actions: &[HoneypotAction]) -> Vec<String> {
    let mut patterns = Vec::new();

    if actions.iter().any(|a| a.action_type == "transfer_attempt") {
        patterns.push("Unauthorized transfer attempt".to_string());
    }

    let balance_checks = actions
        .iter()
        .filter(|a| a.action_type == "view_balance")
        .count();
    if balance_checks > 5 {
        patterns.push(format!("Excessive balance checks ({})", balance_checks));
    }

    if actions.iter().any(|a| a.action_type == "click_admin_link") {
        patterns.push("Admin link access attempted".to_string());
    }

    patterns
}

/// Store for decoy-environment sessions, separate from the verification
/// session store.
pub struct HoneypotStore {
    sessions: RwLock<HashMap<String, HoneypotSession>>,
    ttl: Duration,
}

impl HoneypotStore {
    pub fn new(ttl_minutes: i64) -> Self {
        HoneypotStore {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn enter(
        &self,
        client_ip: String,
        client_user_agent: String,
        now: DateTime<Utc>,
    ) -> HoneypotSession {
        let session = HoneypotSession {
            session_id: Uuid::new_v4().to_string(),
            entry_time: now,
            client_ip,
            client_user_agent,
            actions: Vec::new(),
            fraud_score: 0,
            last_seen: now,
        };
        self.sessions
            .write()
            .insert(session.session_id.clone(), session.clone());
        session
    }

    pub fn track(
        &self,
        session_id: &str,
        action_type: &str,
        page: &str,
        details: Value,
        now: DateTime<Utc>,
    ) -> Result<TrackOutcome, VerifyError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or(VerifyError::SessionNotFound)?;

        session.last_seen = now;
        session.actions.push(HoneypotAction {
            action_type: action_type.to_string(),
            page: page.to_string(),
            timestamp: now,
            details,
        });
        session.fraud_score = compute_fraud_score(&session.actions);

        Ok(TrackOutcome {
            fraud_score: session.fraud_score,
            fraud_confirmed: fraud_confirmed(&session.actions),
            action_count: session.actions.len(),
        })
    }

    pub fn get(&self, session_id: &str) -> Result<HoneypotSession, VerifyError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or(VerifyError::SessionNotFound)
    }

    pub fn report(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<HoneypotReport, VerifyError> {
        let session = self.get(session_id)?;

        let recommendation = if session.fraud_score > BLOCK_THRESHOLD {
            Recommendation::BlockUser
        } else {
            Recommendation::Monitor
        };

        Ok(HoneypotReport {
            session_id: session.session_id,
            fraud_score: session.fraud_score,
            client_ip: session.client_ip,
            client_user_agent: session.client_user_agent,
            action_count: session.actions.len(),
            suspicious_patterns: detect_patterns(&session.actions),
            recommendation,
            entry_time: session.entry_time,
            generated_at: now,
        })
    }

    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| now - session.last_seen <= self.ttl);
        before - sessions.len()
    }
}
