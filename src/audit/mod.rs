use crate::errors::VerifyError;
use crate::models::RiskLevel;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Page names that legitimate users never navigate to.
const RESTRICTED_PAGES: &[&str] = &["admin", "settings", "hidden"];
/// New-user large-transaction rule thresholds.
const NEW_USER_LOGIN_LIMIT: u32 = 2;
const RAPID_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    pub name: String,
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnType {
    Debit,
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "type")]
    pub txn_type: TxnType,
    pub amount: Decimal,
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub user_name: String,
    #[serde(rename = "type")]
    pub txn_type: TxnType,
    pub amount: Decimal,
    pub recipient: String,
    pub status: TxnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub page: String,
    pub details: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuspiciousEntry {
    pub user: String,
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub details: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub name: String,
    pub mobile: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub total_logins: u32,
    pub total_suspicious_actions: u32,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub transactions: Vec<TransactionRecord>,
    pub sessions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingSession {
    pub user: String,
    pub user_name: String,
    pub login_time: DateTime<Utc>,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub actions: Vec<ActionRecord>,
    pub transactions: Vec<TransactionRecord>,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardUser {
    pub name: String,
    pub mobile: String,
    pub email: String,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub total_logins: u32,
    pub suspicious_actions: u32,
    pub transaction_count: usize,
    pub total_spent: Decimal,
    pub current_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_users: usize,
    pub high_risk_users: usize,
    pub total_transactions: usize,
    pub total_suspicious: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub users: Vec<DashboardUser>,
    pub transactions: Vec<TransactionRecord>,
    pub suspicious_activity: Vec<SuspiciousEntry>,
    pub active_sessions: usize,
    pub stats: DashboardStats,
}

#[derive(Default)]
struct AuditState {
    users: HashMap<String, UserRecord>,
    sessions: HashMap<String, TrackingSession>,
    transactions: Vec<TransactionRecord>,
    suspicious_activity: Vec<SuspiciousEntry>,
}

/// Cross-session aggregate state: per-user records, per-login transaction
/// sessions, and the global suspicious-activity log. All read-modify-write
/// sequences run under one lock, so balances cannot be lost to races.
pub struct ActivityAuditor {
    state: RwLock<AuditState>,
    starting_balance: Decimal,
}

impl ActivityAuditor {
    pub fn new(starting_balance: Decimal) -> Self {
        ActivityAuditor {
            state: RwLock::new(AuditState::default()),
            starting_balance,
        }
    }

    /// Upsert the user record and open a transaction session seeded with
    /// the starting balance.
    pub fn track_login(
        &self,
        user: LoginUser,
        risk_score: u32,
        risk_level: RiskLevel,
        session_id: String,
        now: DateTime<Utc>,
    ) {
        let mut state = self.state.write();

        let record = state
            .users
            .entry(user.mobile.clone())
            .or_insert_with(|| UserRecord {
                name: user.name.clone(),
                mobile: user.mobile.clone(),
                email: user.email.clone().unwrap_or_default(),
                created_at: now,
                last_login: None,
                total_logins: 0,
                total_suspicious_actions: 0,
                risk_score,
                risk_level,
                transactions: Vec::new(),
                sessions: Vec::new(),
            });

        record.total_logins += 1;
        record.last_login = Some(now);
        record.risk_score = risk_score;
        record.risk_level = risk_level;
        record.sessions.push(session_id.clone());
        let user_name = record.name.clone();

        state.sessions.insert(
            session_id,
            TrackingSession {
                user: user.mobile,
                user_name,
                login_time: now,
                risk_score,
                risk_level,
                actions: Vec::new(),
                transactions: Vec::new(),
                balance: self.starting_balance,
            },
        );
    }

    /// Apply a transaction to the session balance. A debit exceeding the
    /// current balance never mutates it: the attempt is recorded as failed
    /// and logged as suspicious.
    pub fn track_transaction(
        &self,
        session_id: &str,
        request: TransactionRequest,
        now: DateTime<Utc>,
    ) -> Result<TransactionRecord, VerifyError> {
        let mut state = self.state.write();

        let session = state
            .sessions
            .get(session_id)
            .ok_or(VerifyError::SessionNotFound)?;
        let mobile = session.user.clone();
        let user_name = session.user_name.clone();
        let balance = session.balance;
        let recipient = request.recipient.clone().unwrap_or_default();
        let id = state.transactions.len() as u64 + 1;

        if request.txn_type == TxnType::Debit && request.amount > balance {
            let failed = TransactionRecord {
                id,
                timestamp: now,
                user: mobile.clone(),
                user_name: user_name.clone(),
                txn_type: TxnType::Debit,
                amount: request.amount,
                recipient,
                status: TxnStatus::Failed,
                reason: Some("insufficient_balance".to_string()),
            };
            state.transactions.push(failed.clone());

            let details = serde_json::to_value(&failed).unwrap_or(Value::Null);
            Self::log_suspicious(
                &mut state,
                &mobile,
                &user_name,
                format!(
                    "Failed transaction attempt: insufficient balance for ₹{}",
                    request.amount
                ),
                details,
                now,
            );
            return Ok(failed);
        }

        let transaction = TransactionRecord {
            id,
            timestamp: now,
            user: mobile.clone(),
            user_name: user_name.clone(),
            txn_type: request.txn_type,
            amount: request.amount,
            recipient,
            status: TxnStatus::Completed,
            reason: None,
        };

        {
            let session = state.sessions.get_mut(session_id).unwrap();
            session.balance = match request.txn_type {
                TxnType::Debit => balance - request.amount,
                TxnType::Credit => balance + request.amount,
            };
            session.transactions.push(transaction.clone());
        }
        if let Some(user) = state.users.get_mut(&mobile) {
            user.transactions.push(transaction.clone());
        }
        state.transactions.push(transaction.clone());

        self.check_transaction_rules(&mut state, session_id, &transaction, now);

        Ok(transaction)
    }

    /// Record a navigation/interaction action and run the suspicious rules
    /// over it.
    pub fn track_action(
        &self,
        session_id: &str,
        request: ActionRequest,
        now: DateTime<Utc>,
    ) -> Result<(), VerifyError> {
        let mut state = self.state.write();

        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or(VerifyError::SessionNotFound)?;
        let mobile = session.user.clone();
        let user_name = session.user_name.clone();

        let action = ActionRecord {
            timestamp: now,
            action: request.action.clone(),
            page: request.page.clone().unwrap_or_default(),
            details: request.details.clone().unwrap_or(Value::Null),
        };
        session.actions.push(action.clone());

        let mut reasons = Vec::new();

        if request.action == "failed_transaction" {
            let failures = session
                .actions
                .iter()
                .filter(|a| a.action == "failed_transaction")
                .count();
            if failures > 2 {
                reasons.push("Multiple failed transaction attempts".to_string());
            }
        }

        if request.action == "page_view" {
            if let Some(page) = &request.page {
                if RESTRICTED_PAGES.contains(&page.as_str()) {
                    reasons.push(format!("Attempted to access {} page", page));
                }
            }
        }

        if request.action == "honeypot_trigger" {
            reasons.push("Honeypot trap triggered".to_string());
        }

        let details = serde_json::to_value(&action).unwrap_or(Value::Null);
        for reason in reasons {
            Self::log_suspicious(&mut state, &mobile, &user_name, reason, details.clone(), now);
        }

        Ok(())
    }

    fn check_transaction_rules(
        &self,
        state: &mut AuditState,
        session_id: &str,
        transaction: &TransactionRecord,
        now: DateTime<Utc>,
    ) {
        let mut reasons = Vec::new();

        if transaction.amount > dec!(10000) {
            let new_user = state
                .users
                .get(&transaction.user)
                .map(|u| u.total_logins <= NEW_USER_LOGIN_LIMIT)
                .unwrap_or(true);
            if new_user {
                reasons.push(format!(
                    "New user making large transaction of ₹{}",
                    transaction.amount
                ));
            }
        }

        if let Some(session) = state.sessions.get(session_id) {
            let recent = session
                .transactions
                .iter()
                .filter(|t| now - t.timestamp < Duration::seconds(RAPID_WINDOW_SECS))
                .count();
            if recent > 2 {
                reasons.push(format!(
                    "Multiple rapid transactions: {} in {} seconds",
                    recent, RAPID_WINDOW_SECS
                ));
            }
        }

        let details = serde_json::to_value(transaction).unwrap_or(Value::Null);
        let user = transaction.user.clone();
        let user_name = transaction.user_name.clone();
        for reason in reasons {
            Self::log_suspicious(state, &user, &user_name, reason, details.clone(), now);
        }
    }

    fn log_suspicious(
        state: &mut AuditState,
        mobile: &str,
        user_name: &str,
        reason: String,
        details: Value,
        now: DateTime<Utc>,
    ) {
        log::warn!("suspicious activity for {}: {}", mobile, reason);
        state.suspicious_activity.push(SuspiciousEntry {
            user: mobile.to_string(),
            user_name: user_name.to_string(),
            timestamp: now,
            reason,
            details,
        });
        if let Some(user) = state.users.get_mut(mobile) {
            user.total_suspicious_actions += 1;
        }
    }

    /// Aggregate view for the admin dashboard: users by descending risk, the
    /// most recent suspicious entries and transactions, and global counts.
    pub fn dashboard(&self) -> DashboardData {
        let state = self.state.read();

        let mut users: Vec<DashboardUser> = state
            .users
            .values()
            .map(|user| {
                let latest_session = state
                    .sessions
                    .values()
                    .filter(|s| s.user == user.mobile)
                    .max_by_key(|s| s.login_time);

                let total_spent = user
                    .transactions
                    .iter()
                    .filter(|t| t.txn_type == TxnType::Debit && t.status == TxnStatus::Completed)
                    .map(|t| t.amount)
                    .sum();

                DashboardUser {
                    name: user.name.clone(),
                    mobile: user.mobile.clone(),
                    email: user.email.clone(),
                    risk_score: user.risk_score,
                    risk_level: user.risk_level,
                    total_logins: user.total_logins,
                    suspicious_actions: user.total_suspicious_actions,
                    transaction_count: user.transactions.len(),
                    total_spent,
                    current_balance: latest_session
                        .map(|s| s.balance)
                        .unwrap_or(self.starting_balance),
                    created_at: user.created_at,
                    last_login: user.last_login,
                }
            })
            .collect();
        users.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));

        let mut suspicious = state.suspicious_activity.clone();
        suspicious.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        suspicious.truncate(20);

        let mut transactions = state.transactions.clone();
        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        transactions.truncate(30);

        let stats = DashboardStats {
            total_users: users.len(),
            high_risk_users: users.iter().filter(|u| u.risk_score >= 70).count(),
            total_transactions: state.transactions.len(),
            total_suspicious: state.suspicious_activity.len(),
        };

        DashboardData {
            users,
            transactions,
            suspicious_activity: suspicious,
            active_sessions: state.sessions.len(),
            stats,
        }
    }

    #[cfg(test)]
    fn session_balance(&self, session_id: &str) -> Option<Decimal> {
        self.state.read().sessions.get(session_id).map(|s| s.balance)
    }

    #[cfg(test)]
    fn suspicious_count(&self) -> usize {
        self.state.read().suspicious_activity.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> LoginUser {
        LoginUser {
            name: "Ravi Kumar".to_string(),
            mobile: "9000000001".to_string(),
            email: Some("ravi@example.com".to_string()),
        }
    }

    fn auditor() -> ActivityAuditor {
        ActivityAuditor::new(dec!(50000))
    }

    fn debit(amount: Decimal) -> TransactionRequest {
        TransactionRequest {
            txn_type: TxnType::Debit,
            amount,
            recipient: Some("merchant".to_string()),
        }
    }

    #[test]
    fn login_opens_session_with_seed_balance() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 12, RiskLevel::Low, "s-1".to_string(), now);

        assert_eq!(auditor.session_balance("s-1"), Some(dec!(50000)));

        let dashboard = auditor.dashboard();
        assert_eq!(dashboard.users.len(), 1);
        assert_eq!(dashboard.users[0].total_logins, 1);
        assert_eq!(dashboard.active_sessions, 1);
    }

    #[test]
    fn repeated_logins_update_the_same_user() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 12, RiskLevel::Low, "s-1".to_string(), now);
        auditor.track_login(user(), 55, RiskLevel::High, "s-2".to_string(), now);

        let dashboard = auditor.dashboard();
        assert_eq!(dashboard.users.len(), 1);
        assert_eq!(dashboard.users[0].total_logins, 2);
        assert_eq!(dashboard.users[0].risk_score, 55);
    }

    #[test]
    fn overdraft_debit_never_touches_the_balance() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 12, RiskLevel::Low, "s-1".to_string(), now);

        let record = auditor
            .track_transaction("s-1", debit(dec!(60000)), now)
            .unwrap();
        assert_eq!(record.status, TxnStatus::Failed);
        assert_eq!(record.reason.as_deref(), Some("insufficient_balance"));
        assert_eq!(auditor.session_balance("s-1"), Some(dec!(50000)));

        // The failed attempt is logged as suspicious.
        let dashboard = auditor.dashboard();
        assert_eq!(dashboard.stats.total_suspicious, 1);
        assert!(dashboard.suspicious_activity[0]
            .reason
            .contains("insufficient balance"));
    }

    #[test]
    fn completed_transactions_move_the_balance_both_ways() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 12, RiskLevel::Low, "s-1".to_string(), now);

        auditor
            .track_transaction("s-1", debit(dec!(1500)), now)
            .unwrap();
        auditor
            .track_transaction(
                "s-1",
                TransactionRequest {
                    txn_type: TxnType::Credit,
                    amount: dec!(500),
                    recipient: None,
                },
                now + Duration::seconds(120),
            )
            .unwrap();

        assert_eq!(auditor.session_balance("s-1"), Some(dec!(49000)));
    }

    #[test]
    fn unknown_session_is_rejected() {
        let auditor = auditor();
        let err = auditor
            .track_transaction("missing", debit(dec!(10)), Utc::now())
            .unwrap_err();
        assert!(matches!(err, VerifyError::SessionNotFound));
        assert!(auditor
            .track_action(
                "missing",
                ActionRequest {
                    action: "page_view".to_string(),
                    page: Some("home".to_string()),
                    details: None,
                },
                Utc::now(),
            )
            .is_err());
    }

    #[test]
    fn new_user_large_transaction_is_suspicious() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 12, RiskLevel::Low, "s-1".to_string(), now);

        auditor
            .track_transaction("s-1", debit(dec!(15000)), now)
            .unwrap();

        let dashboard = auditor.dashboard();
        assert_eq!(dashboard.stats.total_suspicious, 1);
        assert!(dashboard.suspicious_activity[0]
            .reason
            .contains("large transaction"));
        assert_eq!(dashboard.users[0].suspicious_actions, 1);
    }

    #[test]
    fn established_user_large_transaction_is_fine() {
        let auditor = auditor();
        let now = Utc::now();
        for i in 0..3 {
            auditor.track_login(user(), 12, RiskLevel::Low, format!("s-{}", i), now);
        }
        auditor
            .track_transaction("s-2", debit(dec!(15000)), now)
            .unwrap();
        assert_eq!(auditor.suspicious_count(), 0);
    }

    #[test]
    fn rapid_transactions_trip_the_velocity_rule() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 12, RiskLevel::Low, "s-1".to_string(), now);

        for i in 0..3 {
            auditor
                .track_transaction(
                    "s-1",
                    debit(dec!(100)),
                    now + Duration::seconds(i * 10),
                )
                .unwrap();
        }

        let dashboard = auditor.dashboard();
        assert!(dashboard
            .suspicious_activity
            .iter()
            .any(|e| e.reason.contains("rapid transactions")));
    }

    #[test]
    fn spaced_transactions_do_not_trip_velocity() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 12, RiskLevel::Low, "s-1".to_string(), now);

        for i in 0..3 {
            auditor
                .track_transaction(
                    "s-1",
                    debit(dec!(100)),
                    now + Duration::seconds(i * 90),
                )
                .unwrap();
        }
        assert_eq!(auditor.suspicious_count(), 0);
    }

    #[test]
    fn restricted_pages_and_honeypot_actions_are_flagged() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 12, RiskLevel::Low, "s-1".to_string(), now);

        auditor
            .track_action(
                "s-1",
                ActionRequest {
                    action: "page_view".to_string(),
                    page: Some("admin".to_string()),
                    details: None,
                },
                now,
            )
            .unwrap();
        auditor
            .track_action(
                "s-1",
                ActionRequest {
                    action: "page_view".to_string(),
                    page: Some("wallet".to_string()),
                    details: None,
                },
                now,
            )
            .unwrap();
        auditor
            .track_action(
                "s-1",
                ActionRequest {
                    action: "honeypot_trigger".to_string(),
                    page: None,
                    details: Some(json!({"element": "admin-trap"})),
                },
                now,
            )
            .unwrap();

        assert_eq!(auditor.suspicious_count(), 2);
        let dashboard = auditor.dashboard();
        assert_eq!(dashboard.users[0].suspicious_actions, 2);
    }

    #[test]
    fn third_failed_transaction_action_is_suspicious() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 12, RiskLevel::Low, "s-1".to_string(), now);

        for i in 0..3 {
            auditor
                .track_action(
                    "s-1",
                    ActionRequest {
                        action: "failed_transaction".to_string(),
                        page: None,
                        details: None,
                    },
                    now + Duration::seconds(i),
                )
                .unwrap();
        }
        // Only the third attempt crosses the "> 2" threshold.
        assert_eq!(auditor.suspicious_count(), 1);
    }

    #[test]
    fn dashboard_sorts_users_by_risk_and_caps_lists() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 20, RiskLevel::Low, "s-1".to_string(), now);
        auditor.track_login(
            LoginUser {
                name: "Meena Iyer".to_string(),
                mobile: "9000000002".to_string(),
                email: None,
            },
            85,
            RiskLevel::Critical,
            "s-2".to_string(),
            now,
        );

        for i in 0..40 {
            auditor
                .track_transaction(
                    "s-1",
                    debit(dec!(1)),
                    now + Duration::seconds(i * 120),
                )
                .unwrap();
        }

        let dashboard = auditor.dashboard();
        assert_eq!(dashboard.users[0].mobile, "9000000002");
        assert_eq!(dashboard.transactions.len(), 30);
        assert_eq!(dashboard.stats.total_transactions, 40);
        assert_eq!(dashboard.stats.high_risk_users, 1);
        // Most recent first
        assert!(dashboard.transactions[0].timestamp >= dashboard.transactions[29].timestamp);
    }

    #[test]
    fn total_spent_counts_only_completed_debits() {
        let auditor = auditor();
        let now = Utc::now();
        auditor.track_login(user(), 12, RiskLevel::Low, "s-1".to_string(), now);

        auditor
            .track_transaction("s-1", debit(dec!(2000)), now)
            .unwrap();
        auditor
            .track_transaction("s-1", debit(dec!(99000)), now + Duration::seconds(90))
            .unwrap();
        auditor
            .track_transaction(
                "s-1",
                TransactionRequest {
                    txn_type: TxnType::Credit,
                    amount: dec!(700),
                    recipient: None,
                },
                now + Duration::seconds(180),
            )
            .unwrap();

        let dashboard = auditor.dashboard();
        assert_eq!(dashboard.users[0].total_spent, dec!(2000));
        assert_eq!(dashboard.users[0].current_balance, dec!(48700));
    }
}
