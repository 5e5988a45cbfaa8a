use crate::behavior::{self, BehaviorEvent, EventOutcome};
use crate::errors::VerifyError;
use crate::models::{BehaviorState, DeviceProfile, IdentityClaim, VerificationSession};
use crate::utils::generate_session_id;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Repository seam for verification sessions. Callers depend on this trait,
/// never on a process-global map. All mutations are atomic per session.
pub trait SessionStore: Send + Sync {
    fn create(
        &self,
        claim: IdentityClaim,
        client_ip: String,
        client_user_agent: String,
        now: DateTime<Utc>,
    ) -> VerificationSession;

    fn get(&self, session_id: &str, now: DateTime<Utc>)
        -> Result<VerificationSession, VerifyError>;

    fn attach_device(
        &self,
        session_id: &str,
        device: DeviceProfile,
        now: DateTime<Utc>,
    ) -> Result<(), VerifyError>;

    /// Apply one behavioral event and return the outcome together with a
    /// snapshot of the updated session.
    fn apply_event(
        &self,
        session_id: &str,
        event: &BehaviorEvent,
        now: DateTime<Utc>,
    ) -> Result<(EventOutcome, VerificationSession), VerifyError>;

    /// Idempotent: deleting an unknown session is a no-op.
    fn delete(&self, session_id: &str);

    /// Record a fingerprint sighting; true when this fingerprint has not
    /// been seen within the retention horizon.
    fn first_sighting(&self, fingerprint: &str, now: DateTime<Utc>) -> bool;

    /// Drop sessions idle past the TTL; returns how many were evicted.
    fn purge_expired(&self, now: DateTime<Utc>) -> usize;
}

/// Fingerprints are kept much longer than sessions so device newness stays
/// stable across verification attempts, but not forever.
const FINGERPRINT_RETENTION_DAYS: i64 = 30;

/// In-memory store with sliding expiration. A coarse lock per map is enough
/// here: critical sections are short and scoring happens outside the lock.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, VerificationSession>>,
    fingerprints: RwLock<HashMap<String, DateTime<Utc>>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        InMemorySessionStore {
            sessions: RwLock::new(HashMap::new()),
            fingerprints: RwLock::new(HashMap::new()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    fn expired(&self, session: &VerificationSession, now: DateTime<Utc>) -> bool {
        now - session.last_seen > self.ttl
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(
        &self,
        claim: IdentityClaim,
        client_ip: String,
        client_user_agent: String,
        now: DateTime<Utc>,
    ) -> VerificationSession {
        let session = VerificationSession {
            session_id: generate_session_id(),
            identity_claim: claim,
            device: None,
            behavior: BehaviorState::default(),
            created_at: now,
            last_seen: now,
            client_ip,
            client_user_agent,
        };

        self.sessions
            .write()
            .insert(session.session_id.clone(), session.clone());
        session
    }

    fn get(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<VerificationSession, VerifyError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or(VerifyError::SessionNotFound)?;

        if now - session.last_seen > self.ttl {
            sessions.remove(session_id);
            return Err(VerifyError::SessionNotFound);
        }

        session.last_seen = now;
        Ok(session.clone())
    }

    fn attach_device(
        &self,
        session_id: &str,
        device: DeviceProfile,
        now: DateTime<Utc>,
    ) -> Result<(), VerifyError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or(VerifyError::SessionNotFound)?;

        if self.expired(session, now) {
            sessions.remove(session_id);
            return Err(VerifyError::SessionNotFound);
        }

        session.last_seen = now;
        if session.device.is_some() {
            // Device is set at most once per session; repeats keep the first
            // registration.
            debug!("duplicate device registration for session {}", session_id);
            return Ok(());
        }
        session.device = Some(device);
        Ok(())
    }

    fn apply_event(
        &self,
        session_id: &str,
        event: &BehaviorEvent,
        now: DateTime<Utc>,
    ) -> Result<(EventOutcome, VerificationSession), VerifyError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or(VerifyError::SessionNotFound)?;

        if now - session.last_seen > self.ttl {
            sessions.remove(session_id);
            return Err(VerifyError::SessionNotFound);
        }

        session.last_seen = now;
        let outcome = behavior::apply_event(&mut session.behavior, event, now);
        Ok((outcome, session.clone()))
    }

    fn delete(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }

    fn first_sighting(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        let mut fingerprints = self.fingerprints.write();
        fingerprints.insert(fingerprint.to_string(), now).is_none()
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let purged = {
            let mut sessions = self.sessions.write();
            let before = sessions.len();
            sessions.retain(|_, session| now - session.last_seen <= self.ttl);
            before - sessions.len()
        };

        let retention = Duration::days(FINGERPRINT_RETENTION_DAYS);
        self.fingerprints
            .write()
            .retain(|_, last_seen| now - *last_seen <= retention);

        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim() -> IdentityClaim {
        IdentityClaim {
            name: "Ravi Kumar".to_string(),
            mobile: "9000000001".to_string(),
        }
    }

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(30)
    }

    #[test]
    fn create_then_get_roundtrips() {
        let store = store();
        let now = Utc::now();
        let session = store.create(claim(), "10.0.0.1".to_string(), "ua".to_string(), now);

        let fetched = store.get(&session.session_id, now).unwrap();
        assert_eq!(fetched.identity_claim, claim());
        assert!(fetched.device.is_none());
        assert_eq!(fetched.client_ip, "10.0.0.1");
    }

    #[test]
    fn unknown_session_is_not_found() {
        let store = store();
        let err = store.get("nope", Utc::now()).unwrap_err();
        assert!(matches!(err, VerifyError::SessionNotFound));
    }

    #[test]
    fn sliding_ttl_expires_idle_sessions() {
        let store = store();
        let t0 = Utc::now();
        let session = store.create(claim(), "ip".to_string(), "ua".to_string(), t0);

        // Touch at +20 minutes keeps the session alive past the original
        // deadline.
        let t1 = t0 + Duration::minutes(20);
        assert!(store.get(&session.session_id, t1).is_ok());

        let t2 = t1 + Duration::minutes(25);
        assert!(store.get(&session.session_id, t2).is_ok());

        // Idle for 31 minutes: gone, and mutations are rejected too.
        let t3 = t2 + Duration::minutes(31);
        assert!(matches!(
            store.get(&session.session_id, t3),
            Err(VerifyError::SessionNotFound)
        ));
        assert!(matches!(
            store.apply_event(&session.session_id, &BehaviorEvent::MouseMovement, t3),
            Err(VerifyError::SessionNotFound)
        ));
    }

    #[test]
    fn device_attaches_at_most_once() {
        let store = store();
        let now = Utc::now();
        let session = store.create(claim(), "ip".to_string(), "ua".to_string(), now);

        let device = DeviceProfile {
            fingerprint: "fp-1".to_string(),
            user_agent: "ua".to_string(),
            platform: "Linux".to_string(),
            screen_resolution: None,
            language: None,
            timezone: None,
            is_emulator: false,
            is_new_device: true,
            vpn_detected: false,
        };
        store
            .attach_device(&session.session_id, device.clone(), now)
            .unwrap();

        let second = DeviceProfile {
            fingerprint: "fp-2".to_string(),
            ..device
        };
        store
            .attach_device(&session.session_id, second, now)
            .unwrap();

        let fetched = store.get(&session.session_id, now).unwrap();
        assert_eq!(fetched.device.unwrap().fingerprint, "fp-1");
    }

    #[test]
    fn events_accumulate_without_lost_updates() {
        let store = store();
        let now = Utc::now();
        let session = store.create(claim(), "ip".to_string(), "ua".to_string(), now);

        for _ in 0..10 {
            store
                .apply_event(&session.session_id, &BehaviorEvent::MouseMovement, now)
                .unwrap();
        }
        let (_, snapshot) = store
            .apply_event(&session.session_id, &BehaviorEvent::TabSwitch, now)
            .unwrap();
        assert_eq!(snapshot.behavior.mouse_movement_count, 10);
        assert_eq!(snapshot.behavior.tab_switch_count, 1);
    }

    #[test]
    fn honeypot_event_reports_terminal_outcome() {
        let store = store();
        let now = Utc::now();
        let session = store.create(claim(), "ip".to_string(), "ua".to_string(), now);

        let (outcome, snapshot) = store
            .apply_event(
                &session.session_id,
                &BehaviorEvent::HoneypotClick {
                    element: "fake-admin".to_string(),
                },
                now,
            )
            .unwrap();
        assert_eq!(outcome, EventOutcome::HoneypotTriggered);
        assert!(snapshot.behavior.honeypot_clicked);
    }

    #[test]
    fn delete_is_idempotent() {
        let store = store();
        let now = Utc::now();
        let session = store.create(claim(), "ip".to_string(), "ua".to_string(), now);
        store.delete(&session.session_id);
        store.delete(&session.session_id);
        assert!(store.get(&session.session_id, now).is_err());
    }

    #[test]
    fn fingerprint_registry_marks_first_sighting_only() {
        let store = store();
        let now = Utc::now();
        assert!(store.first_sighting("abc", now));
        assert!(!store.first_sighting("abc", now));
        assert!(store.first_sighting("def", now));
    }

    #[test]
    fn sweep_evicts_fingerprints_past_retention() {
        let store = store();
        let t0 = Utc::now();
        assert!(store.first_sighting("abc", t0));

        // A sweep inside the retention horizon keeps the fingerprint known.
        store.purge_expired(t0 + Duration::days(29));
        assert!(!store.first_sighting("abc", t0 + Duration::days(29)));

        // Past the horizon (measured from the refreshed sighting) the device
        // reads as new again.
        store.purge_expired(t0 + Duration::days(60));
        assert!(store.first_sighting("abc", t0 + Duration::days(60)));
    }

    #[test]
    fn purge_drops_only_expired_sessions() {
        let store = store();
        let t0 = Utc::now();
        let stale = store.create(claim(), "ip".to_string(), "ua".to_string(), t0);
        let t1 = t0 + Duration::minutes(20);
        let fresh = store.create(claim(), "ip".to_string(), "ua".to_string(), t1);

        let t2 = t0 + Duration::minutes(40);
        assert_eq!(store.purge_expired(t2), 1);
        assert!(store.get(&stale.session_id, t2).is_err());
        assert!(store.get(&fresh.session_id, t2).is_ok());
    }
}
