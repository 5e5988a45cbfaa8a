use crate::errors::VerifyError;
use crate::models::{BehaviorState, PageVisit};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Typed behavioral events applied to a session. Wire format is an object
/// with a `type` tag plus type-specific fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BehaviorEvent {
    LoginSpeed { duration_ms: u64 },
    PageView { page: String },
    HoneypotClick { element: String },
    MouseMovement,
    CopyPaste,
    LoginAttempt,
    TabSwitch,
    DevToolsDetected,
    AutomationDetected,
    ScrollBehavior,
}

const KNOWN_EVENT_TYPES: &[&str] = &[
    "login_speed",
    "page_view",
    "honeypot_click",
    "mouse_movement",
    "copy_paste",
    "login_attempt",
    "tab_switch",
    "dev_tools_detected",
    "automation_detected",
    "scroll_behavior",
];

impl BehaviorEvent {
    /// Parse an event from a request body. An unrecognized `type` tag is
    /// `UnknownEventType`; a recognized tag with a malformed payload is
    /// `InvalidInput`.
    pub fn from_value(value: &Value) -> Result<Self, VerifyError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| VerifyError::InvalidInput("missing event type".to_string()))?;

        if !KNOWN_EVENT_TYPES.contains(&kind) {
            return Err(VerifyError::UnknownEventType(kind.to_string()));
        }

        serde_json::from_value(value.clone())
            .map_err(|e| VerifyError::InvalidInput(format!("malformed {} event: {}", kind, e)))
    }
}

/// Outcome of applying a single event. Only a honeypot click terminates the
/// flow; everything else just accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Tracked,
    HoneypotTriggered,
}

/// Mutate the behavioral accumulator with one event. Callers hold the
/// session lock, so the read-modify-write is atomic per session.
pub fn apply_event(
    behavior: &mut BehaviorState,
    event: &BehaviorEvent,
    now: DateTime<Utc>,
) -> EventOutcome {
    match event {
        BehaviorEvent::LoginSpeed { duration_ms } => {
            behavior.login_time_ms = Some(*duration_ms);
        }
        BehaviorEvent::PageView { page } => {
            behavior.pages_visited.push(PageVisit {
                page: page.clone(),
                timestamp: now,
            });
            recompute_page_rate(behavior, now);
        }
        BehaviorEvent::HoneypotClick { element } => {
            behavior.honeypot_clicked = true;
            behavior.honeypot_element = Some(element.clone());
            return EventOutcome::HoneypotTriggered;
        }
        BehaviorEvent::MouseMovement => {
            behavior.mouse_movement_count += 1;
        }
        BehaviorEvent::CopyPaste => {
            behavior.copied_pasted = true;
        }
        BehaviorEvent::LoginAttempt => {
            behavior.login_attempt_count += 1;
        }
        BehaviorEvent::TabSwitch => {
            behavior.tab_switch_count += 1;
        }
        BehaviorEvent::DevToolsDetected => {
            behavior.dev_tools_opened = true;
        }
        BehaviorEvent::AutomationDetected => {
            behavior.automation_detected = true;
        }
        BehaviorEvent::ScrollBehavior => {
            behavior.scroll_count += 1;
        }
    }

    EventOutcome::Tracked
}

/// Pages per minute, measured from the first recorded page view. Only
/// meaningful once at least two pages exist.
fn recompute_page_rate(behavior: &mut BehaviorState, now: DateTime<Utc>) {
    if behavior.pages_visited.len() < 2 {
        return;
    }

    let first = behavior.pages_visited[0].timestamp;
    let elapsed_ms = (now - first).num_milliseconds().max(0) as f64;
    let minutes = elapsed_ms / 60_000.0;
    let count = behavior.pages_visited.len() as f64;

    behavior.pages_visited_per_minute = if minutes > 0.0 { count / minutes } else { count };
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn at(base: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        base + Duration::seconds(secs)
    }

    #[test]
    fn parses_typed_events() {
        let event =
            BehaviorEvent::from_value(&json!({"type": "login_speed", "duration_ms": 850}))
                .unwrap();
        assert!(matches!(event, BehaviorEvent::LoginSpeed { duration_ms: 850 }));

        let event = BehaviorEvent::from_value(
            &json!({"type": "mouse_movement", "session_id": "abc"}),
        )
        .unwrap();
        assert!(matches!(event, BehaviorEvent::MouseMovement));
    }

    #[test]
    fn unknown_type_is_rejected_without_mutation() {
        let err = BehaviorEvent::from_value(&json!({"type": "teleport"})).unwrap_err();
        assert!(matches!(err, VerifyError::UnknownEventType(t) if t == "teleport"));
    }

    #[test]
    fn known_type_with_bad_payload_is_invalid_input() {
        let err = BehaviorEvent::from_value(&json!({"type": "login_speed"})).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidInput(_)));
    }

    #[test]
    fn missing_type_is_invalid_input() {
        let err = BehaviorEvent::from_value(&json!({"session_id": "abc"})).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidInput(_)));
    }

    #[test]
    fn counters_and_flags_accumulate() {
        let mut behavior = BehaviorState::default();
        let now = Utc::now();

        apply_event(&mut behavior, &BehaviorEvent::MouseMovement, now);
        apply_event(&mut behavior, &BehaviorEvent::MouseMovement, now);
        apply_event(&mut behavior, &BehaviorEvent::TabSwitch, now);
        apply_event(&mut behavior, &BehaviorEvent::CopyPaste, now);
        apply_event(&mut behavior, &BehaviorEvent::DevToolsDetected, now);
        apply_event(&mut behavior, &BehaviorEvent::ScrollBehavior, now);
        apply_event(
            &mut behavior,
            &BehaviorEvent::LoginSpeed { duration_ms: 4200 },
            now,
        );

        assert_eq!(behavior.mouse_movement_count, 2);
        assert_eq!(behavior.tab_switch_count, 1);
        assert!(behavior.copied_pasted);
        assert!(behavior.dev_tools_opened);
        assert_eq!(behavior.scroll_count, 1);
        assert_eq!(behavior.login_time_ms, Some(4200));
    }

    #[test]
    fn page_rate_needs_two_pages() {
        let mut behavior = BehaviorState::default();
        let base = Utc::now();

        apply_event(
            &mut behavior,
            &BehaviorEvent::PageView {
                page: "home".to_string(),
            },
            base,
        );
        assert_eq!(behavior.pages_visited_per_minute, 0.0);

        apply_event(
            &mut behavior,
            &BehaviorEvent::PageView {
                page: "wallet".to_string(),
            },
            at(base, 30),
        );
        // 2 pages over half a minute
        assert!((behavior.pages_visited_per_minute - 4.0).abs() < 1e-9);

        apply_event(
            &mut behavior,
            &BehaviorEvent::PageView {
                page: "settings".to_string(),
            },
            at(base, 60),
        );
        assert!((behavior.pages_visited_per_minute - 3.0).abs() < 1e-9);
    }

    #[test]
    fn honeypot_click_is_terminal_and_monotonic() {
        let mut behavior = BehaviorState::default();
        let now = Utc::now();

        let outcome = apply_event(
            &mut behavior,
            &BehaviorEvent::HoneypotClick {
                element: "admin-trap".to_string(),
            },
            now,
        );
        assert_eq!(outcome, EventOutcome::HoneypotTriggered);
        assert!(behavior.honeypot_clicked);
        assert_eq!(behavior.honeypot_element.as_deref(), Some("admin-trap"));

        // Later events never clear the flag.
        apply_event(&mut behavior, &BehaviorEvent::MouseMovement, now);
        assert!(behavior.honeypot_clicked);
    }
}
