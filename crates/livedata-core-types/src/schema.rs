//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_SESSION_ID: &str = "session_id";
pub const FIELD_TRACE_ID: &str = "trace_id";
pub const FIELD_REASON: &str = "reason";

// Collection sizes
pub const FIELD_HOUSES_LEN: &str = "houses_len";
pub const FIELD_JEDIS_LEN: &str = "jedis_len";
pub const FIELD_LISTENERS: &str = "listeners";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Reasons a session did not deliver after a notification
pub const REASON_NO_OP: &str = "no_op_transition";
pub const REASON_SAME_RESULT: &str = "same_result";
pub const REASON_COALESCED: &str = "coalesced";
pub const REASON_CLOSED: &str = "closed";
pub const REASON_FATAL: &str = "fatal_error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_SESSION_ID.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_reasons_are_distinct() {
        let reasons = [
            REASON_NO_OP,
            REASON_SAME_RESULT,
            REASON_COALESCED,
            REASON_CLOSED,
            REASON_FATAL,
        ];
        for (i, a) in reasons.iter().enumerate() {
            for b in &reasons[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
