//! Exponential backoff over the persistent `[internal]` state.
//!
//! After a connectivity failure at `backoff_at` with `retries` consecutive
//! failures, the next attempt is allowed at
//! `backoff_at + 15 * 2^min(retries, 6)` seconds. The state itself lives in
//! [`crate::config::StateFile`]; this module only interprets it.

use chrono::{DateTime, Duration, Utc};

use crate::config::State;

/// Base wait in seconds after the first failure.
pub const BACKOFF_BASE_SECS: i64 = 15;

/// Exponent cap: waits stop growing at `15 * 2^6` = 960 seconds.
pub const BACKOFF_MAX_EXPONENT: u32 = 6;

/// Earliest moment a new attempt is allowed, if backoff is active.
pub fn next_allowed(state: &State) -> Option<DateTime<Utc>> {
    let at = state.backoff_at?;

    let exponent = state.backoff_retries.min(BACKOFF_MAX_EXPONENT);
    let wait = Duration::seconds(BACKOFF_BASE_SECS * 2i64.pow(exponent));

    Some(at.with_timezone(&Utc) + wait)
}

/// Whether sending at `now` must short-circuit with a backoff error.
pub fn in_backoff(state: &State, now: DateTime<Utc>) -> bool {
    match next_allowed(state) {
        Some(next) => now < next,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn state(retries: u32, at: &str) -> State {
        State {
            backoff_at: Some(DateTime::parse_from_rfc3339(at).unwrap()),
            backoff_retries: retries,
            last_sent_at: None,
        }
    }

    #[test]
    fn test_no_backoff_without_failure() {
        let now = Utc::now();
        assert!(!in_backoff(&State::default(), now));
    }

    #[test]
    fn test_first_failure_waits_30_seconds() {
        // retries is 1 after the first failure, so the wait is 15 * 2^1.
        let s = state(1, "2024-01-01T00:00:00Z");
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert!(in_backoff(&s, at + Duration::seconds(29)));
        assert!(!in_backoff(&s, at + Duration::seconds(30)));
    }

    #[test]
    fn test_exponent_is_capped() {
        let s = state(50, "2024-01-01T00:00:00Z");
        let next = next_allowed(&s).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(next - at, Duration::seconds(BACKOFF_BASE_SECS * 64));
    }

    #[test]
    fn test_backoff_monotonic_in_retries() {
        let at = "2024-01-01T00:00:00Z";
        let mut previous = next_allowed(&state(0, at)).unwrap();

        for retries in 1..=BACKOFF_MAX_EXPONENT {
            let next = next_allowed(&state(retries, at)).unwrap();
            assert!(next > previous);
            previous = next;
        }
    }
}
