use rand::Rng;

use crate::time_utils::current_unix_timestamp_ms;

const SESSION_ID_PREFIX: &str = "qa_test";
const SESSION_ID_SUFFIX_LEN: usize = 9;

/// Generates a collision-resistant session identifier scoping one test run.
///
/// Format: `qa_test_{unix_millis}_{base36 suffix}`. The millisecond prefix
/// keeps ids sortable in storage dashboards; the random suffix keeps parallel
/// sessions launched in the same millisecond distinct.
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SESSION_ID_SUFFIX_LEN)
        .map(|_| {
            let digit = rng.random_range(0..36u32);
            char::from_digit(digit, 36).unwrap_or('0')
        })
        .collect();
    format!(
        "{SESSION_ID_PREFIX}_{}_{suffix}",
        current_unix_timestamp_ms()
    )
}

/// Returns true when `candidate` looks like a harness-generated session id.
/// Cleanup tooling uses this to refuse deleting rows it does not own.
pub fn is_harness_session_id(candidate: &str) -> bool {
    candidate.starts_with("qa_test_")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{generate_session_id, is_harness_session_id};

    #[test]
    fn unit_generated_session_ids_carry_prefix_and_suffix() {
        let id = generate_session_id();
        assert!(is_harness_session_id(&id));
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[3].len(), 9);
        assert!(parts[2].parse::<u64>().is_ok());
    }

    #[test]
    fn unit_generated_session_ids_do_not_collide_in_burst() {
        let ids: HashSet<String> = (0..256).map(|_| generate_session_id()).collect();
        assert_eq!(ids.len(), 256);
    }

    #[test]
    fn unit_foreign_session_ids_are_rejected() {
        assert!(!is_harness_session_id("user_session_123"));
        assert!(!is_harness_session_id(""));
    }
}
