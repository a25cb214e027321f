//! `ParseJsonValue` (spec.md §4.2, §6): parses a byte string into a JSON
//! value. Treated as a pure external adapter, same as the original's call
//! into its own hand-rolled parser — here that's `serde_json` instead.

use crate::result::PollResult;

pub fn parse(bytes: &str) -> PollResult {
    match serde_json::from_str(bytes) {
        Ok(value) => PollResult::done_json(value),
        Err(_) => PollResult::error(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_json() {
        assert!(parse(r#"{"a":1}"#).is_done());
    }

    #[test]
    fn malformed_json_is_an_error_result_not_a_panic() {
        assert!(parse("{not json").is_error());
    }
}
