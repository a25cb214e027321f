//! `Result` payloads for a single [`crate::poll::poll`] tick (spec.md §3)

use serde_json::Value as JsonValue;

/// Terminal/non-terminal state of a polled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Done,
    Pending,
    Error,
}

/// The payload a `Done` [`PollResult`] carries. `Pending`/`Error` results
/// always carry `Void` (spec.md §3).
#[derive(Debug, Clone)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i32),
    StringView(String),
    JsonValue(JsonValue),
}

/// `(state, value)` as specified in spec.md §3.
#[derive(Debug, Clone)]
pub struct PollResult {
    pub state: PollState,
    pub value: Value,
}

impl PollResult {
    pub fn pending() -> Self {
        Self { state: PollState::Pending, value: Value::Void }
    }

    pub fn error() -> Self {
        Self { state: PollState::Error, value: Value::Void }
    }

    pub fn done_void() -> Self {
        Self { state: PollState::Done, value: Value::Void }
    }

    pub fn done_bool(b: bool) -> Self {
        Self { state: PollState::Done, value: Value::Bool(b) }
    }

    pub fn done_int(x: i32) -> Self {
        Self { state: PollState::Done, value: Value::Int(x) }
    }

    pub fn done_string(s: impl Into<String>) -> Self {
        Self { state: PollState::Done, value: Value::StringView(s.into()) }
    }

    pub fn done_json(v: JsonValue) -> Self {
        Self { state: PollState::Done, value: Value::JsonValue(v) }
    }

    pub fn is_done(&self) -> bool {
        self.state == PollState::Done
    }

    pub fn is_pending(&self) -> bool {
        self.state == PollState::Pending
    }

    pub fn is_error(&self) -> bool {
        self.state == PollState::Error
    }

    /// Unwraps a `Done(Bool(_))` result; panics otherwise.
    ///
    /// Used at `Iterate`'s condition boundary, where spec.md §4.2
    /// asserts `r.kind == RESULT_KIND_BOOL` on the original.
    pub fn expect_bool(&self) -> bool {
        match (&self.state, &self.value) {
            (PollState::Done, Value::Bool(b)) => *b,
            _ => panic!("expected a Done(Bool) result, got {self:?}"),
        }
    }

    pub fn expect_string(self) -> String {
        match (self.state, self.value) {
            (PollState::Done, Value::StringView(s)) => s,
            (state, value) => panic!("expected a Done(StringView) result, got ({state:?}, {value:?})"),
        }
    }

    pub fn expect_json(self) -> JsonValue {
        match (self.state, self.value) {
            (PollState::Done, Value::JsonValue(v)) => v,
            (state, value) => panic!("expected a Done(JsonValue) result, got ({state:?}, {value:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_int_round_trips() {
        let r = PollResult::done_int(42);
        assert!(r.is_done());
        match r.value {
            Value::Int(x) => assert_eq!(x, 42),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    #[should_panic]
    fn expect_bool_panics_on_pending() {
        PollResult::pending().expect_bool();
    }
}
