//! The bounded value stack (spec.md §3, §4.4)
//!
//! Backs every arithmetic and print/drop/clear command the interpreter
//! exposes. Fixed capacity, same as the task pool, so a runaway script
//! fails with a recoverable error instead of growing without bound.

use crate::error::{Error, Kind};

#[derive(Debug, Clone, PartialEq)]
pub enum StackValue {
    Int(i32),
    String(String),
}

impl std::fmt::Display for StackValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackValue::Int(n) => write!(f, "{n}"),
            StackValue::String(s) => write!(f, "{s}"),
        }
    }
}

pub struct Stack {
    values: Vec<StackValue>,
    capacity: usize,
}

impl Stack {
    pub fn new(capacity: usize) -> Self {
        Self { values: Vec::with_capacity(capacity), capacity }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: StackValue) -> Result<(), Error> {
        if self.values.len() == self.capacity {
            return Err(Error::new(Kind::User, "stack is full"));
        }
        self.values.push(value);
        Ok(())
    }

    pub fn push_int(&mut self, n: i32) -> Result<(), Error> {
        self.push(StackValue::Int(n))
    }

    pub fn push_string(&mut self, s: impl Into<String>) -> Result<(), Error> {
        self.push(StackValue::String(s.into()))
    }

    pub fn drop_top(&mut self) -> Result<StackValue, Error> {
        self.values.pop().ok_or_else(|| Error::new(Kind::User, "stack is empty"))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn print(&self) {
        for v in &self.values {
            println!("{v}");
        }
    }

    /// Pops the top two values for a binary arithmetic command. Both must
    /// be `Int`; anything else is a recoverable user error, not a panic,
    /// since it originates from REPL input.
    pub fn pop_two_ints(&mut self) -> Result<(i32, i32), Error> {
        let b = self.drop_top()?;
        let a = match self.drop_top() {
            Ok(a) => a,
            Err(e) => {
                // restore b so a failed op doesn't silently shrink the stack by one
                let _ = self.push(b);
                return Err(e);
            }
        };
        match (&a, &b) {
            (StackValue::Int(x), StackValue::Int(y)) => Ok((*x, *y)),
            _ => {
                let _ = self.push(a);
                let _ = self.push(b);
                Err(Error::new(Kind::User, "arithmetic commands require two ints on the stack"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trips() {
        let mut s = Stack::new(4);
        s.push_int(1).unwrap();
        s.push_int(2).unwrap();
        let (a, b) = s.pop_two_ints().unwrap();
        assert_eq!((a, b), (1, 2));
        assert!(s.is_empty());
    }

    #[test]
    fn push_past_capacity_is_a_user_error() {
        let mut s = Stack::new(1);
        s.push_int(1).unwrap();
        let err = s.push_int(2).unwrap_err();
        assert_eq!(err.kind(), Kind::User);
    }

    #[test]
    fn drop_on_empty_stack_is_a_user_error() {
        let mut s = Stack::new(4);
        assert_eq!(s.drop_top().unwrap_err().kind(), Kind::User);
    }

    #[test]
    fn arithmetic_on_a_string_is_a_user_error_and_preserves_the_stack() {
        let mut s = Stack::new(4);
        s.push_int(1).unwrap();
        s.push_string("x").unwrap();
        let err = s.pop_two_ints().unwrap_err();
        assert_eq!(err.kind(), Kind::User);
        assert_eq!(s.len(), 2);
    }
}
