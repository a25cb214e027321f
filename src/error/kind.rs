//! Represents the error kinds enumerated in spec.md §7

use std::fmt::Display;

/// Classifies what a runtime [`super::Error`] propagated from
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Kind {
    /// Pipe open/close/read failure
    Io,
    /// The task pool has no free slots
    PoolExhausted,
    /// Failed to parse a command token or a JSON payload
    Parse,
    /// The HTTP library (curl) reported an init/perform failure
    Library,
    /// A programmer-level invariant was violated (e.g. `CurlEasy` without `CurlGlobal`)
    Contract,
    /// A user command was malformed or used at the wrong arity
    User,
}

impl Display for Kind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Io => write!(f, "I/O error"),
            Kind::PoolExhausted => write!(f, "task pool exhausted"),
            Kind::Parse => write!(f, "parse error"),
            Kind::Library => write!(f, "library error"),
            Kind::Contract => write!(f, "contract violation"),
            Kind::User => write!(f, "user error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_a_human_readable_label() {
        assert_eq!(Kind::Parse.to_string(), "parse error");
        assert_eq!(Kind::Contract.to_string(), "contract violation");
    }
}
