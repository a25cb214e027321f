//! Represents a runtime error

use std::convert::Infallible;
use std::fmt;
use std::error::Error as StdError;
use std::io::Error as IoError;

pub use kind::Kind;

pub mod kind;

type BoxError = Box<
    dyn StdError
    + Send
    + Sync
>;

/// Represents an error surfaced by a [`crate::poll::poll`] tick
#[derive(Debug)]
pub struct Error {
    pub(crate) kind: Kind,
    inner: BoxError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Self {
            inner: err.into(),
            kind: Kind::Parse,
        }
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Error {
        Self {
            inner: err.into(),
            kind: Kind::Io,
        }
    }
}

impl From<curl::Error> for Error {
    fn from(err: curl::Error) -> Error {
        Self {
            inner: err.into(),
            kind: Kind::Library,
        }
    }
}

impl From<curl::MultiError> for Error {
    fn from(err: curl::MultiError) -> Error {
        Self {
            inner: err.into(),
            kind: Kind::Library,
        }
    }
}

impl From<nix::Error> for Error {
    fn from(err: nix::Error) -> Error {
        Self {
            inner: err.into(),
            kind: Kind::Io,
        }
    }
}

impl From<Infallible> for Error {
    fn from(infallible: Infallible) -> Error {
        match infallible {}
    }
}

impl Error {
    /// Creates a new [`Error`] of the given [`Kind`]
    #[inline]
    pub fn new(kind: Kind, err: impl Into<BoxError>) -> Error {
        Self { inner: err.into(), kind }
    }

    /// The [`Kind`] this error was raised with
    #[inline]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// True for [`Kind::Contract`] and [`Kind::PoolExhausted`], the two kinds
    /// spec.md §7 marks as fatal for the whole process rather than recoverable
    /// by the enclosing task.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, Kind::Contract | Kind::PoolExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_kind_through_display() {
        let err = Error::new(Kind::User, "bad token");
        assert_eq!(err.kind(), Kind::User);
        assert_eq!(err.to_string(), "bad token");
    }

    #[test]
    fn contract_and_pool_exhausted_are_fatal() {
        assert!(Error::new(Kind::Contract, "x").is_fatal());
        assert!(Error::new(Kind::PoolExhausted, "x").is_fatal());
        assert!(!Error::new(Kind::Io, "x").is_fatal());
    }
}
