//! The context stack (spec.md §3, §4.3)
//!
//! A mutable record of the external resources currently in scope. Context
//! nodes (see [`crate::task::Task::Context`]) acquire exactly one resource on
//! first entry and release it on their body's terminal poll; everything else
//! in the tree only ever reads or is handed a fresh copy (`Task::Parallel`
//! seeds each sibling's slot from the parent on first poll — spec.md §4.2,
//! §9 "Parallel sub-contexts").

use std::os::fd::OwnedFd;
use std::sync::{Arc, Mutex};

use bumpalo::Bump;
use curl::easy::Easy;
use curl::multi::{EasyHandle, Multi};

use crate::error::{Error, Kind};

/// Which scoped resource kind a [`Task::Context`](crate::task::Task::Context) node manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Fifo,
    Arena,
    CurlGlobal,
    CurlMulti,
    CurlEasy,
}

/// An easy handle handed off to the active `Multi` session, plus the buffer
/// its write callback fills. Lives in the `Context` across poll ticks so
/// `CurlPerform` can drive it to completion without blocking any one tick
/// (spec.md §3 "poll never blocks", §4.3's `CurlMulti`/`CurlEasy` nesting).
struct InFlightTransfer {
    handle: EasyHandle,
    body: Arc<Mutex<Vec<u8>>>,
}

/// Outcome of one non-blocking drive of an in-flight `CurlPerform` transfer.
pub enum CurlTick {
    Pending,
    Done(Vec<u8>),
    Failed(String),
}

/// The set of resources visible to the poll currently in progress.
///
/// Invariant (spec.md §3): a resource handle is valid iff its matching flag
/// is set. `CurlEasy`/`CurlMulti` require `CurlGlobal`; `CurlEasy` also
/// requires `CurlMulti` (spec.md §4.4: "a `CurlMulti` context wrapping a
/// `CurlEasy` context"); `CurlPerform` requires `CurlEasy` (and `Arena` for
/// response storage); `FifoRepl` requires `Fifo`. These are asserted, not
/// silently tolerated, because a violation is a programmer bug (spec.md §7
/// `ContractViolation`), not a recoverable runtime condition.
#[derive(Default)]
pub struct Context {
    fifo_fd: Option<OwnedFd>,
    arena: Option<Bump>,
    curl_global: bool,
    curl_multi: Option<Multi>,
    curl_easy: Option<Easy>,
    curl_in_flight: Option<InFlightTransfer>,
}

impl Clone for Context {
    /// Parallel seeds every sibling's context slot from a copy of the
    /// parent's (spec.md §4.2) so that resource acquisitions made by one
    /// sibling never leak into another. Handles themselves aren't
    /// `Clone`-able (they're live OS/library resources) so a cloned
    /// `Context` always starts with no resources of its own and only
    /// copies which flags the parent already had set — mirroring the
    /// original's `*sub_ctx = *ctx`, a shallow struct copy of flags plus
    /// handles that the child then either reads through or re-acquires.
    fn clone(&self) -> Self {
        Self {
            fifo_fd: self.fifo_fd.as_ref().and_then(|fd| fd.try_clone().ok()),
            arena: None,
            curl_global: self.curl_global,
            curl_multi: None,
            curl_easy: None,
            curl_in_flight: None,
        }
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fifo_fd.is_none()
            && self.arena.is_none()
            && !self.curl_global
            && self.curl_multi.is_none()
            && self.curl_easy.is_none()
            && self.curl_in_flight.is_none()
    }

    pub fn has_fifo(&self) -> bool {
        self.fifo_fd.is_some()
    }

    pub fn fifo_fd(&self) -> Result<&OwnedFd, Error> {
        self.fifo_fd.as_ref().ok_or_else(|| {
            Error::new(Kind::Contract, "FifoRepl polled without an active Fifo context")
        })
    }

    pub fn set_fifo_fd(&mut self, fd: OwnedFd) {
        self.fifo_fd = Some(fd);
    }

    pub fn clear_fifo(&mut self) -> Option<OwnedFd> {
        self.fifo_fd.take()
    }

    pub fn has_arena(&self) -> bool {
        self.arena.is_some()
    }

    pub fn arena(&self) -> Result<&Bump, Error> {
        self.arena.as_ref().ok_or_else(|| {
            Error::new(Kind::Contract, "task polled without an active Arena context")
        })
    }

    pub fn set_arena(&mut self, arena: Bump) {
        self.arena = Some(arena);
    }

    pub fn clear_arena(&mut self) -> Option<Bump> {
        self.arena.take()
    }

    pub fn has_curl_global(&self) -> bool {
        self.curl_global
    }

    pub fn set_curl_global(&mut self, on: bool) {
        self.curl_global = on;
    }

    pub fn has_curl_multi(&self) -> bool {
        self.curl_multi.is_some()
    }

    pub fn set_curl_multi(&mut self, multi: Multi) {
        self.curl_multi = Some(multi);
    }

    /// Drops the multi session. Any easy handle still added to it detaches
    /// automatically (`EasyHandle`'s `Drop` removes it from the multi), so
    /// dropping `curl_in_flight` first isn't required for soundness, but
    /// teardown always runs it anyway since `CurlMulti` only releases after
    /// its body (and the `CurlPerform` within it) has gone terminal.
    pub fn clear_curl_multi(&mut self) {
        self.curl_in_flight = None;
        self.curl_multi = None;
    }

    pub fn has_curl_easy(&self) -> bool {
        self.curl_easy.is_some()
    }

    pub fn set_curl_easy(&mut self, easy: Easy) {
        self.curl_easy = Some(easy);
    }

    pub fn clear_curl_easy(&mut self) -> Option<Easy> {
        self.curl_easy.take()
    }

    pub fn has_curl_in_flight(&self) -> bool {
        self.curl_in_flight.is_some()
    }

    /// Configures `easy` for `url`, hands it to the active `Multi` session,
    /// and stashes the resulting handle plus its write buffer so later
    /// `curl_perform_tick` calls can drive it without blocking (spec.md §3,
    /// §4.3's `CurlMulti`/`CurlEasy` nesting).
    pub fn curl_start_perform(&mut self, url: &str) -> Result<(), Error> {
        let mut easy = self.curl_easy.take().ok_or_else(|| {
            Error::new(Kind::Contract, "CurlPerform polled without an active CurlEasy context")
        })?;

        easy.url(url)?;

        let body = Arc::new(Mutex::new(Vec::new()));
        let write_buf = Arc::clone(&body);
        easy.write_function(move |chunk| {
            write_buf.lock().expect("curl write callback mutex poisoned").extend_from_slice(chunk);
            Ok(chunk.len())
        })?;

        let multi = self.curl_multi.as_ref().ok_or_else(|| {
            Error::new(Kind::Contract, "CurlEasy polled without an active CurlMulti context")
        })?;
        let handle = multi.add(easy)?;

        self.curl_in_flight = Some(InFlightTransfer { handle, body });
        Ok(())
    }

    /// Non-blocking drive of the in-flight transfer started by
    /// `curl_start_perform`. `Multi::perform` only reads/writes whatever is
    /// already available and returns immediately (spec.md §3 "poll never
    /// blocks"); completion is detected via `Multi::messages`, not by
    /// waiting on sockets.
    pub fn curl_perform_tick(&mut self) -> Result<CurlTick, Error> {
        let multi = self.curl_multi.as_ref().ok_or_else(|| {
            Error::new(Kind::Contract, "CurlPerform polled without an active CurlMulti context")
        })?;
        multi.perform()?;

        let body = match &self.curl_in_flight {
            Some(transfer) => Arc::clone(&transfer.body),
            None => {
                return Err(Error::new(Kind::Contract, "curl_perform_tick driven without an in-flight transfer"));
            }
        };

        let mut outcome = None;
        if let Some(transfer) = &self.curl_in_flight {
            multi.messages(|msg| {
                if msg.is_for(&transfer.handle) {
                    outcome = Some(msg.result_for(&transfer.handle));
                }
            });
        }

        match outcome {
            Some(Some(result)) => {
                self.curl_in_flight = None;
                match result {
                    Ok(()) => Ok(CurlTick::Done(body.lock().expect("curl write callback mutex poisoned").clone())),
                    Err(e) => Ok(CurlTick::Failed(e.to_string())),
                }
            }
            _ => Ok(CurlTick::Pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_empty() {
        assert!(Context::new().is_empty());
    }

    #[test]
    fn clone_carries_flags_but_not_handles() {
        let mut ctx = Context::new();
        ctx.set_curl_global(true);
        ctx.set_fifo_fd(std::fs::File::open("/dev/null").unwrap().into());
        ctx.set_arena(Bump::new());
        ctx.set_curl_multi(Multi::new());

        let child = ctx.clone();
        assert!(child.has_curl_global());
        assert!(child.has_fifo());
        assert!(!child.has_arena(), "arena handle must not leak into a sibling's copy");
        assert!(!child.has_curl_multi(), "multi session must not leak into a sibling's copy");
    }

    #[test]
    fn missing_resource_is_a_contract_violation() {
        let ctx = Context::new();
        let err = ctx.fifo_fd().unwrap_err();
        assert_eq!(err.kind(), Kind::Contract);
    }

    #[test]
    fn curl_start_perform_without_a_curl_easy_context_is_a_contract_violation() {
        let mut ctx = Context::new();
        ctx.set_curl_multi(Multi::new());
        let err = ctx.curl_start_perform("https://example.invalid").unwrap_err();
        assert_eq!(err.kind(), Kind::Contract);
    }

    #[test]
    fn curl_start_perform_without_a_curl_multi_context_is_a_contract_violation() {
        let mut ctx = Context::new();
        ctx.set_curl_easy(Easy::new());
        let err = ctx.curl_start_perform("https://example.invalid").unwrap_err();
        assert_eq!(err.kind(), Kind::Contract);
    }
}
