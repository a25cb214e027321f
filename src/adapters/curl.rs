//! `CurlPerform` (spec.md §4.2, §6): issues one HTTP GET through the active
//! `CurlMulti`/`CurlEasy` context and returns the response body.
//!
//! Each tick drives the transfer via `Multi::perform` and checks
//! `Multi::messages` for completion rather than blocking on
//! `Easy::perform`, so a slow transfer is spread across poll ticks instead
//! of stalling the poll loop (spec.md §3 "poll never blocks", §5's
//! blocking policy).

use tracing::error;

use crate::context::{Context, CurlTick};
use crate::result::PollResult;

pub fn perform(ctx: &mut Context, url: &str) -> PollResult {
    if !ctx.has_curl_in_flight() {
        if let Err(e) = ctx.curl_start_perform(url) {
            error!("{e}");
            return PollResult::error();
        }
    }

    match ctx.curl_perform_tick() {
        Ok(CurlTick::Pending) => PollResult::pending(),
        Ok(CurlTick::Done(bytes)) => match String::from_utf8(bytes) {
            Ok(text) => PollResult::done_string(text),
            Err(e) => {
                error!("response body was not valid UTF-8: {e}");
                PollResult::error()
            }
        },
        Ok(CurlTick::Failed(msg)) => {
            error!("curl perform failed: {msg}");
            PollResult::error()
        }
        Err(e) => {
            error!("{e}");
            PollResult::error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perform_without_a_curl_easy_context_is_an_error_result() {
        let mut ctx = Context::new();
        assert!(perform(&mut ctx, "https://example.invalid").is_error());
    }
}
