//! Mutable state the REPL needs beyond the task tree itself (spec.md §3's
//! `Stack`, plus the handle the `tg-getMe`/`tg-getUpdates`/`request`
//! commands need to append a sibling onto the global runner).
//!
//! Kept separate from [`crate::context::Context`]: `Context` is scoped
//! resource handles that come and go with tree position, while `Session` is
//! flat runtime state that every poll tick sees the same copy of.

use crate::pool::TaskRef;
use crate::stack::Stack;

pub struct Session {
    pub stack: Stack,
    /// The top-level `Parallel` runner that REPL commands append new
    /// sibling tasks onto (spec.md §4.4's `tg-getMe`/`tg-getUpdates`).
    pub runner: TaskRef,
    pub base_url: String,
    pub max_par_count: usize,
    /// Fifo read-buffer size in bytes (spec.md §6, default 64).
    pub read_buffer_capacity: usize,
}

impl Session {
    pub fn new(
        stack_capacity: usize,
        runner: TaskRef,
        base_url: String,
        max_par_count: usize,
        read_buffer_capacity: usize,
    ) -> Self {
        Self { stack: Stack::new(stack_capacity), runner, base_url, max_par_count, read_buffer_capacity }
    }
}
