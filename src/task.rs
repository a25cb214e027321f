//! The task tree (spec.md §3, §4.2)
//!
//! A discriminated union of the combinators the runtime is built from.
//! Tasks never own their children directly; they hold [`TaskRef`]s into
//! the shared [`Pool`](crate::pool::Pool), so the tree can be rewired
//! in-place (e.g. `Parallel::append`, spec.md §5's "in-place append during
//! a poll tick") without any of the aliasing or lifetime trouble a tree of
//! `Box<Task>` would bring.
//!
//! spec.md §9 asks for `then_fn`/`build_body_fn`/`build_condition_fn` — C
//! function pointers closing over task state — to become either "a small
//! fixed enum of continuations" or "a trait/interface with a `build` method".
//! This port takes the closure route: a boxed `FnOnce` is already exactly
//! that trait with one method, and Rust's ownership rules remove the
//! captured-state hazard the original note is warning about.

use std::time::Instant;

use crate::context::ContextKind;
use crate::error::Error;
use crate::pool::{Pool, TaskRef};
use crate::result::PollResult;

/// Builds the successor of a `Then` node from its predecessor's result. Runs
/// exactly once, which is why `Then` can consume it by value.  May allocate
/// new tasks into the pool, which is why it needs `&mut Pool` and can fail
/// with [`Error::Kind::PoolExhausted`].
pub type Continuation = Box<dyn FnOnce(PollResult, &mut Pool) -> Result<TaskRef, Error>>;

/// Rebuilds an `Iterate` node's body or condition task from the previous
/// phase's result. Unlike [`Continuation`], a loop runs this once per
/// iteration, so it must stay callable for the life of the `Iterate` task.
pub type LoopFn = Box<dyn Fn(PollResult, &mut Pool) -> Result<TaskRef, Error>>;

pub enum Task {
    /// Always resolves to the wrapped result (spec.md §4.2 `Const`).
    Const(PollResult),

    /// Polls children in declared order; the sequence's `Done` result is
    /// the last child's result. Bounded to `MAX_SEQ_COUNT` by construction.
    Sequence {
        children: Vec<TaskRef>,
        index: usize,
    },

    /// Round-robin schedule over children, each with its own copy-on-enter
    /// [`Context`](crate::context::Context) slot. Bounded to `MAX_PAR_COUNT`,
    /// but may grow past that only via `task_par_append`'s own bound check
    /// (spec.md §5 "implementations must bound `MAX_PAR_COUNT`").
    Parallel {
        children: Vec<TaskRef>,
        contexts: Vec<crate::context::Context>,
        index: usize,
    },

    /// `fst` runs first; once it's `Done`, `then_fn` builds `snd` from its
    /// result and `snd` is polled to completion.
    Then {
        fst: Option<TaskRef>,
        snd: Option<TaskRef>,
        then_fn: Option<Continuation>,
    },

    /// `phase 0` polls `body`; on `Done` it stores the result as `last` and
    /// builds a condition task. `phase 1` polls that condition; `true`
    /// rebuilds `body` from `last` via `next_fn` and loops, `false` returns
    /// `last`.
    Iterate {
        phase: u8,
        body: Option<TaskRef>,
        condition: Option<TaskRef>,
        last: Option<PollResult>,
        next_fn: LoopFn,
        build_condition_fn: LoopFn,
    },

    /// Coarse-grained (≥1s resolution) monotonic timeout.
    Wait {
        duration_secs: u64,
        start: Option<Instant>,
    },

    /// Writes `[LOG] msg` to stdout once and completes.
    Log { msg: String },

    /// Reads one command line from the active `Fifo` context and evaluates it.
    FifoRepl,

    /// Acquires `kind`'s resource on first entry (see `crate::poll` for the
    /// Fifo-only one-tick delay), polls `body`, releases on body's terminal
    /// state.
    Context {
        kind: ContextKind,
        body: Option<TaskRef>,
    },

    /// Performs an HTTP GET for `url`, requires `CurlEasy` (and `Arena`).
    CurlPerform { url: String },

    /// Parses `bytes` as JSON, requires `Arena`.
    ParseJsonValue { bytes: String },

    /// Projects `root` as a Telegram `getMe` response.
    GetTgUser { root: serde_json::Value },

    /// Projects `root` as a Telegram `getUpdates` response.
    GetTgUpdateList { root: serde_json::Value },
}

impl Task {
    pub fn alloc(pool: &mut Pool, task: Task) -> Result<TaskRef, Error> {
        pool.allocate(task)
    }

    pub fn sequence() -> Task {
        Task::Sequence { children: Vec::new(), index: 0 }
    }

    pub fn parallel() -> Task {
        Task::Parallel { children: Vec::new(), contexts: Vec::new(), index: 0 }
    }

    pub fn then(fst: TaskRef, then_fn: Continuation) -> Task {
        Task::Then { fst: Some(fst), snd: None, then_fn: Some(then_fn) }
    }

    pub fn iterate(body: TaskRef, next_fn: LoopFn, build_condition_fn: LoopFn) -> Task {
        Task::Iterate {
            phase: 0,
            body: Some(body),
            condition: None,
            last: None,
            next_fn,
            build_condition_fn,
        }
    }

    pub fn wait(duration_secs: u64) -> Task {
        Task::Wait { duration_secs, start: None }
    }

    pub fn log(msg: impl Into<String>) -> Task {
        Task::Log { msg: msg.into() }
    }

    pub fn context(kind: ContextKind, body: TaskRef) -> Task {
        Task::Context { kind, body: Some(body) }
    }
}

/// Appends `child` as a new parallel sibling, each with a fresh context slot
/// (spec.md §4.4's `tg-getMe`/`tg-getUpdates` handlers do this to the global
/// runner). Bounds to `max_par_count` per spec.md §5.
pub fn parallel_append(
    pool: &mut Pool,
    runner: TaskRef,
    child: TaskRef,
    max_par_count: usize,
) -> Result<(), Error> {
    match pool.get_mut(runner) {
        Task::Parallel { children, contexts, .. } => {
            if children.len() >= max_par_count {
                return Err(Error::new(
                    crate::error::Kind::User,
                    "parallel runner is at MAX_PAR_COUNT capacity",
                ));
            }
            children.push(child);
            contexts.push(crate::context::Context::new());
            Ok(())
        }
        _ => Err(Error::new(crate::error::Kind::Contract, "parallel_append on a non-Parallel task")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    #[test]
    fn parallel_append_respects_the_bound() {
        let mut pool = Pool::new(4);
        let runner = pool.allocate(Task::parallel()).unwrap();
        let child = pool.allocate(Task::Const(PollResult::done_void())).unwrap();
        parallel_append(&mut pool, runner, child, 1).unwrap();

        let other = pool.allocate(Task::Const(PollResult::done_void())).unwrap();
        let err = parallel_append(&mut pool, runner, other, 1).unwrap_err();
        assert_eq!(err.kind(), crate::error::Kind::User);
    }

    #[test]
    fn fresh_parallel_context_list_tracks_children() {
        let mut pool = Pool::new(4);
        let runner = pool.allocate(Task::parallel()).unwrap();
        let child = pool.allocate(Task::Const(PollResult::done_void())).unwrap();
        parallel_append(&mut pool, runner, child, 4).unwrap();
        match pool.get(runner) {
            Task::Parallel { children, contexts, .. } => {
                assert_eq!(children.len(), 1);
                assert_eq!(contexts.len(), 1);
                assert!(contexts[0].is_empty());
            }
            _ => panic!("expected Parallel"),
        }
        let _ = Context::new();
    }
}
