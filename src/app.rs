//! Runtime: builds the task tree and drives it to completion
//! (spec.md §6 "main loop", ported from the original's `main()`).

pub mod options;

pub use options::RuntimeOptions;

use tracing::info;

use crate::context::{Context, ContextKind};
use crate::error::Error;
use crate::pool::Pool;
use crate::session::Session;
use crate::task::Task;

/// Owns the pool, the global `Parallel` runner, and the session state the
/// REPL mutates, and loops [`crate::poll::poll`] until the runner is `Done`.
pub struct Runtime {
    pool: Pool,
    ctx: Context,
    session: Session,
    global_ctx_task: crate::pool::TaskRef,
}

impl Runtime {
    pub fn new(options: RuntimeOptions) -> Result<Self, Error> {
        let mut pool = Pool::new(options.pool_capacity);

        let runner = Task::alloc(&mut pool, Task::parallel())?;
        let fifo_body = Task::alloc(&mut pool, Task::FifoRepl)?;
        let fifo_ctx = Task::alloc(&mut pool, Task::context(ContextKind::Fifo, fifo_body))?;
        crate::task::parallel_append(&mut pool, runner, fifo_ctx, options.max_par_count)?;

        let global_ctx_task = Task::alloc(&mut pool, Task::context(ContextKind::CurlGlobal, runner))?;

        let session = Session::new(
            options.stack_capacity,
            runner,
            options.telegram_base_url.clone(),
            options.max_par_count,
            options.read_buffer_capacity,
        );

        Ok(Self { pool, ctx: Context::new(), session, global_ctx_task })
    }

    /// Runs the poll loop until the runner (and the `CurlGlobal` wrapper
    /// around it) completes, i.e. until `quit` is entered at the REPL.
    ///
    /// Returns `Err` only for process-fatal conditions (spec.md §7); an
    /// ordinary recoverable error surfacing from a task is absorbed by its
    /// parent combinator and never reaches here.
    pub fn run(&mut self) -> Result<(), Error> {
        loop {
            let r = crate::poll::poll(&mut self.pool, self.global_ctx_task, &mut self.ctx, &mut self.session)?;
            if r.is_done() {
                break;
            }
        }
        info!(live = self.pool.live_count(), "runtime stopped");
        self.session.stack.print();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_runtime_seeds_a_fifo_repl_sibling() {
        let rt = Runtime::new(RuntimeOptions::default()).unwrap();
        match rt.pool.get(rt.session.runner) {
            Task::Parallel { children, .. } => assert_eq!(children.len(), 1),
            _ => panic!("expected Parallel"),
        }
    }
}
