//! The poll engine (spec.md §4.2): a single recursive dispatcher that
//! advances one task by exactly one tick without blocking.
//!
//! `poll` returns `Result<PollResult, Error>`: the `Ok` payload is the
//! spec's own `(state, value)` result (`Done`/`Pending`/`Error` are all
//! `Ok`), while the `Err` variant is reserved for the two kinds spec.md §7
//! calls process-fatal — `Contract` and `PoolExhausted` — which `?`
//! propagates straight up to [`crate::app::Runtime::run`] instead of being
//! absorbed by a parent combinator the way an ordinary `Error` result is.

use std::mem;
use std::time::Instant;

use tracing::{error, info};

use crate::context::{Context, ContextKind};
use crate::error::Error;
use crate::pool::{Pool, TaskRef};
use crate::result::{PollResult, PollState};
use crate::session::Session;
use crate::task::{LoopFn, Task};
use crate::transport::fifo;
use crate::{adapters, interpreter, telegram};

/// Placeholder swapped into an `Iterate` node's loop-fn slot while the real
/// one is out on loan for a call (see `poll_iterate`); never actually invoked
/// since the real closure is always swapped back before the next poll.
fn placeholder_loop_fn() -> LoopFn {
    Box::new(|_, _| unreachable!("loop fn placeholder invoked"))
}

/// Advances `t` by one tick. See module docs for the `Result` split.
pub fn poll(pool: &mut Pool, t: TaskRef, ctx: &mut Context, session: &mut Session) -> Result<PollResult, Error> {
    let kind = task_kind(pool, t);
    match kind {
        TaskKind::Const => Ok(poll_const(pool, t)),
        TaskKind::Sequence => poll_sequence(pool, t, ctx, session),
        TaskKind::Parallel => poll_parallel(pool, t, ctx, session),
        TaskKind::Then => poll_then(pool, t, ctx, session),
        TaskKind::Iterate => poll_iterate(pool, t, ctx, session),
        TaskKind::Wait => Ok(poll_wait(pool, t)),
        TaskKind::Log => Ok(poll_log(pool, t)),
        TaskKind::FifoRepl => poll_fifo_repl(pool, ctx, session),
        TaskKind::Context => poll_context(pool, t, ctx, session),
        TaskKind::CurlPerform => poll_curl_perform(pool, t, ctx),
        TaskKind::ParseJsonValue => poll_parse_json_value(pool, t, ctx),
        TaskKind::GetTgUser => Ok(poll_get_tg_user(pool, t)),
        TaskKind::GetTgUpdateList => Ok(poll_get_tg_update_list(pool, t, ctx)),
    }
}

enum TaskKind {
    Const,
    Sequence,
    Parallel,
    Then,
    Iterate,
    Wait,
    Log,
    FifoRepl,
    Context,
    CurlPerform,
    ParseJsonValue,
    GetTgUser,
    GetTgUpdateList,
}

fn task_kind(pool: &Pool, t: TaskRef) -> TaskKind {
    match pool.get(t) {
        Task::Const(_) => TaskKind::Const,
        Task::Sequence { .. } => TaskKind::Sequence,
        Task::Parallel { .. } => TaskKind::Parallel,
        Task::Then { .. } => TaskKind::Then,
        Task::Iterate { .. } => TaskKind::Iterate,
        Task::Wait { .. } => TaskKind::Wait,
        Task::Log { .. } => TaskKind::Log,
        Task::FifoRepl => TaskKind::FifoRepl,
        Task::Context { .. } => TaskKind::Context,
        Task::CurlPerform { .. } => TaskKind::CurlPerform,
        Task::ParseJsonValue { .. } => TaskKind::ParseJsonValue,
        Task::GetTgUser { .. } => TaskKind::GetTgUser,
        Task::GetTgUpdateList { .. } => TaskKind::GetTgUpdateList,
    }
}

fn poll_const(pool: &mut Pool, t: TaskRef) -> PollResult {
    match pool.get(t) {
        Task::Const(r) => r.clone(),
        _ => unreachable!(),
    }
}

fn poll_sequence(pool: &mut Pool, t: TaskRef, ctx: &mut Context, session: &mut Session) -> Result<PollResult, Error> {
    let child = match pool.get(t) {
        Task::Sequence { children, index } => children.get(*index).copied(),
        _ => unreachable!(),
    };
    let Some(child) = child else {
        return Ok(PollResult::done_void());
    };

    let r = poll(pool, child, ctx, session)?;
    match r.state {
        PollState::Done => {
            pool.release(child);
            let (new_index, count) = match pool.get_mut(t) {
                Task::Sequence { children, index } => {
                    *index += 1;
                    (*index, children.len())
                }
                _ => unreachable!(),
            };
            if new_index == count {
                Ok(r)
            } else {
                Ok(PollResult::pending())
            }
        }
        PollState::Pending => Ok(PollResult::pending()),
        PollState::Error => {
            pool.release(child);
            Ok(r)
        }
    }
}

fn poll_parallel(pool: &mut Pool, t: TaskRef, ctx: &mut Context, session: &mut Session) -> Result<PollResult, Error> {
    let count = match pool.get(t) {
        Task::Parallel { children, .. } => children.len(),
        _ => unreachable!(),
    };
    if count == 0 {
        return Ok(PollResult::done_void());
    }

    let index = match pool.get(t) {
        Task::Parallel { index, .. } => *index,
        _ => unreachable!(),
    };
    let child = match pool.get(t) {
        Task::Parallel { children, .. } => children[index],
        _ => unreachable!(),
    };

    // Each sibling is seeded with a copy of the parent's context on first
    // entry (spec.md §4.2, §9) so resource acquisitions stay independent.
    let mut sub_ctx = match pool.get_mut(t) {
        Task::Parallel { contexts, .. } => mem::take(&mut contexts[index]),
        _ => unreachable!(),
    };
    if sub_ctx.is_empty() {
        sub_ctx = ctx.clone();
    }

    let r = poll(pool, child, &mut sub_ctx, session)?;

    match r.state {
        PollState::Done | PollState::Error => {
            pool.release(child);
            // sub_ctx (and any resources still held in it) drops here.
            match pool.get_mut(t) {
                Task::Parallel { children, contexts, index } => {
                    children.swap_remove(*index);
                    contexts.swap_remove(*index);
                    if !children.is_empty() {
                        *index %= children.len();
                    }
                }
                _ => unreachable!(),
            }
        }
        PollState::Pending => match pool.get_mut(t) {
            Task::Parallel { contexts, index, children, .. } => {
                contexts[*index] = sub_ctx;
                *index = (*index + 1) % children.len();
            }
            _ => unreachable!(),
        },
    }

    Ok(PollResult::pending())
}

fn poll_then(pool: &mut Pool, t: TaskRef, ctx: &mut Context, session: &mut Session) -> Result<PollResult, Error> {
    let snd = match pool.get(t) {
        Task::Then { snd, .. } => *snd,
        _ => unreachable!(),
    };

    if let Some(snd) = snd {
        let r = poll(pool, snd, ctx, session)?;
        if !r.is_pending() {
            pool.release(snd);
            match pool.get_mut(t) {
                Task::Then { snd, .. } => *snd = None,
                _ => unreachable!(),
            }
        }
        return Ok(r);
    }

    let fst = match pool.get(t) {
        Task::Then { fst, .. } => fst.expect("Then polled with neither fst nor snd set"),
        _ => unreachable!(),
    };
    let r = poll(pool, fst, ctx, session)?;
    match r.state {
        PollState::Done => {
            pool.release(fst);
            let then_fn = match pool.get_mut(t) {
                Task::Then { fst, then_fn, .. } => {
                    *fst = None;
                    then_fn.take().expect("Then polled twice past Done")
                }
                _ => unreachable!(),
            };
            let new_snd = then_fn(r, pool)?;
            match pool.get_mut(t) {
                Task::Then { snd, .. } => *snd = Some(new_snd),
                _ => unreachable!(),
            }
            Ok(PollResult::pending())
        }
        PollState::Pending => Ok(PollResult::pending()),
        PollState::Error => Ok(r),
    }
}

fn poll_iterate(pool: &mut Pool, t: TaskRef, ctx: &mut Context, session: &mut Session) -> Result<PollResult, Error> {
    let phase = match pool.get(t) {
        Task::Iterate { phase, .. } => *phase,
        _ => unreachable!(),
    };

    if phase == 0 {
        let body = match pool.get(t) {
            Task::Iterate { body, .. } => body.expect("Iterate phase 0 without a body"),
            _ => unreachable!(),
        };
        let r = poll(pool, body, ctx, session)?;
        match r.state {
            PollState::Done => {
                pool.release(body);
                match pool.get_mut(t) {
                    Task::Iterate { body, phase, last, .. } => {
                        *body = None;
                        *last = Some(r.clone());
                        *phase = 1;
                    }
                    _ => unreachable!(),
                }
                let build_condition_fn = match pool.get_mut(t) {
                    Task::Iterate { build_condition_fn, .. } => mem::replace(build_condition_fn, placeholder_loop_fn()),
                    _ => unreachable!(),
                };
                let condition = build_condition_fn(r, pool)?;
                match pool.get_mut(t) {
                    Task::Iterate { condition: c, build_condition_fn: slot, .. } => {
                        *c = Some(condition);
                        *slot = build_condition_fn;
                    }
                    _ => unreachable!(),
                }
                Ok(PollResult::pending())
            }
            PollState::Pending => Ok(PollResult::pending()),
            PollState::Error => {
                pool.release(body);
                Ok(r)
            }
        }
    } else {
        let condition = match pool.get(t) {
            Task::Iterate { condition, .. } => condition.expect("Iterate phase 1 without a condition"),
            _ => unreachable!(),
        };
        let r = poll(pool, condition, ctx, session)?;
        match r.state {
            PollState::Done => {
                pool.release(condition);
                let take_next = r.expect_bool();
                if take_next {
                    let last = match pool.get_mut(t) {
                        Task::Iterate { condition, phase, last, .. } => {
                            *condition = None;
                            *phase = 0;
                            last.clone().expect("missing last")
                        }
                        _ => unreachable!(),
                    };
                    let next_fn = match pool.get_mut(t) {
                        Task::Iterate { next_fn, .. } => mem::replace(next_fn, placeholder_loop_fn()),
                        _ => unreachable!(),
                    };
                    let body = next_fn(last, pool)?;
                    match pool.get_mut(t) {
                        Task::Iterate { body: b, next_fn: slot, .. } => {
                            *b = Some(body);
                            *slot = next_fn;
                        }
                        _ => unreachable!(),
                    }
                    Ok(PollResult::pending())
                } else {
                    let last = match pool.get_mut(t) {
                        Task::Iterate { condition, last, .. } => {
                            *condition = None;
                            last.clone().expect("missing last on loop exit")
                        }
                        _ => unreachable!(),
                    };
                    Ok(last)
                }
            }
            PollState::Pending => Ok(PollResult::pending()),
            PollState::Error => {
                pool.release(condition);
                Ok(r)
            }
        }
    }
}

fn poll_wait(pool: &mut Pool, t: TaskRef) -> PollResult {
    match pool.get_mut(t) {
        Task::Wait { duration_secs, start } => match start {
            None => {
                *start = Some(Instant::now());
                PollResult::pending()
            }
            Some(started) => {
                if started.elapsed().as_secs() >= *duration_secs {
                    PollResult::done_void()
                } else {
                    PollResult::pending()
                }
            }
        },
        _ => unreachable!(),
    }
}

fn poll_log(pool: &mut Pool, t: TaskRef) -> PollResult {
    match pool.get(t) {
        Task::Log { msg } => {
            println!("[LOG] {msg}");
            PollResult::done_void()
        }
        _ => unreachable!(),
    }
}

fn poll_fifo_repl(pool: &mut Pool, ctx: &mut Context, session: &mut Session) -> Result<PollResult, Error> {
    let fd = ctx.fifo_fd()?;
    let Some(line) = fifo::read_command(fd, session.read_buffer_capacity)? else {
        return Ok(PollResult::pending());
    };
    match interpreter::execute(&line, pool, session)? {
        interpreter::Reply::Close => Ok(PollResult::done_void()),
        interpreter::Reply::Ack => Ok(PollResult::pending()),
        interpreter::Reply::Error => {
            println!("[ERROR] command caused an error, try again");
            Ok(PollResult::pending())
        }
    }
}

fn poll_context(pool: &mut Pool, t: TaskRef, ctx: &mut Context, session: &mut Session) -> Result<PollResult, Error> {
    let kind = match pool.get(t) {
        Task::Context { kind, .. } => *kind,
        _ => unreachable!(),
    };

    match kind {
        ContextKind::Fifo => {
            if !ctx.has_fifo() {
                return match fifo::open() {
                    Ok(fd) => {
                        ctx.set_fifo_fd(fd);
                        info!("opened fifo successfully");
                        Ok(PollResult::pending())
                    }
                    Err(e) => {
                        error!("could not open fifo: {e}");
                        Ok(PollResult::error())
                    }
                };
            }
            poll_context_body(pool, t, ctx, session, |ctx| {
                let fd = ctx.clear_fifo().expect("Fifo flag set without an fd");
                match fifo::close_and_unlink(fd) {
                    Ok(()) => {
                        info!("closed fifo successfully");
                        None
                    }
                    Err(e) => {
                        error!("could not close fifo: {e}");
                        Some(())
                    }
                }
            })
        }
        ContextKind::Arena => {
            if !ctx.has_arena() {
                ctx.set_arena(bumpalo::Bump::new());
            }
            poll_context_body(pool, t, ctx, session, |ctx| {
                ctx.clear_arena();
                None
            })
        }
        ContextKind::CurlGlobal => {
            if !ctx.has_curl_global() {
                ctx.set_curl_global(true);
            }
            poll_context_body(pool, t, ctx, session, |ctx| {
                ctx.set_curl_global(false);
                None
            })
        }
        ContextKind::CurlMulti => {
            if !ctx.has_curl_global() {
                return Err(Error::new(crate::error::Kind::Contract, "CurlMulti requires CurlGlobal"));
            }
            if !ctx.has_curl_multi() {
                ctx.set_curl_multi(curl::multi::Multi::new());
            }
            poll_context_body(pool, t, ctx, session, |ctx| {
                ctx.clear_curl_multi();
                None
            })
        }
        ContextKind::CurlEasy => {
            if !ctx.has_curl_multi() {
                return Err(Error::new(crate::error::Kind::Contract, "CurlEasy requires CurlMulti"));
            }
            if !ctx.has_curl_easy() {
                ctx.set_curl_easy(curl::easy::Easy::new());
            }
            poll_context_body(pool, t, ctx, session, |ctx| {
                ctx.clear_curl_easy();
                None
            })
        }
    }
}

/// Shared tail of every `Context` variant's poll: run `body`, and on its
/// terminal state release it and call `release` to tear the resource down.
/// `release` returns `Some(())` to signal the teardown itself failed.
fn poll_context_body(
    pool: &mut Pool,
    t: TaskRef,
    ctx: &mut Context,
    session: &mut Session,
    release: impl FnOnce(&mut Context) -> Option<()>,
) -> Result<PollResult, Error> {
    let body = match pool.get(t) {
        Task::Context { body, .. } => body.expect("Context polled past body release"),
        _ => unreachable!(),
    };
    let r = poll(pool, body, ctx, session)?;
    if !r.is_pending() {
        pool.release(body);
        match pool.get_mut(t) {
            Task::Context { body, .. } => *body = None,
            _ => unreachable!(),
        }
        if release(ctx).is_some() {
            return Ok(PollResult::error());
        }
    }
    Ok(r)
}

fn poll_curl_perform(pool: &mut Pool, t: TaskRef, ctx: &mut Context) -> Result<PollResult, Error> {
    if !ctx.has_arena() {
        return Err(Error::new(crate::error::Kind::Contract, "CurlPerform requires an Arena for response storage"));
    }
    let url = match pool.get(t) {
        Task::CurlPerform { url } => url.clone(),
        _ => unreachable!(),
    };
    Ok(adapters::curl::perform(ctx, &url))
}

fn poll_parse_json_value(pool: &mut Pool, t: TaskRef, ctx: &mut Context) -> Result<PollResult, Error> {
    if !ctx.has_arena() {
        return Err(Error::new(crate::error::Kind::Contract, "ParseJsonValue requires an Arena"));
    }
    let bytes = match pool.get(t) {
        Task::ParseJsonValue { bytes } => bytes.clone(),
        _ => unreachable!(),
    };
    Ok(adapters::json::parse(&bytes))
}

fn poll_get_tg_user(pool: &mut Pool, t: TaskRef) -> PollResult {
    let root = match pool.get(t) {
        Task::GetTgUser { root } => root.clone(),
        _ => unreachable!(),
    };
    telegram::get_user(&root)
}

fn poll_get_tg_update_list(pool: &mut Pool, t: TaskRef, ctx: &mut Context) -> PollResult {
    let root = match pool.get(t) {
        Task::GetTgUpdateList { root } => root.clone(),
        _ => unreachable!(),
    };
    let arena = ctx.arena().expect("GetTgUpdateList requires Arena");
    telegram::get_update_list(&root, arena)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    /// Tests that don't exercise the REPL don't care which runner the
    /// session points at, so a throwaway const task stands in for it.
    fn test_session(pool: &mut Pool) -> Session {
        let runner = pool.allocate(Task::Const(PollResult::done_void())).unwrap();
        Session::new(8, runner, "https://api.telegram.org".into(), 4, 64)
    }

    #[test]
    fn const_yields_its_result_unchanged() {
        let mut pool = Pool::new(4);
        let mut ctx = Context::new();
        let mut session = test_session(&mut pool);
        let t = pool.allocate(Task::Const(PollResult::done_int(7))).unwrap();
        let r = poll(&mut pool, t, &mut ctx, &mut session).unwrap();
        assert!(r.is_done());
        match r.value {
            crate::result::Value::Int(7) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_sequence_is_immediately_done() {
        let mut pool = Pool::new(4);
        let mut ctx = Context::new();
        let mut session = test_session(&mut pool);
        let t = pool.allocate(Task::sequence()).unwrap();
        let r = poll(&mut pool, t, &mut ctx, &mut session).unwrap();
        assert!(r.is_done());
    }

    #[test]
    fn empty_parallel_is_immediately_done() {
        let mut pool = Pool::new(4);
        let mut ctx = Context::new();
        let mut session = test_session(&mut pool);
        let t = pool.allocate(Task::parallel()).unwrap();
        let r = poll(&mut pool, t, &mut ctx, &mut session).unwrap();
        assert!(r.is_done());
    }

    #[test]
    fn sequence_propagates_last_childs_result() {
        let mut pool = Pool::new(8);
        let mut ctx = Context::new();
        let mut session = test_session(&mut pool);
        let a = pool.allocate(Task::Const(PollResult::done_int(1))).unwrap();
        let b = pool.allocate(Task::Const(PollResult::done_int(2))).unwrap();
        let seq = pool.allocate(Task::Sequence { children: vec![a, b], index: 0 }).unwrap();

        let r1 = poll(&mut pool, seq, &mut ctx, &mut session).unwrap();
        assert!(r1.is_pending());
        let r2 = poll(&mut pool, seq, &mut ctx, &mut session).unwrap();
        assert!(r2.is_done());
        match r2.value {
            crate::result::Value::Int(2) => {}
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(pool.live_count(), 2, "the sequence node and the session's runner stub remain live");
    }
}
