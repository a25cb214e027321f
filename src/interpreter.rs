//! Command interpreter (spec.md §3, §4.4)
//!
//! The REPL is postfix: a line is a sequence of whitespace-separated
//! tokens, each acted on immediately, left to right. A token that parses as
//! an integer pushes itself; a recognized keyword runs its command (which
//! may pop operands the preceding tokens pushed); anything else graphic
//! pushes itself as a string.

use crate::error::{Error, Kind};
use crate::pool::{Pool, TaskRef};
use crate::result::PollResult;
use crate::session::Session;
use crate::stack::StackValue;
use crate::task::Task;
use crate::telegram::TgMethodCall;

pub enum Reply {
    /// `quit` was entered; the REPL (and the Fifo context wrapping it) closes.
    Close,
    Ack,
    /// A recoverable error occurred processing the line; the REPL stays open.
    Error,
}

const HELP_TEXT: &str = "\
help            show this text
quit            stop the REPL
print           print the stack, top first
drop            drop the top of the stack
clear           clear the stack
+ - * /         pop two ints, push the result
tg-getMe        call Telegram getMe
tg-getUpdates   call Telegram getUpdates
request         pop a url string, GET it and parse the JSON response
<int>           push an integer
<word>          push a string";

pub fn execute(line: &str, pool: &mut Pool, session: &mut Session) -> Result<Reply, Error> {
    for token in line.split_whitespace() {
        if !token.bytes().all(|b| b.is_ascii_graphic()) {
            println!("[ERROR] non-printable token rejected");
            return Ok(Reply::Error);
        }

        match execute_token(token, pool, session) {
            Ok(TokenOutcome::Continue) => {}
            Ok(TokenOutcome::Close) => return Ok(Reply::Close),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                println!("[ERROR] {e}");
                return Ok(Reply::Error);
            }
        }
    }
    Ok(Reply::Ack)
}

enum TokenOutcome {
    Continue,
    Close,
}

fn execute_token(token: &str, pool: &mut Pool, session: &mut Session) -> Result<TokenOutcome, Error> {
    if let Ok(n) = token.parse::<i32>() {
        session.stack.push_int(n)?;
        return Ok(TokenOutcome::Continue);
    }

    match token {
        "help" => {
            println!("[HELP] {HELP_TEXT}");
        }
        "quit" => return Ok(TokenOutcome::Close),
        "print" => session.stack.print(),
        "drop" => {
            session.stack.drop_top()?;
        }
        "clear" => session.stack.clear(),
        "+" => binary_op(session, |a, b| a.checked_add(b))?,
        "-" => binary_op(session, |a, b| a.checked_sub(b))?,
        "*" => binary_op(session, |a, b| a.checked_mul(b))?,
        "/" => binary_op(session, |a, b| if b == 0 { None } else { a.checked_div(b) })?,
        "tg-getMe" => spawn_get_me(pool, session)?,
        "tg-getUpdates" => spawn_get_updates(pool, session)?,
        "request" => spawn_request(pool, session)?,
        other => session.stack.push_string(other)?,
    }

    Ok(TokenOutcome::Continue)
}

fn binary_op(session: &mut Session, op: impl FnOnce(i32, i32) -> Option<i32>) -> Result<(), Error> {
    let (a, b) = session.stack.pop_two_ints()?;
    match op(a, b) {
        Some(result) => session.stack.push_int(result),
        None => Err(Error::new(Kind::User, "arithmetic overflow or division by zero")),
    }
}

/// Wraps `body` in `Context(CurlMulti, Context(CurlEasy, Context(Arena,
/// body)))` and appends it to the session's global runner (spec.md §4.4's
/// "a `CurlMulti` context wrapping a `CurlEasy` context wrapping an `Arena`
/// context"; supplemented for `request`, spec.md SUPPLEMENTED FEATURES #3).
fn spawn_call(pool: &mut Pool, session: &mut Session, body: TaskRef) -> Result<(), Error> {
    let arena_ctx = Task::alloc(pool, Task::context(crate::context::ContextKind::Arena, body))?;
    let easy_ctx = Task::alloc(pool, Task::context(crate::context::ContextKind::CurlEasy, arena_ctx))?;
    let multi_ctx = Task::alloc(pool, Task::context(crate::context::ContextKind::CurlMulti, easy_ctx))?;
    crate::task::parallel_append(pool, session.runner, multi_ctx, session.max_par_count)
}

/// `CurlPerform(url) -> ParseJsonValue -> project` as a `Then` chain.
fn perform_and_project(
    pool: &mut Pool,
    url: String,
    project: impl FnOnce(serde_json::Value, &mut Pool) -> Result<TaskRef, Error> + 'static,
) -> Result<TaskRef, Error> {
    let perform = Task::alloc(pool, Task::CurlPerform { url })?;
    let parsed = Task::alloc(
        pool,
        Task::then(
            perform,
            Box::new(|r, pool| Task::alloc(pool, Task::ParseJsonValue { bytes: r.expect_string() })),
        ),
    )?;
    Task::alloc(pool, Task::then(parsed, Box::new(move |r, pool| project(r.expect_json(), pool))))
}

/// Pops the required top-of-stack `String` operand, per spec.md §4.4's
/// `( string -> )` stack effect for `tg-getMe`/`tg-getUpdates`/`request`.
fn pop_string(session: &mut Session, what: &str) -> Result<String, Error> {
    match session.stack.drop_top()? {
        StackValue::String(s) => Ok(s),
        StackValue::Int(_) => Err(Error::new(Kind::User, format!("{what} needs a string on top of the stack"))),
    }
}

fn spawn_get_me(pool: &mut Pool, session: &mut Session) -> Result<(), Error> {
    let token = pop_string(session, "tg-getMe")?;
    let call = TgMethodCall::get_me(&session.base_url, &token);
    let body = perform_and_project(pool, call.url, |root, pool| {
        Task::alloc(pool, Task::GetTgUser { root })
    })?;
    spawn_call(pool, session, body)
}

fn spawn_get_updates(pool: &mut Pool, session: &mut Session) -> Result<(), Error> {
    let token = pop_string(session, "tg-getUpdates")?;
    let call = TgMethodCall::get_updates(&session.base_url, &token, None);
    let body = perform_and_project(pool, call.url, |root, pool| {
        Task::alloc(pool, Task::GetTgUpdateList { root })
    })?;
    spawn_call(pool, session, body)
}

/// Bare GET with no JSON interpretation (spec.md SUPPLEMENTED FEATURES #3):
/// the response body is logged as-is, not parsed or projected.
fn spawn_request(pool: &mut Pool, session: &mut Session) -> Result<(), Error> {
    let url = pop_string(session, "request")?;
    let perform = Task::alloc(pool, Task::CurlPerform { url })?;
    let body = Task::alloc(
        pool,
        Task::then(
            perform,
            Box::new(|r, pool| {
                println!("[INFO] {}", r.expect_string());
                Task::alloc(pool, Task::Const(PollResult::done_void()))
            }),
        ),
    )?;
    spawn_call(pool, session, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Pool;

    fn session(pool: &mut Pool) -> Session {
        let runner = pool.allocate(Task::parallel()).unwrap();
        Session::new(8, runner, "https://api.telegram.org".into(), 4, 64)
    }

    #[test]
    fn pushes_and_adds_two_ints() {
        let mut pool = Pool::new(16);
        let mut session = session(&mut pool);
        execute("3 4 +", &mut pool, &mut session).unwrap();
        assert_eq!(session.stack.len(), 1);
    }

    #[test]
    fn quit_closes_the_repl() {
        let mut pool = Pool::new(16);
        let mut session = session(&mut pool);
        assert!(matches!(execute("quit", &mut pool, &mut session).unwrap(), Reply::Close));
    }

    #[test]
    fn division_by_zero_is_a_recoverable_error() {
        let mut pool = Pool::new(16);
        let mut session = session(&mut pool);
        assert!(matches!(execute("1 0 /", &mut pool, &mut session).unwrap(), Reply::Error));
    }

    #[test]
    fn drop_on_an_empty_stack_is_a_recoverable_error() {
        let mut pool = Pool::new(16);
        let mut session = session(&mut pool);
        assert!(matches!(execute("drop", &mut pool, &mut session).unwrap(), Reply::Error));
    }

    #[test]
    fn tg_get_me_appends_a_sibling_to_the_runner() {
        let mut pool = Pool::new(16);
        let mut session = session(&mut pool);
        execute("123456:ABC tg-getMe", &mut pool, &mut session).unwrap();
        assert!(session.stack.is_empty(), "the token is popped off the stack");
        match pool.get(session.runner) {
            Task::Parallel { children, .. } => assert_eq!(children.len(), 1),
            _ => panic!("expected Parallel"),
        }
    }

    #[test]
    fn tg_get_me_needs_a_token_on_the_stack() {
        let mut pool = Pool::new(16);
        let mut session = session(&mut pool);
        assert!(matches!(execute("tg-getMe", &mut pool, &mut session).unwrap(), Reply::Error));
    }

    #[test]
    fn request_needs_a_string_on_the_stack() {
        let mut pool = Pool::new(16);
        let mut session = session(&mut pool);
        session.stack.push_int(1).unwrap();
        assert!(matches!(execute("request", &mut pool, &mut session).unwrap(), Reply::Error));
    }
}
