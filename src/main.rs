//! Binary entry point (spec.md §6, ported from the original's `main()`):
//! builds the runtime and loops it until `quit` is entered at the REPL or a
//! fatal (`Contract`/`PoolExhausted`) error occurs.

use std::process::ExitCode;

use ribezal_rt::{Runtime, RuntimeOptions};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut runtime = match Runtime::new(RuntimeOptions::new()) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("[ERROR] failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            ExitCode::FAILURE
        }
    }
}
