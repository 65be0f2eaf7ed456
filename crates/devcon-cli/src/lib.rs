//! devcon runtime: evaluator, environment, builtins, host bridge and shell.
//!
//! ```text
//! source -> devcon_parse::parse_str -> Program -> eval_program -> Value
//! ```

#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

use std::sync::Once;

pub mod builtins;
pub mod config;
pub mod console;
pub mod demo;
pub mod env;
pub mod error;
pub mod eval;
pub mod host;
pub mod shell;
mod stack;
pub mod trace;
pub mod value;

pub use config::ShellConfig;
pub use console::{BufferConsole, Console, StdConsole};
pub use env::Env;
pub use error::{Error, EvalError, EvalResult};
pub use eval::{ControlFlow, Runtime};
pub use host::{HostClass, HostError, HostObject, HostRegistry, ParamType};
pub use shell::Shell;
pub use trace::TraceEmitter;
pub use value::Value;

static TRACING_INIT: Once = Once::new();

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing unless `RUST_LOG` is set; later calls are no-ops.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
