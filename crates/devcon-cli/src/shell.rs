//! The embedding surface: one global frame, one console, one host registry.

use devcon_parse::{parse_str, tokenize, TokKind};
use tracing::{debug, warn};

use crate::builtins;
use crate::config::ShellConfig;
use crate::console::Console;
use crate::env::Env;
use crate::error::Error;
use crate::eval::{eval_program, Runtime};
use crate::host::HostRegistry;
use crate::trace::{TraceEmitter, TraceError};
use crate::value::Value;

/// An interpreter session. Bindings made by one `eval` are visible to the
/// next; a failed `eval` keeps whatever side effects ran before the error.
pub struct Shell {
    rt: Runtime,
    env: Env,
    config: ShellConfig,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("rt", &self.rt)
            .field("config", &self.config)
            .finish()
    }
}

impl Shell {
    /// A shell with no host classes beyond `devcon.Error`.
    pub fn new(console: impl Console + 'static) -> Self {
        Self::with_host(console, HostRegistry::new(), ShellConfig::default())
    }

    pub fn with_host(
        console: impl Console + 'static,
        host: HostRegistry,
        config: ShellConfig,
    ) -> Self {
        let env = Env::new_global();
        builtins::install(&env);
        Shell {
            rt: Runtime::new(host, Box::new(console), config.max_call_depth),
            env,
            config,
        }
    }

    /// Record host invocations on `tracer`.
    pub fn with_tracer(mut self, tracer: TraceEmitter) -> Self {
        self.rt.tracer = tracer;
        self
    }

    /// Parse and evaluate `src` against the global frame.
    pub fn eval(&mut self, src: &str) -> Result<Value, Error> {
        if src.len() > self.config.max_source_size {
            return Err(Error::SourceTooLarge {
                limit: self.config.max_source_size,
                size: src.len(),
            });
        }
        debug!(bytes = src.len(), "eval");
        let program = parse_str(src)?;
        self.rt.reset_depth();
        let value = eval_program(&mut self.rt, &self.env, &program)?;
        Ok(value)
    }

    /// Evaluate one console line and report the outcome on the console: the
    /// result's source form unless it is `null`, or `error: ...`. A missing
    /// trailing `;` is supplied.
    pub fn run_line(&mut self, line: &str) -> Result<Value, Error> {
        let trimmed = line.trim_end();
        let result = if needs_terminator(trimmed) {
            // on a new line, so a trailing `//` comment cannot swallow it
            self.eval(&format!("{trimmed}\n;"))
        } else {
            self.eval(trimmed)
        };
        match &result {
            Ok(Value::Null) => {}
            Ok(v) if self.config.echo_results => self.rt.console.print(&Value::Str(v.repr())),
            Ok(_) => {}
            Err(e) => self
                .rt
                .console
                .print(&Value::Str(format!("error: {e}"))),
        }
        result
    }

    /// Drive `run_line` from the console's input until it is exhausted, then
    /// close the console. Returns the number of lines that failed.
    pub fn run(&mut self) -> usize {
        let mut failures = 0;
        while self.rt.console.has_next() {
            let Some(line) = self.rt.console.next_line() else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            if self.run_line(&line).is_err() {
                failures += 1;
            }
        }
        self.rt.console.close();
        failures
    }

    pub fn set_global(&self, name: &str, value: impl Into<Value>) {
        self.env.set_global(name, value.into());
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.env.get_global(name).ok()
    }

    /// The global frame.
    pub fn globals(&self) -> &Env {
        &self.env
    }

    pub fn host(&self) -> &HostRegistry {
        &self.rt.host
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Write the trace footer. Safe to call more than once.
    pub fn finish(&mut self, success: bool) -> Result<(), TraceError> {
        self.rt
            .tracer
            .finalize(if success { "success" } else { "error" })
    }
}

/// Whether `line` has tokens and the last one is not `;`. Lines that fail to
/// lex are left alone so the lexer error is reported as written.
fn needs_terminator(line: &str) -> bool {
    let Ok(toks) = tokenize(line) else {
        return false;
    };
    toks.iter()
        .rev()
        .find(|t| t.kind != TokKind::Eof)
        .is_some_and(|t| t.kind != TokKind::Semicolon)
}

impl Drop for Shell {
    fn drop(&mut self) {
        if let Err(e) = self.rt.tracer.finalize("unfinished") {
            warn!(error = %e, "failed to finalize host-call trace");
        }
        // closures stored in the global frame hold the frame itself
        self.env.clear();
    }
}
