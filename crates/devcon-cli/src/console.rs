//! The output sink (and optional input source) a shell talks to.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;

use crate::value::Value;

/// Where `print` output and shell results go. Interactive consoles also
/// feed input lines to [`crate::Shell::run`].
pub trait Console {
    fn print(&mut self, value: &Value);

    /// Whether another input line is available.
    fn has_next(&mut self) -> bool {
        false
    }

    fn next_line(&mut self) -> Option<String> {
        None
    }

    /// Release console-owned resources.
    fn close(&mut self) {}
}

/// stdin/stdout console. Interactive consoles read through a line editor
/// with history; plain ones read stdin line by line, which suits pipes.
pub struct StdConsole {
    input: Input,
    pending: Option<String>,
    eof: bool,
}

enum Input {
    Plain,
    Editor {
        editor: Box<DefaultEditor>,
        prompt: String,
    },
}

impl StdConsole {
    pub fn new() -> Self {
        StdConsole {
            input: Input::Plain,
            pending: None,
            eof: false,
        }
    }

    /// A line-editing console that shows `prompt` before each read.
    pub fn interactive(prompt: impl Into<String>) -> Result<Self, ReadlineError> {
        Ok(StdConsole {
            input: Input::Editor {
                editor: Box::new(DefaultEditor::new()?),
                prompt: prompt.into(),
            },
            ..Self::new()
        })
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self.input, Input::Editor { .. })
    }

    fn fill(&mut self) {
        if self.pending.is_some() || self.eof {
            return;
        }
        match &mut self.input {
            Input::Plain => {
                let mut line = String::new();
                match io::stdin().lock().read_line(&mut line) {
                    Ok(0) | Err(_) => self.eof = true,
                    Ok(_) => {
                        self.pending = Some(line.trim_end_matches(['\n', '\r']).to_string());
                    }
                }
            }
            Input::Editor { editor, prompt } => match editor.readline(prompt.as_str()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    self.pending = Some(line);
                }
                // Ctrl-C abandons the line being typed
                Err(ReadlineError::Interrupted) => self.pending = Some(String::new()),
                Err(ReadlineError::Eof) => self.eof = true,
                Err(e) => {
                    warn!(error = %e, "console input failed");
                    self.eof = true;
                }
            },
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn print(&mut self, value: &Value) {
        println!("{value}");
    }

    fn has_next(&mut self) -> bool {
        self.fill();
        self.pending.is_some()
    }

    fn next_line(&mut self) -> Option<String> {
        self.fill();
        self.pending.take()
    }

    fn close(&mut self) {
        let _ = io::stdout().flush();
    }
}

/// In-memory console: captures printed lines and serves scripted input.
///
/// Clones share the same output buffer, so a test can keep one handle and
/// give the other to a shell.
#[derive(Clone, Default)]
pub struct BufferConsole {
    output: Rc<RefCell<Vec<String>>>,
    input: Rc<RefCell<VecDeque<String>>>,
    closed: Rc<RefCell<bool>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let console = Self::new();
        console
            .input
            .borrow_mut()
            .extend(lines.into_iter().map(Into::into));
        console
    }

    /// Every printed line so far.
    pub fn lines(&self) -> Vec<String> {
        self.output.borrow().clone()
    }

    /// Printed lines joined with `\n`.
    pub fn text(&self) -> String {
        self.output.borrow().join("\n")
    }

    pub fn clear(&self) {
        self.output.borrow_mut().clear();
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Console for BufferConsole {
    fn print(&mut self, value: &Value) {
        self.output.borrow_mut().push(value.to_string());
    }

    fn has_next(&mut self) -> bool {
        !self.input.borrow().is_empty()
    }

    fn next_line(&mut self) -> Option<String> {
        self.input.borrow_mut().pop_front()
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_console_shares_output_between_clones() {
        let handle = BufferConsole::new();
        let mut sink = handle.clone();
        sink.print(&Value::from("a"));
        sink.print(&Value::Int(2));
        assert_eq!(handle.lines(), vec!["a", "2"]);
        assert_eq!(handle.text(), "a\n2");
        handle.clear();
        assert!(handle.lines().is_empty());
    }

    #[test]
    fn std_console_defaults_to_plain_input() {
        assert!(!StdConsole::new().is_interactive());
        assert!(!StdConsole::default().is_interactive());
    }

    #[test]
    fn scripted_input_drains_in_order() {
        let mut c = BufferConsole::with_input(["x = 1;", "x;"]);
        assert!(c.has_next());
        assert_eq!(c.next_line().as_deref(), Some("x = 1;"));
        assert_eq!(c.next_line().as_deref(), Some("x;"));
        assert!(!c.has_next());
        assert_eq!(c.next_line(), None);
        c.close();
        assert!(c.is_closed());
    }
}
