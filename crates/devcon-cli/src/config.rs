//! Shell configuration, loadable from JSON.

use serde::Deserialize;

use crate::eval::DEFAULT_MAX_CALL_DEPTH;

/// Default cap on source text accepted by `Shell::eval`.
pub const DEFAULT_MAX_SOURCE_SIZE: usize = 1_000_000;

/// Limits and behavior of a [`crate::Shell`]. Missing JSON keys keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Nested user-function calls allowed before `CallDepthExceeded`.
    pub max_call_depth: u32,
    /// Bytes of source accepted per `eval`.
    pub max_source_size: usize,
    /// Whether `run_line` echoes non-null results to the console.
    pub echo_results: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_source_size: DEFAULT_MAX_SOURCE_SIZE,
            echo_results: true,
        }
    }
}

impl ShellConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
