#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

mod error;
mod lexer;
mod parser;
mod token;

pub use error::{LexError, ParseError, SyntaxError};
pub use lexer::{tokenize, Lexer};
pub use parser::{parse_str, parse_tokens, MAX_NESTING};
pub use token::{Tok, TokKind};
