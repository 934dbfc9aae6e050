//! `msh`, a minimal command-line interpreter.
//!
//! Lines come from a terminal or a batch file. Each line is split on whitespace,
//! checked against the built-ins `exit`/`quit` and `cd`, and otherwise looked up in a
//! fixed list of directories and run as a child process, optionally with its standard
//! output sent to a file (`cmd args > file`). The shell waits for every child before
//! reading the next line.
//!
//! All failures produce the same diagnostic, [`GENERIC_ERROR`], on standard error.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
mod external;
mod interpreter;
mod io_adapters;
mod lexer;
mod parser;

pub use env::{Environment, SearchPath};
pub use error::{GENERIC_ERROR, ShellError};
pub use external::{ExternalCommand, Spawned, find_command_path};
pub use interpreter::{Flow, Interpreter};
pub use io_adapters::{
    BufferedSource, LineSource, MAX_LINE_LEN, MemWriter, PROMPT, RawLine, Terminal, split_bounded,
};
pub use lexer::{MAX_ARGUMENTS, MAX_TOKEN_LEN, TokenList, split_into_tokens};
pub use parser::{ParsedCommand, parse_redirection};
