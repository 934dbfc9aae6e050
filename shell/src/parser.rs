use crate::error::ShellError;
use crate::lexer::TokenList;

/// The output redirection operator. Only recognised as a token of its own.
pub const REDIRECT_OP: &str = ">";

/// A command line split into its argument vector and optional output file.
///
/// Borrows from the [`TokenList`] it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    /// Command name followed by its arguments. Empty when the line starts with `>`.
    pub argv: &'a [String],
    /// File that receives the command's standard output.
    pub redirect_target: Option<&'a str>,
}

impl<'a> ParsedCommand<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.argv.first().map(String::as_str)
    }
}

/// Separate an output redirection from the command.
///
/// Only the first `>` counts. It must be followed by exactly one token, the target;
/// everything from `>` on is removed from the argument vector.
pub fn parse_redirection(tokens: &TokenList) -> Result<ParsedCommand<'_>, ShellError> {
    let all = tokens.as_slice();
    let Some(op) = all.iter().position(|t| t == REDIRECT_OP) else {
        return Ok(ParsedCommand {
            argv: all,
            redirect_target: None,
        });
    };

    match &all[op + 1..] {
        [] => Err(ShellError::MalformedRedirection("missing target after '>'")),
        [target] => Ok(ParsedCommand {
            argv: &all[..op],
            redirect_target: Some(target.as_str()),
        }),
        _ => Err(ShellError::MalformedRedirection("more than one target after '>'")),
    }
}
