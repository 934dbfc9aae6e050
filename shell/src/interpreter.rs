use crate::builtin::default_builtins;
use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::error::{ShellError, report_error};
use crate::external::{ExternalCommand, find_command_path};
use crate::io_adapters::LineSource;
use crate::lexer;
use crate::parser;
use std::io::Write;
use tracing::debug;

/// What the loop does after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The read-tokenize-dispatch-execute loop.
///
/// Built-ins are tried first and short-circuit everything else. Other commands go
/// through redirection parsing, path resolution and spawn-and-wait. Every failure
/// is reported as the same generic diagnostic and the loop goes on.
///
/// Example
/// ```no_run
/// use msh::{BufferedSource, Interpreter};
/// let mut sh = Interpreter::default();
/// let mut script = BufferedSource::new(std::io::Cursor::new("echo hello\nexit\n"));
/// assert_eq!(sh.repl(&mut script), 0);
/// ```
pub struct Interpreter {
    env: Environment,
    builtins: Vec<Box<dyn CommandFactory>>,
    stderr: Box<dyn Write>,
}

impl Interpreter {
    /// Create an interpreter that reports errors to `stderr`.
    pub fn new(env: Environment, stderr: Box<dyn Write>) -> Self {
        Self {
            env,
            builtins: default_builtins(),
            stderr,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Process lines until `exit`/`quit` or end of input. Returns the exit status.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> ExitCode {
        loop {
            let line = match source.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("end of input");
                    return 0;
                }
                Err(err) => {
                    report_error(&mut self.stderr, &err);
                    continue;
                }
            };

            match self.execute_line(line.as_str()) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => return 0,
                Err(err) => report_error(&mut self.stderr, &err),
            }
        }
    }

    /// Handle one command line.
    ///
    /// The tokens live only for the duration of this call; whichever branch returns,
    /// they are released with it.
    pub fn execute_line(&mut self, line: &str) -> Result<Flow, ShellError> {
        let tokens = lexer::split_into_tokens(line);
        let Some(name) = tokens.first() else {
            return Ok(Flow::Continue);
        };
        debug!(?tokens, "tokenized line");

        let args: Vec<&str> = tokens.iter().skip(1).collect();
        if let Some(builtin) = self
            .builtins
            .iter()
            .find_map(|factory| factory.try_create(name, &args))
        {
            builtin.execute(&mut self.env)?;
            return Ok(if self.env.should_exit {
                Flow::Exit
            } else {
                Flow::Continue
            });
        }

        let parsed = parser::parse_redirection(&tokens)?;
        let command_name = parsed.name().unwrap_or_default();
        let program = find_command_path(&self.env.search_path, command_name)
            .ok_or_else(|| ShellError::CommandNotFound(command_name.to_string()))?;
        debug!(program = %program.display(), redirect = ?parsed.redirect_target, "resolved command");

        let command = Box::new(ExternalCommand::new(
            program,
            parsed.argv,
            parsed.redirect_target,
        ));
        command.execute(&mut self.env)?;
        Ok(Flow::Continue)
    }
}

impl Default for Interpreter {
    /// Default search path, errors to the process's standard error.
    fn default() -> Self {
        Self::new(Environment::default(), Box::new(std::io::stderr()))
    }
}
