use anyhow::Context;
use argh::{EarlyExit, FromArgs};
use msh::{
    BufferedSource, GENERIC_ERROR, Interpreter, LineSource, PROMPT, ShellError, Terminal,
};
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// A minimal command interpreter. Runs the commands in BATCH_FILE, or reads them
/// interactively from standard input when no file is given.
struct Invocation {
    #[argh(positional, greedy)]
    /// file to read commands from.
    batch_file: Vec<String>,
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(err) => {
            tracing::debug!(error = ?err, "fatal error");
            let _ = io::stderr().write_all(GENERIC_ERROR.as_bytes());
            ExitCode::from(1)
        }
    }
}

/// Logging is off unless `MSH_LOG` asks for it: standard error belongs to the
/// diagnostic contract.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("MSH_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn run() -> anyhow::Result<i32> {
    let invocation = parse_invocation()?;
    let mut source: Box<dyn LineSource> = match invocation.batch_file.as_slice() {
        [] => interactive_source()?,
        [path] => Box::new(
            BufferedSource::open(path).with_context(|| format!("batch mode on {path}"))?,
        ),
        more => {
            return Err(ShellError::Invocation(format!(
                "expected at most one batch file, got {}",
                more.len()
            ))
            .into());
        }
    };

    let mut interpreter = Interpreter::default();
    Ok(interpreter.repl(source.as_mut()))
}

fn parse_invocation() -> Result<Invocation, ShellError> {
    let args: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let (program, rest) = match args.split_first() {
        Some((program, rest)) => (program.as_str(), rest),
        None => ("msh", &[][..]),
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    Invocation::from_args(&[program], &rest)
        .map_err(|EarlyExit { output, .. }| ShellError::Invocation(output.trim_end().to_string()))
}

/// A line editor on a terminal; otherwise plain reads with the prompt on stdout.
fn interactive_source() -> anyhow::Result<Box<dyn LineSource>> {
    if io::stdin().is_terminal() {
        let terminal = Terminal::new(PROMPT).context("cannot initialise the line editor")?;
        return Ok(Box::new(terminal));
    }
    Ok(Box::new(
        BufferedSource::new(io::stdin().lock()).with_prompt(PROMPT, Box::new(io::stdout())),
    ))
}
