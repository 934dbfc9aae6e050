use std::io::{self, Write};
use std::path::PathBuf;

/// The only diagnostic the shell ever shows for a failure.
///
/// Callers never learn which of the [`ShellError`] variants happened; the detailed
/// text is available to the `tracing` subscriber only.
pub const GENERIC_ERROR: &str = "An error has occurred\n";

/// Everything that can go wrong while running the shell.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Wrong number of program arguments.
    #[error("invalid invocation: {0}")]
    Invocation(String),

    #[error("cannot open batch file {path}")]
    BatchFileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read a command line")]
    LineRead(#[source] io::Error),

    #[error("malformed redirection: {0}")]
    MalformedRedirection(&'static str),

    /// `exit`/`quit` with arguments, `cd` without exactly one argument.
    #[error("{name}: bad arguments: {reason}")]
    BuiltinArguments { name: String, reason: String },

    #[error("cd: cannot change directory to {target}")]
    ChangeDirectory {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("invalid redirect target {0:?}")]
    RedirectTarget(String),

    /// Fork, redirect-open in the child and exec failures all come back through spawn.
    #[error("cannot run {program}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot wait for child {pid}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Write [`GENERIC_ERROR`] to `stderr`.
///
/// A failure to write the diagnostic itself is ignored: there is nowhere left to report it.
pub fn report_error(stderr: &mut dyn Write, err: &ShellError) {
    tracing::debug!(error = %err, cause = ?std::error::Error::source(err), "reporting error");
    let _ = stderr.write_all(GENERIC_ERROR.as_bytes());
    let _ = stderr.flush();
}
