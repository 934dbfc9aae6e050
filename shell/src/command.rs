use crate::env::Environment;
use crate::error::ShellError;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Object-safe trait for any command that can be executed by the shell.
///
/// Implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Run the command to completion.
    fn execute(self: Box<Self>, env: &mut Environment) -> Result<(), ShellError>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
