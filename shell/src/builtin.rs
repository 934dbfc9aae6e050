use crate::command::{CommandFactory, ExecutableCommand};
use crate::env::Environment;
use crate::error::ShellError;
use argh::{EarlyExit, FromArgs};
use std::env;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process. They run before any redirection parsing or path lookup, so their
/// output can never be redirected.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Every name the command answers to, e.g. `["exit", "quit"]`.
    fn names() -> &'static [&'static str];

    fn execute(self, env: &mut Environment) -> Result<(), ShellError>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, env: &mut Environment) -> Result<(), ShellError> {
        T::execute(*self, env)
    }
}

/// Arguments a built-in refused, including `exit --help`: the built-in does not run.
struct InvalidArgs {
    name: String,
    output: String,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, _env: &mut Environment) -> Result<(), ShellError> {
        Err(ShellError::BuiltinArguments {
            name: self.name,
            reason: self.output.trim_end().to_string(),
        })
    }
}

/// Factory allows creating instances of a [`BuiltinCommand`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if !T::names().contains(&name) {
            return None;
        }
        Some(match T::from_args(&[name], args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, .. }) => Box::new(InvalidArgs {
                name: name.to_string(),
                output,
            }),
        })
    }
}

/// Every built-in, in dispatch order.
pub(crate) fn default_builtins() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Exit>::default()),
        Box::new(CdFactory),
    ]
}

#[derive(FromArgs)]
/// Leave the shell with status 0. Takes no arguments.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn names() -> &'static [&'static str] {
        &["exit", "quit"]
    }

    fn execute(self, env: &mut Environment) -> Result<(), ShellError> {
        env.should_exit = true;
        Ok(())
    }
}

/// Change the current working directory.
///
/// Not an argh command: the target is handed to `chdir` verbatim, so directories
/// named `-`, `-foo` or `--help` are valid targets.
pub struct Cd {
    /// directory to switch to; absolute or relative to the current directory.
    pub target: String,
}

/// Creates [`Cd`] when exactly one argument is given.
pub(crate) struct CdFactory;

impl CommandFactory for CdFactory {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name != "cd" {
            return None;
        }
        Some(match args {
            [target] => Box::new(Cd {
                target: target.to_string(),
            }),
            _ => Box::new(InvalidArgs {
                name: name.to_string(),
                output: format!("expected one directory, got {} arguments", args.len()),
            }),
        })
    }
}

impl ExecutableCommand for Cd {
    fn execute(self: Box<Self>, _env: &mut Environment) -> Result<(), ShellError> {
        env::set_current_dir(&self.target).map_err(|source| ShellError::ChangeDirectory {
            target: self.target.clone(),
            source,
        })?;
        tracing::debug!(dir = %self.target, "changed directory");
        Ok(())
    }
}
