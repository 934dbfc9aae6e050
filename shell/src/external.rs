use crate::command::{ExecutableCommand, ExitCode};
use crate::env::{Environment, SearchPath};
use crate::error::ShellError;
use nix::fcntl::{OFlag, open};
use nix::libc::STDOUT_FILENO;
use nix::sys::stat::Mode;
use nix::unistd::{AccessFlags, access, close, dup2};
use std::ffi::{CStr, CString};
use std::io::{self, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use tracing::debug;

/// Resolve a command name against the search path.
///
/// Each prefix is concatenated with `name` as plain text, so names containing `/` are
/// looked up below every prefix too. The first candidate the current user may execute
/// wins; earlier prefixes shadow later ones.
pub fn find_command_path(search_path: &SearchPath, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    search_path
        .iter()
        .map(|prefix| PathBuf::from(format!("{prefix}{name}")))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    access(path, AccessFlags::X_OK).is_ok()
}

/// A resolved program together with its arguments and optional output file.
pub struct ExternalCommand {
    program: PathBuf,
    argv: Vec<String>,
    redirect: Option<String>,
}

impl ExternalCommand {
    /// `argv[0]` is passed to the child as typed; `program` is what actually runs.
    pub fn new(program: PathBuf, argv: &[String], redirect: Option<&str>) -> Self {
        Self {
            program,
            argv: argv.to_vec(),
            redirect: redirect.map(str::to_string),
        }
    }

    /// Start the child process.
    ///
    /// When a redirect target is set, the child opens it (create, truncate, write-only)
    /// and puts it in place of its standard output before the program image is replaced.
    /// The parent never opens the file.
    pub fn spawn(&self) -> Result<Spawned, ShellError> {
        let mut command = Command::new(&self.program);
        if let Some((name, args)) = self.argv.split_first() {
            command.arg0(name).args(args);
        }

        if let Some(target) = &self.redirect {
            let target = CString::new(target.as_bytes())
                .map_err(|_| ShellError::RedirectTarget(target.clone()))?;
            // SAFETY: the hook runs in the forked child and only calls open, dup2 and
            // close, all async-signal-safe. It does not allocate.
            unsafe {
                command.pre_exec(move || redirect_stdout(&target));
            }
        }

        // Anything still buffered (the prompt) must come out before the child's output.
        let _ = io::stdout().flush();

        let child = command.spawn().map_err(|source| ShellError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        let spawned = Spawned { child };
        debug!(pid = spawned.id(), program = %self.program.display(), "spawned child");
        Ok(spawned)
    }
}

fn redirect_stdout(target: &CStr) -> io::Result<()> {
    let fd = open(
        target,
        OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        Mode::from_bits_truncate(0o666),
    )?;
    if fd != STDOUT_FILENO {
        dup2(fd, STDOUT_FILENO)?;
        close(fd)?;
    }
    Ok(())
}

impl ExecutableCommand for ExternalCommand {
    /// Spawn and wait. The child's exit status is not reported to the user.
    fn execute(self: Box<Self>, _env: &mut Environment) -> Result<(), ShellError> {
        let status = self.spawn()?.wait()?;
        debug!(
            program = %self.program.display(),
            code = status_code(status),
            "child finished"
        );
        Ok(())
    }
}

/// Handle to the one child the shell is waiting for.
#[derive(Debug)]
pub struct Spawned {
    child: Child,
}

impl Spawned {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Block until the child terminates. Consumes the handle: a child is reaped once.
    pub fn wait(mut self) -> Result<ExitStatus, ShellError> {
        let pid = self.child.id();
        self.child
            .wait()
            .map_err(|source| ShellError::Wait { pid, source })
    }
}

/// Shell-style numeric status, for logging.
fn status_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(code) => code,
        None => terminated_by_signal(status),
    }
}

fn terminated_by_signal(status: ExitStatus) -> ExitCode {
    if let Some(signal) = status.signal() {
        128 + signal
    } else if status.core_dumped() {
        255
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn write_tool(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").expect("write tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod tool");
        path
    }

    fn prefix(dir: &Path) -> String {
        format!("{}/", dir.display())
    }

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_finds_sh_on_default_path() {
        let found = find_command_path(&SearchPath::default(), "sh").expect("sh should exist");
        assert!(found.ends_with("sh"));
        assert!(
            found.starts_with("/bin/") || found.starts_with("/usr/bin/"),
            "unexpected location {:?}",
            found
        );
    }

    #[test]
    fn test_unknown_command_not_found() {
        assert!(find_command_path(&SearchPath::default(), "notarealcommand").is_none());
    }

    #[test]
    fn test_empty_name_not_found() {
        assert!(find_command_path(&SearchPath::default(), "").is_none());
    }

    #[test]
    fn test_absolute_name_is_appended_to_prefixes() {
        // "/bin/" + "/bin/sh" is "/bin//bin/sh", which does not exist.
        assert!(find_command_path(&SearchPath::default(), "/bin/sh").is_none());
    }

    #[test]
    fn test_earlier_prefix_shadows_later() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let expected = write_tool(first.path(), "tool", 0o755);
        write_tool(second.path(), "tool", 0o755);

        let path = SearchPath::new([prefix(first.path()), prefix(second.path())]);
        assert_eq!(find_command_path(&path, "tool"), Some(expected));
    }

    #[test]
    fn test_non_executable_is_skipped() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_tool(first.path(), "tool", 0o644);
        let expected = write_tool(second.path(), "tool", 0o755);

        let path = SearchPath::new([prefix(first.path()), prefix(second.path())]);
        assert_eq!(find_command_path(&path, "tool"), Some(expected));
    }

    #[test]
    fn test_redirect_truncates_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        fs::write(&out, "previous content that is longer\n").unwrap();

        let echo = find_command_path(&SearchPath::default(), "echo").expect("echo should exist");
        let target = out.to_string_lossy().to_string();
        let cmd = ExternalCommand::new(echo, &argv(&["echo", "hi"]), Some(&target));
        let status = cmd.spawn().unwrap().wait().unwrap();

        assert!(status.success());
        assert_eq!(fs::read_to_string(&out).unwrap(), "hi\n");
    }

    #[test]
    fn test_redirect_into_missing_directory_fails() {
        let echo = find_command_path(&SearchPath::default(), "echo").expect("echo should exist");
        let cmd = ExternalCommand::new(
            echo,
            &argv(&["echo", "hi"]),
            Some("/no/such/dir/out.txt"),
        );
        assert!(matches!(cmd.spawn(), Err(ShellError::Spawn { .. })));
    }

    #[test]
    fn test_redirect_target_with_nul_is_rejected() {
        let echo = find_command_path(&SearchPath::default(), "echo").expect("echo should exist");
        let cmd = ExternalCommand::new(echo, &argv(&["echo"]), Some("a\0b"));
        assert!(matches!(cmd.spawn(), Err(ShellError::RedirectTarget(_))));
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let cmd = ExternalCommand::new(
            PathBuf::from("/no/such/program"),
            &argv(&["program"]),
            None,
        );
        assert!(matches!(cmd.spawn(), Err(ShellError::Spawn { .. })));
    }

    #[test]
    fn test_exit_status_is_collected_but_not_an_error() {
        let false_cmd = find_command_path(&SearchPath::default(), "false").expect("false exists");
        let status = ExternalCommand::new(false_cmd.clone(), &argv(&["false"]), None)
            .spawn()
            .unwrap()
            .wait()
            .unwrap();
        assert_eq!(status_code(status), 1);

        let cmd = Box::new(ExternalCommand::new(false_cmd, &argv(&["false"]), None));
        assert!(cmd.execute(&mut Environment::default()).is_ok());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_argv0_is_the_typed_name() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("cmdline");
        let cat = find_command_path(&SearchPath::default(), "cat").expect("cat should exist");
        let target = out.to_string_lossy().to_string();
        let cmd = ExternalCommand::new(
            cat,
            &argv(&["cat", "/proc/self/cmdline"]),
            Some(&target),
        );
        cmd.spawn().unwrap().wait().unwrap();

        let cmdline = fs::read(&out).unwrap();
        assert!(cmdline.starts_with(b"cat\0/proc/self/cmdline\0"));
    }
}
