//! External process execution.
//!
//! Every tool cake drives (cmake, vcpkg, debuggers, git, the user's own
//! binaries) goes through a [`ProcessRunner`]. Commands are argv-style: the
//! program and each argument are discrete strings, nothing is handed to a
//! shell.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program followed by the arguments, as owned strings (lossy).
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_word(f, &self.program)?;
        for arg in &self.args {
            f.write_str(" ")?;
            write_word(f, arg)?;
        }
        Ok(())
    }
}

fn write_word(f: &mut fmt::Formatter<'_>, word: &OsStr) -> fmt::Result {
    let word = word.to_string_lossy();
    if word.is_empty() || word.contains(char::is_whitespace) {
        write!(f, "\"{}\"", word)
    } else {
        f.write_str(&word)
    }
}

/// Ways running an external command can fail.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The child process could not be created.
    #[error("Could not spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The program could not be found or loaded.
    #[error("Could not execute `{command}`: {source}")]
    Exec {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The child ran and returned a non-zero status.
    #[error("`{command}` exited with exit code {code}")]
    NonZeroExit { command: String, code: i32 },

    /// The child was killed by a signal.
    #[error("`{command}` was terminated by signal {signal}")]
    Signal { command: String, signal: i32 },
}

/// Runs commands to completion.
pub trait ProcessRunner {
    /// Run `command`, blocking until it exits.
    fn run(&self, command: &CommandLine) -> Result<(), ProcessError>;
}

/// Runs commands as real child processes with inherited stdio, so tool
/// output streams straight to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> Result<(), ProcessError> {
        tracing::debug!("Executing \"{}\"", command);

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .spawn()
            .map_err(|source| spawn_error(command, source))?;

        let status = child.wait().map_err(|source| ProcessError::Spawn {
            command: command.to_string(),
            source,
        })?;

        check_status(command, status)
    }
}

fn spawn_error(command: &CommandLine, source: io::Error) -> ProcessError {
    let command = command.to_string();
    match source.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            ProcessError::Exec { command, source }
        }
        _ => ProcessError::Spawn { command, source },
    }
}

fn check_status(command: &CommandLine, status: ExitStatus) -> Result<(), ProcessError> {
    if status.success() {
        return Ok(());
    }

    if let Some(code) = status.code() {
        return Err(ProcessError::NonZeroExit {
            command: command.to_string(),
            code,
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(ProcessError::Signal {
                command: command.to_string(),
                signal,
            });
        }
    }

    Err(ProcessError::NonZeroExit {
        command: command.to_string(),
        code: -1,
    })
}

/// Records commands instead of running them.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingRunner {
    pub commands: std::cell::RefCell<Vec<CommandLine>>,
    /// Programs that fail with exit code 1.
    pub failing: Vec<OsString>,
}

#[cfg(test)]
impl RecordingRunner {
    pub fn failing_on(programs: &[&str]) -> Self {
        Self {
            commands: Default::default(),
            failing: programs.iter().map(OsString::from).collect(),
        }
    }

    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.commands.borrow().iter().map(CommandLine::argv).collect()
    }
}

#[cfg(test)]
impl ProcessRunner for RecordingRunner {
    fn run(&self, command: &CommandLine) -> Result<(), ProcessError> {
        self.commands.borrow_mut().push(command.clone());
        if self.failing.contains(&command.program) {
            return Err(ProcessError::NonZeroExit {
                command: command.to_string(),
                code: 1,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_display() {
        let cmd = CommandLine::new("cmake")
            .arg("-S")
            .arg(".")
            .args(["-B", "out dir", ""]);

        assert_eq!(cmd.to_string(), "cmake -S . -B \"out dir\" \"\"");
        assert_eq!(cmd.argv(), vec!["cmake", "-S", ".", "-B", "out dir", ""]);
    }

    #[test]
    fn test_missing_program_is_exec_error() {
        let cmd = CommandLine::new("/nonexistent/cake-test-program");
        let err = SystemRunner.run(&cmd).unwrap_err();

        assert!(matches!(err, ProcessError::Exec { .. }), "got {:?}", err);
        assert!(err.to_string().contains("/nonexistent/cake-test-program"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status() {
        SystemRunner.run(&CommandLine::new("true")).unwrap();

        let err = SystemRunner
            .run(&CommandLine::new("sh").args(["-c", "exit 3"]))
            .unwrap_err();
        assert!(matches!(err, ProcessError::NonZeroExit { code: 3, .. }), "got {:?}", err);

        let err = SystemRunner
            .run(&CommandLine::new("sh").args(["-c", "kill -9 $$"]))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Signal { signal: 9, .. }), "got {:?}", err);
    }
}
