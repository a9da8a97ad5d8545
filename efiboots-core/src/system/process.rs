// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Runs external programs and captures their output.
//!
//! Inside a Flatpak sandbox the host tools are not visible, so every invocation is routed through
//! `flatpak-spawn --host` instead.

use std::{env, io::ErrorKind};

use duct::cmd;
use log::debug;

use crate::{BootResult, error::BootError};

/// The environment variable that is set inside a Flatpak sandbox.
const FLATPAK_ENV: &str = "FLATPAK_ID";

/// The program that escapes the Flatpak sandbox.
const FLATPAK_SPAWN: &str = "flatpak-spawn";

/// Whether invocations should escape a Flatpak sandbox.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SandboxMode {
    /// Escape only when `FLATPAK_ID` is set.
    #[default]
    Auto,

    /// Always run through `flatpak-spawn --host`.
    Always,

    /// Never run through `flatpak-spawn --host`.
    Never,
}

impl SandboxMode {
    /// Parses a [`SandboxMode`] from `auto`, `always` or `never`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_str_opt(mode: &str) -> Option<Self> {
        match mode {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    /// Checks if invocations have to go through `flatpak-spawn`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn escapes(self) -> bool {
        match self {
            Self::Auto => env::var_os(FLATPAK_ENV).is_some(),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Runs a program to completion and returns what it printed.
///
/// This is the seam between the tool adapter and the operating system, so that the adapter can be driven by
/// canned output.
pub trait CommandRunner {
    /// Runs `program` with `args`, returning its standard output.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the program does not exist, could not be started, exits with a non zero
    /// status, or prints something that is not valid UTF-8.
    fn run(&self, program: &str, args: &[&str]) -> BootResult<String>;
}

/// A [`CommandRunner`] that runs programs on the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostRunner {
    /// Whether to escape a Flatpak sandbox.
    sandbox: SandboxMode,
}

impl HostRunner {
    /// Constructs a new [`HostRunner`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(sandbox: SandboxMode) -> Self {
        Self { sandbox }
    }

    /// Returns the program and arguments that will actually be executed.
    fn wrap<'a>(&self, program: &'a str, args: &[&'a str]) -> (&'a str, Vec<&'a str>) {
        if self.sandbox.escapes() {
            let mut wrapped = vec!["--host", program];
            wrapped.extend_from_slice(args);
            debug!("Flatpak sandbox detected");
            (FLATPAK_SPAWN, wrapped)
        } else {
            (program, args.to_vec())
        }
    }
}

impl CommandRunner for HostRunner {
    fn run(&self, program: &str, args: &[&str]) -> BootResult<String> {
        let (program, args) = self.wrap(program, args);
        let command = display_command(program, &args);
        debug!("Running: {command}");

        let output = cmd(program, args.iter().copied())
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    BootError::ToolNotFound {
                        tool: program.to_owned(),
                        source: e,
                    }
                } else {
                    BootError::ToolInvocationFailed {
                        command: command.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            return Err(BootError::ToolInvocationFailed {
                command,
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        String::from_utf8(output.stdout).map_err(|source| BootError::Decoding { command, source })
    }
}

/// Joins a program and its arguments for logging and error messages.
fn display_command(program: &str, args: &[&str]) -> String {
    let mut command = program.to_owned();
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_wrapping() {
        let runner = HostRunner::new(SandboxMode::Always);
        let (program, args) = runner.wrap("efibootmgr", &["-v"]);
        assert_eq!(program, FLATPAK_SPAWN);
        assert_eq!(args, ["--host", "efibootmgr", "-v"]);

        let runner = HostRunner::new(SandboxMode::Never);
        let (program, args) = runner.wrap("efibootmgr", &["-v"]);
        assert_eq!(program, "efibootmgr");
        assert_eq!(args, ["-v"]);
    }

    #[test]
    fn test_sandbox_mode_names() {
        assert_eq!(SandboxMode::from_str_opt("auto"), Some(SandboxMode::Auto));
        assert_eq!(SandboxMode::from_str_opt("never"), Some(SandboxMode::Never));
        assert_eq!(SandboxMode::from_str_opt("sometimes"), None);
    }

    #[test]
    fn test_missing_program() {
        let runner = HostRunner::new(SandboxMode::Never);
        assert!(matches!(
            runner.run("efiboots-this-program-does-not-exist", &[]),
            Err(BootError::ToolNotFound { .. })
        ));
    }

    #[test]
    fn test_display_command() {
        assert_eq!(
            display_command("pkexec", &["sh", "-c", "reboot"]),
            "pkexec sh -c reboot"
        );
    }
}
