// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Runs a compiled script with elevated privileges.

use efiboots_core::{BootResult, system::process::CommandRunner};
use log::info;

/// The program that elevates privileges.
const PKEXEC: &str = "pkexec";

/// Build the arguments that run `script` through `sh`.
///
/// With `halt_on_error`, the shell stops at the first failing command. Otherwise every command runs and only the
/// status of the last one counts.
fn shell_args(script: &str, halt_on_error: bool) -> Vec<&str> {
    let mut args = vec!["sh"];
    if halt_on_error {
        args.push("-e");
    }
    args.extend(["-c", script]);
    args
}

/// Run `script` as root through `pkexec`, returning what it printed.
///
/// # Errors
///
/// May return an `Error` if `pkexec` is missing, authorization was refused, or the script failed.
pub fn execute(runner: &impl CommandRunner, script: &str, halt_on_error: bool) -> BootResult<String> {
    info!("Executing script with {PKEXEC}");
    runner.run(PKEXEC, &shell_args(script, halt_on_error))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Records what it was asked to run.
    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl CommandRunner for Recorder {
        fn run(&self, program: &str, args: &[&str]) -> BootResult<String> {
            let mut calls = self.0.borrow_mut();
            calls.push(program.to_owned());
            calls.extend(args.iter().map(ToString::to_string));
            Ok(String::new())
        }
    }

    #[test]
    fn test_halt_on_error() -> BootResult<()> {
        let runner = Recorder::default();
        execute(&runner, "reboot\n", true)?;
        assert_eq!(*runner.0.borrow(), ["pkexec", "sh", "-e", "-c", "reboot\n"]);
        Ok(())
    }

    #[test]
    fn test_continue_on_error() {
        assert_eq!(shell_args("reboot\n", false), ["sh", "-c", "reboot\n"]);
    }
}
