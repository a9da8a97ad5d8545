// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The adapter for the `efibootmgr` utility.
//!
//! [`Efibootmgr`] asks the tool for its version once, picks the matching [`Dialect`], and from then on reads
//! snapshots with the arguments that dialect needs.

use log::info;

use crate::{
    BootResult,
    efibootmgr::{
        dialect::Dialect,
        parser::{ParseOutput, parse},
    },
    system::process::{CommandRunner, HostRunner},
};

pub mod decode;
pub mod dialect;
pub mod parser;

/// The default name of the utility.
pub const EFIBOOTMGR: &str = "efibootmgr";

/// A handle to an installed `efibootmgr` of a known [`Dialect`].
pub struct Efibootmgr<R: CommandRunner = HostRunner> {
    /// Runs the tool.
    runner: R,

    /// The program name or path.
    program: String,

    /// The detected output dialect.
    dialect: Dialect,
}

impl<R: CommandRunner> Efibootmgr<R> {
    /// Query the version of `program` and pick the [`Dialect`] for it.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the tool could not be run, or if its version is missing or unsupported.
    pub fn detect(runner: R, program: impl Into<String>) -> BootResult<Self> {
        let program = program.into();
        let output = runner.run(&program, &["--version"])?;
        let dialect = Dialect::detect(&output)?;
        Ok(Self::with_dialect(runner, program, dialect))
    }

    /// Create an [`Efibootmgr`] with an already known [`Dialect`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn with_dialect(runner: R, program: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            runner,
            program: program.into(),
            dialect,
        }
    }

    /// Get the detected [`Dialect`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Get the program name or path.
    #[must_use = "Has no effect if the result is unused"]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the tool with the arguments of the dialect and return what it printed.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the tool could not be run or printed invalid UTF-8.
    pub fn raw_output(&self) -> BootResult<String> {
        self.runner.run(&self.program, self.dialect.snapshot_args())
    }

    /// Read the current state of the boot variables.
    ///
    /// Lines that could not be parsed do not fail the read, they are returned in
    /// [`ParseOutput::diagnostics`].
    ///
    /// # Errors
    ///
    /// May return an `Error` if the tool could not be run or printed invalid UTF-8.
    pub fn snapshot(&self) -> BootResult<ParseOutput> {
        let output = self.raw_output()?;
        let parsed = parse(self.dialect, output.lines());
        info!(
            "Read {} boot entries from version {} output ({} unparsable lines)",
            parsed.snapshot.len(),
            self.dialect.as_str(),
            parsed.diagnostics.len()
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{
        efibootmgr::parser::tests::{V17_OUTPUT, V18_OUTPUT},
        error::BootError,
        snapshot::tests::num_of,
    };

    /// A [`CommandRunner`] that answers with canned output and remembers what it was asked.
    struct ScriptedRunner {
        /// The output of `--version`.
        version: &'static str,

        /// The output of the snapshot query.
        output: &'static str,

        /// Every argument list that was run.
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn new(version: &'static str, output: &'static str) -> Self {
            Self {
                version,
                output,
                calls: RefCell::default(),
            }
        }
    }

    impl CommandRunner for &ScriptedRunner {
        fn run(&self, _program: &str, args: &[&str]) -> BootResult<String> {
            self.calls
                .borrow_mut()
                .push(args.iter().map(ToString::to_string).collect());
            if args == ["--version"] {
                Ok(self.version.to_owned())
            } else {
                Ok(self.output.to_owned())
            }
        }
    }

    #[test]
    fn test_v18_round_trip() -> BootResult<()> {
        let runner = ScriptedRunner::new("version 18\n", V18_OUTPUT);
        let tool = Efibootmgr::detect(&runner, EFIBOOTMGR)?;
        assert_eq!(tool.dialect(), Dialect::V18);

        let parsed = tool.snapshot()?;
        assert_eq!(parsed.snapshot.len(), 3);
        assert_eq!(
            runner.calls.borrow().last().map(Vec::as_slice),
            Some(&["--unicode".to_owned()][..])
        );
        Ok(())
    }

    #[test]
    fn test_v17_round_trip() -> BootResult<()> {
        let runner = ScriptedRunner::new("version 17\n", V17_OUTPUT);
        let tool = Efibootmgr::detect(&runner, EFIBOOTMGR)?;
        assert_eq!(tool.dialect(), Dialect::V17);

        let parsed = tool.snapshot()?;
        assert_eq!(
            parsed.snapshot.entry(&num_of("0000")).map(|x| x.parameters.as_str()),
            Some("root=/dev/sda2")
        );
        assert_eq!(
            runner.calls.borrow().last().map(Vec::as_slice),
            Some(&["-v".to_owned()][..])
        );
        Ok(())
    }

    #[test]
    fn test_unsupported_version() {
        let runner = ScriptedRunner::new("version 99\n", "");
        assert!(matches!(
            Efibootmgr::detect(&runner, EFIBOOTMGR),
            Err(BootError::UnsupportedVersion(v)) if v == "99"
        ));
    }
}
