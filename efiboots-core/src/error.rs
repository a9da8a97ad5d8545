// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`BootError`], which encapsulates other errors

use std::{io, string::FromUtf8Error};

use thiserror::Error;

/// An `Error` resulting from the program.
#[derive(Error, Debug)]
pub enum BootError {
    /// The program could not be found on the host.
    #[error("Tool Not Found Error: {tool}")]
    ToolNotFound {
        /// The program that was looked for.
        tool: String,

        /// The error returned by the operating system.
        #[source]
        source: io::Error,
    },

    /// The program could not be started, or exited with a non zero status.
    #[error("Tool Invocation Error: `{command}` failed: {reason}")]
    ToolInvocationFailed {
        /// The command line that was run.
        command: String,

        /// What went wrong.
        reason: String,
    },

    /// The version output did not contain a version number.
    #[error("Version Error: no version number in {0:?}")]
    VersionNotFound(String),

    /// The version of the tool is not one of the supported versions.
    #[error("Unsupported Version Error: version {0} is not supported")]
    UnsupportedVersion(String),

    /// The output of the program was not valid UTF-8.
    #[error("Decoding Error: output of `{command}` is not valid UTF-8")]
    Decoding {
        /// The command line that was run.
        command: String,

        /// The conversion error.
        #[source]
        source: FromUtf8Error,
    },

    /// An edit referenced an entry that does not exist.
    #[error("Registry Error: {0}")]
    Registry(#[from] crate::registry::RegistryError),

    /// The ESP target was invalid.
    #[error("Target Error: {0}")]
    Target(#[from] crate::script::target::TargetError),

    /// The configuration file could not be loaded.
    #[error("Config Error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
