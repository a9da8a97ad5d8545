// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Selects the output dialect from the installed `efibootmgr` version.

use std::sync::LazyLock;

use log::info;
use regex::Regex;
use serde::Serialize;

use crate::{BootResult, error::BootError};

/// Matches the version number in `efibootmgr --version`.
static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"version ([0-9]+)")
        .unwrap_or_else(|_| unreachable!("The version pattern should always compile"))
});

/// The output dialects that can be parsed.
///
/// This is a closed set. Adding support for a new version means adding a variant here and teaching
/// [`Dialect::from_version`] about it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Dialect {
    /// `efibootmgr` 17, which prints loader parameters as raw bytes.
    V17,

    /// `efibootmgr` 18, which can print loader parameters as text with `--unicode`.
    V18,
}

impl Dialect {
    /// Selects the [`Dialect`] from the output of `efibootmgr --version`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the output has no version number, or if the version is not supported.
    pub fn detect(output: &str) -> BootResult<Self> {
        let version = VERSION_REGEX
            .captures(output)
            .and_then(|x| x.get(1))
            .ok_or_else(|| BootError::VersionNotFound(output.trim().to_owned()))?
            .as_str();
        info!("efibootmgr version {version} detected");
        Self::from_version(version)
    }

    /// Selects the [`Dialect`] from a bare version number.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the version is not supported.
    pub fn from_version(version: &str) -> BootResult<Self> {
        match version {
            "17" => Ok(Self::V17),
            "18" => Ok(Self::V18),
            _ => Err(BootError::UnsupportedVersion(version.to_owned())),
        }
    }

    /// The arguments that make `efibootmgr` print everything the parser needs.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn snapshot_args(self) -> &'static [&'static str] {
        match self {
            Self::V17 => &["-v"],
            Self::V18 => &["--unicode"],
        }
    }

    /// Checks if loader parameters have to go through [`super::decode::decode_params`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn decodes_parameters(self) -> bool {
        matches!(self, Self::V17)
    }

    /// Convert a [`Dialect`] into an [`&str`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V17 => "17",
            Self::V18 => "18",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch() {
        assert_eq!(
            Dialect::detect("EFI Boot Manager version 17 ...").ok(),
            Some(Dialect::V17)
        );
        assert_eq!(Dialect::detect("... version 18 ...").ok(), Some(Dialect::V18));
        assert_eq!(Dialect::detect("version 18\n").ok(), Some(Dialect::V18));
        assert_eq!(Dialect::V17.as_str(), "17");
    }

    #[test]
    fn test_unsupported_version() {
        assert!(matches!(
            Dialect::detect("... version 99 ..."),
            Err(BootError::UnsupportedVersion(v)) if v == "99"
        ));
    }

    #[test]
    fn test_no_version() {
        assert!(matches!(
            Dialect::detect("efibootmgr: command not understood"),
            Err(BootError::VersionNotFound(_))
        ));
        assert!(matches!(
            Dialect::detect("version x"),
            Err(BootError::VersionNotFound(_))
        ));
    }

    #[test]
    fn test_dialect_args() {
        assert_eq!(Dialect::V17.snapshot_args(), &["-v"]);
        assert_eq!(Dialect::V18.snapshot_args(), &["--unicode"]);
        assert!(Dialect::V17.decodes_parameters());
        assert!(!Dialect::V18.decodes_parameters());
    }
}
