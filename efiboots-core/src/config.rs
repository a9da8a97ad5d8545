// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`EfibootsConfig`], the configuration file for the frontends.
//!
//! This parses space separated key value pairs, the format of which is defined in
//! the [`EfibootsConfig`] struct.
//!
//! Example configuration:
//!
//! ```text
//! # The utility to run, either a name on PATH or a full path
//! tool /usr/bin/efibootmgr
//!
//! # The EFI System Partition that scripts are written against
//! disk /dev/nvme0n1
//! part 1
//!
//! # How much to log, from error to trace
//! log_level info
//!
//! # Stop the script at the first failing command
//! halt_on_error true
//!
//! # Whether to escape a Flatpak sandbox: auto, always or never
//! flatpak auto
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{LevelFilter, warn};
use thiserror::Error;

use crate::{
    efibootmgr::EFIBOOTMGR,
    script::target::{EspTarget, TargetError},
    system::{log_backend::level_from_str, process::SandboxMode},
};

/// The configuration path that is used when none is given.
pub const CONFIG_PATH: &str = "/etc/efiboots.conf";

/// An `Error` that may result from loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("could not read {path}: {source}")]
    Read {
        /// The path of the file.
        path: PathBuf,

        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// The configuration file for the frontends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EfibootsConfig {
    /// The utility to run.
    pub tool: String,

    /// The disk of the ESP.
    pub disk: Option<String>,

    /// The partition number of the ESP.
    pub part: Option<String>,

    /// The most verbose level that is logged.
    pub log_level: LevelFilter,

    /// If a script stops at the first failing command.
    pub halt_on_error: bool,

    /// Whether to escape a Flatpak sandbox.
    pub flatpak: SandboxMode,
}

impl EfibootsConfig {
    /// Loads the configuration from `path`, or from [`CONFIG_PATH`] if there is none.
    ///
    /// A file that does not exist yields the defaults.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the file exists but could not be read.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
        match fs::read_to_string(path) {
            Ok(content) => Ok(Self::get_config(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            }),
        }
    }

    /// Parses the contents of an [`EfibootsConfig`] format string.
    #[must_use = "Has no effect if the result is unused"]
    pub fn get_config(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once(char::is_whitespace) else {
                warn!("Config line has no value: {line}");
                continue;
            };
            let value = value.trim();
            match &*key.to_ascii_lowercase() {
                "tool" => config.tool = value.to_owned(),
                "disk" => config.disk = Some(value.to_owned()),
                "part" => config.part = Some(value.to_owned()),
                "log_level" => match level_from_str(value) {
                    Some(level) => config.log_level = level,
                    None => warn!("Unknown log level: {value}"),
                },
                "halt_on_error" => match value.parse() {
                    Ok(value) => config.halt_on_error = value,
                    Err(_) => warn!("halt_on_error must be true or false, got {value}"),
                },
                "flatpak" => match SandboxMode::from_str_opt(value) {
                    Some(mode) => config.flatpak = mode,
                    None => warn!("flatpak must be auto, always or never, got {value}"),
                },
                key => warn!("Unknown config key: {key}"),
            }
        }

        config
    }

    /// Get the configured [`EspTarget`], if both the disk and the partition are set.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the disk or the partition is invalid.
    pub fn target(&self) -> Result<Option<EspTarget>, TargetError> {
        match (&self.disk, &self.part) {
            (Some(disk), Some(part)) => EspTarget::parse(disk.as_str(), part).map(Some),
            _ => Ok(None),
        }
    }
}

impl Default for EfibootsConfig {
    fn default() -> Self {
        Self {
            tool: EFIBOOTMGR.to_owned(),
            disk: None,
            part: None,
            log_level: LevelFilter::Warn,
            halt_on_error: true,
            flatpak: SandboxMode::Auto,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_full_config() {
        let config = r"
            # comment
            tool /usr/sbin/efibootmgr
            disk /dev/sda
            part 1
            log_level debug
            halt_on_error false
            flatpak never
        ";

        let config = EfibootsConfig::get_config(config);
        assert_eq!(config.tool, "/usr/sbin/efibootmgr");
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert!(!config.halt_on_error);
        assert_eq!(config.flatpak, SandboxMode::Never);
        assert_eq!(
            config.target().ok().flatten().map(|x| (x.disk().to_owned(), x.part())),
            Some(("/dev/sda".to_owned(), 1))
        );
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = EfibootsConfig::get_config("log_level loud\nhalt_on_error maybe\nflatpak sometimes\nnonsense");
        assert_eq!(config, EfibootsConfig::default());
        assert_eq!(config.target(), Ok(None));
    }

    #[test]
    fn test_last_value_wins() {
        let config = EfibootsConfig::get_config("part 1\npart 3\ndisk /dev/vda");
        assert_eq!(config.target().ok().flatten().map(|x| x.part()), Some(3));
    }

    #[test]
    fn test_missing_file() {
        let config = EfibootsConfig::load(Some(Path::new("/nonexistent/efiboots.conf")));
        assert_eq!(config.ok(), Some(EfibootsConfig::default()));
    }

    proptest! {
        #[test]
        fn doesnt_panic(s in "\\PC*") {
            let _ = EfibootsConfig::get_config(&s);
        }
    }
}
