// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The EFI System Partition that every command of a script refers to.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Splits a partition device such as `/dev/sda1` or `/dev/nvme0n1p1` into its disk and partition number.
static DEVICE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z/]+[0-9a-z]*?)p?([0-9]+)$")
        .unwrap_or_else(|_| unreachable!("The device pattern should always compile"))
});

/// An `Error` that may result from building an [`EspTarget`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// The disk was empty.
    #[error("the disk of the ESP is empty")]
    EmptyDisk,

    /// The partition was not a positive number.
    #[error("\"{0}\" is not a valid partition number")]
    InvalidPartition(String),

    /// The device could not be split into a disk and a partition.
    #[error("\"{0}\" does not look like a partition device")]
    InvalidDevice(String),
}

/// A disk and a partition number on it, as passed to `--disk` and `--part`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EspTarget {
    /// The disk device, such as `/dev/nvme0n1`.
    disk: String,

    /// The one based partition number.
    part: u32,
}

impl EspTarget {
    /// Creates a new [`EspTarget`].
    ///
    /// # Errors
    ///
    /// May return an `Error` if the disk is empty or the partition is zero.
    pub fn new(disk: impl Into<String>, part: u32) -> Result<Self, TargetError> {
        let disk = disk.into();
        if disk.is_empty() {
            return Err(TargetError::EmptyDisk);
        }
        if part == 0 {
            return Err(TargetError::InvalidPartition(part.to_string()));
        }
        Ok(Self { disk, part })
    }

    /// Creates a new [`EspTarget`] from a partition number that is still a string.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the disk is empty or the partition is not a positive number.
    pub fn parse(disk: impl Into<String>, part: &str) -> Result<Self, TargetError> {
        let part = part
            .trim()
            .parse()
            .map_err(|_| TargetError::InvalidPartition(part.to_owned()))?;
        Self::new(disk, part)
    }

    /// Creates a new [`EspTarget`] from a partition device, such as `/dev/sda1`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the device does not end in a partition number.
    pub fn from_device(device: &str) -> Result<Self, TargetError> {
        let caps = DEVICE_REGEX
            .captures(device)
            .ok_or_else(|| TargetError::InvalidDevice(device.to_owned()))?;
        let disk = caps.get(1).map_or("", |x| x.as_str());
        let part = caps.get(2).map_or("", |x| x.as_str());
        Self::parse(disk, part)
    }

    /// Get the disk device.
    #[must_use = "Has no effect if the result is unused"]
    pub fn disk(&self) -> &str {
        &self.disk
    }

    /// Get the partition number.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn part(&self) -> u32 {
        self.part
    }
}
