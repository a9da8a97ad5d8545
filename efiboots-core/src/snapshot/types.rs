// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! `newtype` definitions for boot entry identifiers.
//!
//! At the moment, this includes the following type definitions:
//! - [`BootNum`] (constructor enforces one or more uppercase hexadecimal digits)
//! - [`BootId`] (either an existing [`BootNum`] or a synthetic id of a pending addition)

use core::{fmt, ops::Deref};

use serde::Serialize;
use thiserror::Error;

/// The prefix of synthetic ids handed out to pending additions.
pub const SYNTHETIC_PREFIX: &str = "NEW";

/// Errors that may happen from invalid inputs to the respective constructors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The boot number was not made of uppercase hexadecimal digits.
    #[error("\"{0}\" is not a valid boot number")]
    BootNum(String),

    /// The id was neither a boot number nor a synthetic id.
    #[error("\"{0}\" is not a valid boot id")]
    BootId(String),
}

/// A newtype wrapper around a boot number as printed by `efibootmgr`, such as `0000` or `001A`.
///
/// Boot numbers are case sensitive. Lowercase digits are rejected rather than normalized, because
/// the tool itself only ever prints uppercase ones.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BootNum(String);

impl BootNum {
    /// Creates a new [`BootNum`].
    ///
    /// # Errors
    ///
    /// May return an `Error` if the boot number is empty or contains anything other than `0-9` and `A-F`.
    pub fn new(num: &str) -> Result<Self, TypeError> {
        if !num.is_empty() && num.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F')) {
            Ok(Self(num.to_owned()))
        } else {
            Err(TypeError::BootNum(num.to_owned()))
        }
    }

    /// Creates a four digit [`BootNum`] from its numeric value.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_value(value: u16) -> Self {
        Self(format!("{value:04X}"))
    }

    /// Returns the numeric value of the [`BootNum`], if it fits in a `u16`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn value(&self) -> Option<u16> {
        u16::from_str_radix(&self.0, 16).ok()
    }
}

impl Deref for BootNum {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for BootNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// The identity of an entry in the live model.
///
/// Entries that came from the tool are identified by their [`BootNum`]. Entries that were added
/// by the user and do not exist yet get a synthetic id, `NEW0`, `NEW1` and so on.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BootId {
    /// An entry that exists in the snapshot.
    Existing(BootNum),

    /// A pending addition, numbered in creation order.
    Synthetic(u32),
}

impl BootId {
    /// Parses a [`BootId`] from either a boot number or a synthetic id.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the string is neither.
    pub fn parse(id: &str) -> Result<Self, TypeError> {
        if let Some(n) = id.strip_prefix(SYNTHETIC_PREFIX)
            && let Ok(n) = n.parse()
        {
            return Ok(Self::Synthetic(n));
        }
        BootNum::new(id)
            .map(Self::Existing)
            .map_err(|_| TypeError::BootId(id.to_owned()))
    }

    /// Checks if the id belongs to a pending addition.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }

    /// Returns the [`BootNum`] of an existing entry.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn as_num(&self) -> Option<&BootNum> {
        match self {
            Self::Existing(num) => Some(num),
            Self::Synthetic(_) => None,
        }
    }
}

impl From<BootNum> for BootId {
    fn from(value: BootNum) -> Self {
        Self::Existing(value)
    }
}

impl fmt::Display for BootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing(num) => num.fmt(f),
            Self::Synthetic(n) => f.pad(&format!("{SYNTHETIC_PREFIX}{n}")),
        }
    }
}

impl Serialize for BootId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
