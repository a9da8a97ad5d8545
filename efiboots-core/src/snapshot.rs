// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`Snapshot`], the parsed state of the firmware boot variables at one point in time.
//!
//! A [`Snapshot`] is produced once per refresh by the output parser and is never changed afterwards.
//! Edits are tracked separately by [`crate::registry::BootRegistry`].

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde::Serialize;

pub mod types;

use crate::snapshot::types::BootNum;

/// A single firmware boot entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BootEntry {
    /// The boot number of the entry.
    pub num: BootNum,

    /// If the entry is marked active.
    pub active: bool,

    /// The display name of the entry.
    pub name: String,

    /// The loader path, if the device path of the entry contains a file node.
    pub loader: String,

    /// The optional data passed to the loader.
    pub parameters: String,
}

/// The state of the boot variables as reported by the tool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Every known entry, keyed by boot number.
    entries: BTreeMap<BootNum, BootEntry>,

    /// The `BootOrder` variable.
    boot_order: Vec<BootNum>,

    /// The `BootNext` variable.
    boot_next: Option<BootNum>,

    /// The `BootCurrent` variable.
    boot_current: Option<BootNum>,

    /// The `Timeout` variable in seconds.
    timeout: Option<u32>,

    /// Every boot number the firmware is known to use, including ones that were dropped or could not be parsed.
    #[serde(skip)]
    reserved: BTreeSet<BootNum>,
}

impl Snapshot {
    /// Assembles a [`Snapshot`] from its parts.
    ///
    /// Ids in the boot order, boot next or boot current that do not name a known entry are dropped
    /// with a warning, as are repeated ids in the boot order. If two entries share a boot number, the
    /// later one wins. Every boot number passed in stays reserved, see [`Snapshot::reserved`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(
        entries: impl IntoIterator<Item = BootEntry>,
        boot_order: Vec<BootNum>,
        boot_next: Option<BootNum>,
        boot_current: Option<BootNum>,
        timeout: Option<u32>,
    ) -> Self {
        let entries: BTreeMap<_, _> = entries.into_iter().map(|x| (x.num.clone(), x)).collect();
        let reserved = entries
            .keys()
            .chain(&boot_order)
            .chain(&boot_next)
            .chain(&boot_current)
            .cloned()
            .collect();

        let mut seen = BTreeSet::new();
        let boot_order = boot_order
            .into_iter()
            .filter(|num| {
                if !entries.contains_key(num) {
                    warn!("BootOrder references unknown entry {num}, dropping it");
                    false
                } else if !seen.insert(num.clone()) {
                    warn!("BootOrder lists entry {num} more than once, dropping the repeat");
                    false
                } else {
                    true
                }
            })
            .collect();

        let known = |field: &str, num: Option<BootNum>| {
            num.filter(|num| {
                let found = entries.contains_key(num);
                if !found {
                    warn!("{field} references unknown entry {num}, ignoring it");
                }
                found
            })
        };
        let boot_next = known("BootNext", boot_next);
        let boot_current = known("BootCurrent", boot_current);

        Self {
            entries,
            boot_order,
            boot_next,
            boot_current,
            timeout,
            reserved,
        }
    }

    /// Mark more boot numbers as used, such as those of entry lines that could not be parsed.
    #[must_use = "Has no effect if the result is unused"]
    pub fn reserve(mut self, nums: impl IntoIterator<Item = BootNum>) -> Self {
        self.reserved.extend(nums);
        self
    }

    /// Get every boot number the firmware is known to use.
    ///
    /// This is a superset of the entry numbers. A new entry must never be created with one of these.
    pub fn reserved(&self) -> impl Iterator<Item = &BootNum> {
        self.reserved.iter()
    }

    /// Get an entry by its boot number.
    #[must_use = "Has no effect if the result is unused"]
    pub fn entry(&self, num: &BootNum) -> Option<&BootEntry> {
        self.entries.get(num)
    }

    /// Get every entry, sorted by boot number.
    pub fn entries(&self) -> impl Iterator<Item = &BootEntry> {
        self.entries.values()
    }

    /// Get the number of entries.
    #[must_use = "Has no effect if the result is unused"]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if there are no entries.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the boot order.
    #[must_use = "Has no effect if the result is unused"]
    pub fn boot_order(&self) -> &[BootNum] {
        &self.boot_order
    }

    /// Get the one shot boot override.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn boot_next(&self) -> Option<&BootNum> {
        self.boot_next.as_ref()
    }

    /// Get the entry the running system was booted from.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn boot_current(&self) -> Option<&BootNum> {
        self.boot_current.as_ref()
    }

    /// Get the boot menu timeout.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn timeout(&self) -> Option<u32> {
        self.timeout
    }
}
