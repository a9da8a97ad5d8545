// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The boot entry editor.
//!
//! [`BootRegistry`] holds the [`Snapshot`] read from the tool together with a [`PendingChanges`] overlay that
//! records every edit made since. The snapshot itself is never modified, so the overlay can always be compared
//! against it to find out what has to be written back. A frontend drives the editor through the methods on
//! [`BootRegistry`] and renders [`BootRegistry::rows`]; on refresh it simply builds a new [`BootRegistry`].

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::snapshot::{
    Snapshot,
    types::{BootId, BootNum},
};

/// The prefix given to the label of a duplicated entry.
const COPY_PREFIX: &str = "Copy of ";

/// An `Error` that may result from editing the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The id does not name a live entry.
    #[error("no entry with id {0}")]
    UnknownEntry(BootId),
}

/// An entry that will be created when the changes are written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Addition {
    /// The label of the new entry.
    pub label: String,

    /// The path of the loader relative to the ESP.
    pub loader: String,

    /// The parameters passed to the loader.
    pub parameters: String,

    /// If the new entry should be active.
    pub active: bool,
}

/// The edits made on top of a [`Snapshot`].
#[derive(Clone, Debug, Default)]
pub struct PendingChanges {
    /// The live boot order. Never contains a removed entry or an addition.
    order: Vec<BootNum>,

    /// The pending additions, keyed by their synthetic number.
    additions: BTreeMap<u32, Addition>,

    /// The synthetic number the next addition gets.
    next_synthetic: u32,

    /// Entries that will be deleted.
    removals: BTreeSet<BootNum>,

    /// Entries that were inactive in the snapshot and are now active.
    activated: BTreeSet<BootNum>,

    /// Entries that were active in the snapshot and are now inactive.
    deactivated: BTreeSet<BootNum>,

    /// The live one shot boot override.
    boot_next: Option<BootId>,

    /// The live timeout.
    timeout: Option<u32>,
}

impl PendingChanges {
    /// Starts with no edits on top of the [`Snapshot`].
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            order: snapshot.boot_order().to_vec(),
            boot_next: snapshot.boot_next().cloned().map(BootId::Existing),
            timeout: snapshot.timeout(),
            ..Self::default()
        }
    }

    /// Get the live boot order.
    #[must_use = "Has no effect if the result is unused"]
    pub fn order(&self) -> &[BootNum] {
        &self.order
    }

    /// Get the pending additions with their synthetic numbers, in creation order.
    pub fn additions(&self) -> impl Iterator<Item = (u32, &Addition)> {
        self.additions.iter().map(|(k, v)| (*k, v))
    }

    /// Get the entries that will be deleted.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn removals(&self) -> &BTreeSet<BootNum> {
        &self.removals
    }

    /// Get the entries that will be marked active.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn activated(&self) -> &BTreeSet<BootNum> {
        &self.activated
    }

    /// Get the entries that will be marked inactive.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn deactivated(&self) -> &BTreeSet<BootNum> {
        &self.deactivated
    }

    /// Get the live one shot boot override.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn boot_next(&self) -> Option<&BootId> {
        self.boot_next.as_ref()
    }

    /// Get the live timeout.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn timeout(&self) -> Option<u32> {
        self.timeout
    }
}

/// One line of the live entry list, as a frontend would display it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Row {
    /// The id of the entry.
    pub id: BootId,

    /// The display name.
    pub name: String,

    /// The loader path.
    pub loader: String,

    /// The loader parameters.
    pub parameters: String,

    /// The live active flag.
    pub active: bool,

    /// If the running system was booted from this entry.
    pub current: bool,

    /// If this entry is the live one shot boot override.
    pub next: bool,
}

/// The editor for a [`Snapshot`].
#[derive(Clone, Debug, Default)]
pub struct BootRegistry {
    /// The state the edits are relative to.
    snapshot: Snapshot,

    /// The edits.
    pending: PendingChanges,
}

impl BootRegistry {
    /// Create a new instance of [`BootRegistry`] with no edits.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(snapshot: Snapshot) -> Self {
        let pending = PendingChanges::from_snapshot(&snapshot);
        Self { snapshot, pending }
    }

    /// Replace the [`Snapshot`], discarding every edit.
    pub fn load(&mut self, snapshot: Snapshot) {
        *self = Self::new(snapshot);
    }

    /// Get the [`Snapshot`] the edits are relative to.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Get the edits.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn pending(&self) -> &PendingChanges {
        &self.pending
    }

    /// Swap two positions of the live boot order.
    ///
    /// Nothing happens if either index is out of range, so moving the first entry up or the last entry down
    /// has no effect.
    pub fn reorder(&mut self, from: usize, to: usize) {
        let len = self.pending.order.len();
        if from < len && to < len {
            self.pending.order.swap(from, to);
        }
    }

    /// Move an entry one position earlier in the boot order.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the entry is not in the live boot order.
    pub fn move_up(&mut self, num: &BootNum) -> Result<(), RegistryError> {
        let idx = self.position(num)?;
        self.reorder(idx, idx.saturating_sub(1));
        Ok(())
    }

    /// Move an entry one position later in the boot order.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the entry is not in the live boot order.
    pub fn move_down(&mut self, num: &BootNum) -> Result<(), RegistryError> {
        let idx = self.position(num)?;
        self.reorder(idx, idx + 1);
        Ok(())
    }

    /// Set the live active flag of an entry.
    ///
    /// For an existing entry the flag is tracked relative to the snapshot, so setting it back to the
    /// original value cancels the edit.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the id does not name a live entry.
    pub fn set_active(&mut self, id: &BootId, active: bool) -> Result<(), RegistryError> {
        match id {
            BootId::Existing(num) => {
                let original = self.original_active(num)?;
                let pending = &mut self.pending;
                if active == original {
                    pending.activated.remove(num);
                    pending.deactivated.remove(num);
                } else if active {
                    pending.deactivated.remove(num);
                    pending.activated.insert(num.clone());
                } else {
                    pending.activated.remove(num);
                    pending.deactivated.insert(num.clone());
                }
            }
            BootId::Synthetic(n) => {
                self.pending
                    .additions
                    .get_mut(n)
                    .ok_or_else(|| RegistryError::UnknownEntry(id.clone()))?
                    .active = active;
            }
        }
        debug!("{id} set to {}", if active { "active" } else { "inactive" });
        Ok(())
    }

    /// Select the one shot boot override.
    ///
    /// Selecting the entry that is already selected clears it.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the id does not name a live entry.
    pub fn set_boot_next(&mut self, id: Option<BootId>) -> Result<(), RegistryError> {
        if let Some(id) = &id
            && !self.contains(id)
        {
            return Err(RegistryError::UnknownEntry(id.clone()));
        }

        if self.pending.boot_next == id {
            self.pending.boot_next = None;
        } else {
            self.pending.boot_next = id;
        }
        debug!("BootNext changed to {:?}", self.pending.boot_next);
        Ok(())
    }

    /// Add a new entry, returning its synthetic id.
    ///
    /// The new entry is not put into the boot order, because the tool places it on creation.
    pub fn add(
        &mut self,
        label: impl Into<String>,
        loader: impl Into<String>,
        parameters: impl Into<String>,
    ) -> BootId {
        let n = self.pending.next_synthetic;
        self.pending.next_synthetic += 1;
        self.pending.additions.insert(
            n,
            Addition {
                label: label.into(),
                loader: loader.into(),
                parameters: parameters.into(),
                active: true,
            },
        );
        let id = BootId::Synthetic(n);
        debug!("Added {id}");
        id
    }

    /// Add a copy of an entry, labelled `Copy of <name>`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the id does not name a live entry.
    pub fn duplicate(&mut self, id: &BootId) -> Result<BootId, RegistryError> {
        let row = self
            .row(id)
            .ok_or_else(|| RegistryError::UnknownEntry(id.clone()))?;
        Ok(self.add(
            format!("{COPY_PREFIX}{}", row.name),
            row.loader,
            row.parameters,
        ))
    }

    /// Remove an entry.
    ///
    /// A pending addition is discarded without a trace. An existing entry is marked for deletion and taken out
    /// of the boot order, and any pending activation change for it is dropped. If the entry was the one shot
    /// boot override, that is cleared too.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the id does not name a live entry.
    pub fn remove(&mut self, id: &BootId) -> Result<(), RegistryError> {
        if !self.contains(id) {
            return Err(RegistryError::UnknownEntry(id.clone()));
        }

        match id {
            BootId::Existing(num) => {
                let pending = &mut self.pending;
                pending.order.retain(|x| x != num);
                pending.activated.remove(num);
                pending.deactivated.remove(num);
                pending.removals.insert(num.clone());
            }
            BootId::Synthetic(n) => {
                self.pending.additions.remove(n);
            }
        }

        if self.pending.boot_next.as_ref() == Some(id) {
            self.pending.boot_next = None;
        }
        debug!("Removed {id}");
        Ok(())
    }

    /// Set the live timeout in seconds.
    pub const fn set_timeout(&mut self, secs: u32) {
        self.pending.timeout = Some(secs);
    }

    /// Checks if anything differs from the [`Snapshot`].
    #[must_use = "Has no effect if the result is unused"]
    pub fn has_pending_changes(&self) -> bool {
        let pending = &self.pending;
        pending.order != self.snapshot.boot_order()
            || pending.boot_next.as_ref().and_then(BootId::as_num) != self.snapshot.boot_next()
            || pending.boot_next.as_ref().is_some_and(BootId::is_synthetic)
            || !pending.additions.is_empty()
            || !pending.removals.is_empty()
            || !pending.activated.is_empty()
            || !pending.deactivated.is_empty()
            || pending.timeout != self.snapshot.timeout()
    }

    /// Checks if the id names a live entry.
    #[must_use = "Has no effect if the result is unused"]
    pub fn contains(&self, id: &BootId) -> bool {
        match id {
            BootId::Existing(num) => {
                self.snapshot.entry(num).is_some() && !self.pending.removals.contains(num)
            }
            BootId::Synthetic(n) => self.pending.additions.contains_key(n),
        }
    }

    /// Get the live row of an entry.
    #[must_use = "Has no effect if the result is unused"]
    pub fn row(&self, id: &BootId) -> Option<Row> {
        if !self.contains(id) {
            return None;
        }
        let next = self.pending.boot_next.as_ref() == Some(id);
        match id {
            BootId::Existing(num) => {
                let entry = self.snapshot.entry(num)?;
                Some(Row {
                    id: id.clone(),
                    name: entry.name.clone(),
                    loader: entry.loader.clone(),
                    parameters: entry.parameters.clone(),
                    active: self.live_active(num, entry.active),
                    current: self.snapshot.boot_current() == Some(num),
                    next,
                })
            }
            BootId::Synthetic(n) => {
                let addition = self.pending.additions.get(n)?;
                Some(Row {
                    id: id.clone(),
                    name: addition.label.clone(),
                    loader: addition.loader.clone(),
                    parameters: addition.parameters.clone(),
                    active: addition.active,
                    current: false,
                    next,
                })
            }
        }
    }

    /// Get every live entry in display order.
    ///
    /// Entries in the live boot order come first, then existing entries that are not in the boot order by boot
    /// number, then pending additions in creation order.
    #[must_use = "Has no effect if the result is unused"]
    pub fn rows(&self) -> Vec<Row> {
        let ordered = self.pending.order.iter().cloned().map(BootId::Existing);
        let unordered = self
            .snapshot
            .entries()
            .map(|x| &x.num)
            .filter(|x| !self.pending.order.contains(x))
            .cloned()
            .map(BootId::Existing);
        let added = self.pending.additions.keys().copied().map(BootId::Synthetic);

        ordered
            .chain(unordered)
            .chain(added)
            .filter_map(|id| self.row(&id))
            .collect()
    }

    /// Get the active flag of an existing entry as it was in the snapshot.
    fn original_active(&self, num: &BootNum) -> Result<bool, RegistryError> {
        if self.pending.removals.contains(num) {
            return Err(RegistryError::UnknownEntry(BootId::Existing(num.clone())));
        }
        self.snapshot
            .entry(num)
            .map(|x| x.active)
            .ok_or_else(|| RegistryError::UnknownEntry(BootId::Existing(num.clone())))
    }

    /// Get the live active flag of an existing entry.
    fn live_active(&self, num: &BootNum, original: bool) -> bool {
        if self.pending.activated.contains(num) {
            true
        } else if self.pending.deactivated.contains(num) {
            false
        } else {
            original
        }
    }

    /// Get the index of an entry in the live boot order.
    fn position(&self, num: &BootNum) -> Result<usize, RegistryError> {
        self.pending
            .order
            .iter()
            .position(|x| x == num)
            .ok_or_else(|| RegistryError::UnknownEntry(BootId::Existing(num.clone())))
    }
}

impl From<Snapshot> for BootRegistry {
    fn from(value: Snapshot) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::snapshot::tests::{num_of, sample};

    /// Shorthand for the id of an existing entry.
    fn id(num: &str) -> BootId {
        BootId::Existing(num_of(num))
    }

    #[test]
    fn test_fresh_registry() {
        let registry = BootRegistry::new(sample());
        assert!(!registry.has_pending_changes());
        assert!(!BootRegistry::default().has_pending_changes());
        let rows = registry.rows();
        assert_eq!(
            rows.iter().map(|x| x.id.to_string()).collect::<Vec<_>>(),
            ["0001", "0000", "0002"]
        );
        assert!(rows[0].current);
        assert!(!rows[2].active);
    }

    #[test]
    fn test_reorder() {
        let mut registry = BootRegistry::new(sample());
        registry.reorder(0, 1);
        assert_eq!(registry.pending().order(), &[num_of("0000"), num_of("0001"), num_of("0002")]);
        assert!(registry.has_pending_changes());
        registry.reorder(0, 1);
        assert!(!registry.has_pending_changes());

        registry.reorder(2, 3);
        registry.reorder(7, 0);
        assert!(!registry.has_pending_changes());
    }

    #[test]
    fn test_move_at_the_edges() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        registry.move_up(&num_of("0001"))?;
        registry.move_down(&num_of("0002"))?;
        assert!(!registry.has_pending_changes());
        registry.move_down(&num_of("0001"))?;
        assert_eq!(registry.pending().order()[1], num_of("0001"));
        assert!(registry.move_up(&num_of("0009")).is_err());
        Ok(())
    }

    #[test]
    fn test_toggle_cancellation() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        registry.set_active(&id("0000"), false)?;
        assert!(registry.pending().deactivated().contains(&num_of("0000")));
        assert!(registry.has_pending_changes());
        registry.set_active(&id("0000"), true)?;
        assert!(registry.pending().activated().is_empty());
        assert!(registry.pending().deactivated().is_empty());
        assert!(!registry.has_pending_changes());

        registry.set_active(&id("0002"), true)?;
        assert!(registry.pending().activated().contains(&num_of("0002")));
        assert_eq!(registry.row(&id("0002")).map(|x| x.active), Some(true));
        Ok(())
    }

    #[test]
    fn test_boot_next_toggle() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        registry.set_boot_next(Some(id("0000")))?;
        assert_eq!(registry.pending().boot_next(), Some(&id("0000")));
        assert!(registry.has_pending_changes());
        registry.set_boot_next(Some(id("0000")))?;
        assert_eq!(registry.pending().boot_next(), None);
        assert!(!registry.has_pending_changes());
        assert!(registry.set_boot_next(Some(id("0042"))).is_err());
        Ok(())
    }

    #[test]
    fn test_add_then_remove() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        let new = registry.add("Arch", "\\vmlinuz-linux", "root=/dev/sda2");
        assert_eq!(new, BootId::Synthetic(0));
        assert!(registry.has_pending_changes());
        assert_eq!(registry.pending().order(), registry.snapshot().boot_order());
        assert_eq!(registry.rows().last().map(|x| x.id.clone()), Some(new.clone()));

        registry.remove(&new)?;
        assert!(!registry.has_pending_changes());
        assert!(registry.pending().removals().is_empty());

        // synthetic ids are never reused
        assert_eq!(registry.add("Other", "", ""), BootId::Synthetic(1));
        Ok(())
    }

    #[test]
    fn test_remove_existing() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        registry.set_active(&id("0000"), false)?;
        registry.set_boot_next(Some(id("0000")))?;
        registry.remove(&id("0000"))?;

        let pending = registry.pending();
        assert!(pending.removals().contains(&num_of("0000")));
        assert!(!pending.order().contains(&num_of("0000")));
        assert!(pending.deactivated().is_empty());
        assert!(pending.boot_next().is_none());
        assert!(registry.row(&id("0000")).is_none());
        assert!(registry.remove(&id("0000")).is_err());
        assert!(registry.set_active(&id("0000"), true).is_err());
        Ok(())
    }

    #[test]
    fn test_synthetic_boot_next() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        let new = registry.add("Arch", "\\vmlinuz-linux", "");
        registry.set_boot_next(Some(new.clone()))?;
        assert_eq!(registry.row(&new).map(|x| x.next), Some(true));
        registry.remove(&new)?;
        assert!(!registry.has_pending_changes());
        Ok(())
    }

    #[test]
    fn test_duplicate() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        let copy = registry.duplicate(&id("0001"))?;
        let row = registry.row(&copy).expect("Duplicated row should exist");
        assert_eq!(row.name, "Copy of Windows");
        assert_eq!(row.loader, "\\EFI\\Windows\\loader.efi");
        assert!(row.active);
        assert!(registry.duplicate(&BootId::Synthetic(9)).is_err());
        Ok(())
    }

    #[test]
    fn test_timeout() {
        let mut registry = BootRegistry::new(sample());
        registry.set_timeout(5);
        assert!(!registry.has_pending_changes());
        registry.set_timeout(0);
        assert!(registry.has_pending_changes());
    }

    #[test]
    fn test_load_discards_edits() {
        let mut registry = BootRegistry::new(sample());
        registry.add("Arch", "", "");
        registry.load(sample());
        assert!(!registry.has_pending_changes());
        assert_eq!(registry.add("Arch", "", ""), BootId::Synthetic(0));
    }

    proptest! {
        #[test]
        fn order_never_contains_removed(ops in prop::collection::vec((0usize..4, 0usize..4, any::<bool>()), 0..32)) {
            let mut registry = BootRegistry::new(sample());
            let nums = ["0000", "0001", "0002"];
            for (a, b, remove) in ops {
                if remove {
                    let _ = registry.remove(&id(nums[a % nums.len()]));
                } else {
                    registry.reorder(a, b);
                }
            }
            let pending = registry.pending();
            for num in pending.removals() {
                prop_assert!(!pending.order().contains(num));
            }
            prop_assert!(pending.activated().is_disjoint(pending.deactivated()));
        }
    }
}
