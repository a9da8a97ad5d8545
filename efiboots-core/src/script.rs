// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Compiles the edits of a [`BootRegistry`] into a shell script.
//!
//! The script is built as a list of [`Command`]s first and rendered to text as the very last step. Commands come
//! in a fixed order:
//!
//! 1. deletions
//! 2. additions, in creation order
//! 3. the boot order, if it changed
//! 4. the boot next override, if it changed
//! 5. activations
//! 6. deactivations
//! 7. the timeout, if it changed
//! 8. a reboot, if requested
//!
//! New entries are given a concrete boot number up front, the lowest one not used by any entry of the snapshot.
//! This lets a later command such as `--bootnext` refer to an entry that does not exist yet.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use log::warn;

use crate::{
    efibootmgr::EFIBOOTMGR,
    registry::BootRegistry,
    script::target::EspTarget,
    snapshot::{
        Snapshot,
        types::{BootId, BootNum},
    },
};

pub mod target;

/// One change made through the utility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Delete an entry.
    Delete(BootNum),

    /// Create a new entry.
    Create {
        /// The boot number the entry is created with.
        num: BootNum,

        /// The label of the entry.
        label: String,

        /// The loader path.
        loader: String,

        /// The loader parameters.
        parameters: String,
    },

    /// Replace the whole boot order.
    BootOrder(Vec<BootNum>),

    /// Set the one shot boot override.
    BootNext(BootNum),

    /// Clear the one shot boot override.
    DeleteBootNext,

    /// Mark an entry active.
    Activate(BootNum),

    /// Mark an entry inactive.
    Deactivate(BootNum),

    /// Set the boot menu timeout in seconds.
    Timeout(u32),
}

/// One line of a [`Script`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// A call to the utility against an ESP.
    Efibootmgr {
        /// The partition the call refers to.
        target: EspTarget,

        /// What the call does.
        operation: Operation,
    },

    /// Restart the machine.
    Reboot,
}

impl Command {
    /// Render the [`Command`] as one line of shell, calling the utility as `program`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn render(&self, program: &str) -> String {
        let Self::Efibootmgr { target, operation } = self else {
            return "reboot".to_owned();
        };

        let mut line = format!(
            "{} --disk {} --part {}",
            shell_quote(program),
            shell_quote(target.disk()),
            target.part()
        );
        let args = match operation {
            Operation::Delete(num) => format!("--delete-bootnum --bootnum {num}"),
            Operation::Create {
                num,
                label,
                loader,
                parameters,
            } => {
                let mut args = format!(
                    "--create --bootnum {num} --label {} --loader {}",
                    quote(label),
                    quote(loader)
                );
                if !parameters.is_empty() {
                    args.push_str(" --unicode ");
                    args.push_str(&quote(parameters));
                }
                args
            }
            Operation::BootOrder(order) => format!("--bootorder {}", join(order)),
            Operation::BootNext(num) => format!("--bootnext {num}"),
            Operation::DeleteBootNext => "--delete-bootnext".to_owned(),
            Operation::Activate(num) => format!("--bootnum {num} --active"),
            Operation::Deactivate(num) => format!("--bootnum {num} --inactive"),
            Operation::Timeout(secs) => format!("--timeout {secs}"),
        };
        line.push(' ');
        line.push_str(&args);
        line
    }
}

/// An ordered list of [`Command`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    /// The commands, in execution order.
    commands: Vec<Command>,
}

impl Script {
    /// Checks if the script does nothing.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Render the whole script, one command per line, calling the utility as `program`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn render(&self, program: &str) -> String {
        self.commands
            .iter()
            .map(|x| x.render(program) + "\n")
            .collect()
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(EFIBOOTMGR))
    }
}

/// Compile the edits of a [`BootRegistry`] into a [`Script`] against `target`.
///
/// A registry with no pending changes compiles to an empty script, or to a lone reboot if `reboot` is set.
#[must_use = "Has no effect if the result is unused"]
pub fn compile(registry: &BootRegistry, target: &EspTarget, reboot: bool) -> Script {
    let snapshot = registry.snapshot();
    let pending = registry.pending();
    let assigned = assign_boot_nums(snapshot, pending.additions().map(|(n, _)| n));
    let mut ops = Vec::new();

    ops.extend(pending.removals().iter().cloned().map(Operation::Delete));

    for (n, addition) in pending.additions() {
        if let Some(num) = assigned.get(&n) {
            ops.push(Operation::Create {
                num: num.clone(),
                label: addition.label.clone(),
                loader: addition.loader.clone(),
                parameters: addition.parameters.clone(),
            });
        }
    }

    if pending.order() != snapshot.boot_order() {
        // creating an entry puts it at the front of the order, newest first
        let mut order: Vec<_> = assigned.values().rev().cloned().collect();
        order.extend_from_slice(pending.order());
        ops.push(Operation::BootOrder(order));
    }

    let next = pending.boot_next().and_then(|id| match id {
        BootId::Existing(num) => Some(num.clone()),
        BootId::Synthetic(n) => assigned.get(n).cloned(),
    });
    let next_changed = pending.boot_next().and_then(BootId::as_num) != snapshot.boot_next()
        || pending.boot_next().is_some_and(BootId::is_synthetic);
    if next_changed {
        match next {
            Some(num) => ops.push(Operation::BootNext(num)),
            None if snapshot.boot_next().is_some() => ops.push(Operation::DeleteBootNext),
            None => warn!("BootNext references an entry that will not be created, skipping it"),
        }
    }

    ops.extend(pending.activated().iter().cloned().map(Operation::Activate));
    ops.extend(pending.deactivated().iter().cloned().map(Operation::Deactivate));
    for (n, addition) in pending.additions() {
        if !addition.active
            && let Some(num) = assigned.get(&n)
        {
            ops.push(Operation::Deactivate(num.clone()));
        }
    }

    if pending.timeout() != snapshot.timeout()
        && let Some(secs) = pending.timeout()
    {
        ops.push(Operation::Timeout(secs));
    }

    let mut commands: Vec<_> = ops
        .into_iter()
        .map(|operation| Command::Efibootmgr {
            target: target.clone(),
            operation,
        })
        .collect();
    if reboot {
        commands.push(Command::Reboot);
    }
    Script { commands }
}

/// Give each synthetic number the lowest boot number the firmware is not known to use.
///
/// This skips every number in [`Snapshot::reserved`], so removed entries, dropped ids and malformed entry lines
/// all keep their slot.
fn assign_boot_nums(
    snapshot: &Snapshot,
    synthetic: impl Iterator<Item = u32>,
) -> BTreeMap<u32, BootNum> {
    let used: BTreeSet<u16> = snapshot.reserved().filter_map(|x| x.value()).collect();
    let mut free = (0..=u16::MAX)
        .filter(|x| !used.contains(x))
        .map(BootNum::from_value);
    synthetic
        .filter_map(|n| free.next().map(|num| (n, num)))
        .collect()
}

/// Join boot numbers with commas.
fn join(nums: &[BootNum]) -> String {
    nums.iter()
        .map(|x| x.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote a value for the shell unconditionally.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quote a value for the shell, unless it only has characters that are safe bare.
fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe { value.to_owned() } else { quote(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        efibootmgr::{dialect::Dialect, parser::parse},
        registry::RegistryError,
        snapshot::tests::{num_of, sample},
    };

    /// The target used by every test.
    fn target() -> EspTarget {
        EspTarget::new("/dev/nvme0n1", 1).expect("Test target should be valid")
    }

    /// Compile and render a registry against [`target`].
    fn render(registry: &BootRegistry, reboot: bool) -> Vec<String> {
        compile(registry, &target(), reboot)
            .to_string()
            .lines()
            .map(ToOwned::to_owned)
            .collect()
    }

    /// The prefix of every utility call.
    const PREFIX: &str = "efibootmgr --disk /dev/nvme0n1 --part 1";

    #[test]
    fn test_no_changes() {
        let registry = BootRegistry::new(sample());
        assert!(compile(&registry, &target(), false).is_empty());
        assert_eq!(render(&registry, true), ["reboot"]);
    }

    #[test]
    fn test_add_then_remove_compiles_to_nothing() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        let new = registry.add("Arch", "\\vmlinuz-linux", "");
        registry.remove(&new)?;
        assert!(!registry.has_pending_changes());
        assert!(compile(&registry, &target(), false).is_empty());
        Ok(())
    }

    #[test]
    fn test_new_entries_skip_unparsed_numbers() -> Result<(), RegistryError> {
        let output = parse(
            Dialect::V18,
            [
                "BootOrder: 0000,0001",
                "Boot0000* Linux\tHD(1)/File(\\vmlinuz-linux)",
                "Boot0001* Windows\tHD(1)/File(\\bootmgfw.efi)",
                "Boot0002* Odd entry without a device path",
            ],
        );
        assert_eq!(output.diagnostics.len(), 1);

        let mut registry = BootRegistry::new(output.snapshot);
        let new = registry.add("Arch", "\\vmlinuz-linux", "");
        registry.set_boot_next(Some(new))?;

        let script = compile(&registry, &target(), false).to_string();
        assert!(!script.contains("--bootnum 0002"));
        assert!(script.contains("--create --bootnum 0003"));
        assert!(script.contains("--bootnext 0003"));
        Ok(())
    }

    #[test]
    fn test_new_entries_skip_dropped_ids() {
        let snapshot = Snapshot::new(
            sample().entries().cloned(),
            vec![num_of("0000"), num_of("0003")],
            Some(num_of("0004")),
            None,
            None,
        );
        let mut registry = BootRegistry::new(snapshot);
        registry.add("Arch", "", "");
        assert!(compile(&registry, &target(), false).to_string().contains("--create --bootnum 0005"));
    }

    #[test]
    fn test_ordering_contract() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        registry.set_timeout(10);
        registry.reorder(0, 1);
        registry.add("Arch", "\\vmlinuz-linux", "root=/dev/sda2");
        registry.remove(&BootId::Existing(num_of("0002")))?;

        assert_eq!(
            render(&registry, false),
            [
                format!("{PREFIX} --delete-bootnum --bootnum 0002"),
                format!(
                    "{PREFIX} --create --bootnum 0003 --label 'Arch' --loader '\\vmlinuz-linux' --unicode 'root=/dev/sda2'"
                ),
                format!("{PREFIX} --bootorder 0003,0000,0001"),
                format!("{PREFIX} --timeout 10"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_activation_and_next() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        registry.set_active(&BootId::Existing(num_of("0002")), true)?;
        registry.set_active(&BootId::Existing(num_of("0000")), false)?;
        registry.set_boot_next(Some(BootId::Existing(num_of("0000"))))?;

        assert_eq!(
            render(&registry, true),
            [
                format!("{PREFIX} --bootnext 0000"),
                format!("{PREFIX} --bootnum 0002 --active"),
                format!("{PREFIX} --bootnum 0000 --inactive"),
                "reboot".to_owned(),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_synthetic_next_and_inactive_addition() -> Result<(), RegistryError> {
        let mut registry = BootRegistry::new(sample());
        let new = registry.add("Test", "\\test.efi", "");
        registry.set_active(&new, false)?;
        registry.set_boot_next(Some(new))?;

        assert_eq!(
            render(&registry, false),
            [
                format!("{PREFIX} --create --bootnum 0003 --label 'Test' --loader '\\test.efi'"),
                format!("{PREFIX} --bootnext 0003"),
                format!("{PREFIX} --bootnum 0003 --inactive"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_delete_boot_next() -> Result<(), RegistryError> {
        let snapshot = Snapshot::new(
            sample().entries().cloned(),
            sample().boot_order().to_vec(),
            Some(num_of("0000")),
            None,
            None,
        );
        let mut registry = BootRegistry::new(snapshot);
        registry.set_boot_next(Some(BootId::Existing(num_of("0000"))))?;
        assert_eq!(render(&registry, false), [format!("{PREFIX} --delete-bootnext")]);
        Ok(())
    }

    #[test]
    fn test_quoting() {
        let mut registry = BootRegistry::new(sample());
        registry.add("Bob's OS", "\\EFI\\bob\\boot.efi", "quiet splash");
        let script = compile(&registry, &EspTarget::new("/dev/disk by id", 2).expect("valid"), false);
        assert_eq!(
            script.render("efibootmgr"),
            "efibootmgr --disk '/dev/disk by id' --part 2 --create --bootnum 0003 --label 'Bob'\\''s OS' --loader '\\EFI\\bob\\boot.efi' --unicode 'quiet splash'\n"
        );
    }

    #[test]
    fn test_assigned_numbers_skip_used() {
        let mut registry = BootRegistry::new(sample());
        registry.add("A", "", "");
        registry.add("B", "", "");
        let assigned = assign_boot_nums(
            registry.snapshot(),
            registry.pending().additions().map(|(n, _)| n),
        );
        assert_eq!(
            assigned.values().map(ToString::to_string).collect::<Vec<_>>(),
            ["0003", "0004"]
        );
    }
}
