// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Edits given on the command line, and the ESP they are written against.

use clap::{ArgAction, Args};
use efiboots_core::{
    BootResult,
    config::EfibootsConfig,
    registry::{BootRegistry, RegistryError},
    script::target::EspTarget,
    snapshot::types::{BootId, BootNum},
};

/// Edits to make before compiling the script.
///
/// Edits of different kinds are applied in a fixed order, whatever order they were given in: removals,
/// duplicates, additions, moves, activations, deactivations, the boot next override and finally the timeout.
/// This lets an edit refer to the `NEWn` id of an entry added in the same invocation.
#[derive(Args, Debug, Default)]
pub struct Edits {
    /// Remove an entry
    #[arg(long, value_name = "ID", value_parser = BootId::parse)]
    remove: Vec<BootId>,

    /// Add a copy of an entry named "Copy of <name>"
    #[arg(long, value_name = "ID", value_parser = BootId::parse)]
    duplicate: Vec<BootId>,

    /// Add a new entry
    #[arg(
        long,
        num_args = 3,
        value_names = ["LABEL", "LOADER", "PARAMS"],
        action = ArgAction::Append
    )]
    add: Vec<String>,

    /// Move an entry one place earlier in the boot order
    #[arg(long, value_name = "ID", value_parser = BootId::parse)]
    up: Vec<BootId>,

    /// Move an entry one place later in the boot order
    #[arg(long, value_name = "ID", value_parser = BootId::parse)]
    down: Vec<BootId>,

    /// Mark an entry active
    #[arg(long, value_name = "ID", value_parser = BootId::parse)]
    activate: Vec<BootId>,

    /// Mark an entry inactive
    #[arg(long, value_name = "ID", value_parser = BootId::parse)]
    deactivate: Vec<BootId>,

    /// Boot an entry once on the next restart (given twice, clears it again)
    #[arg(long, value_name = "ID", value_parser = BootId::parse)]
    next: Vec<BootId>,

    /// Set the boot menu timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u32>,
}

impl Edits {
    /// Apply every edit to the [`BootRegistry`].
    ///
    /// # Errors
    ///
    /// May return an `Error` if an edit names an entry that does not exist.
    pub fn apply(&self, registry: &mut BootRegistry) -> BootResult<()> {
        for id in &self.remove {
            registry.remove(id)?;
        }
        for id in &self.duplicate {
            registry.duplicate(id)?;
        }
        for add in self.add.chunks_exact(3) {
            registry.add(&*add[0], &*add[1], &*add[2]);
        }
        for id in &self.up {
            registry.move_up(existing(id)?)?;
        }
        for id in &self.down {
            registry.move_down(existing(id)?)?;
        }
        for id in &self.activate {
            registry.set_active(id, true)?;
        }
        for id in &self.deactivate {
            registry.set_active(id, false)?;
        }
        for id in &self.next {
            registry.set_boot_next(Some(id.clone()))?;
        }
        if let Some(secs) = self.timeout {
            registry.set_timeout(secs);
        }
        Ok(())
    }
}

/// Only existing entries have a place in the boot order.
fn existing(id: &BootId) -> Result<&BootNum, RegistryError> {
    id.as_num()
        .ok_or_else(|| RegistryError::UnknownEntry(id.clone()))
}

/// The EFI System Partition to write against.
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// The disk holding the ESP, such as /dev/nvme0n1
    #[arg(long, requires = "part", conflicts_with = "device")]
    disk: Option<String>,

    /// The partition number of the ESP
    #[arg(long, requires = "disk", conflicts_with = "device")]
    part: Option<u32>,

    /// The ESP partition device, such as /dev/nvme0n1p1
    #[arg(long)]
    device: Option<String>,
}

impl TargetArgs {
    /// Resolve the [`EspTarget`], falling back to the configuration.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the given target is invalid.
    pub fn resolve(&self, config: &EfibootsConfig) -> BootResult<Option<EspTarget>> {
        if let Some(device) = &self.device {
            return Ok(Some(EspTarget::from_device(device)?));
        }
        if let (Some(disk), Some(part)) = (&self.disk, self.part) {
            return Ok(Some(EspTarget::new(disk.as_str(), part)?));
        }
        Ok(config.target()?)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use efiboots_core::snapshot::{Snapshot, types::BootNum};

    use super::*;

    /// A bare parser around [`Edits`].
    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        edits: Edits,

        #[command(flatten)]
        target: TargetArgs,
    }

    fn registry() -> BootRegistry {
        let num = |x: &str| BootNum::new(x).expect("Test boot numbers should be valid");
        let entries = ["0000", "0001"].map(|x| efiboots_core::snapshot::BootEntry {
            num: num(x),
            active: true,
            name: format!("Entry {x}"),
            loader: String::new(),
            parameters: String::new(),
        });
        BootRegistry::new(Snapshot::new(entries, vec![num("0000"), num("0001")], None, None, None))
    }

    #[test]
    fn test_add_then_next() -> BootResult<()> {
        let cli = TestCli::try_parse_from([
            "efiboots", "--add", "Arch", "\\vmlinuz", "quiet", "--next", "NEW0", "--down", "0000",
        ])
        .expect("Arguments should parse");
        let mut registry = registry();
        cli.edits.apply(&mut registry)?;

        assert_eq!(registry.pending().boot_next(), Some(&BootId::Synthetic(0)));
        assert_eq!(registry.pending().order()[0].as_str(), "0001");
        Ok(())
    }

    #[test]
    fn test_unknown_entry() {
        let cli = TestCli::try_parse_from(["efiboots", "--remove", "0009"]).expect("Arguments should parse");
        assert!(cli.edits.apply(&mut registry()).is_err());
        assert!(TestCli::try_parse_from(["efiboots", "--up", "nope"]).is_err());
    }

    #[test]
    fn test_target() -> BootResult<()> {
        let config = EfibootsConfig::get_config("disk /dev/sda\npart 2");
        let cli = TestCli::try_parse_from(["efiboots"]).expect("Arguments should parse");
        assert_eq!(cli.target.resolve(&config)?, Some(EspTarget::new("/dev/sda", 2)?));

        let cli = TestCli::try_parse_from(["efiboots", "--device", "/dev/nvme0n1p1"])
            .expect("Arguments should parse");
        assert_eq!(cli.target.resolve(&config)?, Some(EspTarget::new("/dev/nvme0n1", 1)?));

        assert!(TestCli::try_parse_from(["efiboots", "--disk", "/dev/sda"]).is_err());
        Ok(())
    }
}
