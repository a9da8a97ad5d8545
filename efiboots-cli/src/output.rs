// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Prints the live state of a [`BootRegistry`].

use std::fmt::Write;

use efiboots_core::{
    efibootmgr::dialect::Dialect,
    registry::{BootRegistry, Row},
    snapshot::types::{BootId, BootNum},
};
use serde::Serialize;

/// The JSON document printed by `list --json`.
#[derive(Serialize)]
pub struct Listing<'a> {
    /// The detected output dialect.
    dialect: Dialect,

    /// The live entries.
    entries: Vec<Row>,

    /// The live boot order.
    boot_order: &'a [BootNum],

    /// The live boot next override.
    boot_next: Option<&'a BootId>,

    /// The entry the system was booted from.
    boot_current: Option<&'a BootNum>,

    /// The live timeout.
    timeout: Option<u32>,

    /// Lines of tool output that could not be parsed.
    diagnostics: Vec<String>,
}

impl<'a> Listing<'a> {
    /// Collect the live state of `registry`.
    pub fn new(dialect: Dialect, registry: &'a BootRegistry, diagnostics: Vec<String>) -> Self {
        let pending = registry.pending();
        Self {
            dialect,
            entries: registry.rows(),
            boot_order: pending.order(),
            boot_next: pending.boot_next(),
            boot_current: registry.snapshot().boot_current(),
            timeout: pending.timeout(),
            diagnostics,
        }
    }

    /// Render as human readable text.
    ///
    /// Each entry is prefixed with `*` if active, `>` if booted from and `+` if it will be booted next.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        let none = || "-".to_owned();
        let _ = writeln!(
            text,
            "BootCurrent: {}",
            self.boot_current.map_or_else(none, ToString::to_string)
        );
        let _ = writeln!(
            text,
            "BootNext: {}",
            self.boot_next.map_or_else(none, ToString::to_string)
        );
        let _ = writeln!(
            text,
            "Timeout: {}",
            self.timeout.map_or_else(none, |x| format!("{x} seconds"))
        );
        let order: Vec<_> = self.boot_order.iter().map(|x| x.as_str()).collect();
        let _ = writeln!(text, "BootOrder: {}", order.join(","));

        for row in &self.entries {
            let flag = |set: bool, c: char| if set { c } else { ' ' };
            let _ = writeln!(
                text,
                "{}{}{} {:<6} {}\t{} {}",
                flag(row.active, '*'),
                flag(row.current, '>'),
                flag(row.next, '+'),
                row.id,
                row.name,
                row.loader,
                row.parameters
            );
        }
        text
    }
}
