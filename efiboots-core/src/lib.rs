// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `efiboots-core` library crate.
//!
//! This reads the firmware boot entries of a Linux system through `efibootmgr`, lets a frontend edit them in
//! memory, and compiles the edits into a shell script that applies them. It never writes to the firmware itself;
//! running the script is left to the frontend.
//!
//! The pieces fit together roughly like this:
//!
//! 1. [`efibootmgr::Efibootmgr`] detects the [`efibootmgr::dialect::Dialect`] of the installed tool and reads its
//!    output into a [`snapshot::Snapshot`] through [`efibootmgr::parser`].
//! 2. [`registry::BootRegistry`] records edits on top of that snapshot.
//! 3. [`script::compile`] turns the edits into a [`script::Script`].
//!
//! An example frontend can be found in `efiboots-cli`.
//!
//! ## MSRV
//!
//! The minimum supported rust version is 1.88.0.

/// The primary result type that wraps around [`crate::error::BootError`].
pub type BootResult<T> = Result<T, crate::error::BootError>;

pub mod config;
pub mod efibootmgr;
pub mod error;
pub mod registry;
pub mod script;
pub mod snapshot;
pub mod system;
