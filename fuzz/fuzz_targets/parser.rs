// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

#![no_main]

use efiboots_core::efibootmgr::{dialect::Dialect, parser::parse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = parse(Dialect::V17, data.lines());
    let _ = parse(Dialect::V18, data.lines());
});
