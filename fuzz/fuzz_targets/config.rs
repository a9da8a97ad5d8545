// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

#![no_main]

use efiboots_core::config::EfibootsConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = EfibootsConfig::get_config(data);
});
