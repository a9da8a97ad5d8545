// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

#![no_main]

use efiboots_core::efibootmgr::decode::decode_params;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = decode_params(data);
});
