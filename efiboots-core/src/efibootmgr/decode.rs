// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Repairs loader parameters as printed by `efibootmgr` version 17.
//!
//! That version prints the optional data of an entry byte by byte, showing every non printable byte as a
//! period. Since the data is almost always a UCS-2 string, `root=/dev/sda2` comes out as
//! `r.o.o.t.=./.d.e.v./.s.d.a.2.`. Turning the periods at odd positions back into zero bytes and decoding
//! the result as UTF-16 recovers the original string.

use log::warn;
use thiserror::Error;

/// The prefix printed by Windows boot manager entries before their binary data.
const WINDOWS_PREFIX: &str = "WINDOWS";

/// An `Error` that may result from decoding parameters.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The repaired bytes do not divide into 16 bit units.
    #[error("truncated data, {0} bytes cannot be read as UTF-16")]
    Truncated(usize),

    /// The units contain an unpaired surrogate.
    #[error("invalid UTF-16: {0}")]
    InvalidUtf16(#[from] std::string::FromUtf16Error),
}

/// Decodes the parameters of an entry, returning the original text if it cannot be decoded.
///
/// Text without periods, or with a single trailing period, is returned as is. A leading `WINDOWS` is kept
/// and the rest is decoded on its own.
#[must_use = "Has no effect if the result is unused"]
pub fn decode_params(code: &str) -> String {
    if !code.contains('.') {
        return code.to_owned();
    }
    if code.ends_with('.') && code.matches('.').count() == 1 {
        return code.to_owned();
    }
    if let Some(rest) = code.strip_prefix(WINDOWS_PREFIX) {
        return format!("{WINDOWS_PREFIX}{}", decode_params(rest));
    }

    match try_decode_wide(code) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Could not decode '{code}': {e}");
            code.to_owned()
        }
    }
}

/// Replaces every period at an odd index with a zero byte, then decodes the bytes as UTF-16LE.
///
/// # Errors
///
/// May return an `Error` if the byte count is odd, or if the units are not valid UTF-16.
pub fn try_decode_wide(code: &str) -> Result<String, DecodeError> {
    let mut bytes = code.as_bytes().to_vec();
    for byte in bytes.iter_mut().skip(1).step_by(2) {
        if *byte == b'.' {
            *byte = 0;
        }
    }

    if bytes.len() % 2 != 0 {
        return Err(DecodeError::Truncated(bytes.len()));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|x| u16::from_le_bytes([x[0], x[1]]))
        .collect();

    Ok(String::from_utf16(&units)?)
}
