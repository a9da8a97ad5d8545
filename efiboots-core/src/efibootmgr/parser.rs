// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! A parser for the human readable output of `efibootmgr`.
//!
//! Example output (version 18 with `--unicode`):
//!
//! ```text
//! BootCurrent: 0001
//! Timeout: 1 seconds
//! BootOrder: 0001,0000,0002
//! Boot0000* Windows Boot Manager	HD(1,GPT,0b0a...,0x800,0x32000)/File(\EFI\Microsoft\Boot\bootmgfw.efi)WINDOWS
//! Boot0001* Linux	HD(1,GPT,0b0a...,0x800,0x32000)/File(\vmlinuz-linux)root=/dev/sda2 rw
//! Boot0002  UEFI Shell	FvVol(7cb8bdc9-f8eb-4f34-aaea-3ee4af6516a1)/FvFile(c57ad6b7-0515-40a8-9d21-551652854e37)
//! ```
//!
//! Every line is parsed on its own. A line that cannot be parsed is logged and skipped, so a single odd line
//! never prevents the rest of the output from being read.

use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;
use thiserror::Error;

use crate::{
    efibootmgr::{decode::decode_params, dialect::Dialect},
    snapshot::{
        BootEntry, Snapshot,
        types::{BootNum, TypeError},
    },
};

/// Matches a boot entry line.
///
/// The groups are the boot number, the active marker, the name, the loader path (only when the device
/// path ends with a file node) and the parameters. Inactive entries are printed with a blank in place of
/// the marker, which is not part of the name.
static ENTRY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Boot([0-9A-F]+)(?:(\*)| )? (.+)\t(?:.+/File\((.+)\)|.*\))(.*)$")
        .unwrap_or_else(|_| unreachable!("The entry pattern should always compile"))
});

/// Matches the boot number of anything that looks like an entry line, even one that is otherwise malformed.
static ENTRY_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Boot([0-9A-F]{4})")
        .unwrap_or_else(|_| unreachable!("The entry prefix pattern should always compile"))
});

/// Matches a single boot number inside a variable value.
static BOOT_NUM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9A-F]{4}\b")
        .unwrap_or_else(|_| unreachable!("The boot number pattern should always compile"))
});

/// The label of the boot order line.
const BOOT_ORDER: &str = "BootOrder";

/// The label of the boot next line.
const BOOT_NEXT: &str = "BootNext";

/// The label of the boot current line.
const BOOT_CURRENT: &str = "BootCurrent";

/// The label of the timeout line.
const TIMEOUT: &str = "Timeout";

/// An `Error` describing why a single line was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// The line did not match any known grammar.
    #[error("line didn't match: {0:?}")]
    NoMatch(String),

    /// The line had a known label, but its value could not be parsed.
    #[error("invalid {field} in line {line:?}: {reason}")]
    InvalidValue {
        /// The label of the line.
        field: &'static str,

        /// The whole line.
        line: String,

        /// What was wrong with the value.
        reason: String,
    },
}

/// A successfully parsed line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedLine {
    /// A boot entry.
    Entry(BootEntry),

    /// The `BootOrder` variable.
    BootOrder(Vec<BootNum>),

    /// The `BootNext` variable.
    BootNext(BootNum),

    /// The `BootCurrent` variable.
    BootCurrent(BootNum),

    /// The `Timeout` variable.
    Timeout(u32),
}

/// The result of parsing the whole output.
#[derive(Debug, Default)]
pub struct ParseOutput {
    /// The assembled [`Snapshot`].
    pub snapshot: Snapshot,

    /// Every line that was skipped, in the order they appeared.
    pub diagnostics: Vec<LineError>,
}

/// Parses the output of `efibootmgr` into a [`Snapshot`].
///
/// Blank lines are ignored. Lines that fail to parse are logged at warning level and collected into
/// [`ParseOutput::diagnostics`]. If a variable appears more than once, the last one is used.
pub fn parse<'a>(dialect: Dialect, lines: impl IntoIterator<Item = &'a str>) -> ParseOutput {
    let mut entries = Vec::new();
    let mut boot_order = Vec::new();
    let mut boot_next = None;
    let mut boot_current = None;
    let mut timeout = None;
    let mut diagnostics = Vec::new();
    let mut stray = Vec::new();

    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(dialect, line) {
            Ok(ParsedLine::Entry(entry)) => entries.push(entry),
            Ok(ParsedLine::BootOrder(order)) => boot_order = order,
            Ok(ParsedLine::BootNext(num)) => boot_next = Some(num),
            Ok(ParsedLine::BootCurrent(num)) => boot_current = Some(num),
            Ok(ParsedLine::Timeout(secs)) => timeout = Some(secs),
            Err(e) => {
                warn!("{e}");
                stray.extend(stray_boot_nums(line));
                diagnostics.push(e);
            }
        }
    }

    ParseOutput {
        snapshot: Snapshot::new(entries, boot_order, boot_next, boot_current, timeout)
            .reserve(stray),
        diagnostics,
    }
}

/// Finds the boot numbers a line that failed to parse still refers to.
///
/// A malformed entry line still means its boot number is taken, and a variable line with one bad id may still
/// name other valid ones.
fn stray_boot_nums(line: &str) -> Vec<BootNum> {
    if let Some(caps) = ENTRY_PREFIX_REGEX.captures(line) {
        return caps
            .get(1)
            .and_then(|x| BootNum::new(x.as_str()).ok())
            .into_iter()
            .collect();
    }

    if [BOOT_ORDER, BOOT_NEXT, BOOT_CURRENT]
        .iter()
        .any(|x| line.starts_with(x))
        && let Some((_, value)) = line.split_once(':')
    {
        return BOOT_NUM_REGEX
            .find_iter(value)
            .filter_map(|x| BootNum::new(x.as_str()).ok())
            .collect();
    }

    Vec::new()
}

/// Parses a single line of output.
///
/// Entry lines are tried first, then the `BootOrder`, `BootNext`, `BootCurrent` and `Timeout` labels.
///
/// # Errors
///
/// May return an `Error` if the line matches none of them, or if a labelled value is invalid.
pub fn parse_line(dialect: Dialect, line: &str) -> Result<ParsedLine, LineError> {
    if let Some(entry) = parse_entry(dialect, line) {
        debug!("Entry: {entry:?}");
        return Ok(ParsedLine::Entry(entry));
    }

    let parsed = if line.starts_with(BOOT_ORDER) {
        let value = field_value(BOOT_ORDER, line)?;
        let order = value
            .split(',')
            .map(str::trim)
            .filter(|x| !x.is_empty())
            .map(BootNum::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(BOOT_ORDER, line, &e))?;
        ParsedLine::BootOrder(order)
    } else if line.starts_with(BOOT_NEXT) {
        ParsedLine::BootNext(field_num(BOOT_NEXT, line)?)
    } else if line.starts_with(BOOT_CURRENT) {
        ParsedLine::BootCurrent(field_num(BOOT_CURRENT, line)?)
    } else if line.starts_with(TIMEOUT) {
        let value = field_value(TIMEOUT, line)?;
        let secs = value
            .split_whitespace()
            .next()
            .ok_or_else(|| invalid(TIMEOUT, line, &"missing value"))?
            .parse()
            .map_err(|e| invalid(TIMEOUT, line, &e))?;
        ParsedLine::Timeout(secs)
    } else {
        return Err(LineError::NoMatch(line.to_owned()));
    };

    debug!("{parsed:?}");
    Ok(parsed)
}

/// Parses a boot entry line, decoding its parameters if the dialect requires it.
fn parse_entry(dialect: Dialect, line: &str) -> Option<BootEntry> {
    let caps = ENTRY_REGEX.captures(line)?;
    let num = BootNum::new(caps.get(1)?.as_str()).ok()?;
    let name = caps.get(3)?.as_str();
    let loader = caps.get(4).map_or("", |x| x.as_str());
    let params = caps.get(5).map_or("", |x| x.as_str());

    let parameters = if dialect.decodes_parameters() {
        decode_params(params)
    } else {
        params.to_owned()
    };

    Some(BootEntry {
        num,
        active: caps.get(2).is_some(),
        name: name.to_owned(),
        loader: loader.to_owned(),
        parameters,
    })
}

/// Returns the value between the first and second colon of a labelled line, trimmed.
fn field_value<'a>(field: &'static str, line: &'a str) -> Result<&'a str, LineError> {
    line.split(':')
        .nth(1)
        .map(str::trim)
        .ok_or_else(|| invalid(field, line, &"missing ':'"))
}

/// Parses the value of a labelled line as a single boot number.
fn field_num(field: &'static str, line: &str) -> Result<BootNum, LineError> {
    BootNum::new(field_value(field, line)?).map_err(|e: TypeError| invalid(field, line, &e))
}

/// Builds a [`LineError::InvalidValue`].
fn invalid(field: &'static str, line: &str, reason: &dyn ToString) -> LineError {
    LineError::InvalidValue {
        field,
        line: line.to_owned(),
        reason: reason.to_string(),
    }
}
