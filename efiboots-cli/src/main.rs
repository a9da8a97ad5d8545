// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! A command line interface frontend to `efiboots-core`.
//!
//! `list` prints the boot entries, `script` prints the shell script that would apply a set of edits, and `apply`
//! runs that script as root and prints the state afterwards.

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use efiboots_core::{
    config::EfibootsConfig,
    efibootmgr::Efibootmgr,
    registry::BootRegistry,
    script::compile,
    system::{
        log_backend::StderrLogger,
        process::{CommandRunner, HostRunner},
    },
};
use log::LevelFilter;

use crate::{
    edits::{Edits, TargetArgs},
    output::Listing,
};

mod edits;
mod executor;
mod output;

/// Inspect and edit firmware boot entries through efibootmgr.
#[derive(Parser)]
#[command(name = "efiboots", version, about, long_about = None)]
struct Cli {
    /// Read the configuration from this file instead of /etc/efiboots.conf
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log more, may be repeated
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// The subcommands of [`Cli`].
#[derive(Subcommand)]
enum Commands {
    /// Print the boot entries
    List {
        /// Print JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the script that applies the edits
    Script {
        #[command(flatten)]
        edits: Edits,

        #[command(flatten)]
        target: TargetArgs,

        /// Restart the machine at the end of the script
        #[arg(long, default_value_t = false)]
        reboot: bool,
    },

    /// Run the script that applies the edits as root
    Apply {
        #[command(flatten)]
        edits: Edits,

        #[command(flatten)]
        target: TargetArgs,

        /// Restart the machine at the end of the script
        #[arg(long, default_value_t = false)]
        reboot: bool,

        /// Do not ask for confirmation
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
}

/// Map the number of `-v` flags to a level, if any were given.
const fn verbosity(count: u8) -> Option<LevelFilter> {
    match count {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

/// Read the current state and wrap it in a fresh [`BootRegistry`].
fn refresh<R: CommandRunner>(tool: &Efibootmgr<R>) -> anyhow::Result<(BootRegistry, Vec<String>)> {
    let parsed = tool
        .snapshot()
        .with_context(|| format!("Failed to read boot entries with {}", tool.program()))?;
    let diagnostics = parsed.diagnostics.iter().map(ToString::to_string).collect();
    Ok((parsed.snapshot.into(), diagnostics))
}

/// Ask on stdin whether to go on.
fn confirm(script: &str) -> anyhow::Result<bool> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{script}\nRun this script as root? [y/N] ")?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // the logger passes everything, the global max level does the filtering
    StderrLogger::init(LevelFilter::Trace).context("Failed to install the logger")?;
    log::set_max_level(verbosity(cli.verbose).unwrap_or(LevelFilter::Warn));

    let config = EfibootsConfig::load(cli.config.as_deref()).context("Failed to load the configuration")?;
    log::set_max_level(verbosity(cli.verbose).unwrap_or(config.log_level));

    let runner = HostRunner::new(config.flatpak);
    let tool = Efibootmgr::detect(runner, config.tool.as_str())
        .with_context(|| format!("Failed to detect the version of {}", config.tool))?;
    let (mut registry, diagnostics) = refresh(&tool)?;

    match cli.command {
        Commands::List { json } => {
            let listing = Listing::new(tool.dialect(), &registry, diagnostics);
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                print!("{}", listing.to_text());
            }
        }
        Commands::Script {
            edits,
            target,
            reboot,
        } => {
            edits.apply(&mut registry)?;
            let Some(target) = target.resolve(&config)? else {
                bail!("No ESP given, pass --disk and --part or --device, or set disk and part in the configuration");
            };
            print!("{}", compile(&registry, &target, reboot).render(tool.program()));
        }
        Commands::Apply {
            edits,
            target,
            reboot,
            yes,
        } => {
            edits.apply(&mut registry)?;
            let Some(target) = target.resolve(&config)? else {
                bail!("No ESP given, pass --disk and --part or --device, or set disk and part in the configuration");
            };
            let script = compile(&registry, &target, reboot);
            if script.is_empty() {
                println!("Nothing to do");
                return Ok(());
            }

            let script = script.render(tool.program());
            if !yes && !confirm(&script)? {
                println!("Aborted");
                return Ok(());
            }

            let output = executor::execute(&runner, &script, config.halt_on_error)
                .context("Failed to run the script")?;
            print!("{output}");

            let (registry, diagnostics) = refresh(&tool)?;
            print!("{}", Listing::new(tool.dialect(), &registry, diagnostics).to_text());
        }
    }

    Ok(())
}
