// src/main.rs
//
// =============================================================================
// DURALOG: DEMONSTRATION CLI
// =============================================================================
//
// A thin `clap` wrapper over the public API, useful for manual smoke-testing
// and as executable documentation. Carries no durability guarantees beyond
// what the library already provides.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use duralog::DuraLog;

#[derive(Parser)]
#[command(name = "duralog-cli", about = "Append to and replay a duralog file")]
struct Cli {
    /// Path to the log file.
    #[arg(long, global = true)]
    path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a record. Text starting with `{` is parsed as a JSON object;
    /// anything else is stored as a plain string.
    Append {
        /// The record to append.
        value: String,
    },
    /// Replay every well-formed record currently on disk.
    Replay,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Append { value } => {
            let log = DuraLog::open(&cli.path)
                .with_context(|| format!("opening log at {:?}", cli.path))?;
            append_value(&log, &value)?;
            log.close().context("flushing log on close")?;
        }
        Command::Replay => {
            let log = DuraLog::open(&cli.path)
                .with_context(|| format!("opening log at {:?}", cli.path))?;
            for record in log.replay().context("starting replay")? {
                println!("{record:?}");
            }
            log.close().context("flushing log on close")?;
        }
    }

    Ok(())
}

fn append_value(log: &DuraLog, value: &str) -> Result<()> {
    let trimmed = value.trim_start();
    if trimmed.starts_with('{') {
        let parsed: serde_json::Value =
            serde_json::from_str(value).context("parsing value as JSON object")?;
        log.append_value(&parsed)
            .context("appending JSON record")?;
    } else {
        log.append(value.to_owned());
    }
    Ok(())
}
