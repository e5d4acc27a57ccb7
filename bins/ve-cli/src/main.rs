//! ve-cli: command-line driver for the vote-escrow ledger.
//!
//! Replays JSON scenarios of escrow operations into a snapshot file and
//! answers historical voting power queries against a saved snapshot.

mod scenario;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use ve_core::types::{Address, Lock, LockId, Point, Rounding, Timestamp};
use ve_escrow::{snapshot, EscrowConfig, MemoryTokenLedger};

use crate::scenario::{CliEscrow, Scenario};

/// Vote-escrow ledger command-line interface.
#[derive(Parser)]
#[command(name = "ve-cli")]
#[command(version, about = "Replay vote-escrow scenarios and query time-decayed voting power")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON scenario and save the resulting state.
    Replay(ReplayArgs),
    /// Voting power of one lock at a point in time.
    Power(PowerArgs),
    /// Total voting power at a point in time.
    Total(TotalArgs),
    /// Print a snapshot, or one lock's history, as JSON.
    Inspect(InspectArgs),
}

#[derive(Args)]
struct SnapshotArg {
    /// Snapshot file (default: <data dir>/ve-escrow/escrow.snapshot).
    #[arg(short, long)]
    snapshot: Option<PathBuf>,
}

#[derive(Args)]
struct ReplayArgs {
    /// Scenario file.
    scenario: PathBuf,

    /// Log rejected steps and continue instead of stopping.
    #[arg(long)]
    keep_going: bool,

    /// Replay without writing a snapshot.
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    snapshot: SnapshotArg,
}

#[derive(Args)]
struct PowerArgs {
    /// Lock id.
    #[arg(long)]
    lock: LockId,

    /// Unix seconds or RFC 3339 date-time.
    #[arg(long, value_parser = parse_at)]
    at: Timestamp,

    /// "current" or "whole-week".
    #[arg(long, default_value_t = Rounding::Current)]
    rounding: Rounding,

    #[command(flatten)]
    snapshot: SnapshotArg,
}

#[derive(Args)]
struct TotalArgs {
    /// Unix seconds or RFC 3339 date-time.
    #[arg(long, value_parser = parse_at)]
    at: Timestamp,

    /// "current" or "whole-week".
    #[arg(long, default_value_t = Rounding::Current)]
    rounding: Rounding,

    #[command(flatten)]
    snapshot: SnapshotArg,
}

#[derive(Args)]
struct InspectArgs {
    /// Only print this lock's record and checkpoints.
    #[arg(long)]
    lock: Option<LockId>,

    #[command(flatten)]
    snapshot: SnapshotArg,
}

#[derive(Serialize)]
struct LockReport<'a> {
    lock_id: LockId,
    owner: Option<Address>,
    attacher: Option<Address>,
    lock: Option<&'a Lock>,
    checkpoints: &'a [Point],
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Replay(args) => replay(args),
        Commands::Power(args) => power(args),
        Commands::Total(args) => total(args),
        Commands::Inspect(args) => inspect(args),
    }
}

fn replay(args: ReplayArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.scenario)
        .with_context(|| format!("Failed to read scenario: {}", args.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse scenario: {}", args.scenario.display()))?;

    let mut escrow = scenario::build(&scenario)?;
    let outcome = scenario::replay(&mut escrow, &scenario.steps, args.keep_going)?;

    println!("Steps applied:  {}", outcome.applied);
    println!("Steps rejected: {}", outcome.rejected);
    println!("Live locks:     {}", escrow.state().locks.len());
    println!("Locked supply:  {}", escrow.locked_supply());
    println!("Checkpoints:    {}", escrow.global_checkpoints().len());

    if args.dry_run {
        return Ok(());
    }
    let path = resolve_snapshot_path(args.snapshot.snapshot)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    snapshot::save(&path, escrow.state()).context("Failed to save snapshot")?;
    info!(path = %path.display(), "snapshot written");
    println!("Snapshot:       {}", path.display());
    Ok(())
}

fn power(args: PowerArgs) -> Result<()> {
    let escrow = open(&resolve_snapshot_path(args.snapshot.snapshot)?)?;
    let power = escrow
        .token_voting_power(args.lock, args.at, args.rounding)
        .with_context(|| format!("Query failed for lock {} at {}", args.lock, args.at))?;
    println!("{power}");
    Ok(())
}

fn total(args: TotalArgs) -> Result<()> {
    let escrow = open(&resolve_snapshot_path(args.snapshot.snapshot)?)?;
    let total = escrow
        .total_voting_power(args.at, args.rounding)
        .with_context(|| format!("Query failed at {}", args.at))?;
    println!("{total}");
    Ok(())
}

fn inspect(args: InspectArgs) -> Result<()> {
    let escrow = open(&resolve_snapshot_path(args.snapshot.snapshot)?)?;
    let json = match args.lock {
        Some(lock_id) => {
            let checkpoints = escrow
                .token_checkpoints(lock_id)
                .with_context(|| format!("Lock {lock_id} was never created"))?;
            let report = LockReport {
                lock_id,
                owner: escrow.owner_of(lock_id),
                attacher: escrow.attacher(lock_id),
                lock: escrow.lock(lock_id),
                checkpoints,
            };
            serde_json::to_string_pretty(&report)?
        }
        None => serde_json::to_string_pretty(escrow.state())?,
    };
    println!("{json}");
    Ok(())
}

/// Load a snapshot for read-only queries.
///
/// Queries only read the checkpoint logs, so the default config and an empty
/// ledger stand in for the ones used when the snapshot was written.
fn open(path: &Path) -> Result<CliEscrow> {
    let state = snapshot::load(path)
        .with_context(|| format!("Failed to load snapshot: {}", path.display()))?;
    CliEscrow::from_state(EscrowConfig::default(), state, MemoryTokenLedger::new())
        .context("Failed to restore escrow")
}

fn resolve_snapshot_path(path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = path {
        return Ok(p);
    }
    let data = dirs::data_dir().context("Could not determine data directory")?;
    Ok(data.join("ve-escrow").join("escrow.snapshot"))
}

fn parse_at(s: &str) -> Result<Timestamp, String> {
    scenario::parse_time(s).map_err(|e| format!("{e:#}"))
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ve_core::constants::TOKEN;

    #[test]
    fn cli_parses_queries() {
        let cli = Cli::try_parse_from([
            "ve-cli", "power", "--lock", "2", "--at", "2024-02-01T00:00:00Z", "--rounding", "whole-week",
        ])
        .unwrap();
        match cli.command {
            Commands::Power(args) => {
                assert_eq!(args.lock, 2);
                assert_eq!(args.at, 1_706_745_600);
                assert_eq!(args.rounding, Rounding::WholeWeek);
                assert!(args.snapshot.snapshot.is_none());
            }
            _ => panic!("expected power"),
        }
        assert!(Cli::try_parse_from(["ve-cli", "total", "--at", "yesterday"]).is_err());
    }

    #[test]
    fn replayed_snapshot_answers_queries() {
        let dir = tempfile::tempdir().unwrap();
        let scenario_path = dir.path().join("basic.json");
        fs::write(&scenario_path, include_str!("../scenarios/basic.json")).unwrap();
        let snap = dir.path().join("nested").join("escrow.snapshot");

        replay(ReplayArgs {
            scenario: scenario_path,
            keep_going: false,
            dry_run: false,
            snapshot: SnapshotArg { snapshot: Some(snap.clone()) },
        })
        .unwrap();

        let escrow = open(&snap).unwrap();
        assert_eq!(escrow.locked_supply(), 1_511 * TOKEN);
        let at = scenario::parse_time("2024-06-01T00:00:00Z").unwrap();
        let total = escrow.total_voting_power(at, Rounding::Current).unwrap();
        let sum: u128 = [1, 2]
            .iter()
            .map(|&id| escrow.token_voting_power(id, at, Rounding::Current).unwrap())
            .sum();
        assert!(total.abs_diff(sum) <= 100, "{total} vs {sum}");
    }

    #[test]
    fn missing_snapshot_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.snapshot");
        let err = open(&path).unwrap_err();
        assert!(format!("{err:#}").contains("absent.snapshot"), "{err:#}");
    }
}
