//! BracketLab CLI — session replay and check commands.
//!
//! Commands:
//! - `run` — replay a session's orders against per-symbol bar CSVs and print
//!   a report (or the full outcome JSON)
//! - `check` — expand and validate a session file, listing every problem
//!   without running anything

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bracketlab_core::domain::{ConditionalOrder, Direction, ExitReason};
use bracketlab_runner::{
    dedupe_overlapping, load_bars_dir, synthetic_bars, ReplayBatch, ReplayConfig, SessionReport,
};

#[derive(Parser)]
#[command(
    name = "bracketlab",
    about = "BracketLab CLI — conditional bracket-order replay engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a session's orders against bar data and print a report.
    Run {
        /// Path to a session TOML file.
        #[arg(long)]
        session: PathBuf,

        /// Directory of per-symbol bar CSVs (one SYMBOL.csv each).
        #[arg(long, default_value = "bars")]
        bars_dir: PathBuf,

        /// Worker threads (overrides the session setting; 1 = sequential).
        #[arg(long)]
        jobs: Option<usize>,

        /// Generate synthetic bars for symbols without usable bar data.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Synthetic walk seed (only used with --synthetic).
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Keep only the first live bracket per symbol.
        #[arg(long, default_value_t = false)]
        dedupe: bool,

        /// Emit the full session report as JSON instead of the table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Expand and validate a session file, listing every problem.
    Check {
        /// Path to a session TOML file.
        #[arg(long)]
        session: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            session,
            bars_dir,
            jobs,
            synthetic,
            seed,
            dedupe,
            json,
        } => run_replay_cmd(session, bars_dir, jobs, synthetic, seed, dedupe, json),
        Commands::Check { session } => run_check_cmd(session),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_replay_cmd(
    session: PathBuf,
    bars_dir: PathBuf,
    jobs: Option<usize>,
    synthetic: bool,
    seed: u64,
    dedupe: bool,
    json: bool,
) -> Result<()> {
    let config = ReplayConfig::from_file(&session)
        .with_context(|| format!("load session {}", session.display()))?;

    // Entries that cannot even become an order are skipped with a note;
    // orders with bad bracket levels replay anyway and come back rejected.
    let (orders, skipped) = config.replay_orders();
    for (symbol, err) in &skipped {
        eprintln!("SKIP {symbol:<12} {err}");
    }
    if orders.is_empty() && skipped.is_empty() {
        bail!("session has no orders and no setups");
    }
    let symbols: Vec<String> = orders.iter().map(|o| o.symbol.clone()).collect();

    let mut bars = load_bars_dir(&bars_dir, &symbols)
        .with_context(|| format!("load bars from {}", bars_dir.display()))?;

    // Fill data gaps with a deterministic fake walk when asked to. One NSE
    // session is 75 five-minute bars (09:15–15:30 IST).
    let mut synthetic_used = false;
    if synthetic {
        for order in &orders {
            let entry = bars.entry(order.symbol.clone()).or_default();
            if entry.is_empty() {
                *entry = synthetic_bars(&order.symbol, order.created_at, 75, 5, seed);
                synthetic_used = true;
                if !json {
                    println!("Synthetic bars for {} (seed {seed})", order.symbol);
                }
            }
        }
    }

    let outcomes = ReplayBatch::new(config.engine)
        .with_jobs(jobs.or(config.jobs))
        .run(&orders, &bars);
    let outcomes = if dedupe {
        dedupe_overlapping(&outcomes)
    } else {
        outcomes
    };

    let report = SessionReport::new(config.replay_id(), outcomes);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, synthetic_used);
    }

    Ok(())
}

fn run_check_cmd(session: PathBuf) -> Result<()> {
    let config = ReplayConfig::from_file(&session)
        .with_context(|| format!("load session {}", session.display()))?;

    let results = config.expanded_orders();
    if results.is_empty() {
        bail!("session has no orders and no setups");
    }

    println!("Session:   {}", short_id(&config.replay_id()));
    println!(
        "Orders:    {} explicit, {} setups (risk {:.2}, ratio {})",
        config.orders.len(),
        config.setups.len(),
        config.risk_amount,
        config.ratio,
    );
    println!();

    // expanded_orders keeps input positions: explicit orders, then setups.
    let symbols: Vec<&str> = config
        .orders
        .iter()
        .map(|o| o.symbol.as_str())
        .chain(config.setups.iter().map(|s| s.symbol.as_str()))
        .collect();

    let mut problems = 0usize;
    for (symbol, result) in symbols.iter().zip(&results) {
        match result {
            Ok(order) => println!("OK   {:<12} {}", symbol, bracket_line(order)),
            Err(err) => {
                problems += 1;
                println!("BAD  {:<12} {err}", symbol);
            }
        }
    }

    println!();
    if problems > 0 {
        println!("{problems} of {} orders have problems", results.len());
        std::process::exit(1);
    }
    println!("All {} orders are valid.", results.len());
    Ok(())
}

fn bracket_line(order: &ConditionalOrder) -> String {
    let target = match order.target_price {
        Some(target) => format!("{target:.2}"),
        None => "none".to_string(),
    };
    format!(
        "{:<5} trigger {:.2}  stop {:.2}  target {}  qty {}",
        direction_label(order.direction),
        order.trigger_price,
        order.stop_loss_price,
        target,
        order.quantity,
    )
}

fn print_report(report: &SessionReport, synthetic_used: bool) {
    let summary = &report.summary;
    let exits = &summary.exits;

    println!();
    println!("=== Replay Report ===");
    println!("Session:        {}", short_id(&report.replay_id));
    println!("Replays:        {}", summary.replays);
    println!("Executed:       {}", summary.executed);
    println!("Winners:        {}", summary.winners);
    println!("Losers:         {}", summary.losers);
    println!("Win Rate:       {:.1}%", summary.win_rate() * 100.0);
    println!("Total PnL:      {:.2}", summary.total_pnl);
    println!();
    println!("--- Exits ---");
    println!("Target Hit:     {}", exits.target_hit);
    println!("Stopped Out:    {}", exits.stopped_out);
    println!("Squared Off:    {}", exits.squared_off);
    println!("Cancelled:      {}", exits.cancelled);
    println!("Timed Out:      {}", exits.timed_out);
    println!("Rejected:       {}", exits.rejected);
    println!("No Data:        {}", exits.no_data);
    println!();
    println!("--- Brackets ---");
    println!(
        "{:<12} {:<6} {:>5} {:>10} {:>8}  {:<12} {:>10}",
        "Symbol", "Dir", "Qty", "Activated", "Closed", "Exit", "PnL"
    );
    println!("{}", "-".repeat(70));
    for outcome in &report.outcomes {
        println!(
            "{:<12} {:<6} {:>5} {:>10} {:>8}  {:<12} {:>10.2}",
            outcome.symbol,
            direction_label(outcome.order.direction),
            outcome.order.quantity,
            hhmm(outcome.state.first_activated_at()),
            hhmm(outcome.state.closed_at),
            exit_label(outcome.state.exit_reason),
            outcome.state.realized_pnl,
        );
    }
    if synthetic_used {
        println!();
        println!("WARNING: Results include SYNTHETIC bars");
    }
    println!();
}

/// First 12 hex digits of a replay id — enough to tell sessions apart.
fn short_id(replay_id: &str) -> &str {
    &replay_id[..replay_id.len().min(12)]
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Long => "LONG",
        Direction::Short => "SHORT",
    }
}

fn exit_label(reason: Option<ExitReason>) -> &'static str {
    match reason {
        Some(ExitReason::TriggeredCancelled) => "CANCELLED",
        Some(ExitReason::StoppedOut) => "STOPPED_OUT",
        Some(ExitReason::TargetHit) => "TARGET_HIT",
        Some(ExitReason::TimedOut) => "TIMED_OUT",
        Some(ExitReason::SquaredOffEndOfData) => "SQUARED_OFF",
        Some(ExitReason::RejectedBelowTarget) => "REJECTED",
        None => "NO_DATA",
    }
}

fn hhmm(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.format("%H:%M").to_string(),
        None => "-".to_string(),
    }
}
