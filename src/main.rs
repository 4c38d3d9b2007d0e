//! # Rosterbell — shift reminder host
//!
//! Usage:
//!   rosterbell watch --shifts shifts.json            # Remind about shifts until Ctrl-C
//!   rosterbell watch --shifts shifts.json --lead-time 3hours
//!   rosterbell expand --date 2024-06-05 --frequency weekly --count 3 --weekdays 0,6

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rosterbell_core::{LeadTime, ReminderPreferences, RosterConfig};
use rosterbell_scheduler::dates;
use rosterbell_scheduler::recurrence::{self, RecurrenceRequest};
use rosterbell_scheduler::{
    ChannelDispatcher, InMemoryShiftStore, ReminderScheduler, SharedPreferences, ShiftRecord,
    SystemClock,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rosterbell",
    version,
    about = "🔔 Rosterbell — shift reminders and recurring shift dates"
)]
struct Cli {
    /// Config file (default: ~/.rosterbell/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch a shift file and print reminders as they become due
    Watch {
        /// JSON array of shifts
        #[arg(long)]
        shifts: String,

        /// Override the configured lead time (1hour, 3hours, 12hours, 24hours)
        #[arg(long)]
        lead_time: Option<LeadTime>,
    },
    /// Expand a recurrence pattern from an anchor date
    Expand {
        /// Anchor shift date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// daily or weekly
        #[arg(long, default_value = "weekly")]
        frequency: String,

        /// Number of days (daily) or weeks (weekly), 1-12
        #[arg(long, default_value = "4")]
        count: u32,

        /// Weekday indices, Sunday = 0 (weekly only)
        #[arg(long, value_delimiter = ',')]
        weekdays: Vec<u8>,

        /// Date to leave out (defaults to the anchor date)
        #[arg(long)]
        exclude: Option<String>,
    },
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "rosterbell=debug,rosterbell_scheduler=debug,rosterbell_core=debug"
    } else {
        "rosterbell=info,rosterbell_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => RosterConfig::load_from(&expand_path(path))?,
        None => RosterConfig::load()?,
    };

    match cli.command {
        Command::Watch { shifts, lead_time } => watch(config, &shifts, lead_time).await,
        Command::Expand {
            date,
            frequency,
            count,
            weekdays,
            exclude,
        } => expand(&date, frequency, count, weekdays, exclude.as_deref()),
    }
}

async fn watch(config: RosterConfig, shifts_path: &str, lead_time: Option<LeadTime>) -> Result<()> {
    let path = expand_path(shifts_path);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let shifts: Vec<ShiftRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse shifts in {}", path.display()))?;
    tracing::info!("📋 Loaded {} shifts from {}", shifts.len(), path.display());

    let mut prefs = ReminderPreferences::from(&config.reminders);
    if let Some(lt) = lead_time {
        prefs.lead_time = lt;
    }

    let store = Arc::new(InMemoryShiftStore::with_shifts(shifts));
    let (dispatcher, mut events) = ChannelDispatcher::new();
    let scheduler = ReminderScheduler::new(
        store,
        Arc::new(SharedPreferences::new(prefs)),
        Arc::new(dispatcher),
        Arc::new(SystemClock),
        config.scheduler.clone(),
    );
    scheduler.start()?;
    println!("🔔 Watching shifts (lead time {}). Press Ctrl-C to stop.", prefs.lead_time);

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                println!("[{}] {}", event.severity, event.message);
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    scheduler.stop();
    Ok(())
}

fn expand(
    date: &str,
    frequency: String,
    count: u32,
    weekdays: Vec<u8>,
    exclude: Option<&str>,
) -> Result<()> {
    let anchor = dates::parse_date(date).with_context(|| format!("Invalid date '{date}'"))?;
    let exclude = match exclude {
        Some(d) => dates::parse_date(d).with_context(|| format!("Invalid exclude date '{d}'"))?,
        None => anchor,
    };
    let request = RecurrenceRequest {
        frequency,
        occurrence_count: count,
        weekdays,
    };

    let outcome = recurrence::generate(anchor, &request, exclude)?;
    for d in &outcome.dates {
        println!("{} ({})", d.format(dates::DATE_FORMAT), d.format("%a"));
    }
    println!("[{}] {}", outcome.severity, outcome.message);
    Ok(())
}
