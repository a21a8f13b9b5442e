//! Session simulator: runs bot-only spelling sessions against the engine
//! with in-memory capabilities and a simulated clock.

mod bot;
mod output;
mod simulator;
mod telemetry;
mod words;

use std::time::{Duration, Instant};

use bot::BotProfile;
use clap::{Parser, ValueEnum};
use futures::stream::{self, StreamExt};
use output::OutputWriter;
use simulator::{simulate, SessionSummary, SimulationConfig};
use spellbee_engine::GameMode;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "session-simulator")]
#[command(about = "Bot-only spelling sessions for load and balance testing")]
struct Args {
    /// Number of sessions to simulate
    #[arg(short, long, default_value = "1")]
    sessions: u64,

    /// Game mode for every session
    #[arg(long, default_value = "round-robin")]
    mode: ModeArg,

    /// Players per session (1 runs solo sessions)
    #[arg(short, long, default_value = "4")]
    players: usize,

    /// Round limit for round-robin sessions
    #[arg(long)]
    rounds: Option<u32>,

    /// Knock players out on a miss or a timeout
    #[arg(long)]
    elimination: bool,

    /// Word level (1-10)
    #[arg(long, default_value = "1")]
    level: u8,

    /// Probability a bot spells its word correctly
    #[arg(long, default_value = "0.8")]
    accuracy: f64,

    /// Probability a bot asks for another hint before answering
    #[arg(long, default_value = "0.2")]
    hint_rate: f64,

    /// Probability a bot lets its turn time out
    #[arg(long, default_value = "0.05")]
    stall_rate: f64,

    /// Turns after which a still running session is cancelled
    #[arg(long, default_value = "2000")]
    max_turns: u32,

    /// Sessions run at the same time
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Base seed (for deterministic runs)
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Show output summary and file paths
    #[arg(long)]
    show_output: bool,

    /// Output directory for results
    #[arg(long, default_value = "./simulation-results")]
    output_dir: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    RoundRobin,
    RapidFire,
    TotalGame,
}

impl From<ModeArg> for GameMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::RoundRobin => GameMode::RoundRobin,
            ModeArg::RapidFire => GameMode::RapidFire,
            ModeArg::TotalGame => GameMode::TotalGame,
        }
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), String> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("--{name} must be between 0 and 1, got {value}"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Silent by default, only warnings and errors
    let filter = if args.verbose {
        "debug"
    } else if args.show_output {
        "info"
    } else {
        "warn"
    };
    telemetry::init_tracing(filter);

    check_probability("accuracy", args.accuracy)?;
    check_probability("hint-rate", args.hint_rate)?;
    check_probability("stall-rate", args.stall_rate)?;

    let config = SimulationConfig {
        mode: args.mode.into(),
        players: args.players,
        rounds: args.rounds,
        elimination: args.elimination,
        level: args.level,
        bot: BotProfile {
            accuracy: args.accuracy,
            hint_rate: args.hint_rate,
            stall_rate: args.stall_rate,
            min_think: Duration::from_secs(1),
            max_think: Duration::from_secs(8),
        },
        seed: args.seed,
        max_turns: args.max_turns,
    };
    info!(sessions = args.sessions, mode = ?config.mode, players = config.players, "Starting session simulator");

    let mut output_writer = OutputWriter::new(&args.output_dir)?;

    let start = Instant::now();
    let mut results = Vec::new();
    let mut errors = 0u64;

    let mut runs = stream::iter(0..args.sessions)
        .map(|index| {
            let config = config.clone();
            async move { (index, simulate(index, &config).await) }
        })
        .buffer_unordered(args.concurrency.max(1));

    while let Some((index, result)) = runs.next().await {
        match result {
            Ok(summary) => {
                if let Err(e) = output_writer.write_session(&summary) {
                    warn!(index, error = %e, "Failed to write session summary");
                }
                if args.verbose {
                    info!(index, status = ?summary.status, turns = summary.turns, "Session completed");
                }
                results.push(summary);
            }
            Err(e) => {
                errors += 1;
                warn!(index, error = %e, code = %e.code(), "Session failed");
            }
        }
    }

    let elapsed = start.elapsed();
    let (jsonl_path, csv_path) = output_writer.output_paths();
    let (jsonl_path, csv_path) = (jsonl_path.to_path_buf(), csv_path.to_path_buf());
    output_writer.finish()?;

    if args.show_output {
        info!("Detailed results written to: {}", jsonl_path.display());
        info!("Summary CSV written to: {}", csv_path.display());
        print_summary(&results, errors, elapsed, args.sessions);
    }

    Ok(())
}

fn print_summary(results: &[SessionSummary], errors: u64, elapsed: Duration, total: u64) {
    println!("\n=== Simulation Summary ===");
    println!("Sessions completed: {}/{}", results.len(), total);
    if errors > 0 {
        println!("Errors: {errors}");
    }
    println!("Total time: {elapsed:?}");
    if results.is_empty() {
        return;
    }

    let n = results.len() as f64;
    let turns: u64 = results.iter().map(|r| u64::from(r.turns)).sum();
    let attempts: usize = results.iter().map(|r| r.attempts).sum();
    let correct: usize = results.iter().map(|r| r.correct).sum();
    let hints: u64 = results.iter().map(|r| u64::from(r.hints)).sum();
    let timeouts: u64 = results.iter().map(|r| u64::from(r.timeouts)).sum();
    let top: Vec<i64> = results
        .iter()
        .filter_map(|r| r.standings.first().map(|s| s.score))
        .collect();

    println!("Average turns per session: {:.1}", turns as f64 / n);
    if attempts > 0 {
        println!(
            "Accuracy: {:.1}% ({correct}/{attempts})",
            correct as f64 / attempts as f64 * 100.0
        );
    }
    println!("Hints per turn: {:.2}", hints as f64 / turns.max(1) as f64);
    println!("Timeouts: {timeouts}");
    if let (Some(min), Some(max)) = (top.iter().min(), top.iter().max()) {
        let avg = top.iter().sum::<i64>() as f64 / top.len() as f64;
        println!("Winning score: avg={avg:.1}, min={min}, max={max}");
    }
}
