use clap::Parser;
use tracing::error;

use castle_rescue::constants::{
    AGENTS, DEFAULT_MAX_STEPS, DEFAULT_NUM_SIMULATIONS, DEFAULT_SEED, HEIGHT, PROGRESS_INTERVAL,
    SUCCESS_THRESHOLD, WIDTH, WIN_THRESHOLD,
};
use castle_rescue::model::ModelConfig;
use castle_rescue::sandbox::sandbox_factory;
use castle_rescue::simulation::{save_report, BatchHarness, BatchOutcome, Thresholds};

#[derive(Debug, Parser)]
#[command(
    name = "castle-simulate",
    about = "Run many Castle Rescue games and report outcome statistics",
    version
)]
struct Args {
    /// Number of games to simulate.
    #[arg(long, default_value_t = DEFAULT_NUM_SIMULATIONS)]
    runs: usize,

    /// Step cap per game; unfinished games are recorded as such.
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u32,

    /// Base seed. Game i uses seed + i.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Victims saved needed for a win (when the engine does not report one).
    #[arg(long, default_value_t = WIN_THRESHOLD)]
    win_threshold: u32,

    /// Games saving strictly more victims than this count as successful.
    #[arg(long, default_value_t = SUCCESS_THRESHOLD)]
    success_threshold: u32,

    /// Log progress every N completed games (0 disables).
    #[arg(long, default_value_t = PROGRESS_INTERVAL)]
    progress_every: usize,

    /// Run games one after another on the main thread.
    #[arg(long)]
    sequential: bool,

    /// Write the aggregate report as JSON to this path.
    #[arg(long)]
    output: Option<String>,

    #[arg(long, default_value_t = WIDTH)]
    width: usize,

    #[arg(long, default_value_t = HEIGHT)]
    height: usize,

    #[arg(long, default_value_t = AGENTS)]
    agents: usize,
}

fn main() {
    castle_rescue::env_config::init_tracing();
    let args = Args::parse();
    let num_threads = castle_rescue::env_config::init_rayon_threads();

    println!("Castle Rescue batch simulation");
    println!(
        "  Configuration: {} games, max {} steps/game, seed {}, {} threads",
        args.runs,
        args.max_steps,
        args.seed,
        if args.sequential { 1 } else { num_threads }
    );
    println!();

    let config = ModelConfig {
        width: args.width,
        height: args.height,
        agents: args.agents,
    };
    let thresholds = Thresholds {
        win: args.win_threshold,
        success: args.success_threshold,
    };
    let mut harness = BatchHarness::new(sandbox_factory, config)
        .with_thresholds(thresholds)
        .with_seed(args.seed)
        .with_progress_interval(args.progress_every);
    if args.sequential {
        harness = harness.sequential();
    }

    let outcome = match harness.run_batch(args.runs, args.max_steps) {
        Ok(o) => o,
        Err(e) => {
            error!(error = %e, "batch failed");
            std::process::exit(1);
        }
    };

    print_report(&outcome);

    if let Some(ref path) = args.output {
        match save_report(&outcome.report, path) {
            Ok(()) => println!("\n  Report saved: {}", path),
            Err(e) => {
                error!(path = %path, error = %e, "failed to save report");
                std::process::exit(1);
            }
        }
    }
}

fn pct(ratio: f64) -> f64 {
    ratio * 100.0
}

fn print_report(outcome: &BatchOutcome) {
    let report = &outcome.report;
    let n = report.num_simulations as f64;
    let t = report.thresholds;

    println!("Results ({} games):", report.num_simulations);
    println!(
        "  Saved more than {} victims: {} ({:.1}%)",
        t.success,
        report.successful,
        pct(report.success_rate)
    );

    let successful: Vec<_> = outcome
        .results
        .iter()
        .filter(|r| r.victims_saved > t.success)
        .collect();
    if !successful.is_empty() {
        println!();
        println!("Successful games:");
        for r in successful {
            println!(
                "  Game {:4}: {} saved (steps: {}, dead: {}, damage: {})",
                r.simulation, r.victims_saved, r.steps, r.victims_dead, r.damage_counter
            );
        }
    }

    println!();
    println!("Summary:");
    println!("  Wins (>= {} victims): {}", t.win, report.total_wins);
    println!("  Win rate:            {:.1}%", pct(report.win_rate));
    println!("  Mean victims saved:  {:.2}", report.average_victims_saved);
    println!("  Mean steps per game: {:.1}", report.average_steps);
    println!("  Failed games:        {}", report.errors);
    println!("  Execution time:      {:.1} s", report.execution_time_secs);

    println!();
    println!("Victims saved distribution:");
    for (&victims, &count) in &report.victims_saved_distribution {
        let share = count as f64 / n * 100.0;
        let bar = "\u{2588}".repeat((share / 2.0) as usize);
        println!("  {:2} victims: {:5} games ({:5.1}%) {}", victims, count, share, bar);
    }

    println!();
    println!("Termination reasons:");
    for (reason, count) in report.reasons_by_frequency() {
        println!(
            "  {}: {} games ({:.1}%)",
            reason,
            count,
            count as f64 / n * 100.0
        );
    }

    println!();
    println!("Executive summary:");
    println!(
        "  Successful (> {} victims): {}/{} ({:.1}%)",
        t.success,
        report.successful,
        report.num_simulations,
        pct(report.success_rate)
    );
    println!(
        "  Wins: {} ({:.1}%)",
        report.total_wins,
        pct(report.win_rate)
    );
    println!("  Mean victims saved: {:.2}", report.average_victims_saved);
    if let Some(avg) = report.average_victims_saved_successful {
        println!("  Mean victims saved in successful games: {:.2}", avg);
    }
}
