use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::prelude::ToPrimitive;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use rowtrack::pace::{format_distance, format_elapsed, split_per_500m, PACE_SENTINEL};
use rowtrack::progress::{ProgressRange, ProgressSummary};
use rowtrack::source::wire::decode_payload;
use rowtrack::{
    logging, AppConfig, JsonLinesStore, ManualTimeSource, MetricsSnapshot, ReplaySource,
    SessionController, TimeSource, WorkoutRecord, WorkoutStore,
};

/// rowtrack - Rowing distance from accelerometer data
///
/// Replays recorded accelerometer sessions through the distance estimator,
/// decodes peripheral payloads and summarises stored workouts.
#[derive(Parser)]
#[command(name = "rowtrack")]
#[command(version)]
#[command(about = "Rowing motion-to-distance tracker", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded sample log through a full session
    Replay {
        /// CSV recording with timestamp_ms,ax,ay,az columns
        #[arg(short, long)]
        file: PathBuf,

        /// Print the workout record as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Append the workout to the configured store
        #[arg(short, long)]
        store: bool,
    },

    /// Decode one base64 peripheral notification
    Decode {
        #[arg(short, long)]
        payload: String,
    },

    /// Summarise stored workouts
    Progress {
        /// week, month or all
        #[arg(short, long, default_value = "week")]
        range: ProgressRange,
    },

    /// Show or create the configuration file
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the active configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);
    let config = AppConfig::load_or_default(&config_path)?;

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    logging::init_logging(&log_config)?;

    match cli.command {
        Commands::Replay { file, json, store } => replay(&config, &file, json, store)?,

        Commands::Decode { payload } => {
            let acceleration = decode_payload(&payload)
                .with_context(|| format!("Failed to decode payload {:?}", payload))?;
            println!(
                "x = {:.3}  y = {:.3}  z = {:.3}  |a| = {:.3}",
                acceleration.x,
                acceleration.y,
                acceleration.z,
                acceleration.magnitude()
            );
        }

        Commands::Progress { range } => {
            let store = JsonLinesStore::new(&config.storage.data_dir);
            let records = store.load_user(&config.storage.user_id)?;
            let summary = ProgressSummary::from_records(&records, range, Utc::now());
            print_progress(&summary);
        }

        Commands::Config { init, show } => {
            if init {
                let mut config = config.clone();
                config.save_to_file(&config_path)?;
                println!(
                    "{}",
                    format!("✓ Configuration written to {}", config_path.display()).green()
                );
            }
            if show || !init {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn replay(config: &AppConfig, file: &Path, json: bool, store: bool) -> Result<()> {
    let source = ReplaySource::from_path(file)
        .with_context(|| format!("Failed to load recording: {}", file.display()))?;
    let first_ms = source.peek_timestamp().unwrap_or(0);
    let total = source.remaining() as u64;

    // recordings carry relative timestamps; anchor them at the current wall time
    let wall_start = Utc::now().timestamp_millis();
    let time = ManualTimeSource::new(wall_start);
    let mut controller = SessionController::new(source, time.clone(), config.session_options());
    controller.start_session(&config.storage.user_id)?;

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} Replaying...")?
            .progress_chars("#>-"),
    );

    let tick_ms = config.display.tick_ms as i64;
    let mut next_tick = wall_start + tick_ms;
    while let Some(sample) = controller.source_mut().emit_next() {
        time.set(wall_start.saturating_add(sample.timestamp_ms.saturating_sub(first_ms)));
        if time.now_ms() >= next_tick {
            controller.tick();
            next_tick = time.now_ms() + tick_ms;
        }
        pb.inc(1);
    }
    controller.pump();
    pb.finish_and_clear();

    let snapshot = controller.snapshot();
    let record = if store {
        let mut store = JsonLinesStore::new(&config.storage.data_dir);
        controller.stop_and_store(&mut store)?
    } else {
        controller.stop_session()?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_workout(&record, snapshot.as_ref());
        if store {
            println!("{}", "✓ Workout saved".green());
        }
    }

    Ok(())
}

fn print_workout(record: &WorkoutRecord, snapshot: Option<&MetricsSnapshot>) {
    println!("{}", "Workout Summary".cyan().bold());

    let distance = record.total_distance_m.to_f64().unwrap_or(0.0);
    let mut rows = vec![
        SummaryRow {
            metric: "Elapsed",
            value: format_elapsed(record.duration_ms),
        },
        SummaryRow {
            metric: "Distance",
            value: format_distance(distance),
        },
        SummaryRow {
            metric: "Split",
            value: split_per_500m(record.duration_ms as f64 / 1000.0, distance)
                .to_string(),
        },
        SummaryRow {
            metric: "Average power",
            value: record
                .average_power_w
                .map(|watts| format!("{} W", watts))
                .unwrap_or_else(|| PACE_SENTINEL.to_string()),
        },
        SummaryRow {
            metric: "Dropped samples",
            value: record.dropped_samples.to_string(),
        },
    ];
    if let Some(snapshot) = snapshot {
        rows.push(SummaryRow {
            metric: "Final speed",
            value: format!("{:.2} m/s", snapshot.speed_mps),
        });
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

fn print_progress(summary: &ProgressSummary) {
    println!("{}", format!("Progress: {}", summary.range.label()).cyan().bold());

    let rows = vec![
        SummaryRow {
            metric: "Sessions",
            value: summary.total_sessions.to_string(),
        },
        SummaryRow {
            metric: "Distance",
            value: format!("{} km", summary.total_distance_km),
        },
        SummaryRow {
            metric: "Average duration",
            value: summary
                .avg_duration_seconds
                .map(|seconds| format_elapsed(seconds * 1000))
                .unwrap_or_else(|| PACE_SENTINEL.to_string()),
        },
        SummaryRow {
            metric: "Average power",
            value: summary
                .avg_power_w
                .map(|watts| format!("{} W", watts))
                .unwrap_or_else(|| PACE_SENTINEL.to_string()),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    if !summary.daily_distance_m.is_empty() {
        println!("{}", "Daily distance".yellow().bold());
        for (day, meters) in &summary.daily_distance_m {
            println!("  {}  {} m", day, meters);
        }
    }
}
