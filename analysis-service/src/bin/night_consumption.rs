use std::env;
use std::path::Path;

use analysis_service::{observability, window_report};
use anyhow::{bail, Result};
use load_analytics::analytics::NIGHT_HOURS;

/// Find the day with the highest nighttime (21:00-04:59) consumption in a
/// cleaned per-meter CSV and export its profile.
///
/// Usage:
///   night_consumption <cleaned_meter.csv>
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: night_consumption <cleaned_meter.csv>");
    }

    window_report::run_window_report(
        Path::new(&args[1]),
        "night",
        &NIGHT_HOURS,
        Path::new("highest_night_consumption_day.csv"),
        Path::new("night_daily_totals.csv"),
    )
    .await
}
