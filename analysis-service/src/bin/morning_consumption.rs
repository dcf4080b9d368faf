use std::env;
use std::path::Path;

use analysis_service::{observability, window_report};
use anyhow::{bail, Result};
use load_analytics::analytics::MORNING_HOURS;

/// Find the day with the highest morning (06:00-10:59) consumption in a
/// cleaned per-meter CSV and export its profile.
///
/// Usage:
///   morning_consumption <cleaned_meter.csv>
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: morning_consumption <cleaned_meter.csv>");
    }

    window_report::run_window_report(
        Path::new(&args[1]),
        "morning",
        &MORNING_HOURS,
        Path::new("highest_morning_consumption_day.csv"),
        Path::new("morning_daily_totals.csv"),
    )
    .await
}
