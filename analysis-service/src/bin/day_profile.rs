use std::env;
use std::path::Path;
use std::sync::Arc;

use analysis_service::{
    observability, pipeline, report, sources::LoadProfileCsvFileSource,
    transform::ReadingValidation,
};
use anyhow::{bail, Context, Result};
use load_analytics::analytics::windows::{day_readings, window_summary};
use load_analytics::analytics::NIGHT_HOURS;
use time::macros::format_description;
use time::Date;

/// Export one meter's full-day profile for a specific date, with night-hour
/// markers for the highlighted chart.
///
/// Usage:
///   day_profile <combined.csv> <meter_id> <YYYY-MM-DD>
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        bail!("usage: day_profile <combined.csv> <meter_id> <YYYY-MM-DD>");
    }
    let csv_path = Path::new(&args[1]);
    let meter_id = &args[2];
    let date = Date::parse(&args[3], format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid date '{}'", args[3]))?;

    let source = LoadProfileCsvFileSource::new(csv_path);
    let readings =
        pipeline::collect_records(source, vec![Arc::new(ReadingValidation::default())], None)
            .await?;

    let meter_readings: Vec<_> = readings
        .into_iter()
        .filter(|r| r.meter_id == *meter_id)
        .collect();
    if meter_readings.is_empty() {
        bail!("no data found for meter {meter_id}");
    }

    let day = day_readings(&meter_readings, date);
    if day.is_empty() {
        bail!("no data found for meter {meter_id} on {date}");
    }
    tracing::info!(records = day.len(), meter_id = %meter_id, date = %date, "day extracted");

    let day_avg = day.iter().map(|r| r.import_w).sum::<f64>() / day.len() as f64;
    tracing::info!(avg_w = day_avg, "full-day average");
    if let Some(night) = window_summary(&day, &NIGHT_HOURS) {
        tracing::info!(
            avg_w = night.avg_w,
            max_w = night.max_w,
            min_w = night.min_w,
            peak_hour = night.peak_hour,
            "night window summary"
        );
    }

    let out = format!("day_profile_{meter_id}_{date}.csv");
    report::write_day_profile(Path::new(&out), &day, &NIGHT_HOURS)?;
    tracing::info!(path = %out, "day profile written");

    Ok(())
}
