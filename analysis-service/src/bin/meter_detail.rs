use std::env;
use std::path::Path;
use std::sync::Arc;

use analysis_service::{
    observability, pipeline, report, sources::LoadProfileCsvFileSource,
    transform::ReadingValidation,
};
use anyhow::{bail, Result};
use load_analytics::analytics::detail::{meter_findings, monthly_profile, weekday_profile};
use load_analytics::analytics::hourly_stats;

/// Deep dive on a single meter: hourly, weekday and monthly profiles plus
/// the night-versus-day key findings behind the anomaly rules.
///
/// Usage:
///   meter_detail <combined.csv> <meter_id>
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("usage: meter_detail <combined.csv> <meter_id>");
    }
    let csv_path = Path::new(&args[1]);
    let meter_id = &args[2];

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

    let (Some(first_ts), Some(last_ts)) = (
        meter_readings.iter().map(|r| r.meter_ts).min(),
        meter_readings.iter().map(|r| r.meter_ts).max(),
    ) else {
        bail!("no data found for meter {meter_id}");
    };
    tracing::info!(
        records = meter_readings.len(),
        meter_id = %meter_id,
        first_ts = %first_ts,
        last_ts = %last_ts,
        "meter data loaded"
    );

    let hourly = hourly_stats(&meter_readings);
    let weekday = weekday_profile(&meter_readings);
    let monthly = monthly_profile(&meter_readings);

    report::write_hourly_profile(Path::new(&format!("meter_{meter_id}_hourly.csv")), &hourly)?;
    report::write_weekday_profile(Path::new(&format!("meter_{meter_id}_weekday.csv")), &weekday)?;
    report::write_monthly_profile(Path::new(&format!("meter_{meter_id}_monthly.csv")), &monthly)?;
    tracing::info!(meter_id = %meter_id, "hourly, weekday and monthly profiles written");

    match meter_findings(&meter_readings) {
        Some(f) => {
            tracing::info!(
                overall_mean_w = f.overall_mean,
                overall_max_w = f.overall_max,
                overall_min_w = f.overall_min,
                "overall statistics"
            );
            tracing::info!(
                night_mean_w = f.night_mean,
                day_mean_w = f.day_mean,
                night_min_w = f.night_min,
                night_max_w = f.night_max,
                "day versus night comparison"
            );
            if let Some(ratio) = f.night_day_ratio {
                tracing::info!(ratio, "night consumption relative to day");
            }
            if let Some(ratio) = f.base_load_ratio {
                tracing::info!(ratio, "night minimum relative to overall mean");
            }
            tracing::info!(
                night_above_day = f.night_mean > f.day_mean,
                high_night_minimum = f.night_min > 0.5 * f.overall_mean,
                night_peak_near_max = f.night_max > 0.7 * f.overall_max,
                "anomaly indicators"
            );
        }
        None => {
            tracing::info!(
                meter_id = %meter_id,
                "meter lacks night or day readings, skipping comparison"
            );
        }
    }

    Ok(())
}
