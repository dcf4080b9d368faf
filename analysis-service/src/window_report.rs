use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use load_analytics::analytics::windows::{
    daily_window_totals, day_readings, peak_day, top_days, window_summary,
};

use crate::pipeline;
use crate::report;
use crate::sources::LoadProfileCsvFileSource;
use crate::transform::ReadingValidation;

/// Shared implementation of the night/morning consumption jobs: find the
/// date with the highest in-window consumption, log its breakdown, and write
/// the chart-ready day profile and daily totals.
pub async fn run_window_report(
    csv_path: &Path,
    label: &str,
    window: &[u8],
    day_profile_out: &Path,
    daily_totals_out: &Path,
) -> Result<()> {
    let source = LoadProfileCsvFileSource::new(csv_path);
    let readings =
        pipeline::collect_records(source, vec![Arc::new(ReadingValidation::default())], None)
            .await?;
    if readings.is_empty() {
        bail!("no readings in {}", csv_path.display());
    }
    tracing::info!(records = readings.len(), file = %csv_path.display(), "readings loaded");

    let totals = daily_window_totals(&readings, window);
    let Some(peak) = peak_day(&totals) else {
        bail!("no {label} readings in {}", csv_path.display());
    };
    tracing::info!(
        date = %peak.date,
        total_w = peak.total_w,
        "day with highest {label} consumption"
    );

    let day = day_readings(&readings, peak.date);
    if let Some(s) = window_summary(&day, window) {
        tracing::info!(
            total_w = s.total_w,
            avg_w = s.avg_w,
            max_w = s.max_w,
            min_w = s.min_w,
            peak_hour = s.peak_hour,
            "{label} window summary"
        );
    }

    for r in &day {
        tracing::info!(
            hour = r.hour(),
            import_w = r.import_w,
            in_window = window.contains(&r.hour()),
            "hour reading"
        );
    }

    for (rank, t) in top_days(&totals, 5).iter().enumerate() {
        tracing::info!(rank = rank + 1, date = %t.date, total_w = t.total_w, "top {label} day");
    }

    report::write_day_profile(day_profile_out, &day, window)
        .with_context(|| format!("failed to write {}", day_profile_out.display()))?;
    report::write_daily_totals(daily_totals_out, &totals)
        .with_context(|| format!("failed to write {}", daily_totals_out.display()))?;
    tracing::info!(
        day_profile = %day_profile_out.display(),
        daily_totals = %daily_totals_out.display(),
        "{label} report written"
    );

    Ok(())
}
