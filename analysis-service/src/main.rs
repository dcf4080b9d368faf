use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use analysis_service::{
    config::AppConfig, observability, pipeline, report, sources::LoadProfileCsvFileSource,
    transform::ReadingValidation,
};
use anyhow::Result;
use load_analytics::analytics::{hourly_stats, meter_stats, score_meters};

/// Nighttime anomaly scan over the combined load profile: aggregates the
/// hourly and per-meter tables, scores every meter, and writes the ranked
/// report plus per-meter profile exports for the top offenders.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    let source = LoadProfileCsvFileSource::new(&cfg.input.combined_csv);
    let readings = pipeline::collect_records(
        source,
        vec![Arc::new(ReadingValidation::default())],
        cfg.input.max_records,
    )
    .await?;
    anyhow::ensure!(
        !readings.is_empty(),
        "no readings in {}",
        cfg.input.combined_csv.display()
    );

    let meters: BTreeSet<&str> = readings.iter().map(|r| r.meter_id.as_str()).collect();
    if let (Some(first_ts), Some(last_ts)) = (
        readings.iter().map(|r| r.meter_ts).min(),
        readings.iter().map(|r| r.meter_ts).max(),
    ) {
        tracing::info!(
            records = readings.len(),
            unique_meters = meters.len(),
            first_ts = %first_ts,
            last_ts = %last_ts,
            "load profile loaded"
        );
    }

    let hourly = hourly_stats(&readings);
    let meter_table = meter_stats(&readings);
    let flagged = score_meters(&hourly, &meter_table);

    if flagged.is_empty() {
        tracing::info!("no significantly anomalous meters found");
        return Ok(());
    }
    tracing::info!(flagged = flagged.len(), "meters with anomalous nighttime consumption");

    for (rank, rec) in flagged.iter().take(5).enumerate() {
        tracing::info!(
            rank = rank + 1,
            meter_id = %rec.meter_id,
            anomaly_score = rec.anomaly_score,
            night_avg_w = rec.night_avg,
            day_avg_w = rec.day_avg,
            reasons = %rec.reasons.join("; "),
            "anomalous meter"
        );
    }

    fs::create_dir_all(&cfg.report.out_dir)?;

    let report_path = cfg.report.out_dir.join("anomalous_meters.csv");
    report::write_anomaly_report(&report_path, &flagged)?;
    tracing::info!(path = %report_path.display(), "anomaly report written");

    let top_ids: Vec<&str> = flagged
        .iter()
        .take(cfg.report.top_meters)
        .map(|rec| rec.meter_id.as_str())
        .collect();

    for meter_id in &top_ids {
        let profile: Vec<_> = hourly
            .iter()
            .filter(|s| s.meter_id == *meter_id)
            .cloned()
            .collect();
        let path = cfg.report.out_dir.join(format!("meter_{meter_id}_hourly.csv"));
        report::write_hourly_profile(&path, &profile)?;
    }

    let heatmap_path = cfg.report.out_dir.join("anomalous_meters_heatmap.csv");
    report::write_hourly_heatmap(&heatmap_path, &top_ids, &hourly)?;
    tracing::info!(
        profiles = top_ids.len(),
        heatmap = %heatmap_path.display(),
        "per-meter exports written"
    );

    Ok(())
}
