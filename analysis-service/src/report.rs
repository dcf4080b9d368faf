//! CSV report writers. Charts and animations are rendered elsewhere; these
//! files are the chart-ready data the jobs hand over.

use std::path::Path;

use anyhow::{Context, Result};
use load_analytics::analytics::aggregate::HourlyStat;
use load_analytics::analytics::anomaly::AnomalyRecord;
use load_analytics::analytics::detail::{MonthlyAvg, WeekdayAvg};
use load_analytics::analytics::windows::DailyWindowTotal;
use load_analytics::domain::LoadReading;
use serde::Serialize;

use crate::csv_layout::TIMESTAMP_FORMAT;

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))
}

#[derive(Serialize)]
struct AnomalyRow<'a> {
    meter_id: &'a str,
    anomaly_score: u32,
    night_avg: f64,
    day_avg: f64,
    night_max: f64,
    night_min: f64,
    overall_max: f64,
    overall_min: f64,
    overall_mean: f64,
    /// Reason strings flattened for the row-oriented file.
    reasons: String,
}

/// Full ranked anomaly list, one row per flagged meter, highest score first.
pub fn write_anomaly_report(path: &Path, records: &[AnomalyRecord]) -> Result<()> {
    let mut wtr = writer(path)?;
    for rec in records {
        wtr.serialize(AnomalyRow {
            meter_id: &rec.meter_id,
            anomaly_score: rec.anomaly_score,
            night_avg: rec.night_avg,
            day_avg: rec.day_avg,
            night_max: rec.night_max,
            night_min: rec.night_min,
            overall_max: rec.overall_max,
            overall_min: rec.overall_min,
            overall_mean: rec.overall_mean,
            reasons: rec.reasons.join("; "),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Per-hour statistics rows, typically filtered to one meter.
pub fn write_hourly_profile(path: &Path, stats: &[HourlyStat]) -> Result<()> {
    let mut wtr = writer(path)?;
    for stat in stats {
        wtr.serialize(stat)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct DayProfileRow<'a> {
    meter_ts: String,
    hour: u8,
    import_w: f64,
    export_w: f64,
    in_window: bool,
    meter_id: &'a str,
}

/// One day's time-ordered readings with an in-window marker, for the
/// highlighted single-day charts.
pub fn write_day_profile(path: &Path, day: &[LoadReading], window: &[u8]) -> Result<()> {
    let mut wtr = writer(path)?;
    for r in day {
        wtr.serialize(DayProfileRow {
            meter_ts: r
                .meter_ts
                .format(TIMESTAMP_FORMAT)
                .context("failed to format timestamp")?,
            hour: r.hour(),
            import_w: r.import_w,
            export_w: r.export_w,
            in_window: window.contains(&r.hour()),
            meter_id: &r.meter_id,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct DailyTotalRow {
    date: String,
    total_w: f64,
}

pub fn write_daily_totals(path: &Path, totals: &[DailyWindowTotal]) -> Result<()> {
    let mut wtr = writer(path)?;
    for t in totals {
        wtr.serialize(DailyTotalRow {
            date: t.date.to_string(),
            total_w: t.total_w,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_weekday_profile(path: &Path, profile: &[WeekdayAvg]) -> Result<()> {
    let mut wtr = writer(path)?;
    for row in profile {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_monthly_profile(path: &Path, profile: &[MonthlyAvg]) -> Result<()> {
    let mut wtr = writer(path)?;
    for row in profile {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Meter × hour grid of mean import power for the given meters, absent hours
/// zero-filled, one row per meter.
pub fn write_hourly_heatmap(path: &Path, meter_ids: &[&str], hourly: &[HourlyStat]) -> Result<()> {
    let mut wtr = writer(path)?;

    let mut header = vec!["meter_id".to_string()];
    header.extend((0..24).map(|h| format!("h{h:02}")));
    wtr.write_record(&header)?;

    for meter_id in meter_ids {
        let mut row_means = [0.0f64; 24];
        for stat in hourly.iter().filter(|s| s.meter_id == *meter_id) {
            row_means[stat.hour as usize] = stat.mean;
        }

        let mut row = vec![(*meter_id).to_string()];
        row.extend(row_means.iter().map(|m| m.to_string()));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn temp_file(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("report_writer_tests");
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn anomaly_report_flattens_reasons() {
        let path = temp_file("anomalies.csv");
        let records = vec![AnomalyRecord {
            meter_id: "m-1".to_string(),
            anomaly_score: 4,
            night_avg: 85.0,
            day_avg: 75.0,
            night_max: 120.0,
            night_min: 50.0,
            overall_max: 200.0,
            overall_min: 5.0,
            overall_mean: 90.0,
            reasons: vec!["first reason".to_string(), "second reason".to_string()],
        }];

        write_anomaly_report(&path, &records).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "meter_id,anomaly_score,night_avg,day_avg,night_max,night_min,overall_max,overall_min,overall_mean,reasons"
        );
        assert_eq!(
            lines.next().unwrap(),
            "m-1,4,85.0,75.0,120.0,50.0,200.0,5.0,90.0,first reason; second reason"
        );
    }

    #[test]
    fn heatmap_zero_fills_absent_hours() {
        let path = temp_file("heatmap.csv");
        let hourly = vec![
            HourlyStat {
                meter_id: "m-1".to_string(),
                hour: 0,
                mean: 5.0,
                median: 5.0,
                max: 5.0,
                min: 5.0,
                stddev: None,
                count: 1,
            },
            HourlyStat {
                meter_id: "m-1".to_string(),
                hour: 23,
                mean: 7.0,
                median: 7.0,
                max: 7.0,
                min: 7.0,
                stddev: None,
                count: 1,
            },
        ];

        write_hourly_heatmap(&path, &["m-1"], &hourly).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("meter_id,h00,h01"));
        assert!(header.ends_with("h23"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("m-1,5,0,0"));
        assert!(row.ends_with(",7"));
    }

    #[test]
    fn day_profile_marks_window_hours() {
        let path = temp_file("day_profile.csv");
        let ts = datetime!(2023-05-10 22:00:00);
        let day = vec![LoadReading {
            entry_ts: ts,
            meter_ts: ts,
            meter_id: "m-1".to_string(),
            import_w: 42.0,
            export_w: 0.0,
        }];

        write_day_profile(&path, &day, &load_analytics::analytics::NIGHT_HOURS).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "meter_ts,hour,import_w,export_w,in_window,meter_id"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2023-05-10 22:00:00,22,42.0,0.0,true,m-1"
        );
    }
}
