use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::LoadReading;

/// Import-power statistics for one meter and one hour of day, aggregated
/// over the whole observation window. Hours with no observations produce no
/// row at all.
#[derive(Debug, Clone, Serialize)]
pub struct HourlyStat {
    pub meter_id: String,
    pub hour: u8,
    #[serde(rename = "mean_w")]
    pub mean: f64,
    #[serde(rename = "median_w")]
    pub median: f64,
    #[serde(rename = "max_w")]
    pub max: f64,
    #[serde(rename = "min_w")]
    pub min: f64,
    /// Sample standard deviation; absent for a single observation.
    #[serde(rename = "stddev_w")]
    pub stddev: Option<f64>,
    pub count: u64,
}

/// Import-power statistics for one meter over all hours.
#[derive(Debug, Clone, Serialize)]
pub struct MeterStat {
    pub meter_id: String,
    #[serde(rename = "mean_w")]
    pub mean: f64,
    #[serde(rename = "median_w")]
    pub median: f64,
    #[serde(rename = "max_w")]
    pub max: f64,
    #[serde(rename = "min_w")]
    pub min: f64,
    #[serde(rename = "stddev_w")]
    pub stddev: Option<f64>,
}

/// Aggregate readings by (meter, hour of day). Rows come back ordered
/// ascending by meter id, then hour, so downstream iteration order is
/// deterministic.
pub fn hourly_stats(readings: &[LoadReading]) -> Vec<HourlyStat> {
    let mut groups: BTreeMap<(&str, u8), Vec<f64>> = BTreeMap::new();
    for r in readings {
        groups
            .entry((r.meter_id.as_str(), r.hour()))
            .or_default()
            .push(r.import_w);
    }

    groups
        .into_iter()
        .map(|((meter_id, hour), values)| {
            let s = Summary::of(&values);
            HourlyStat {
                meter_id: meter_id.to_string(),
                hour,
                mean: s.mean,
                median: s.median,
                max: s.max,
                min: s.min,
                stddev: s.stddev,
                count: values.len() as u64,
            }
        })
        .collect()
}

/// Aggregate readings by meter over all hours, ordered ascending by meter id.
pub fn meter_stats(readings: &[LoadReading]) -> Vec<MeterStat> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in readings {
        groups.entry(r.meter_id.as_str()).or_default().push(r.import_w);
    }

    groups
        .into_iter()
        .map(|(meter_id, values)| {
            let s = Summary::of(&values);
            MeterStat {
                meter_id: meter_id.to_string(),
                mean: s.mean,
                median: s.median,
                max: s.max,
                min: s.min,
                stddev: s.stddev,
            }
        })
        .collect()
}

struct Summary {
    mean: f64,
    median: f64,
    max: f64,
    min: f64,
    stddev: Option<f64>,
}

impl Summary {
    /// `values` is never empty: group-by only creates a group on first push.
    fn of(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let max = *sorted.last().unwrap_or(&f64::NAN);
        let min = *sorted.first().unwrap_or(&f64::NAN);

        let stddev = if values.len() > 1 {
            let sq_sum: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            Some((sq_sum / (n - 1.0)).sqrt())
        } else {
            None
        };

        Self {
            mean,
            median,
            max,
            min,
            stddev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::PrimitiveDateTime;

    fn reading(meter_id: &str, meter_ts: PrimitiveDateTime, import_w: f64) -> LoadReading {
        LoadReading {
            entry_ts: meter_ts,
            meter_ts,
            meter_id: meter_id.to_string(),
            import_w,
            export_w: 0.0,
        }
    }

    #[test]
    fn hourly_stats_groups_by_meter_and_hour() {
        let readings = vec![
            reading("m-1", datetime!(2024-01-01 10:00), 100.0),
            reading("m-1", datetime!(2024-01-02 10:30), 200.0),
            reading("m-1", datetime!(2024-01-01 11:00), 50.0),
            reading("m-2", datetime!(2024-01-01 10:15), 10.0),
        ];

        let stats = hourly_stats(&readings);
        assert_eq!(stats.len(), 3);

        let m1_h10 = &stats[0];
        assert_eq!(m1_h10.meter_id, "m-1");
        assert_eq!(m1_h10.hour, 10);
        assert_eq!(m1_h10.mean, 150.0);
        assert_eq!(m1_h10.median, 150.0);
        assert_eq!(m1_h10.max, 200.0);
        assert_eq!(m1_h10.min, 100.0);
        assert_eq!(m1_h10.count, 2);

        // single observation: no sample stddev
        let m1_h11 = &stats[1];
        assert_eq!(m1_h11.hour, 11);
        assert!(m1_h11.stddev.is_none());

        let m2_h10 = &stats[2];
        assert_eq!(m2_h10.meter_id, "m-2");
        assert_eq!(m2_h10.count, 1);
    }

    #[test]
    fn median_averages_middle_pair_for_even_counts() {
        let readings = vec![
            reading("m-1", datetime!(2024-01-01 08:00), 1.0),
            reading("m-1", datetime!(2024-01-02 08:00), 2.0),
            reading("m-1", datetime!(2024-01-03 08:00), 3.0),
            reading("m-1", datetime!(2024-01-04 08:00), 10.0),
        ];

        let stats = hourly_stats(&readings);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].median, 2.5);
    }

    #[test]
    fn meter_stats_covers_all_hours() {
        let readings = vec![
            reading("m-1", datetime!(2024-01-01 00:00), 2.0),
            reading("m-1", datetime!(2024-01-01 12:00), 4.0),
            reading("m-1", datetime!(2024-01-01 23:00), 6.0),
        ];

        let stats = meter_stats(&readings);
        assert_eq!(stats.len(), 1);
        let m = &stats[0];
        assert_eq!(m.mean, 4.0);
        assert_eq!(m.median, 4.0);
        assert_eq!(m.max, 6.0);
        assert_eq!(m.min, 2.0);
        assert_eq!(m.stddev, Some(2.0));
    }

    #[test]
    fn output_is_ordered_by_meter_id() {
        let readings = vec![
            reading("m-9", datetime!(2024-01-01 00:00), 1.0),
            reading("m-1", datetime!(2024-01-01 00:00), 1.0),
            reading("m-5", datetime!(2024-01-01 00:00), 1.0),
        ];

        let ids: Vec<String> = meter_stats(&readings).into_iter().map(|m| m.meter_id).collect();
        assert_eq!(ids, ["m-1", "m-5", "m-9"]);
    }
}
