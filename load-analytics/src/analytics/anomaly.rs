use std::collections::BTreeMap;

use crate::analytics::aggregate::{HourlyStat, MeterStat};

/// Hours treated as night: 21:00 through 04:59. Listed in chronological
/// order across midnight; trend fitting relies on this order.
pub const NIGHT_HOURS: [u8; 8] = [21, 22, 23, 0, 1, 2, 3, 4];

/// A meter is flagged once its rule weights sum to at least this.
pub const ANOMALY_SCORE_THRESHOLD: u32 = 2;

/// Night peak above this fraction of the overall maximum scores.
const NIGHT_PEAK_RATIO: f64 = 0.7;
/// Night minimum above this fraction of the overall mean scores.
const NIGHT_BASELINE_RATIO: f64 = 0.5;
/// Fitted night trend must rise faster than this (watts per hour step).
const NIGHT_TREND_MIN_SLOPE: f64 = 10.0;

/// One flagged meter: the score, the inputs it was judged on, and the
/// human-readable reasons in rule order.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRecord {
    pub meter_id: String,
    pub anomaly_score: u32,
    pub night_avg: f64,
    pub day_avg: f64,
    pub night_max: f64,
    pub night_min: f64,
    pub overall_max: f64,
    pub overall_min: f64,
    pub overall_mean: f64,
    pub reasons: Vec<String>,
}

/// Score every meter's nighttime consumption against its own profile.
///
/// Takes the two aggregate tables computed over one reading set and returns
/// the flagged meters sorted descending by score. The sort is stable and
/// meters are visited ascending by meter id, so ties keep that order and
/// repeated runs over the same tables produce identical output.
pub fn score_meters(hourly: &[HourlyStat], meters: &[MeterStat]) -> Vec<AnomalyRecord> {
    let mut hours_by_meter: BTreeMap<&str, Vec<&HourlyStat>> = BTreeMap::new();
    for h in hourly {
        hours_by_meter.entry(h.meter_id.as_str()).or_default().push(h);
    }
    let overall_by_meter: BTreeMap<&str, &MeterStat> =
        meters.iter().map(|m| (m.meter_id.as_str(), m)).collect();

    let mut flagged: Vec<AnomalyRecord> = hours_by_meter
        .iter()
        .filter_map(|(meter_id, hours)| {
            overall_by_meter
                .get(meter_id)
                .and_then(|overall| score_meter(hours, overall))
        })
        .collect();

    flagged.sort_by(|a, b| b.anomaly_score.cmp(&a.anomaly_score));
    flagged
}

fn score_meter(hours: &[&HourlyStat], overall: &MeterStat) -> Option<AnomalyRecord> {
    // Night rows in the chronological wrap order of NIGHT_HOURS, not by
    // numeric hour; missing hours are simply absent.
    let night: Vec<&HourlyStat> = NIGHT_HOURS
        .iter()
        .filter_map(|nh| hours.iter().find(|s| s.hour == *nh).copied())
        .collect();
    let day: Vec<&HourlyStat> = hours
        .iter()
        .filter(|s| !NIGHT_HOURS.contains(&s.hour))
        .copied()
        .collect();

    // Nothing to compare against.
    if night.is_empty() || day.is_empty() {
        return None;
    }

    let night_means: Vec<f64> = night.iter().map(|s| s.mean).collect();
    let night_avg = night_means.iter().sum::<f64>() / night_means.len() as f64;
    let day_avg = day.iter().map(|s| s.mean).sum::<f64>() / day.len() as f64;
    let night_max = night_means.iter().copied().fold(f64::MIN, f64::max);
    let night_min = night_means.iter().copied().fold(f64::MAX, f64::min);

    let mut anomaly_score = 0u32;
    let mut reasons = Vec::new();

    // 1. Night peak close to the meter's overall peak.
    if overall.max != 0.0 && night_max > NIGHT_PEAK_RATIO * overall.max {
        anomaly_score += 3;
        reasons.push(format!(
            "High night peak: {night_max:.0}W vs overall max {:.0}W",
            overall.max
        ));
    }

    // 2. Nights run hotter than days on average.
    if day_avg != 0.0 && night_avg > day_avg {
        anomaly_score += 2;
        reasons.push(format!("Night avg ({night_avg:.0}W) > day avg ({day_avg:.0}W)"));
    }

    // 3. Consumption never dips at night relative to the overall mean.
    if overall.mean != 0.0 && night_min > NIGHT_BASELINE_RATIO * overall.mean {
        anomaly_score += 2;
        reasons.push(format!(
            "High night minimum: {night_min:.0}W vs overall mean {:.0}W",
            overall.mean
        ));
    }

    // 4. Consumption ramps up through the night.
    if night_means.len() > 2 {
        if let Some(slope) = fit_slope(&night_means) {
            if slope > NIGHT_TREND_MIN_SLOPE {
                anomaly_score += 1;
                reasons.push(format!("Increasing night trend: +{slope:.1}W/hour"));
            }
        }
    }

    if anomaly_score < ANOMALY_SCORE_THRESHOLD {
        return None;
    }

    Some(AnomalyRecord {
        meter_id: overall.meter_id.clone(),
        anomaly_score,
        night_avg,
        day_avg,
        night_max,
        night_min,
        overall_max: overall.max,
        overall_min: overall.min,
        overall_mean: overall.mean,
        reasons,
    })
}

/// Least-squares slope of `values` against their indices. `None` when a
/// slope is undefined (fewer than two points).
fn fit_slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        numerator += (x - x_mean) * (y - y_mean);
        denominator += (x - x_mean) * (x - x_mean);
    }

    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}
