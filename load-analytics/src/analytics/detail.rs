use std::collections::BTreeMap;

use serde::Serialize;
use time::Weekday;

use crate::analytics::anomaly::NIGHT_HOURS;
use crate::domain::LoadReading;

/// Mean import power for one day of the week.
#[derive(Debug, Clone, Serialize)]
pub struct WeekdayAvg {
    pub weekday: String,
    #[serde(rename = "mean_w")]
    pub mean: f64,
    pub count: u64,
}

/// Mean import power for one calendar month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyAvg {
    pub year: i32,
    pub month: u8,
    #[serde(rename = "mean_w")]
    pub mean: f64,
    pub count: u64,
}

/// Night-versus-day breakdown of a single meter's raw readings, used for the
/// deep-dive report. Unlike the scorer this works on readings directly, not
/// on per-hour means.
#[derive(Debug, Clone)]
pub struct MeterFindings {
    pub overall_mean: f64,
    pub overall_max: f64,
    pub overall_min: f64,
    pub night_mean: f64,
    pub day_mean: f64,
    pub night_max: f64,
    pub night_min: f64,
    /// night_mean / day_mean; `None` when day_mean is zero.
    pub night_day_ratio: Option<f64>,
    /// night_min / overall_mean; `None` when overall_mean is zero.
    pub base_load_ratio: Option<f64>,
}

const WEEKDAY_ORDER: [Weekday; 7] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
    Weekday::Sunday,
];

/// Mean import power per day of week, Monday through Sunday. Days with no
/// readings are omitted.
pub fn weekday_profile(readings: &[LoadReading]) -> Vec<WeekdayAvg> {
    let mut sums: BTreeMap<u8, (f64, u64)> = BTreeMap::new();
    for r in readings {
        let idx = r.meter_ts.weekday().number_days_from_monday();
        let entry = sums.entry(idx).or_insert((0.0, 0));
        entry.0 += r.import_w;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(idx, (sum, count))| WeekdayAvg {
            weekday: format!("{:?}", WEEKDAY_ORDER[idx as usize]),
            mean: sum / count as f64,
            count,
        })
        .collect()
}

/// Mean import power per calendar month, ascending.
pub fn monthly_profile(readings: &[LoadReading]) -> Vec<MonthlyAvg> {
    let mut sums: BTreeMap<(i32, u8), (f64, u64)> = BTreeMap::new();
    for r in readings {
        let key = (r.meter_ts.year(), u8::from(r.meter_ts.month()));
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += r.import_w;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|((year, month), (sum, count))| MonthlyAvg {
            year,
            month,
            mean: sum / count as f64,
            count,
        })
        .collect()
}

/// Key findings over one meter's readings. `None` when the meter has no
/// night readings or no day readings to compare.
pub fn meter_findings(readings: &[LoadReading]) -> Option<MeterFindings> {
    if readings.is_empty() {
        return None;
    }

    let night: Vec<f64> = readings
        .iter()
        .filter(|r| NIGHT_HOURS.contains(&r.hour()))
        .map(|r| r.import_w)
        .collect();
    let day: Vec<f64> = readings
        .iter()
        .filter(|r| !NIGHT_HOURS.contains(&r.hour()))
        .map(|r| r.import_w)
        .collect();
    if night.is_empty() || day.is_empty() {
        return None;
    }

    let mean = |vals: &[f64]| vals.iter().sum::<f64>() / vals.len() as f64;
    let overall: Vec<f64> = readings.iter().map(|r| r.import_w).collect();

    let overall_mean = mean(&overall);
    let night_mean = mean(&night);
    let day_mean = mean(&day);
    let night_max = night.iter().copied().fold(f64::MIN, f64::max);
    let night_min = night.iter().copied().fold(f64::MAX, f64::min);

    Some(MeterFindings {
        overall_mean,
        overall_max: overall.iter().copied().fold(f64::MIN, f64::max),
        overall_min: overall.iter().copied().fold(f64::MAX, f64::min),
        night_mean,
        day_mean,
        night_max,
        night_min,
        night_day_ratio: (day_mean != 0.0).then(|| night_mean / day_mean),
        base_load_ratio: (overall_mean != 0.0).then(|| night_min / overall_mean),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::PrimitiveDateTime;

    fn reading(meter_ts: PrimitiveDateTime, import_w: f64) -> LoadReading {
        LoadReading {
            entry_ts: meter_ts,
            meter_ts,
            meter_id: "m-1".to_string(),
            import_w,
            export_w: 0.0,
        }
    }

    #[test]
    fn weekday_profile_runs_monday_to_sunday() {
        // 2024-03-04 is a Monday, 2024-03-10 a Sunday.
        let readings = vec![
            reading(datetime!(2024-03-10 10:00), 30.0),
            reading(datetime!(2024-03-04 10:00), 10.0),
            reading(datetime!(2024-03-04 11:00), 20.0),
        ];

        let profile = weekday_profile(&readings);
        assert_eq!(profile.len(), 2);
        assert_eq!(profile[0].weekday, "Monday");
        assert_eq!(profile[0].mean, 15.0);
        assert_eq!(profile[0].count, 2);
        assert_eq!(profile[1].weekday, "Sunday");
        assert_eq!(profile[1].mean, 30.0);
    }

    #[test]
    fn monthly_profile_is_ascending_across_years() {
        let readings = vec![
            reading(datetime!(2024-01-15 10:00), 40.0),
            reading(datetime!(2023-12-15 10:00), 20.0),
            reading(datetime!(2024-01-20 10:00), 60.0),
        ];

        let profile = monthly_profile(&readings);
        assert_eq!(profile.len(), 2);
        assert_eq!((profile[0].year, profile[0].month, profile[0].mean), (2023, 12, 20.0));
        assert_eq!((profile[1].year, profile[1].month, profile[1].mean), (2024, 1, 50.0));
    }

    #[test]
    fn findings_compare_night_and_day_readings() {
        let readings = vec![
            reading(datetime!(2024-03-01 22:00), 100.0),
            reading(datetime!(2024-03-02 02:00), 300.0),
            reading(datetime!(2024-03-02 12:00), 100.0),
        ];

        let f = meter_findings(&readings).unwrap();
        assert_eq!(f.night_mean, 200.0);
        assert_eq!(f.day_mean, 100.0);
        assert_eq!(f.night_max, 300.0);
        assert_eq!(f.night_min, 100.0);
        assert_eq!(f.night_day_ratio, Some(2.0));
    }

    #[test]
    fn findings_need_both_night_and_day() {
        let readings = vec![reading(datetime!(2024-03-01 12:00), 100.0)];
        assert!(meter_findings(&readings).is_none());
        assert!(meter_findings(&[]).is_none());
    }
}
