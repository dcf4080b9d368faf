use std::collections::BTreeMap;

use time::Date;

use crate::domain::LoadReading;

/// Hours treated as morning: 06:00 through 10:59.
pub const MORNING_HOURS: [u8; 5] = [6, 7, 8, 9, 10];

/// Summed import power inside one hour window for one calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyWindowTotal {
    pub date: Date,
    pub total_w: f64,
}

/// Aggregate stats over the in-window readings of a single day.
#[derive(Debug, Clone)]
pub struct WindowSummary {
    pub total_w: f64,
    pub avg_w: f64,
    pub max_w: f64,
    pub min_w: f64,
    /// Hour of day at which the window peak occurred.
    pub peak_hour: u8,
}

/// Sum import power per date over the readings whose hour falls in `window`.
/// Dates come back in ascending order.
pub fn daily_window_totals(readings: &[LoadReading], window: &[u8]) -> Vec<DailyWindowTotal> {
    let mut totals: BTreeMap<Date, f64> = BTreeMap::new();
    for r in readings.iter().filter(|r| window.contains(&r.hour())) {
        *totals.entry(r.date()).or_insert(0.0) += r.import_w;
    }

    totals
        .into_iter()
        .map(|(date, total_w)| DailyWindowTotal { date, total_w })
        .collect()
}

/// The date with the highest window total. Ties resolve to the earliest
/// date, so the answer is deterministic.
pub fn peak_day(totals: &[DailyWindowTotal]) -> Option<&DailyWindowTotal> {
    totals
        .iter()
        .fold(None, |best: Option<&DailyWindowTotal>, t| match best {
            Some(b) if t.total_w <= b.total_w => Some(b),
            _ => Some(t),
        })
}

/// The `n` highest-total days, descending; equal totals keep date order.
pub fn top_days(totals: &[DailyWindowTotal], n: usize) -> Vec<DailyWindowTotal> {
    let mut ranked = totals.to_vec();
    ranked.sort_by(|a, b| b.total_w.total_cmp(&a.total_w));
    ranked.truncate(n);
    ranked
}

/// Summarise the in-window readings of one day's data. `None` when the day
/// has no reading inside the window.
pub fn window_summary(day_readings: &[LoadReading], window: &[u8]) -> Option<WindowSummary> {
    let in_window: Vec<&LoadReading> = day_readings
        .iter()
        .filter(|r| window.contains(&r.hour()))
        .collect();
    if in_window.is_empty() {
        return None;
    }

    let total_w: f64 = in_window.iter().map(|r| r.import_w).sum();
    let avg_w = total_w / in_window.len() as f64;
    let peak = in_window
        .iter()
        .copied()
        .fold(in_window[0], |best, r| if r.import_w > best.import_w { r } else { best });
    let min_w = in_window
        .iter()
        .map(|r| r.import_w)
        .fold(f64::MAX, f64::min);

    Some(WindowSummary {
        total_w,
        avg_w,
        max_w: peak.import_w,
        min_w,
        peak_hour: peak.hour(),
    })
}

/// All readings of `date`, in meter-timestamp order.
pub fn day_readings(readings: &[LoadReading], date: Date) -> Vec<LoadReading> {
    let mut day: Vec<LoadReading> = readings.iter().filter(|r| r.date() == date).cloned().collect();
    day.sort_by_key(|r| r.meter_ts);
    day
}
