pub mod aggregate;
pub mod anomaly;
pub mod detail;
pub mod windows;

pub use aggregate::{hourly_stats, meter_stats, HourlyStat, MeterStat};
pub use anomaly::{score_meters, AnomalyRecord, NIGHT_HOURS};
pub use windows::{daily_window_totals, peak_day, window_summary, MORNING_HOURS};
