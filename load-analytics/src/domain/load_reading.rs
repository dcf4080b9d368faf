use time::{Date, PrimitiveDateTime};

/// One row of the electrical load profile: a pair of timestamped power
/// readings for a single meter. Timestamps are naive; the head-end system
/// exports them without a zone.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReading {
    /// When the head-end system recorded the row.
    pub entry_ts: PrimitiveDateTime,
    /// The meter's own clock for the interval.
    pub meter_ts: PrimitiveDateTime,
    pub meter_id: String,
    /// Import active power (QI+QIV), watts.
    pub import_w: f64,
    /// Export active power (QII+QIII), watts.
    pub export_w: f64,
}

impl LoadReading {
    /// Hour of day (0-23) the reading belongs to, taken from the meter clock.
    pub fn hour(&self) -> u8 {
        self.meter_ts.hour()
    }

    pub fn date(&self) -> Date {
        self.meter_ts.date()
    }
}
