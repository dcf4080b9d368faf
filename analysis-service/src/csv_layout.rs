//! Column names and timestamp format of the cleaned load-profile CSV. The
//! header keeps the head-end system's original column names.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

pub const COL_ENTRY_TS: &str = "Entry Datetime";
pub const COL_METER_TS: &str = "Meter Datetime";
pub const COL_METER_ID: &str = "HES Meter Id";
pub const COL_IMPORT_W: &str = "Import active power (QI+QIV)[W]";
pub const COL_EXPORT_W: &str = "Export active power (QII+QIII)[W]";

pub const CLEANED_HEADER: [&str; 5] = [
    COL_ENTRY_TS,
    COL_METER_TS,
    COL_METER_ID,
    COL_IMPORT_W,
    COL_EXPORT_W,
];

/// Naive second-precision timestamps; the raw exports carry no zone and the
/// sub-second digits are head-end artifacts.
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
